//! Relevance scoring for candidate links.
//!
//! Scores are additive integers. Text evidence (tokens, phrase, path,
//! category keywords) is available for every candidate; the structural
//! boost only exists once the candidate page has been visited and its
//! product cards counted.

use crate::acquisition::links::Candidate;
use crate::cartography::url_rules::{self, UrlRules};
use crate::config::ScoringWeights;
use serde::Serialize;

/// Per-rule contributions to a candidate's score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScoreBreakdown {
    pub token: i64,
    pub phrase: i64,
    pub path: i64,
    pub category: i64,
    pub structural: i64,
}

impl ScoreBreakdown {
    pub fn total(&self) -> i64 {
        self.token + self.phrase + self.path + self.category + self.structural
    }
}

/// Scores candidates against one material's token set.
#[derive(Debug, Clone)]
pub struct RelevanceScorer<'a> {
    tokens: &'a [String],
    phrase: String,
    weights: &'a ScoringWeights,
    rules: &'a UrlRules,
}

impl<'a> RelevanceScorer<'a> {
    pub fn new(tokens: &'a [String], weights: &'a ScoringWeights, rules: &'a UrlRules) -> Self {
        Self {
            tokens,
            phrase: tokens.join(" "),
            weights,
            rules,
        }
    }

    pub fn score_candidate(&self, candidate: &Candidate) -> ScoreBreakdown {
        self.score(&candidate.anchor_text, &candidate.url, &candidate.context)
    }

    /// Score from anchor text, the absolute URL and surrounding text.
    pub fn score(&self, anchor_text: &str, url: &str, context: &str) -> ScoreBreakdown {
        let combined = collapse_whitespace(&format!("{anchor_text} {url} {context}").to_lowercase());
        let path = url_rules::path_of(url).to_lowercase();

        let mut breakdown = ScoreBreakdown::default();
        for token in self.tokens {
            if combined.contains(token.as_str()) {
                breakdown.token += self.weights.token;
            }
            if path.contains(token.as_str()) {
                breakdown.path += self.weights.path_token;
            }
        }
        if !self.phrase.is_empty() && combined.contains(&self.phrase) {
            breakdown.phrase = self.weights.phrase;
        }
        let hits = self.rules.category_hits(url, anchor_text).len() as i64;
        breakdown.category = hits * self.weights.category;
        breakdown
    }

    /// Boost earned by a visited page showing `card_count` product cards.
    pub fn structural_boost(&self, card_count: usize) -> i64 {
        card_count as i64 * self.weights.card_multiplier
    }
}

/// Collapse runs of whitespace to single spaces and trim.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
