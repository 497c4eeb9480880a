//! Classify a fetched page as listing, product detail or unclassified.
//!
//! The deciding signal is structural: a page repeating several
//! product-card elements is a working category or search page whatever
//! its text says. URL shape only matters when the DOM is inconclusive.

use crate::cartography::url_rules::UrlRules;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Outcome of page classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageClass {
    /// Enumerates several items. Terminal success for a crawl target.
    Listing,
    /// A single product view. Never returned as a result.
    Detail,
    /// No decisive signal; keeps its text score.
    Unclassified,
}

/// Parse card selectors, skipping any that do not compile.
///
/// Selectors are validated when the config loads, so a failure here means
/// the caller bypassed validation.
pub fn parse_selectors(raw: &[String]) -> Vec<Selector> {
    raw.iter()
        .filter_map(|s| match Selector::parse(s) {
            Ok(sel) => Some(sel),
            Err(e) => {
                tracing::warn!("skipping card selector {s:?}: {e}");
                None
            }
        })
        .collect()
}

/// Number of distinct elements matching any product-card selector.
pub fn count_product_cards(document: &Html, selectors: &[Selector]) -> usize {
    let mut seen = HashSet::new();
    for selector in selectors {
        for element in document.select(selector) {
            seen.insert(element.id());
        }
    }
    seen.len()
}

/// Classify a visited page from its card count and URL.
pub fn classify(card_count: usize, url: &str, listing_threshold: usize, rules: &UrlRules) -> PageClass {
    if card_count >= listing_threshold {
        return PageClass::Listing;
    }
    if card_count > 0 {
        return PageClass::Detail;
    }
    classify_url(url, rules)
}

/// Classification available before a visit: URL shape only.
pub fn classify_url(url: &str, rules: &UrlRules) -> PageClass {
    if rules.is_detail_url(url) {
        PageClass::Detail
    } else {
        PageClass::Unclassified
    }
}
