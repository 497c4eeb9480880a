//! Frontier controller: bounded breadth-first exploration for one target.
//!
//! One controller owns one target's visited set and FIFO frontier and
//! drives a single fetch session strictly sequentially. It stops at the
//! first page classified as a listing. Otherwise it runs until the queue
//! empties, the page budget is spent, or it is cancelled, and then returns
//! the best non-detail candidate it observed.

use crate::acquisition::fetcher::{FetchStatus, PageFetcher};
use crate::acquisition::links::{Extraction, LinkExtractor};
use crate::cartography::material;
use crate::cartography::page_classifier::{self, PageClass};
use crate::cartography::scorer::{RelevanceScorer, ScoreBreakdown};
use crate::cartography::sites::SiteProfile;
use crate::cartography::url_rules::{self, UrlRules};
use crate::config::ScoutConfig;
use crate::error::{ErrorKind, Result, ScoutError};
use crate::progress::{CrawlEventKind, Emitter};
use chrono::{DateTime, Utc};
use scraper::{Html, Selector};
use serde::Serialize;
use std::cmp::Reverse;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Page, depth and result limits for one target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CrawlBudget {
    /// Fetch attempts allowed, failed ones included.
    pub max_pages: usize,
    /// Deepest queue depth; seeds are depth 0.
    pub max_depth: usize,
    /// Length of the ranked list returned.
    pub max_results: usize,
}

impl Default for CrawlBudget {
    fn default() -> Self {
        Self {
            max_pages: 40,
            max_depth: 2,
            max_results: 10,
        }
    }
}

/// One unit of work: a material on a site, or a caller-supplied seed URL.
#[derive(Debug, Clone)]
pub struct CrawlTarget {
    /// Display label, e.g. `"White cement @ buildersmart"`.
    pub label: String,
    pub material: Option<String>,
    pub site: Option<String>,
    /// Normalised origin URLs, fetched at depth 0.
    pub seeds: Vec<String>,
    /// Caller seeds may be the answer themselves; constructed search URLs
    /// only count when they turn out to be listings.
    pub seeds_are_candidates: bool,
    pub tokens: Vec<String>,
    /// Domain hint; only hosts on this domain are queued or returned.
    pub domain: String,
    pub budget: CrawlBudget,
}

impl CrawlTarget {
    /// Search a site for a material. The query may be alias-normalised but
    /// scoring tokens always come from the material name itself.
    pub fn for_material(
        material: &str,
        site: &SiteProfile,
        config: &ScoutConfig,
        budget: CrawlBudget,
    ) -> Self {
        let query = config.search_term(material);
        let seeds = site
            .search_urls(&query)
            .iter()
            .filter_map(|u| url_rules::normalize_url(u))
            .collect();
        Self {
            label: format!("{} @ {}", material.trim(), site.id),
            material: Some(material.trim().to_string()),
            site: Some(site.id.clone()),
            seeds,
            seeds_are_candidates: false,
            tokens: material::tokenize(material),
            domain: site.domain.clone(),
            budget,
        }
    }

    /// Explore from a caller-supplied starting URL. A seed on a configured
    /// site takes that site's domain as its hint.
    pub fn for_seed(seed: &str, budget: CrawlBudget, sites: &[SiteProfile]) -> Result<Self> {
        let invalid = || ScoutError::InvalidSeed(seed.to_string());
        let url = url::Url::parse(seed.trim()).map_err(|_| invalid())?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid());
        }
        let host = url.host_str().ok_or_else(invalid)?;
        let known = sites.iter().find(|s| url_rules::host_matches(host, &s.domain));
        let domain = match known {
            Some(site) => site.domain.clone(),
            None => url_rules::domain_hint_for(&url).ok_or_else(invalid)?,
        };
        let normalized = url_rules::normalize_url(url.as_str()).ok_or_else(invalid)?;
        Ok(Self {
            label: seed.trim().to_string(),
            material: None,
            site: known.map(|s| s.id.clone()),
            seeds: vec![normalized],
            seeds_are_candidates: true,
            tokens: material::seed_tokens(&url),
            domain,
            budget,
        })
    }
}

/// Cooperative cancellation flag, checked before every fetch.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Controller lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CrawlState {
    Idle,
    Running,
    Succeeded,
    Exhausted,
    Failed,
}

/// Terminal outcome reported to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CrawlOutcome {
    Succeeded,
    Exhausted,
    Failed,
}

/// Why exploration stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    ListingFound,
    QueueEmpty,
    PageBudget,
    TimeBudget,
    Cancelled,
}

/// Why an exhausted crawl has no result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyReason {
    /// Every fetch failed or nothing was queued.
    NoPagesFetched,
    /// Pages were fetched but nothing was relevant or classifiable.
    NoRelevantCandidate,
}

impl EmptyReason {
    pub fn message(&self) -> &'static str {
        match self {
            EmptyReason::NoPagesFetched => "no pages could be fetched for this target",
            EmptyReason::NoRelevantCandidate => {
                "pages were fetched but no listing or relevant candidate was found"
            }
        }
    }
}

/// A result URL with its score provenance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedLink {
    pub url: String,
    pub score: i64,
    pub breakdown: ScoreBreakdown,
    pub class: PageClass,
    /// Product cards counted when the page was visited.
    pub card_count: Option<usize>,
    /// Depth at which the link was discovered.
    pub depth: usize,
    /// Found only by the raw-source scan.
    pub fallback: bool,
}

/// One fetch attempt.
#[derive(Debug, Clone, Serialize)]
pub struct VisitRecord {
    pub url: String,
    pub depth: usize,
    pub status: FetchStatus,
    pub class: Option<PageClass>,
    pub cards: usize,
    pub elapsed_ms: u64,
}

/// Diagnostics for one target run.
#[derive(Debug, Clone, Serialize)]
pub struct CrawlStats {
    /// Fetch attempts, failed ones included. Never exceeds the page budget.
    pub pages_fetched: usize,
    pub fetch_failures: usize,
    pub candidates_seen: usize,
    pub off_domain_dropped: usize,
    pub static_dropped: usize,
    pub parse_failures: usize,
    /// Page-level errors that were recovered from.
    pub page_errors: Vec<CrawlFailure>,
    pub stop: Option<StopReason>,
    pub visits: Vec<VisitRecord>,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}

impl CrawlStats {
    fn new() -> Self {
        Self {
            pages_fetched: 0,
            fetch_failures: 0,
            candidates_seen: 0,
            off_domain_dropped: 0,
            static_dropped: 0,
            parse_failures: 0,
            page_errors: Vec::new(),
            stop: None,
            visits: Vec::new(),
            started_at: Utc::now(),
            elapsed_ms: 0,
        }
    }
}

/// An error in serialisable form.
#[derive(Debug, Clone, Serialize)]
pub struct CrawlFailure {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&ScoutError> for CrawlFailure {
    fn from(err: &ScoutError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Final output for one target.
#[derive(Debug, Clone, Serialize)]
pub struct CrawlResult {
    pub target: String,
    pub material: Option<String>,
    pub site: Option<String>,
    pub outcome: CrawlOutcome,
    pub best_url: Option<String>,
    pub best: Option<RankedLink>,
    pub ranked: Vec<RankedLink>,
    pub empty_reason: Option<EmptyReason>,
    /// Human-readable explanation when there is no best URL.
    pub reason: Option<String>,
    pub error: Option<CrawlFailure>,
    pub stats: CrawlStats,
}

impl CrawlResult {
    /// A target that could not run at all.
    pub fn failed(label: &str, material: Option<String>, site: Option<String>, err: &ScoutError) -> Self {
        Self {
            target: label.to_string(),
            material,
            site,
            outcome: CrawlOutcome::Failed,
            best_url: None,
            best: None,
            ranked: Vec::new(),
            empty_reason: None,
            reason: Some(err.to_string()),
            error: Some(CrawlFailure::from(err)),
            stats: CrawlStats::new(),
        }
    }

    pub fn failed_target(target: &CrawlTarget, err: &ScoutError) -> Self {
        Self::failed(&target.label, target.material.clone(), target.site.clone(), err)
    }
}

/// Everything known about a discovered URL.
#[derive(Debug, Clone)]
struct Observed {
    url: String,
    breakdown: ScoreBreakdown,
    class: PageClass,
    card_count: Option<usize>,
    depth: usize,
    seq: usize,
    /// Constructed search URL: only a result if it proves to be a listing.
    origin: bool,
}

impl Observed {
    fn score(&self) -> i64 {
        self.breakdown.total()
    }

    fn ranked(&self, fallback: bool) -> RankedLink {
        RankedLink {
            url: self.url.clone(),
            score: self.score(),
            breakdown: self.breakdown,
            class: self.class,
            card_count: self.card_count,
            depth: self.depth,
            fallback,
        }
    }
}

/// Result of the synchronous parse of one page.
struct PageAnalysis {
    card_count: usize,
    extraction: Extraction,
}

/// Bounded BFS over one target.
pub struct FrontierController<'a> {
    target: &'a CrawlTarget,
    config: &'a ScoutConfig,
    rules: UrlRules,
    extractor: LinkExtractor,
    card_selectors: Vec<Selector>,
    cancel: CancelToken,
    deadline: Option<Instant>,
    emitter: Emitter,
    state: CrawlState,
    queue: VecDeque<(String, usize)>,
    enqueued: HashSet<String>,
    visited: HashSet<String>,
    failed: HashSet<String>,
    observed: HashMap<String, Observed>,
    raw_urls: Vec<(String, usize)>,
    raw_seen: HashSet<String>,
    next_seq: usize,
    pages_ok: usize,
    stats: CrawlStats,
}

impl<'a> FrontierController<'a> {
    pub fn new(target: &'a CrawlTarget, config: &'a ScoutConfig) -> Result<Self> {
        let rules = UrlRules::from_filters(&config.filters)?;
        Ok(Self {
            target,
            config,
            extractor: LinkExtractor::new(&config.filters, &rules),
            card_selectors: page_classifier::parse_selectors(&config.filters.card_selectors),
            rules,
            cancel: CancelToken::new(),
            deadline: None,
            emitter: Emitter::new(None, target.label.clone()),
            state: CrawlState::Idle,
            queue: VecDeque::new(),
            enqueued: HashSet::new(),
            visited: HashSet::new(),
            failed: HashSet::new(),
            observed: HashMap::new(),
            raw_urls: Vec::new(),
            raw_seen: HashSet::new(),
            next_seq: 0,
            pages_ok: 0,
            stats: CrawlStats::new(),
        })
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Stop queueing new fetches once `deadline` passes.
    pub fn with_deadline(mut self, deadline: Option<Instant>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn with_emitter(mut self, emitter: Emitter) -> Self {
        self.emitter = emitter;
        self
    }

    pub fn state(&self) -> CrawlState {
        self.state
    }

    /// Run the crawl to a terminal state using `fetcher`.
    ///
    /// Never fails: page errors are recorded and skipped. The fetcher stays
    /// open; the caller owns closing it.
    pub async fn run(&mut self, fetcher: &mut dyn PageFetcher) -> CrawlResult {
        let started = Instant::now();
        self.state = CrawlState::Running;
        self.seed();
        self.emitter.emit(CrawlEventKind::TargetStarted {
            seeds: self.queue.len(),
        });

        let mut listing: Option<String> = None;
        let stop = loop {
            if self.cancel.is_cancelled() {
                break StopReason::Cancelled;
            }
            if self.deadline.is_some_and(|d| Instant::now() >= d) {
                break StopReason::TimeBudget;
            }
            if self.stats.pages_fetched >= self.target.budget.max_pages {
                break StopReason::PageBudget;
            }
            let Some((url, depth)) = self.queue.pop_front() else {
                break StopReason::QueueEmpty;
            };
            if self.visited.contains(&url) {
                continue;
            }
            self.visited.insert(url.clone());

            let page = fetcher.fetch(&url).await;
            self.stats.pages_fetched += 1;

            if !page.is_ok() {
                self.record_failure(&url, depth, page.status, page.elapsed_ms);
                continue;
            }

            let final_url = url_rules::normalize_url(&page.final_url).unwrap_or_else(|| url.clone());
            if !url_rules::on_domain(&final_url, &self.target.domain) {
                let status = FetchStatus::Failed(format!("redirected off-domain to {final_url}"));
                self.record_failure(&url, depth, status, page.elapsed_ms);
                continue;
            }
            if final_url != url {
                self.visited.insert(final_url.clone());
            }
            self.pages_ok += 1;

            let analysis = self.analyze(&page.html, &final_url);
            // A redirect decides the page's shape: a category URL that lands
            // on a product page is a product page.
            let class = page_classifier::classify(
                analysis.card_count,
                &final_url,
                self.config.weights.listing_threshold,
                &self.rules,
            );
            self.stats.visits.push(VisitRecord {
                url: url.clone(),
                depth,
                status: FetchStatus::Ok,
                class: Some(class),
                cards: analysis.card_count,
                elapsed_ms: page.elapsed_ms,
            });
            self.emitter.emit(CrawlEventKind::PageVisited {
                url: url.clone(),
                depth,
                class,
                cards: analysis.card_count,
                candidates: analysis.extraction.candidates.len(),
            });
            debug!(
                "visited {url} (depth {depth}): {class:?}, {} cards, {} candidates",
                analysis.card_count,
                analysis.extraction.candidates.len()
            );

            self.record_visit(&url, depth, class, analysis.card_count);
            if final_url != url && self.observed.contains_key(&final_url) {
                self.record_visit(&final_url, depth, class, analysis.card_count);
            }
            if class == PageClass::Listing {
                listing = Some(url);
                break StopReason::ListingFound;
            }

            let fresh = self.absorb(analysis.extraction, &final_url, depth);
            let expand = class != PageClass::Detail || self.config.follow_detail_pages;
            if depth < self.target.budget.max_depth && expand {
                self.enqueue(fresh, depth + 1);
            }
        };

        self.stats.stop = Some(stop);
        self.stats.elapsed_ms = started.elapsed().as_millis() as u64;
        let result = self.finish(listing);
        self.emitter.emit(CrawlEventKind::TargetFinished {
            outcome: format!("{:?}", result.outcome).to_lowercase(),
            best_url: result.best_url.clone(),
            pages_fetched: self.stats.pages_fetched,
            elapsed_ms: self.stats.elapsed_ms,
        });
        result
    }

    fn seed(&mut self) {
        let seeds = self.target.seeds.clone();
        for seed in seeds {
            if !self.enqueued.insert(seed.clone()) {
                continue;
            }
            self.queue.push_back((seed.clone(), 0));
            let breakdown = self.scorer().score("", &seed, "");
            let seq = self.take_seq();
            self.observed.insert(
                seed.clone(),
                Observed {
                    class: page_classifier::classify_url(&seed, &self.rules),
                    url: seed,
                    breakdown,
                    card_count: None,
                    depth: 0,
                    seq,
                    origin: !self.target.seeds_are_candidates,
                },
            );
        }
    }

    fn scorer(&self) -> RelevanceScorer<'_> {
        RelevanceScorer::new(&self.target.tokens, &self.config.weights, &self.rules)
    }

    fn take_seq(&mut self) -> usize {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    /// Parse, count cards and extract links. Synchronous so the `!Send`
    /// document is dropped before the next `.await`.
    fn analyze(&self, html: &str, page_url: &str) -> PageAnalysis {
        let document = Html::parse_document(html);
        let card_count = page_classifier::count_product_cards(&document, &self.card_selectors);
        let extraction = match url::Url::parse(page_url) {
            Ok(base) => self
                .extractor
                .extract(&document, html, &base, Some(&self.target.domain)),
            Err(_) => Extraction::default(),
        };
        PageAnalysis {
            card_count,
            extraction,
        }
    }

    fn record_failure(&mut self, url: &str, depth: usize, status: FetchStatus, elapsed_ms: u64) {
        let reason = match &status {
            FetchStatus::Timeout => "timeout".to_string(),
            FetchStatus::Failed(r) => r.clone(),
            FetchStatus::Ok => String::new(),
        };
        let err = ScoutError::FetchFailed {
            url: url.to_string(),
            reason: reason.clone(),
        };
        warn!("{err}");
        self.stats.page_errors.push(CrawlFailure::from(&err));
        self.stats.fetch_failures += 1;
        self.failed.insert(url.to_string());
        self.stats.visits.push(VisitRecord {
            url: url.to_string(),
            depth,
            status,
            class: None,
            cards: 0,
            elapsed_ms,
        });
        self.emitter.emit(CrawlEventKind::FetchFailed {
            url: url.to_string(),
            reason,
        });
    }

    /// Fold a visited page's classification into what we know about it.
    fn record_visit(&mut self, url: &str, depth: usize, class: PageClass, cards: usize) {
        let boost = self.scorer().structural_boost(cards);
        let fallback_breakdown = self.scorer().score("", url, "");
        let seq = self.next_seq;
        let entry = self.observed.entry(url.to_string()).or_insert_with(|| Observed {
            url: url.to_string(),
            breakdown: fallback_breakdown,
            class,
            card_count: None,
            depth,
            seq,
            origin: false,
        });
        entry.class = class;
        entry.card_count = Some(cards);
        entry.breakdown.structural = boost;
        if entry.seq == seq {
            self.next_seq += 1;
        }
    }

    /// Score a page's candidates and record them. Returns the on-domain
    /// candidate URLs in first-seen order for queueing.
    fn absorb(&mut self, extraction: Extraction, page_url: &str, depth: usize) -> Vec<String> {
        self.stats.static_dropped += extraction.static_dropped;
        self.stats.parse_failures += extraction.parse_failures;
        if extraction.parse_failures > 0 {
            let err = ScoutError::ParseFailed {
                source_kind: "embedded script JSON".to_string(),
                detail: format!("{} block(s) on {page_url}, URL scan used instead", extraction.parse_failures),
            };
            debug!("{err}");
            self.stats.page_errors.push(CrawlFailure::from(&err));
        }

        for raw in extraction.raw_urls {
            if url_rules::on_domain(&raw, &self.target.domain) && self.raw_seen.insert(raw.clone()) {
                self.raw_urls.push((raw, depth + 1));
            }
        }

        let mut fresh = Vec::new();
        for candidate in extraction.candidates {
            if !candidate.on_domain {
                self.stats.off_domain_dropped += 1;
                continue;
            }
            self.stats.candidates_seen += 1;
            let breakdown = self.scorer().score_candidate(&candidate);
            match self.observed.get_mut(&candidate.url) {
                Some(existing) => {
                    if existing.card_count.is_none() && breakdown.total() > existing.breakdown.total() {
                        existing.breakdown = breakdown;
                    }
                }
                None => {
                    let seq = self.take_seq();
                    let class = page_classifier::classify_url(&candidate.url, &self.rules);
                    self.observed.insert(
                        candidate.url.clone(),
                        Observed {
                            url: candidate.url.clone(),
                            breakdown,
                            class,
                            card_count: None,
                            depth: depth + 1,
                            seq,
                            origin: false,
                        },
                    );
                }
            }
            fresh.push(candidate.url);
        }
        fresh
    }

    /// Queue relevant, unvisited, same-domain links, best first.
    fn enqueue(&mut self, urls: Vec<String>, depth: usize) {
        let mut eligible: Vec<&Observed> = urls
            .iter()
            .filter(|u| !self.visited.contains(*u) && !self.enqueued.contains(*u))
            .filter_map(|u| self.observed.get(u))
            .filter(|o| o.score() >= self.config.weights.min_visit_score)
            .filter(|o| url_rules::on_domain(&o.url, &self.target.domain))
            .filter(|o| !self.rules.is_static(&o.url))
            .filter(|o| self.config.enqueue_detail_links || !self.rules.is_detail_url(&o.url))
            .collect();
        eligible.sort_by_key(|o| (Reverse(o.score()), o.seq));

        let picked: Vec<String> = eligible.into_iter().map(|o| o.url.clone()).collect();
        for url in picked {
            self.enqueued.insert(url.clone());
            self.queue.push_back((url, depth));
        }
    }

    fn is_result_eligible(&self, o: &Observed) -> bool {
        if o.class == PageClass::Listing {
            return true;
        }
        !o.origin
            && o.class != PageClass::Detail
            && !self.failed.contains(&o.url)
            && !self.rules.is_static(&o.url)
            && url_rules::on_domain(&o.url, &self.target.domain)
            && o.score() >= self.config.weights.min_result_score
    }

    fn ranking(&self) -> Vec<&Observed> {
        let mut ranked: Vec<&Observed> = self
            .observed
            .values()
            .filter(|o| self.is_result_eligible(o))
            .collect();
        ranked.sort_by_key(|o| (o.class != PageClass::Listing, Reverse(o.score()), o.seq));
        ranked
    }

    /// Last resort: bare URLs from raw page source, scored on the URL alone.
    fn fallback_ranking(&self) -> Vec<RankedLink> {
        let scorer = self.scorer();
        let mut scored: Vec<(i64, usize, RankedLink)> = self
            .raw_urls
            .iter()
            .enumerate()
            .filter(|(_, (url, _))| !self.observed.contains_key(url) && !self.failed.contains(url))
            .filter(|(_, (url, _))| !self.rules.is_static(url) && !self.rules.is_detail_url(url))
            .filter(|(_, (url, _))| !self.target.seeds.contains(url))
            .map(|(i, (url, depth))| {
                let breakdown = scorer.score("", url, "");
                let link = RankedLink {
                    url: url.clone(),
                    score: breakdown.total(),
                    breakdown,
                    class: PageClass::Unclassified,
                    card_count: None,
                    depth: *depth,
                    fallback: true,
                };
                (breakdown.total(), i, link)
            })
            .filter(|(score, _, _)| *score >= self.config.weights.min_result_score)
            .collect();
        scored.sort_by_key(|(score, i, _)| (Reverse(*score), *i));
        scored.into_iter().map(|(_, _, link)| link).collect()
    }

    fn finish(&mut self, listing: Option<String>) -> CrawlResult {
        let max_results = self.target.budget.max_results.max(1);
        let mut ranked: Vec<RankedLink> = self
            .ranking()
            .into_iter()
            .take(max_results)
            .map(|o| o.ranked(false))
            .collect();

        let outcome = match listing {
            Some(ref url) => {
                self.state = CrawlState::Succeeded;
                info!("listing found: {url}");
                CrawlOutcome::Succeeded
            }
            None => {
                self.state = CrawlState::Exhausted;
                CrawlOutcome::Exhausted
            }
        };

        if ranked.is_empty() && listing.is_none() && self.config.raw_source_fallback {
            ranked = self.fallback_ranking().into_iter().take(max_results).collect();
            if let Some(first) = ranked.first() {
                info!("raw-source fallback picked {}", first.url);
            }
        }

        let best = match listing {
            Some(ref url) => ranked.iter().find(|r| &r.url == url).cloned(),
            None => ranked.first().cloned(),
        };
        let empty_reason = best.is_none().then(|| {
            if self.pages_ok == 0 {
                EmptyReason::NoPagesFetched
            } else {
                EmptyReason::NoRelevantCandidate
            }
        });
        if let Some(reason) = empty_reason {
            info!("no result: {}", reason.message());
        }

        CrawlResult {
            target: self.target.label.clone(),
            material: self.target.material.clone(),
            site: self.target.site.clone(),
            outcome,
            best_url: best.as_ref().map(|b| b.url.clone()),
            best,
            ranked,
            empty_reason,
            reason: empty_reason.map(|r| r.message().to_string()),
            error: None,
            stats: self.stats.clone(),
        }
    }
}
