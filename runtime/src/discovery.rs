//! Batch discovery: runs independent crawl targets on a bounded worker
//! pool and merges their results into the caller's shape.
//!
//! Every target opens its own fetch session and owns its own frontier, so
//! nothing is shared between workers except the backend (which only hands
//! out sessions) and the per-host rate limiter. A target that cannot run
//! yields a `Failed` result; it never aborts its siblings.

use crate::acquisition::fetcher::{FetchBackend, HttpBackend, RenderedBackend};
use crate::cartography::crawler::{
    CancelToken, CrawlBudget, CrawlResult, CrawlTarget, FrontierController,
};
use crate::cartography::rate_limiter::HostRateLimiter;
use crate::config::ScoutConfig;
use crate::error::{Result, ScoutError};
use crate::progress::{Emitter, ProgressSender};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, info_span, warn, Instrument};

/// `material -> site -> result`.
pub type LinkReport = BTreeMap<String, BTreeMap<String, CrawlResult>>;

/// `seed -> ranked URLs`, best first.
pub type SeedReport = BTreeMap<String, Vec<String>>;

/// Caller-facing knobs for one discovery batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoverOptions {
    /// Load pages in a browser instead of plain GETs.
    pub rendered: bool,
    pub headless: bool,
    pub max_pages: usize,
    pub max_depth: usize,
    pub max_results: usize,
    /// When false only the origin pages are fetched and candidates are
    /// ranked on text evidence alone.
    pub verify_by_visiting: bool,
    /// Targets crawled at once; defaults to the politeness setting.
    pub concurrency: Option<usize>,
    /// Per-target wall-clock budget.
    pub time_budget_ms: Option<u64>,
}

impl Default for DiscoverOptions {
    fn default() -> Self {
        let budget = CrawlBudget::default();
        Self {
            rendered: false,
            headless: true,
            max_pages: budget.max_pages,
            max_depth: budget.max_depth,
            max_results: budget.max_results,
            verify_by_visiting: true,
            concurrency: None,
            time_budget_ms: None,
        }
    }
}

impl DiscoverOptions {
    pub fn budget(&self) -> CrawlBudget {
        CrawlBudget {
            max_pages: self.max_pages,
            max_depth: if self.verify_by_visiting {
                self.max_depth
            } else {
                0
            },
            max_results: self.max_results,
        }
    }

    fn concurrency(&self, config: &ScoutConfig) -> usize {
        self.concurrency
            .unwrap_or(config.politeness.concurrency)
            .max(1)
    }
}

/// Shared state for a batch: configuration, the fetch backend, and the
/// optional progress channel and cancel flag.
pub struct DiscoveryContext {
    pub config: Arc<ScoutConfig>,
    pub backend: Arc<dyn FetchBackend>,
    progress: Option<ProgressSender>,
    cancel: CancelToken,
}

impl DiscoveryContext {
    pub fn new(config: Arc<ScoutConfig>, backend: Arc<dyn FetchBackend>) -> Self {
        Self {
            config,
            backend,
            progress: None,
            cancel: CancelToken::new(),
        }
    }

    /// Build the backend the options ask for. A rendered backend whose
    /// browser cannot start still succeeds here; each target then reports
    /// `RenderUnavailable`.
    pub async fn from_options(config: Arc<ScoutConfig>, options: &DiscoverOptions) -> Result<Self> {
        let limiter = Arc::new(HostRateLimiter::new(
            config.politeness.min_delay_ms,
            config.politeness.jitter_ms,
        ));
        let backend: Arc<dyn FetchBackend> = if options.rendered {
            Arc::new(RenderedBackend::launch(options.headless, config.fetch.clone(), limiter).await)
        } else {
            Arc::new(HttpBackend::new(&config.fetch, limiter)?)
        };
        Ok(Self::new(config, backend))
    }

    pub fn with_progress(mut self, tx: ProgressSender) -> Self {
        self.progress = Some(tx);
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }
}

/// A unit of batch work: a runnable target or an up-front failure.
enum Job {
    Crawl(CrawlTarget),
    Reject(CrawlResult),
}

/// Crawl every material against every site.
pub async fn discover_links(
    materials: &[String],
    sites: &[String],
    options: &DiscoverOptions,
    ctx: &DiscoveryContext,
) -> LinkReport {
    let budget = options.budget();
    let mut jobs = Vec::new();
    for material in unique_trimmed(materials) {
        for site_id in unique_trimmed(sites) {
            let job = match ctx.config.site(&site_id) {
                Some(site) => Job::Crawl(CrawlTarget::for_material(&material, site, &ctx.config, budget)),
                None => Job::Reject(CrawlResult::failed(
                    &format!("{material} @ {site_id}"),
                    Some(material.clone()),
                    Some(site_id.clone()),
                    &ScoutError::UnknownSite(site_id.clone()),
                )),
            };
            jobs.push(job);
        }
    }

    let mut report = LinkReport::new();
    for result in run_jobs(jobs, options, ctx).await {
        let material = result.material.clone().unwrap_or_default();
        let site = result.site.clone().unwrap_or_default();
        report.entry(material).or_default().insert(site, result);
    }
    report
}

/// Crawl from caller-supplied seed URLs, keeping full results.
pub async fn discover_seed_results(
    seeds: &[String],
    options: &DiscoverOptions,
    ctx: &DiscoveryContext,
) -> BTreeMap<String, CrawlResult> {
    let budget = options.budget();
    let jobs = unique_trimmed(seeds)
        .into_iter()
        .map(|seed| match CrawlTarget::for_seed(&seed, budget, &ctx.config.sites) {
            Ok(target) => Job::Crawl(target),
            Err(e) => Job::Reject(CrawlResult::failed(&seed, None, None, &e)),
        })
        .collect();

    run_jobs(jobs, options, ctx)
        .await
        .into_iter()
        .map(|r| (r.target.clone(), r))
        .collect()
}

/// Crawl from seed URLs, returning each seed's ranked URLs.
pub async fn discover_from_seeds(
    seeds: &[String],
    options: &DiscoverOptions,
    ctx: &DiscoveryContext,
) -> SeedReport {
    discover_seed_results(seeds, options, ctx)
        .await
        .into_iter()
        .map(|(seed, result)| (seed, result.ranked.into_iter().map(|r| r.url).collect()))
        .collect()
}

async fn run_jobs(jobs: Vec<Job>, options: &DiscoverOptions, ctx: &DiscoveryContext) -> Vec<CrawlResult> {
    let concurrency = options.concurrency(&ctx.config);
    let started = Instant::now();
    info!("discovering {} target(s), {} at a time", jobs.len(), concurrency);

    let results: Vec<CrawlResult> = stream::iter(jobs)
        .map(|job| async move {
            match job {
                Job::Crawl(target) => run_target(&target, options, ctx).await,
                Job::Reject(result) => {
                    warn!("{}: {}", result.target, result.reason.as_deref().unwrap_or("rejected"));
                    result
                }
            }
        })
        .buffer_unordered(concurrency)
        .collect()
        .await;

    info!("batch finished in {}ms", started.elapsed().as_millis());
    results
}

/// Run one target with its own session, closing it on every exit path.
pub async fn run_target(target: &CrawlTarget, options: &DiscoverOptions, ctx: &DiscoveryContext) -> CrawlResult {
    let span = info_span!("crawl", target = %target.label);
    async {
        let mut session = match ctx.backend.open_session().await {
            Ok(session) => session,
            Err(e) => {
                warn!("cannot open {} session: {e}", ctx.backend.name());
                return CrawlResult::failed_target(target, &e);
            }
        };

        let deadline = options
            .time_budget_ms
            .map(|ms| Instant::now() + Duration::from_millis(ms));
        let result = match FrontierController::new(target, &ctx.config) {
            Ok(controller) => {
                let mut controller = controller
                    .with_cancel(ctx.cancel.clone())
                    .with_deadline(deadline)
                    .with_emitter(Emitter::new(ctx.progress.clone(), target.label.clone()));
                controller.run(session.as_mut()).await
            }
            Err(e) => CrawlResult::failed_target(target, &e),
        };

        session.close().await;
        info!(
            "{:?}: {} ({} pages)",
            result.outcome,
            result.best_url.as_deref().unwrap_or("no result"),
            result.stats.pages_fetched
        );
        result
    }
    .instrument(span)
    .await
}

/// Trimmed, non-empty, de-duplicated (case-insensitively) in input order.
fn unique_trimmed(items: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for item in items {
        let item = item.trim();
        if !item.is_empty() && !out.iter().any(|o| o.eq_ignore_ascii_case(item)) {
            out.push(item.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_verify_means_depth_zero() {
        let options = DiscoverOptions {
            verify_by_visiting: false,
            max_depth: 3,
            ..DiscoverOptions::default()
        };
        assert_eq!(options.budget().max_depth, 0);
        assert_eq!(DiscoverOptions::default().budget(), CrawlBudget::default());
    }

    #[test]
    fn test_concurrency_falls_back_to_politeness() {
        let config = ScoutConfig::default();
        assert_eq!(DiscoverOptions::default().concurrency(&config), 2);
        let options = DiscoverOptions {
            concurrency: Some(0),
            ..DiscoverOptions::default()
        };
        assert_eq!(options.concurrency(&config), 1);
    }

    #[test]
    fn test_unique_trimmed() {
        let items = vec![
            " White cement ".to_string(),
            "white CEMENT".to_string(),
            "".to_string(),
            "Plywood".to_string(),
        ];
        assert_eq!(unique_trimmed(&items), vec!["White cement", "Plywood"]);
    }
}
