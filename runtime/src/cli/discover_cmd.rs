//! `linkscout discover <material>...`: find listing pages for materials.

use crate::cartography::crawler::{CrawlOutcome, CrawlResult};
use crate::cartography::material;
use crate::cli::output::{self, Styled};
use crate::cli::progress_view::{self, ProgressMode};
use crate::config::ScoutConfig;
use crate::discovery::{self, DiscoverOptions, DiscoveryContext};
use crate::progress;
use anyhow::{bail, Result};
use std::path::Path;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Flags shared by `discover` and `seeds`.
#[derive(Debug, Clone, clap::Args)]
pub struct CrawlFlags {
    /// Load pages in Chromium instead of plain HTTP
    #[arg(long)]
    pub rendered: bool,
    /// Show the browser window (implies --rendered)
    #[arg(long)]
    pub headed: bool,
    /// Fetch attempts allowed per target
    #[arg(long, default_value = "40")]
    pub max_pages: usize,
    /// Deepest link level followed from the seeds
    #[arg(long, default_value = "2")]
    pub max_depth: usize,
    /// Ranked URLs kept per target
    #[arg(long, default_value = "10")]
    pub max_results: usize,
    /// Rank links from the seed pages without visiting them
    #[arg(long)]
    pub no_verify: bool,
    /// Targets crawled at once (default from config)
    #[arg(long)]
    pub concurrency: Option<usize>,
    /// Per-target time budget in milliseconds
    #[arg(long)]
    pub time_budget: Option<u64>,
    /// Print every crawl event as a JSON line on stderr
    #[arg(long)]
    pub progress: bool,
}

impl CrawlFlags {
    pub fn options(&self) -> DiscoverOptions {
        DiscoverOptions {
            rendered: self.rendered || self.headed,
            headless: !self.headed,
            max_pages: self.max_pages,
            max_depth: self.max_depth,
            max_results: self.max_results,
            verify_by_visiting: !self.no_verify,
            concurrency: self.concurrency,
            time_budget_ms: self.time_budget,
        }
    }

    fn progress_mode(&self) -> ProgressMode {
        if self.progress {
            ProgressMode::Events
        } else if !output::is_json() && !output::is_quiet() && output::stderr_is_tty() {
            ProgressMode::Bar
        } else {
            ProgressMode::Off
        }
    }
}

/// Run the discover command.
pub async fn run(
    config_path: Option<&Path>,
    materials: &[String],
    sites: &[String],
    defaults: bool,
    flags: &CrawlFlags,
) -> Result<()> {
    let config = Arc::new(ScoutConfig::load(config_path)?);

    let mut materials = materials.to_vec();
    if defaults {
        materials.extend(material::default_materials());
    }
    if materials.iter().all(|m| m.trim().is_empty()) {
        bail!("no materials given; pass one or more names, or --defaults");
    }
    let sites: Vec<String> = if sites.is_empty() {
        config.sites.iter().map(|s| s.id.clone()).collect()
    } else {
        sites.to_vec()
    };

    let options = flags.options();
    let total = materials.len() * sites.len();
    let session = CrawlSession::start(config, &options, flags, total).await?;
    let report = discovery::discover_links(&materials, &sites, &options, &session.ctx).await;
    session.finish().await;

    if output::is_json() {
        output::print_json(&serde_json::to_value(&report)?);
        return Ok(());
    }
    if output::is_quiet() {
        for by_site in report.values() {
            for result in by_site.values() {
                if let Some(ref url) = result.best_url {
                    println!("{url}");
                }
            }
        }
        return Ok(());
    }

    let s = Styled::new();
    output::print_header(&s);
    for (material, by_site) in &report {
        output::print_section(&s, material);
        for (site, result) in by_site {
            print_result(&s, site, result);
        }
        eprintln!();
    }
    Ok(())
}

/// A discovery context wired to the progress display and Ctrl-C.
pub(crate) struct CrawlSession {
    pub ctx: DiscoveryContext,
    display: Option<JoinHandle<()>>,
    interrupt: JoinHandle<()>,
}

impl CrawlSession {
    pub async fn start(
        config: Arc<ScoutConfig>,
        options: &DiscoverOptions,
        flags: &CrawlFlags,
        total: usize,
    ) -> Result<Self> {
        let mut ctx = DiscoveryContext::from_options(config, options).await?;

        let mode = flags.progress_mode();
        let display = if mode != ProgressMode::Off {
            let (tx, rx) = progress::channel();
            ctx = ctx.with_progress(tx);
            Some(progress_view::spawn(rx, total, mode))
        } else {
            None
        };

        let cancel = ctx.cancel_token();
        let interrupt = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupted; finishing current pages");
                cancel.cancel();
            }
        });

        Ok(Self {
            ctx,
            display,
            interrupt,
        })
    }

    /// Stop listening for Ctrl-C and wait for the progress display to drain.
    pub async fn finish(self) {
        let CrawlSession {
            ctx,
            display,
            interrupt,
        } = self;
        interrupt.abort();
        // dropping the context closes the progress channel
        drop(ctx);
        if let Some(handle) = display {
            let _ = handle.await;
        }
    }
}

/// One human-readable line (plus details) per target.
pub(crate) fn print_result(s: &Styled, label: &str, result: &CrawlResult) {
    let pages = format!(
        "{} pages, {}",
        result.stats.pages_fetched,
        output::format_duration_ms(result.stats.elapsed_ms)
    );
    match (&result.outcome, &result.best) {
        (CrawlOutcome::Succeeded, Some(best)) => {
            output::print_check(s.ok_sym(), label, &s.green(&best.url));
            output::print_detail(&s.dim(&format!(
                "listing, {} cards, score {} ({pages})",
                best.card_count.unwrap_or(0),
                best.score
            )));
        }
        (_, Some(best)) => {
            output::print_check(s.warn_sym(), label, &best.url);
            let origin = if best.fallback { "raw-source fallback, " } else { "" };
            output::print_detail(&s.dim(&format!(
                "{origin}{:?}, score {} ({pages})",
                best.class, best.score
            )));
        }
        (CrawlOutcome::Failed, None) => {
            let reason = result.reason.as_deref().unwrap_or("failed");
            output::print_check(s.fail_sym(), label, &s.red(reason));
        }
        (_, None) => {
            let reason = result.reason.as_deref().unwrap_or("no result");
            output::print_check(s.info_sym(), label, &s.dim(reason));
            output::print_detail(&s.dim(&pages));
        }
    }
    if output::is_verbose() {
        for link in result.ranked.iter().skip(1) {
            output::print_detail(&format!("{:>4}  {}", link.score, link.url));
        }
    }
}
