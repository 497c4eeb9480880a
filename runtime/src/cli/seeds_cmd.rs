//! `linkscout seeds <url>...`: explore from known starting URLs.

use crate::cli::discover_cmd::{self, CrawlFlags, CrawlSession};
use crate::cli::output::{self, Styled};
use crate::config::ScoutConfig;
use crate::discovery;
use anyhow::{bail, Result};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

/// Run the seeds command.
pub async fn run(config_path: Option<&Path>, seeds: &[String], flags: &CrawlFlags) -> Result<()> {
    if seeds.iter().all(|s| s.trim().is_empty()) {
        bail!("no seed URLs given");
    }
    let config = Arc::new(ScoutConfig::load(config_path)?);
    let options = flags.options();

    let session = CrawlSession::start(config, &options, flags, seeds.len()).await?;
    let results = discovery::discover_seed_results(seeds, &options, &session.ctx).await;
    session.finish().await;

    if output::is_json() {
        let urls: BTreeMap<&String, Vec<&str>> = results
            .iter()
            .map(|(seed, r)| (seed, r.ranked.iter().map(|l| l.url.as_str()).collect()))
            .collect();
        output::print_json(&serde_json::to_value(urls)?);
        return Ok(());
    }
    if output::is_quiet() {
        for result in results.values() {
            for link in &result.ranked {
                println!("{}", link.url);
            }
        }
        return Ok(());
    }

    let s = Styled::new();
    output::print_header(&s);
    for (seed, result) in &results {
        output::print_section(&s, seed);
        discover_cmd::print_result(&s, "best", result);
        eprintln!();
    }
    Ok(())
}
