//! Live crawl progress on stderr: an `indicatif` bar, or raw event lines.

use crate::progress::{CrawlEvent, CrawlEventKind, ProgressReceiver};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

/// How progress events are shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressMode {
    /// One bar over all targets.
    Bar,
    /// Every event as a JSON line.
    Events,
    Off,
}

/// Drain `rx` on a background task until every sender is dropped.
pub fn spawn(mut rx: ProgressReceiver, total: usize, mode: ProgressMode) -> JoinHandle<()> {
    tokio::spawn(async move {
        let bar = (mode == ProgressMode::Bar).then(|| target_bar(total));
        loop {
            match rx.recv().await {
                Ok(event) => match mode {
                    ProgressMode::Events => print_event(&event),
                    ProgressMode::Bar => {
                        if let Some(ref bar) = bar {
                            update_bar(bar, &event);
                        }
                    }
                    ProgressMode::Off => {}
                },
                Err(RecvError::Lagged(n)) => tracing::debug!("progress display skipped {n} events"),
                Err(RecvError::Closed) => break,
            }
        }
        if let Some(bar) = bar {
            bar.finish_and_clear();
        }
    })
}

fn target_bar(total: usize) -> ProgressBar {
    let bar = ProgressBar::new(total as u64);
    let style = ProgressStyle::with_template("  {spinner:.cyan} [{pos}/{len}] {wide_msg}")
        .expect("valid template")
        .tick_chars("\u{25b8}\u{25b9}\u{25b8}\u{25b9}\u{25b8}");
    bar.set_style(style);
    bar.enable_steady_tick(Duration::from_millis(120));
    bar
}

fn update_bar(bar: &ProgressBar, event: &CrawlEvent) {
    match &event.event {
        CrawlEventKind::TargetStarted { .. } => bar.set_message(event.target.clone()),
        CrawlEventKind::PageVisited { url, .. } => {
            bar.set_message(format!("{}: {url}", event.target));
        }
        CrawlEventKind::FetchFailed { .. } => {}
        CrawlEventKind::TargetFinished { .. } => bar.inc(1),
    }
}

fn print_event(event: &CrawlEvent) {
    if let Ok(line) = serde_json::to_string(event) {
        eprintln!("{line}");
    }
}
