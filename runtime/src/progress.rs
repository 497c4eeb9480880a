// Copyright 2026 Linkscout Contributors
// SPDX-License-Identifier: Apache-2.0

//! Progress event types and broadcast channel for live crawl telemetry.
//!
//! Crawls emit `CrawlEvent`s through a `tokio::sync::broadcast` channel to
//! whoever subscribes (the CLI's `--progress` printer, tests). When no
//! subscriber exists, events are silently dropped.

use crate::cartography::page_classifier::PageClass;
use serde::{Deserialize, Serialize};

/// A progress event tagged with the crawl target it belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlEvent {
    /// Target label, e.g. `"White cement @ buildersmart"`.
    pub target: String,
    /// Monotonically increasing per target.
    pub seq: u64,
    pub event: CrawlEventKind,
}

/// The specific kind of progress event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CrawlEventKind {
    TargetStarted { seeds: usize },
    PageVisited {
        url: String,
        depth: usize,
        class: PageClass,
        cards: usize,
        candidates: usize,
    },
    FetchFailed { url: String, reason: String },
    TargetFinished {
        outcome: String,
        best_url: Option<String>,
        pages_fetched: usize,
        elapsed_ms: u64,
    },
}

/// Sender handle for emitting progress events.
pub type ProgressSender = tokio::sync::broadcast::Sender<CrawlEvent>;

/// Receiver handle for consuming progress events.
pub type ProgressReceiver = tokio::sync::broadcast::Receiver<CrawlEvent>;

/// Create a new progress broadcast channel with a bounded buffer.
pub fn channel() -> (ProgressSender, ProgressReceiver) {
    tokio::sync::broadcast::channel(256)
}

/// Per-target emitter. Holds the sequence counter so call sites stay short.
#[derive(Debug, Clone)]
pub struct Emitter {
    tx: Option<ProgressSender>,
    target: String,
    seq: u64,
}

impl Emitter {
    pub fn new(tx: Option<ProgressSender>, target: impl Into<String>) -> Self {
        Self {
            tx,
            target: target.into(),
            seq: 0,
        }
    }

    /// Emit an event, ignoring send errors (no receivers listening).
    pub fn emit(&mut self, event: CrawlEventKind) {
        if let Some(ref sender) = self.tx {
            self.seq += 1;
            let _ = sender.send(CrawlEvent {
                target: self.target.clone(),
                seq: self.seq,
                event,
            });
        }
    }
}
