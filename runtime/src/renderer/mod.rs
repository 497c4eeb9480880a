//! Renderer abstraction for script-executing page loads.
//!
//! Defines the `Renderer` and `RenderContext` traits that abstract over
//! the browser engine (currently Chromium via chromiumoxide). The crawler
//! only ever sees a context; one is opened per crawl target and closed
//! when that target finishes.

pub mod chromium;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Poll interval while waiting for `document.body`.
const READY_POLL_MS: u64 = 100;

/// Result of navigating to a URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationResult {
    /// The final URL after any redirects.
    pub final_url: String,
    /// HTTP status code, when the engine reports one.
    pub status: Option<u16>,
    /// Time taken to load the page in milliseconds.
    pub load_time_ms: u64,
}

/// Navigation exceeded its deadline.
///
/// Returned inside `anyhow::Error` so callers can tell a timeout apart
/// from other navigation failures with `downcast_ref`.
#[derive(Debug, thiserror::Error)]
#[error("navigation timed out after {0}ms")]
pub struct NavigationTimeout(pub u64);

/// A browser engine that can create rendering contexts.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Create a new browser context (tab).
    async fn new_context(&self) -> Result<Box<dyn RenderContext>>;
    /// Number of currently active contexts.
    fn active_contexts(&self) -> usize;
}

/// A single browser context (tab) for rendering pages.
#[async_trait]
pub trait RenderContext: Send + Sync {
    /// Navigate to a URL with a timeout.
    async fn navigate(&mut self, url: &str, timeout_ms: u64) -> Result<NavigationResult>;
    /// Execute JavaScript in the page context and return the result.
    async fn execute_js(&self, script: &str) -> Result<serde_json::Value>;
    /// Get the full page HTML.
    async fn get_html(&self) -> Result<String>;
    /// Close this context.
    async fn close(self: Box<Self>) -> Result<()>;

    /// Wait until `document.body` exists, up to `timeout_ms`.
    ///
    /// Returns `false` when the deadline passes first; the caller decides
    /// whether a body-less DOM is still worth reading.
    async fn wait_until_ready(&self, timeout_ms: u64) -> Result<bool> {
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);
        loop {
            let ready = self
                .execute_js("document.body !== null")
                .await?
                .as_bool()
                .unwrap_or(false);
            if ready {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(Duration::from_millis(READY_POLL_MS)).await;
        }
    }
}

/// A renderer that never produces a context.
///
/// Used when Chromium cannot be found or launched, so rendered crawls
/// fail per target with a clear reason instead of aborting the batch.
pub struct NoopRenderer {
    reason: String,
}

impl NoopRenderer {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl Renderer for NoopRenderer {
    async fn new_context(&self) -> Result<Box<dyn RenderContext>> {
        Err(anyhow::anyhow!("browser not available: {}", self.reason))
    }
    fn active_contexts(&self) -> usize {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SlowBody {
        polls: std::sync::atomic::AtomicUsize,
    }

    #[async_trait]
    impl RenderContext for SlowBody {
        async fn navigate(&mut self, url: &str, _timeout_ms: u64) -> Result<NavigationResult> {
            Ok(NavigationResult {
                final_url: url.to_string(),
                status: None,
                load_time_ms: 0,
            })
        }
        async fn execute_js(&self, _script: &str) -> Result<serde_json::Value> {
            let n = self.polls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(serde_json::Value::Bool(n >= 2))
        }
        async fn get_html(&self) -> Result<String> {
            Ok(String::new())
        }
        async fn close(self: Box<Self>) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_wait_until_ready_polls() {
        let ctx = SlowBody {
            polls: Default::default(),
        };
        assert!(ctx.wait_until_ready(5_000).await.unwrap());
        assert_eq!(ctx.polls.load(std::sync::atomic::Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_noop_renderer_reports_reason() {
        let r = NoopRenderer::new("chromium not found");
        let err = match r.new_context().await {
            Ok(_) => panic!("noop renderer produced a context"),
            Err(e) => e,
        };
        assert!(err.to_string().contains("chromium not found"));
        assert_eq!(r.active_contexts(), 0);
    }

    #[test]
    fn test_navigation_timeout_downcast() {
        let err: anyhow::Error = NavigationTimeout(8000).into();
        assert_eq!(err.downcast_ref::<NavigationTimeout>().map(|t| t.0), Some(8000));
    }
}
