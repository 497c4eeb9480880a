//! Page fetch strategies behind one interface.
//!
//! A `FetchBackend` opens one `PageFetcher` session per crawl target. The
//! static backend issues plain GETs; the rendered backend drives a browser
//! tab, waits for `document.body` and a short settle delay, then reads the
//! DOM. Either way `fetch` never fails: timeouts, transport errors and
//! non-2xx responses all come back as a `PageFetch` with a failed status.

use crate::acquisition::http_client::{self, HttpClient};
use crate::cartography::rate_limiter::HostRateLimiter;
use crate::config::FetchConfig;
use crate::error::{Result, ScoutError};
use crate::renderer::chromium::ChromiumRenderer;
use crate::renderer::{NavigationTimeout, NoopRenderer, RenderContext, Renderer};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Outcome of loading one URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FetchStatus {
    Ok,
    Timeout,
    Failed(String),
}

/// Result of loading one URL. Discarded after extraction.
#[derive(Debug, Clone)]
pub struct PageFetch {
    pub url: String,
    /// URL after redirects; equal to `url` when unknown.
    pub final_url: String,
    /// Markup (or serialised DOM). Empty unless `status` is `Ok`.
    pub html: String,
    pub status: FetchStatus,
    pub http_status: Option<u16>,
    pub elapsed_ms: u64,
}

impl PageFetch {
    pub fn ok(url: &str, final_url: String, html: String, http_status: Option<u16>) -> Self {
        Self {
            url: url.to_string(),
            final_url,
            html,
            status: FetchStatus::Ok,
            http_status,
            elapsed_ms: 0,
        }
    }

    pub fn failed(url: &str, reason: impl Into<String>, http_status: Option<u16>) -> Self {
        Self {
            url: url.to_string(),
            final_url: url.to_string(),
            html: String::new(),
            status: FetchStatus::Failed(reason.into()),
            http_status,
            elapsed_ms: 0,
        }
    }

    pub fn timeout(url: &str) -> Self {
        Self {
            status: FetchStatus::Timeout,
            ..Self::failed(url, "", None)
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == FetchStatus::Ok
    }

    fn timed(mut self, started: Instant) -> Self {
        self.elapsed_ms = started.elapsed().as_millis() as u64;
        self
    }
}

/// Opens fetch sessions. Shared by every target in a batch.
#[async_trait]
pub trait FetchBackend: Send + Sync {
    /// Acquire a session for one crawl target.
    ///
    /// Fails with `RenderUnavailable` when no rendering session can start.
    async fn open_session(&self) -> Result<Box<dyn PageFetcher>>;

    /// Short name for logs and the doctor report.
    fn name(&self) -> &'static str;
}

/// A sequential fetch session owned by one crawl target.
#[async_trait]
pub trait PageFetcher: Send {
    async fn fetch(&mut self, url: &str) -> PageFetch;
    /// Release the session. Called on every exit path of a target run.
    async fn close(self: Box<Self>);
}

// ── Static fetch ────────────────────────────────────────────────────────────

/// Plain HTTP GET backend.
pub struct HttpBackend {
    client: HttpClient,
    limiter: Arc<HostRateLimiter>,
}

impl HttpBackend {
    pub fn new(config: &FetchConfig, limiter: Arc<HostRateLimiter>) -> Result<Self> {
        let client = HttpClient::new(config)
            .map_err(|e| ScoutError::Config(format!("cannot build HTTP client: {e}")))?;
        Ok(Self { client, limiter })
    }
}

#[async_trait]
impl FetchBackend for HttpBackend {
    async fn open_session(&self) -> Result<Box<dyn PageFetcher>> {
        Ok(Box::new(StaticFetcher {
            client: self.client.clone(),
            limiter: Arc::clone(&self.limiter),
        }))
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

/// One GET per page.
pub struct StaticFetcher {
    client: HttpClient,
    limiter: Arc<HostRateLimiter>,
}

#[async_trait]
impl PageFetcher for StaticFetcher {
    async fn fetch(&mut self, url: &str) -> PageFetch {
        self.limiter.acquire(url).await;
        let started = Instant::now();
        let page = match self.client.get(url).await {
            Ok(resp) if resp.is_success() && resp.is_markup() => {
                PageFetch::ok(url, resp.final_url, resp.body, Some(resp.status))
            }
            Ok(resp) if resp.is_success() => PageFetch::failed(
                url,
                format!("not a page: {}", resp.content_type.unwrap_or_default()),
                Some(resp.status),
            ),
            Ok(resp) => PageFetch::failed(url, format!("HTTP {}", resp.status), Some(resp.status)),
            Err(e) if http_client::is_timeout(&e) => PageFetch::timeout(url),
            Err(e) => PageFetch::failed(url, e.to_string(), None),
        };
        page.timed(started)
    }

    async fn close(self: Box<Self>) {}
}

// ── Rendered fetch ──────────────────────────────────────────────────────────

/// Browser-backed fetches, one tab per crawl target.
pub struct RenderedBackend {
    renderer: Arc<dyn Renderer>,
    config: FetchConfig,
    limiter: Arc<HostRateLimiter>,
}

impl RenderedBackend {
    pub fn new(renderer: Arc<dyn Renderer>, config: FetchConfig, limiter: Arc<HostRateLimiter>) -> Self {
        Self {
            renderer,
            config,
            limiter,
        }
    }

    /// Launch Chromium. When it cannot start, every session request fails
    /// with `RenderUnavailable` so each target reports it explicitly.
    pub async fn launch(headless: bool, config: FetchConfig, limiter: Arc<HostRateLimiter>) -> Self {
        let renderer: Arc<dyn Renderer> = match ChromiumRenderer::launch(headless, &config).await {
            Ok(r) => Arc::new(r),
            Err(e) => {
                tracing::warn!("Chromium unavailable: {e:#}");
                Arc::new(NoopRenderer::new(format!("{e:#}")))
            }
        };
        Self::new(renderer, config, limiter)
    }
}

#[async_trait]
impl FetchBackend for RenderedBackend {
    async fn open_session(&self) -> Result<Box<dyn PageFetcher>> {
        let ctx = self
            .renderer
            .new_context()
            .await
            .map_err(|e| ScoutError::RenderUnavailable(format!("{e:#}")))?;
        Ok(Box::new(RenderedFetcher {
            ctx,
            config: self.config.clone(),
            limiter: Arc::clone(&self.limiter),
        }))
    }

    fn name(&self) -> &'static str {
        "rendered"
    }
}

/// A browser tab driven sequentially.
pub struct RenderedFetcher {
    ctx: Box<dyn RenderContext>,
    config: FetchConfig,
    limiter: Arc<HostRateLimiter>,
}

impl RenderedFetcher {
    /// Ceiling for one whole rendered load: navigation, readiness polling,
    /// settling and DOM serialisation.
    fn page_deadline(&self) -> Duration {
        Duration::from_millis(self.config.timeout_ms + self.config.ready_timeout_ms + self.config.settle_ms)
    }

    async fn load(&mut self, url: &str) -> PageFetch {
        let nav = match self.ctx.navigate(url, self.config.timeout_ms).await {
            Ok(nav) => nav,
            Err(e) if e.downcast_ref::<NavigationTimeout>().is_some() => {
                return PageFetch::timeout(url)
            }
            Err(e) => return PageFetch::failed(url, format!("{e:#}"), None),
        };
        if let Some(status) = nav.status.filter(|s| !(200..300).contains(s)) {
            return PageFetch::failed(url, format!("HTTP {status}"), Some(status));
        }

        match self.ctx.wait_until_ready(self.config.ready_timeout_ms).await {
            Ok(true) => {}
            Ok(false) => tracing::debug!("{url}: no document.body after {}ms", self.config.ready_timeout_ms),
            Err(e) => return PageFetch::failed(url, format!("readiness check failed: {e:#}"), None),
        }
        if self.config.settle_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.settle_ms)).await;
        }

        match self.ctx.get_html().await {
            Ok(html) => PageFetch::ok(url, nav.final_url, html, nav.status),
            Err(e) => PageFetch::failed(url, format!("{e:#}"), nav.status),
        }
    }
}

#[async_trait]
impl PageFetcher for RenderedFetcher {
    async fn fetch(&mut self, url: &str) -> PageFetch {
        self.limiter.acquire(url).await;
        let started = Instant::now();
        let deadline = self.page_deadline();
        let page = match tokio::time::timeout(deadline, self.load(url)).await {
            Ok(page) => page,
            Err(_) => {
                tracing::debug!("{url}: rendered load exceeded {deadline:?}");
                PageFetch::timeout(url)
            }
        };
        page.timed(started)
    }

    async fn close(self: Box<Self>) {
        if let Err(e) = self.ctx.close().await {
            tracing::debug!("closing render context failed: {e:#}");
        }
    }
}
