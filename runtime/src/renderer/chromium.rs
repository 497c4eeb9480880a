//! Headless Chromium backing for rendered fetches.
//!
//! One browser process per crawl; every crawl target gets its own tab so
//! cookies and script state do not leak between sites.

use super::{NavigationResult, NavigationTimeout, RenderContext, Renderer};
use crate::config::FetchConfig;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Environment variable overriding Chromium discovery.
pub const CHROMIUM_ENV: &str = "LINKSCOUT_CHROMIUM_PATH";

/// Locate a Chromium or Chrome executable: env override, then `PATH`,
/// then the usual install locations.
pub fn find_chromium() -> Option<PathBuf> {
    // 1. explicit override
    if let Ok(p) = std::env::var(CHROMIUM_ENV) {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. system PATH
    for name in [
        "google-chrome",
        "google-chrome-stable",
        "chromium",
        "chromium-browser",
        "chrome",
    ] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    // 3. common install locations
    let common: &[&str] = if cfg!(target_os = "macos") {
        &[
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
        ]
    } else if cfg!(target_os = "windows") {
        &[
            r"C:\Program Files\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
        ]
    } else {
        &["/usr/bin/google-chrome", "/usr/bin/chromium", "/snap/bin/chromium"]
    };
    common.iter().map(PathBuf::from).find(|p| p.exists())
}

const NAVIGATION_STATUS_JS: &str =
    "(performance.getEntriesByType('navigation')[0] || {}).responseStatus || 0";

/// Desktop-sized viewport so sites serve their full listing grids.
const VIEWPORT: (u32, u32) = (1366, 900);

/// A running browser shared by every rendered session of one crawl.
pub struct ChromiumRenderer {
    browser: Browser,
    open_tabs: Arc<AtomicUsize>,
}

impl ChromiumRenderer {
    /// Start Chromium presenting the same identity as the static fetcher.
    pub async fn launch(headless: bool, fetch: &FetchConfig) -> Result<Self> {
        let chrome_path = find_chromium().with_context(|| {
            format!("no Chromium executable found; install one or set {CHROMIUM_ENV}")
        })?;

        let mut builder = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .window_size(VIEWPORT.0, VIEWPORT.1)
            .arg(format!("--user-agent={}", fetch.user_agent))
            .arg(format!("--lang={}", primary_language(&fetch.accept_language)))
            .arg("--no-sandbox")
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-background-networking")
            .arg("--blink-settings=imagesEnabled=false");
        builder = if headless {
            builder.arg("--headless=new")
        } else {
            builder.with_head()
        };
        let browser_config = builder
            .build()
            .map_err(|e| anyhow::anyhow!("invalid browser config: {e}"))?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .context("Chromium failed to start")?;

        // The CDP handler must be polled for the browser to make progress.
        tokio::spawn(async move { while handler.next().await.is_some() {} });

        tracing::info!(headless, "rendered fetching enabled");
        Ok(Self {
            browser,
            open_tabs: Arc::new(AtomicUsize::new(0)),
        })
    }
}

/// `--lang` takes a single tag; keep the first entry of an Accept-Language list.
fn primary_language(accept_language: &str) -> &str {
    accept_language
        .split([',', ';'])
        .next()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .unwrap_or("en")
}

#[async_trait]
impl Renderer for ChromiumRenderer {
    async fn new_context(&self) -> Result<Box<dyn RenderContext>> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .context("could not open a browser tab")?;
        self.open_tabs.fetch_add(1, Ordering::Relaxed);
        Ok(Box::new(ChromiumContext {
            page,
            open_tabs: Arc::clone(&self.open_tabs),
        }))
    }

    fn active_contexts(&self) -> usize {
        self.open_tabs.load(Ordering::Relaxed)
    }
}

/// One browser tab, owned by a single crawl target.
pub struct ChromiumContext {
    page: Page,
    open_tabs: Arc<AtomicUsize>,
}

impl ChromiumContext {
    /// Main-document status from Navigation Timing, for loads where CDP
    /// reported no response (history cache hits).
    async fn timing_status(&self) -> Option<u16> {
        let status: u64 = self
            .page
            .evaluate(NAVIGATION_STATUS_JS)
            .await
            .ok()?
            .into_value()
            .ok()?;
        u16::try_from(status).ok().filter(|s| *s > 0)
    }
}

#[async_trait]
impl RenderContext for ChromiumContext {
    async fn navigate(&mut self, url: &str, timeout_ms: u64) -> Result<NavigationResult> {
        let started = Instant::now();
        let limit = Duration::from_millis(timeout_ms);
        let page = &self.page;
        let navigation = async {
            page.goto(url).await?;
            page.wait_for_navigation_response().await
        };
        let request = match tokio::time::timeout(limit, navigation).await {
            Err(_) => return Err(NavigationTimeout(timeout_ms).into()),
            Ok(Err(e)) => bail!("could not load {url}: {e}"),
            Ok(Ok(request)) => request,
        };

        let status = match request
            .as_ref()
            .and_then(|r| r.response.as_ref())
            .and_then(|r| u16::try_from(r.status).ok())
        {
            Some(status) => Some(status),
            None => self.timing_status().await,
        };

        // Redirects are followed by the browser; report where we landed.
        let final_url = match self.page.url().await {
            Ok(Some(landed)) => landed,
            _ => url.to_string(),
        };
        Ok(NavigationResult {
            final_url,
            status,
            load_time_ms: started.elapsed().as_millis() as u64,
        })
    }

    async fn execute_js(&self, script: &str) -> Result<serde_json::Value> {
        let evaluation = self
            .page
            .evaluate(script)
            .await
            .context("script evaluation failed")?;
        evaluation
            .into_value()
            .map_err(|e| anyhow::anyhow!("script returned a non-JSON value: {e:?}"))
    }

    async fn get_html(&self) -> Result<String> {
        self.page
            .content()
            .await
            .context("could not serialise the rendered DOM")
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.open_tabs.fetch_sub(1, Ordering::Relaxed);
        if let Err(e) = self.page.close().await {
            tracing::debug!("tab close failed: {e}");
        }
        Ok(())
    }
}
