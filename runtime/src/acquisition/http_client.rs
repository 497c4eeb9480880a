//! reqwest client for static page fetches.
//!
//! Carries the crawler's identity headers, follows a bounded number of
//! redirects and retries transient failures. Timeouts are never retried:
//! a site that is slow once is slow again, and the page budget matters more.

use crate::config::FetchConfig;
use anyhow::Result;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, RETRY_AFTER};
use reqwest::StatusCode;
use std::time::Duration;

const MAX_REDIRECTS: usize = 5;

/// Longest `Retry-After` we are willing to honour.
const MAX_RETRY_AFTER: Duration = Duration::from_secs(10);

/// A fully read response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// Where redirects ended.
    pub final_url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Whether the body is worth parsing for links. A missing header is
    /// given the benefit of the doubt.
    pub fn is_markup(&self) -> bool {
        match &self.content_type {
            None => true,
            Some(ct) => {
                let ct = ct.to_ascii_lowercase();
                ct.starts_with("text/") || ct.contains("html") || ct.contains("xml")
            }
        }
    }
}

/// How many times, and how long to wait, before giving up on a URL.
#[derive(Debug, Clone, Copy)]
struct RetryPolicy {
    max_retries: u32,
}

impl RetryPolicy {
    /// Exponential backoff from 500ms.
    fn backoff(attempt: u32) -> Duration {
        Duration::from_millis(500u64 << attempt.min(6))
    }

    /// Delay before retrying a response, or `None` to accept it as final.
    fn after_status(&self, attempt: u32, status: StatusCode, headers: &HeaderMap) -> Option<Duration> {
        if attempt >= self.max_retries {
            return None;
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            let secs = headers
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<u64>().ok())
                .unwrap_or(2);
            return Some(Duration::from_secs(secs).min(MAX_RETRY_AFTER));
        }
        status.is_server_error().then(|| Self::backoff(attempt))
    }

    fn after_error(&self, attempt: u32, err: &reqwest::Error) -> Option<Duration> {
        (attempt < self.max_retries && !err.is_timeout()).then(|| Self::backoff(attempt))
    }
}

/// Cloneable handle; clones share one connection pool.
#[derive(Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl HttpClient {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml;q=0.9,*/*;q=0.8"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_str(&config.accept_language)?);

        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .timeout(Duration::from_millis(config.timeout_ms))
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()?;
        Ok(Self {
            client,
            retry: RetryPolicy {
                max_retries: config.max_retries,
            },
        })
    }

    /// GET `url`, retrying 5xx, 429 and connection errors per the policy.
    ///
    /// Errors are reqwest errors inside `anyhow`; see [`is_timeout`].
    pub async fn get(&self, url: &str) -> Result<HttpResponse> {
        let mut attempt = 0u32;
        loop {
            let response = match self.client.get(url).send().await {
                Ok(response) => response,
                Err(e) => match self.retry.after_error(attempt, &e) {
                    Some(delay) => {
                        tracing::debug!("{url}: {e}, retrying in {delay:?}");
                        attempt += 1;
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    None => return Err(e.into()),
                },
            };

            let status = response.status();
            if let Some(delay) = self.retry.after_status(attempt, status, response.headers()) {
                tracing::debug!("{url}: HTTP {}, retrying in {delay:?}", status.as_u16());
                attempt += 1;
                tokio::time::sleep(delay).await;
                continue;
            }

            let final_url = response.url().to_string();
            let content_type = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned);
            let body = response.text().await?;
            return Ok(HttpResponse {
                final_url,
                status: status.as_u16(),
                content_type,
                body,
            });
        }
    }
}

/// Whether an error from [`HttpClient::get`] was a timeout.
pub fn is_timeout(err: &anyhow::Error) -> bool {
    err.downcast_ref::<reqwest::Error>()
        .is_some_and(reqwest::Error::is_timeout)
}
