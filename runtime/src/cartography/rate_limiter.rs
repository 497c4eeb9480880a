//! Per-host politeness delay shared by every crawl in a batch.

use dashmap::DashMap;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Enforces a minimum spacing (plus random jitter) between requests to the
/// same host. Different hosts never wait on each other.
pub struct HostRateLimiter {
    hosts: DashMap<String, Arc<Mutex<Option<Instant>>>>,
    min_delay: Duration,
    jitter_ms: u64,
}

impl HostRateLimiter {
    pub fn new(min_delay_ms: u64, jitter_ms: u64) -> Self {
        Self {
            hosts: DashMap::new(),
            min_delay: Duration::from_millis(min_delay_ms),
            jitter_ms,
        }
    }

    /// A limiter that never waits.
    pub fn unlimited() -> Self {
        Self::new(0, 0)
    }

    /// Wait until a request to `url`'s host is allowed, then claim the slot.
    pub async fn acquire(&self, url: &str) {
        if self.min_delay.is_zero() && self.jitter_ms == 0 {
            return;
        }
        let host = url::Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_ascii_lowercase()))
            .unwrap_or_default();
        let slot = self
            .hosts
            .entry(host)
            .or_insert_with(|| Arc::new(Mutex::new(None)))
            .clone();

        // the lock is held across the sleep so same-host callers queue up
        let mut last = slot.lock().await;
        if let Some(prev) = *last {
            let wait = self.min_delay + self.jitter();
            let elapsed = prev.elapsed();
            if elapsed < wait {
                tokio::time::sleep(wait - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    fn jitter(&self) -> Duration {
        if self.jitter_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..=self.jitter_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_same_host_waits() {
        let limiter = HostRateLimiter::new(500, 0);
        let start = Instant::now();
        limiter.acquire("https://www.buildersmart.in/a").await;
        limiter.acquire("https://www.buildersmart.in/b").await;
        assert!(start.elapsed() >= Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_different_hosts_do_not_wait() {
        let limiter = HostRateLimiter::new(500, 0);
        let start = Instant::now();
        limiter.acquire("https://www.buildersmart.in/a").await;
        limiter.acquire("https://dir.indiamart.com/b").await;
        assert!(start.elapsed() < Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_unlimited_is_immediate() {
        let limiter = HostRateLimiter::unlimited();
        for _ in 0..10 {
            limiter.acquire("https://example.com/").await;
        }
        assert!(limiter.hosts.is_empty());
    }
}
