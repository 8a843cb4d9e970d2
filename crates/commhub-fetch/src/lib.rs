//! Polite HTTP fetching for probing external websites: bounded concurrency,
//! a minimum gap between hits on the same host, capped bodies and retries
//! with exponential backoff on transient failures.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderName, CONTENT_TYPE, SERVER};
use reqwest::{StatusCode, Url};
use thiserror::Error;
use tokio::sync::{Mutex, Semaphore};
use tokio::time::Instant;
use tracing::{debug, info_span, warn, Instrument};

pub const CRATE_NAME: &str = "commhub-fetch";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} answered {status}")]
    Status { status: u16, url: String },
    #[error("fetch limiter closed")]
    LimiterClosed,
}

impl FetchError {
    /// Worth another attempt: throttling, server errors, timeouts and refused connections.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Status { status, .. } => status_is_transient(*status),
            Self::Request { source, .. } => source.is_timeout() || source.is_connect(),
            Self::InvalidUrl { .. } | Self::LimiterClosed => false,
        }
    }
}

fn status_is_transient(status: u16) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS.as_u16() || (500..600).contains(&status)
}

/// Doubling delays starting at `initial`, never above `ceiling`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub retries: u32,
    pub initial: Duration,
    pub ceiling: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            retries: 2,
            initial: Duration::from_millis(300),
            ceiling: Duration::from_secs(5),
        }
    }
}

impl Backoff {
    /// The sleep before each retry, in order.
    pub fn delays(&self) -> impl Iterator<Item = Duration> + '_ {
        (0..self.retries).scan(self.initial, |next, _| {
            let current = (*next).min(self.ceiling);
            *next = next.saturating_mul(2);
            Some(current)
        })
    }
}

#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub timeout: Duration,
    pub user_agent: String,
    pub max_in_flight: usize,
    /// Minimum time between two requests to the same host.
    pub host_interval: Duration,
    /// Bodies are cut at this size; classification only needs the top of a page.
    pub max_body_bytes: usize,
    pub backoff: Backoff,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(15),
            user_agent: format!("commhub-probe/{}", env!("CARGO_PKG_VERSION")),
            max_in_flight: 8,
            host_interval: Duration::from_millis(500),
            max_body_bytes: 2 * 1024 * 1024,
            backoff: Backoff::default(),
        }
    }
}

impl HttpClientConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        let millis = |key: &str, default: Duration| {
            std::env::var(key)
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_millis)
                .unwrap_or(default)
        };
        Self {
            timeout: millis("COMMHUB_PROBE_TIMEOUT_MS", d.timeout),
            user_agent: std::env::var("COMMHUB_PROBE_USER_AGENT")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(d.user_agent),
            host_interval: millis("COMMHUB_PROBE_HOST_INTERVAL_MS", d.host_interval),
            ..d
        }
    }
}

#[derive(Debug, Clone)]
pub struct FetchedResponse {
    pub status: StatusCode,
    pub final_url: String,
    pub server_header: Option<String>,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
    pub truncated: bool,
}

impl FetchedResponse {
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Lowercased host of an absolute http(s) URL.
pub fn host_key(url: &str) -> Result<String, FetchError> {
    let invalid = |reason: String| FetchError::InvalidUrl {
        url: url.to_string(),
        reason,
    };
    let parsed = Url::parse(url).map_err(|e| invalid(e.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme {}", parsed.scheme())));
    }
    parsed
        .host_str()
        .map(str::to_ascii_lowercase)
        .ok_or_else(|| invalid("missing host".to_string()))
}

/// Remembers when each host was last contacted and hands out start times.
#[derive(Debug, Default)]
struct HostSchedule {
    next_slot: Mutex<HashMap<String, Instant>>,
}

impl HostSchedule {
    /// Reserve the next slot for `host` and return when it opens.
    async fn reserve(&self, host: &str, interval: Duration) -> Instant {
        let mut slots = self.next_slot.lock().await;
        let now = Instant::now();
        let slot = slots.get(host).copied().filter(|at| *at > now).unwrap_or(now);
        slots.insert(host.to_string(), slot + interval);
        slot
    }
}

#[derive(Debug)]
pub struct HttpFetcher {
    client: reqwest::Client,
    in_flight: Arc<Semaphore>,
    hosts: HostSchedule,
    config: HttpClientConfig,
}

impl HttpFetcher {
    pub fn new(config: HttpClientConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .gzip(true)
            .brotli(true)
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .context("building probe http client")?;
        Ok(Self {
            client,
            in_flight: Arc::new(Semaphore::new(config.max_in_flight.max(1))),
            hosts: HostSchedule::default(),
            config,
        })
    }

    /// GET `url`, retrying transient failures per the configured backoff.
    pub async fn fetch_page(&self, url: &str) -> Result<FetchedResponse, FetchError> {
        let host = host_key(url)?;
        let span = info_span!("http_fetch", %host, url);
        async {
            let mut delays = self.config.backoff.delays();
            loop {
                match self.attempt(&host, url).await {
                    Err(err) if err.is_transient() => match delays.next() {
                        Some(delay) => {
                            warn!(error = %err, ?delay, "transient fetch failure; retrying");
                            tokio::time::sleep(delay).await;
                        }
                        None => return Err(err),
                    },
                    other => return other,
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn attempt(&self, host: &str, url: &str) -> Result<FetchedResponse, FetchError> {
        let _permit = self
            .in_flight
            .acquire()
            .await
            .map_err(|_| FetchError::LimiterClosed)?;
        let start_at = self.hosts.reserve(host, self.config.host_interval).await;
        tokio::time::sleep_until(start_at).await;

        let request_failed = |source| FetchError::Request {
            url: url.to_string(),
            source,
        };
        let mut resp = self.client.get(url).send().await.map_err(request_failed)?;
        let status = resp.status();
        let final_url = resp.url().to_string();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: final_url,
            });
        }

        let server_header = header_text(resp.headers(), SERVER);
        let content_type = header_text(resp.headers(), CONTENT_TYPE);
        let mut body = Vec::new();
        let mut truncated = false;
        while let Some(chunk) = resp.chunk().await.map_err(request_failed)? {
            let room = self.config.max_body_bytes.saturating_sub(body.len());
            if chunk.len() > room {
                body.extend_from_slice(&chunk[..room]);
                truncated = true;
                break;
            }
            body.extend_from_slice(&chunk);
        }
        debug!(status = status.as_u16(), bytes = body.len(), truncated, "fetched page");

        Ok(FetchedResponse {
            status,
            final_url,
            server_header,
            content_type,
            body,
            truncated,
        })
    }
}

fn header_text(headers: &HeaderMap, name: HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_until_the_ceiling() {
        let backoff = Backoff {
            retries: 4,
            initial: Duration::from_millis(100),
            ceiling: Duration::from_millis(350),
        };
        let delays = backoff.delays().collect::<Vec<_>>();
        assert_eq!(
            delays,
            vec![
                Duration::from_millis(100),
                Duration::from_millis(200),
                Duration::from_millis(350),
                Duration::from_millis(350),
            ]
        );
        assert_eq!(Backoff { retries: 0, ..backoff }.delays().count(), 0);
    }

    #[test]
    fn throttling_and_server_errors_are_transient() {
        let status = |status| FetchError::Status {
            status,
            url: "https://example.com".into(),
        };
        assert!(status(503).is_transient());
        assert!(status(429).is_transient());
        assert!(!status(404).is_transient());
        assert!(!status(403).is_transient());
        assert!(!FetchError::LimiterClosed.is_transient());
    }

    #[test]
    fn host_key_requires_an_http_host() {
        assert_eq!(host_key("https://Example.COM/path?q=1").unwrap(), "example.com");
        assert!(matches!(host_key("not a url"), Err(FetchError::InvalidUrl { .. })));
        assert!(matches!(
            host_key("mailto:someone@example.com"),
            Err(FetchError::InvalidUrl { .. })
        ));
        assert!(matches!(
            host_key("ftp://files.example.com/"),
            Err(FetchError::InvalidUrl { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn same_host_requests_are_spaced_out() {
        let schedule = HostSchedule::default();
        let gap = Duration::from_millis(500);
        let first = schedule.reserve("example.com", gap).await;
        let second = schedule.reserve("example.com", gap).await;
        let other = schedule.reserve("other.org", gap).await;

        assert_eq!(second - first, gap);
        assert!(other <= first + Duration::from_millis(1));

        tokio::time::advance(Duration::from_secs(5)).await;
        let later = schedule.reserve("example.com", gap).await;
        assert!(later >= first + Duration::from_secs(5));
    }
}
