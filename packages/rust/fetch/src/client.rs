//! Rate-limited HTTP gateway with an explicit retry policy.
//!
//! Every outbound request in the pipeline goes through [`Fetcher::get_text`]:
//! each attempt takes a token from the shared [`TokenBucket`] before it
//! starts, failed attempts back off with doubling delay, and the final
//! failure surfaces as [`ThirteenfError::Network`] carrying the URL and the
//! failure class.

use std::time::Duration;

use reqwest::Client;
use tracing::{debug, warn};

use thirteenf_shared::{NetworkErrorKind, Result, ThirteenfError};

use crate::limiter::TokenBucket;

/// Retry policy applied uniformly to every fetch.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts per request, including the first.
    pub max_attempts: u32,
    /// Backoff before the second attempt; doubles per subsequent attempt.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Backoff delay after the given zero-based failed attempt.
    fn delay_after(&self, attempt: u32) -> Duration {
        self.backoff * 2u32.saturating_pow(attempt)
    }
}

/// Settings for constructing a [`Fetcher`].
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// User-Agent header sent with every request.
    pub user_agent: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Request starts admitted per rolling window.
    pub max_requests: usize,
    /// Rolling window length.
    pub period: Duration,
    /// Retry policy for transport failures.
    pub retry: RetryPolicy,
}

/// The single shared gateway for all outbound requests.
pub struct Fetcher {
    client: Client,
    bucket: TokenBucket,
    retry: RetryPolicy,
}

impl Fetcher {
    /// Build a fetcher with its own HTTP client and token bucket.
    pub fn new(config: &FetcherConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                ThirteenfError::config(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            bucket: TokenBucket::new(config.max_requests, config.period),
            retry: config.retry,
        })
    }

    /// Fetch `url` as text under the global rate budget and retry policy.
    pub async fn get_text(&self, url: &str) -> Result<String> {
        let mut attempt: u32 = 0;
        loop {
            self.bucket.acquire().await;
            debug!(url, attempt, "fetching");

            match self.try_get(url).await {
                Ok(body) => return Ok(body),
                Err(err) if attempt + 1 < self.retry.max_attempts => {
                    let delay = self.retry.delay_after(attempt);
                    warn!(
                        url,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "fetch attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    warn!(url, attempts = attempt + 1, error = %err, "fetch failed");
                    return Err(err);
                }
            }
        }
    }

    /// A single fetch attempt with transport failures classified.
    async fn try_get(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ThirteenfError::network(url, classify(&e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ThirteenfError::network(
                url,
                NetworkErrorKind::Status(status.as_u16()),
            ));
        }

        response
            .text()
            .await
            .map_err(|e| ThirteenfError::network(url, NetworkErrorKind::Body(e.to_string())))
    }
}

/// Map a reqwest error onto the failure-class taxonomy.
fn classify(err: &reqwest::Error) -> NetworkErrorKind {
    if err.is_timeout() {
        NetworkErrorKind::Timeout
    } else if err.is_connect() {
        NetworkErrorKind::Connect
    } else {
        NetworkErrorKind::Other(err.to_string())
    }
}
