//! Token-bucket admission over a rolling time window.
//!
//! At most `max_requests` request starts are admitted within any window of
//! `period`; callers over budget sleep until a token frees up — they are
//! never rejected. One bucket is shared by every pipeline worker and is the
//! only cross-worker mutable state in the system.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::trace;

/// Rolling-window token bucket. All methods take `&self`; share via `Arc`.
#[derive(Debug)]
pub struct TokenBucket {
    max_requests: usize,
    period: Duration,
    /// Start instants of requests admitted within the current window.
    starts: Mutex<VecDeque<Instant>>,
}

impl TokenBucket {
    /// A bucket admitting `max_requests` starts per rolling `period`.
    ///
    /// `max_requests` must be non-zero; a zero budget would block forever.
    pub fn new(max_requests: usize, period: Duration) -> Self {
        assert!(max_requests > 0, "token bucket budget must be non-zero");
        Self {
            max_requests,
            period,
            starts: Mutex::new(VecDeque::with_capacity(max_requests)),
        }
    }

    /// Block until a token is available, then consume it.
    ///
    /// The lock is held only while inspecting the window, never across the
    /// sleep, so concurrent callers queue on the bucket rather than on each
    /// other's waits.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut starts = self.starts.lock().await;
                let now = Instant::now();

                while let Some(&front) = starts.front() {
                    if now.duration_since(front) >= self.period {
                        starts.pop_front();
                    } else {
                        break;
                    }
                }

                if starts.len() < self.max_requests {
                    starts.push_back(now);
                    return;
                }

                // Oldest in-window start decides when the next token frees.
                let front = *starts.front().expect("window is non-empty here");
                self.period - now.duration_since(front)
            };

            trace!(wait_ms = wait.as_millis() as u64, "rate budget exhausted, waiting");
            tokio::time::sleep(wait).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn admits_budget_without_waiting() {
        let bucket = TokenBucket::new(5, Duration::from_secs(1));
        let start = Instant::now();
        for _ in 0..5 {
            bucket.acquire().await;
        }
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn excess_callers_wait_full_windows() {
        // N = 12 requests at R = 5 per P = 1s must take at least
        // (ceil(12/5) - 1) * 1s = 2s.
        let bucket = TokenBucket::new(5, Duration::from_secs(1));
        let start = Instant::now();
        for _ in 0..12 {
            bucket.acquire().await;
        }
        assert!(start.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn window_slides_rather_than_resets() {
        let bucket = TokenBucket::new(2, Duration::from_secs(1));
        bucket.acquire().await;
        tokio::time::advance(Duration::from_millis(600)).await;
        bucket.acquire().await;

        // Third acquire must wait for the first token to age out (400ms),
        // not for a fresh full window.
        let start = Instant::now();
        bucket.acquire().await;
        let waited = start.elapsed();
        assert!(waited >= Duration::from_millis(400));
        assert!(waited < Duration::from_millis(1_000));
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_are_all_served() {
        let bucket = Arc::new(TokenBucket::new(3, Duration::from_secs(1)));
        let mut handles = Vec::new();
        for _ in 0..9 {
            let bucket = bucket.clone();
            handles.push(tokio::spawn(async move {
                bucket.acquire().await;
            }));
        }
        let start = Instant::now();
        for handle in handles {
            handle.await.expect("task panicked");
        }
        assert!(start.elapsed() >= Duration::from_secs(2));
    }

    #[test]
    #[should_panic(expected = "non-zero")]
    fn zero_budget_is_rejected() {
        let _ = TokenBucket::new(0, Duration::from_secs(1));
    }
}
