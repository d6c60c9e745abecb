//! Rate-limited HTTP fetch layer.
//!
//! This crate provides:
//! - [`TokenBucket`] — rolling-window admission shared by all workers
//! - [`Fetcher`] — the single outbound-request gateway, with a uniform
//!   [`RetryPolicy`]

pub mod client;
pub mod limiter;

pub use client::{Fetcher, FetcherConfig, RetryPolicy};
pub use limiter::TokenBucket;
