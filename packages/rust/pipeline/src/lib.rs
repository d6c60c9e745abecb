//! End-to-end 13F ingestion pipeline.
//!
//! This crate provides:
//! - [`Scheduler`] — bounded fan-out of the per-fund pipeline
//! - [`aggregate`] — merge, scrub, dedup, and ingestion-date stamping
//! - [`run_ingestion`] — wire a full run from a [`PipelineConfig`]

pub mod aggregate;
pub mod scheduler;

use std::sync::Arc;
use std::time::Duration;

use thirteenf_edgar::{EdgarClient, EdgarEndpoints};
use thirteenf_fetch::{Fetcher, FetcherConfig, RetryPolicy};
use thirteenf_shared::{Cik, PipelineConfig, Result};

pub use aggregate::aggregate;
pub use scheduler::{FundFailure, RunReport, Scheduler, Stage};

/// Build the fetch and EDGAR layers from config and run the full pipeline.
pub async fn run_ingestion(config: &PipelineConfig, ciks: &[Cik]) -> Result<RunReport> {
    let fetcher = Arc::new(Fetcher::new(&FetcherConfig {
        user_agent: config.user_agent.clone(),
        timeout: Duration::from_secs(config.request_timeout_secs),
        max_requests: config.max_requests,
        period: Duration::from_millis(config.period_ms),
        retry: RetryPolicy {
            max_attempts: config.retry_max_attempts,
            backoff: Duration::from_millis(config.retry_backoff_ms),
        },
    })?);

    let client = Arc::new(EdgarClient::new(
        fetcher,
        EdgarEndpoints::from_config(config),
    ));

    let scheduler = Scheduler::new(client, config.worker_count);
    Ok(scheduler.run(ciks).await)
}
