//! Shared types, error model, and configuration for thirteenf.
//!
//! This crate is the foundation depended on by all other thirteenf crates.
//! It provides:
//! - [`ThirteenfError`] — the unified error type
//! - Domain types ([`Cik`], [`FilingReference`], [`HoldingRecord`],
//!   [`FundDataset`], [`AggregatedDataset`])
//! - Configuration ([`AppConfig`], [`PipelineConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DefaultsConfig, EdgarConfig, PipelineConfig, RateLimitConfig, RetryConfig,
    config_dir, config_file_path, init_config, load_config, load_config_from,
};
pub use error::{NetworkErrorKind, Result, ThirteenfError};
pub use types::{
    AccessionNumber, AggregatedDataset, CellValue, Cik, COLUMNS, ColumnSpec, ColumnType,
    FilingReference, FundDataset, HoldingRecord,
};
