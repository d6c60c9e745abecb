//! Application configuration for thirteenf.
//!
//! User config lives at `~/.thirteenf/thirteenf.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, ThirteenfError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "thirteenf.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".thirteenf";

// ---------------------------------------------------------------------------
// Config structs (matching thirteenf.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// EDGAR endpoints and identification.
    #[serde(default)]
    pub edgar: EdgarConfig,

    /// Global request-rate budget shared by all workers.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Retry policy applied uniformly by the fetch layer.
    #[serde(default)]
    pub retry: RetryConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Concurrent per-fund pipeline slots.
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,

    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            worker_count: default_worker_count(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_worker_count() -> usize {
    5
}
fn default_request_timeout_secs() -> u64 {
    30
}

/// `[edgar]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgarConfig {
    /// Base URL for the per-fund submissions index.
    #[serde(default = "default_submissions_base")]
    pub submissions_base: String,

    /// Base URL for filing document bundles and content documents.
    #[serde(default = "default_archives_base")]
    pub archives_base: String,

    /// User-Agent identification sent with every request. EDGAR requires a
    /// contact address here.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Filing form type selected from each fund's index.
    #[serde(default = "default_target_form")]
    pub target_form: String,
}

impl Default for EdgarConfig {
    fn default() -> Self {
        Self {
            submissions_base: default_submissions_base(),
            archives_base: default_archives_base(),
            user_agent: default_user_agent(),
            target_form: default_target_form(),
        }
    }
}

fn default_submissions_base() -> String {
    "https://data.sec.gov/submissions".into()
}
fn default_archives_base() -> String {
    "https://www.sec.gov".into()
}
fn default_user_agent() -> String {
    concat!("thirteenf/", env!("CARGO_PKG_VERSION"), " (research@example.com)").into()
}
fn default_target_form() -> String {
    "13F-HR".into()
}

/// `[rate_limit]` section — at most `max_requests` request starts within any
/// rolling window of `period_ms` milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_max_requests")]
    pub max_requests: usize,

    #[serde(default = "default_period_ms")]
    pub period_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: default_max_requests(),
            period_ms: default_period_ms(),
        }
    }
}

fn default_max_requests() -> usize {
    5
}
fn default_period_ms() -> u64 {
    1_000
}

/// `[retry]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per request, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial backoff in milliseconds; doubles per subsequent attempt.
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_ms: default_backoff_ms(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}
fn default_backoff_ms() -> u64 {
    500
}

// ---------------------------------------------------------------------------
// Pipeline config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime pipeline configuration — merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Concurrent per-fund pipeline slots.
    pub worker_count: usize,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Submissions index base URL.
    pub submissions_base: String,
    /// Archives base URL.
    pub archives_base: String,
    /// User-Agent header value.
    pub user_agent: String,
    /// Filing form type to select, e.g. `13F-HR`.
    pub target_form: String,
    /// Request starts admitted per rolling window.
    pub max_requests: usize,
    /// Rolling window length in milliseconds.
    pub period_ms: u64,
    /// Retry attempts per request, including the first.
    pub retry_max_attempts: u32,
    /// Initial retry backoff in milliseconds.
    pub retry_backoff_ms: u64,
}

impl From<&AppConfig> for PipelineConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            worker_count: config.defaults.worker_count,
            request_timeout_secs: config.defaults.request_timeout_secs,
            submissions_base: config.edgar.submissions_base.clone(),
            archives_base: config.edgar.archives_base.clone(),
            user_agent: config.edgar.user_agent.clone(),
            target_form: config.edgar.target_form.clone(),
            max_requests: config.rate_limit.max_requests,
            period_ms: config.rate_limit.period_ms,
            retry_max_attempts: config.retry.max_attempts,
            retry_backoff_ms: config.retry.backoff_ms,
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.thirteenf/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| ThirteenfError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.thirteenf/thirteenf.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| ThirteenfError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        ThirteenfError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| ThirteenfError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| ThirteenfError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| ThirteenfError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
