//! Error types for thirteenf.
//!
//! Library crates use [`ThirteenfError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.
//!
//! Every variant except `Config` and `Io` is a per-fund outcome: the
//! scheduler catches it at the fund's task boundary and records it in the
//! run report instead of propagating it.

use std::path::PathBuf;

/// Classification of a transport-level fetch failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkErrorKind {
    /// The per-request timeout expired.
    Timeout,
    /// TCP/TLS connection could not be established or was reset.
    Connect,
    /// The server answered with a non-2xx status.
    Status(u16),
    /// The response body could not be read or decoded.
    Body(String),
    /// Anything reqwest reports that doesn't fit the classes above.
    Other(String),
}

impl std::fmt::Display for NetworkErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Timeout => write!(f, "timeout"),
            Self::Connect => write!(f, "connection failed"),
            Self::Status(code) => write!(f, "HTTP {code}"),
            Self::Body(msg) => write!(f, "body read failed: {msg}"),
            Self::Other(msg) => write!(f, "{msg}"),
        }
    }
}

/// Top-level error type for all thirteenf operations.
#[derive(Debug, thiserror::Error)]
pub enum ThirteenfError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Transport failure from the rate-limited fetcher. Carries the URL and
    /// the failure class; retry policy has already been exhausted.
    #[error("network error: {url}: {kind}")]
    Network { url: String, kind: NetworkErrorKind },

    /// The filing exists but its document bundle lists no information table.
    #[error("no information table document listed for CIK {cik}, accession {accession}")]
    DocumentMissing { cik: String, accession: String },

    /// The information-table document contains no recognizable holdings table.
    #[error("no holdings table found in information table document")]
    TableNotFound,

    /// The holdings table width matches neither known layout (12 or 13 columns).
    #[error("unexpected holdings table layout: {columns} columns")]
    SchemaError { columns: usize },

    /// Malformed upstream payload (submissions JSON, dates, fund list).
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ThirteenfError>;

impl ThirteenfError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a network error for `url` with the given failure class.
    pub fn network(url: impl Into<String>, kind: NetworkErrorKind) -> Self {
        Self::Network {
            url: url.into(),
            kind,
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
