//! Error types for the Tripod core library.
//!
//! Uses `thiserror` for public API error types, one enum per concern:
//! category decoding, aggregation, metadata sources and configuration.

use std::path::PathBuf;

/// Top-level error type for the Tripod core library.
#[derive(Debug, thiserror::Error)]
pub enum TripodError {
    #[error("Aggregation error: {0}")]
    Aggregation(#[from] AggregationError),

    #[error("Metadata source error: {0}")]
    Source(#[from] SourceError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// The `dataCategories` annotation of a unit could not be decoded.
///
/// Carries the original annotation value for diagnostics.
#[derive(Debug, thiserror::Error)]
#[error("invalid data categories {raw:?}: {source}")]
pub struct DecodeError {
    pub raw: String,
    #[source]
    pub source: serde_json::Error,
}

/// Discriminant of an [`AggregationError`], for callers that only branch on the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    HostNotFound,
    CategoryDecodeFailed,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::HostNotFound => write!(f, "host_not_found"),
            FailureKind::CategoryDecodeFailed => write!(f, "category_decode_failed"),
        }
    }
}

/// Why aggregation of a single unit failed.
#[derive(Debug, thiserror::Error)]
pub enum AggregationFailure {
    #[error("host '{host}' not found")]
    HostNotFound { host: String },

    #[error("data categories could not be decoded: {0}")]
    CategoryDecodeFailed(#[source] DecodeError),
}

/// A unit could not be turned into a record; the whole pass is aborted.
#[derive(Debug, thiserror::Error)]
#[error("unit '{unit}': {reason}")]
pub struct AggregationError {
    pub unit: String,
    #[source]
    pub reason: AggregationFailure,
}

impl AggregationError {
    pub fn host_not_found(unit: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            unit: unit.into(),
            reason: AggregationFailure::HostNotFound { host: host.into() },
        }
    }

    pub fn category_decode_failed(unit: impl Into<String>, cause: DecodeError) -> Self {
        Self {
            unit: unit.into(),
            reason: AggregationFailure::CategoryDecodeFailed(cause),
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self.reason {
            AggregationFailure::HostNotFound { .. } => FailureKind::HostNotFound,
            AggregationFailure::CategoryDecodeFailed(_) => FailureKind::CategoryDecodeFailed,
        }
    }
}

/// Errors from a raw metadata source.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Source misconfigured: {message}")]
    Config { message: String },

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Request to cluster API failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Cluster API returned {status} for {url}")]
    Status { status: u16, url: String },

    #[error("Failed to parse {what}: {message}")]
    Parse { what: String, message: String },
}

/// Errors from the configuration system.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),
}

/// Convenience result type for Tripod operations.
pub type Result<T> = std::result::Result<T, TripodError>;
