//! Error types for HAVEN operations
//!
//! Cache operations never fail: a full cache is resolved by eviction and a
//! missing entry is `None`. The only errors are fetch failures and invalid
//! configuration.

use std::time::Duration;
use thiserror::Error;

/// A resource fetch that did not produce data.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("Fetch failed for {key}: {reason}")]
    Failed { key: String, reason: String },

    #[error("Fetch for {key} timed out after {timeout:?}")]
    Timeout { key: String, timeout: Duration },

    #[error("Fetch for {key} was cancelled")]
    Cancelled { key: String },

    #[error("Resource not found: {key}")]
    NotFound { key: String },
}

impl FetchError {
    /// Build a `Failed` error from any displayable reason.
    pub fn failed(key: impl Into<String>, reason: impl ToString) -> Self {
        FetchError::Failed {
            key: key.into(),
            reason: reason.to_string(),
        }
    }

    /// The resource key the fetch was for.
    pub fn key(&self) -> &str {
        match self {
            FetchError::Failed { key, .. }
            | FetchError::Timeout { key, .. }
            | FetchError::Cancelled { key }
            | FetchError::NotFound { key } => key,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, FetchError::Timeout { .. })
    }
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Incompatible options: {option_a} and {option_b}")]
    IncompatibleOptions { option_a: String, option_b: String },
}

/// Master error type for all HAVEN errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HavenError {
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for HAVEN operations.
pub type HavenResult<T> = Result<T, HavenError>;
