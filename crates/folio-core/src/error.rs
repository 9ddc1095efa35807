//! Error types for folio operations.
//!
//! This module defines [`FolioError`] which covers every failure that can occur
//! while fetching, persisting, or deriving financial data.

use thiserror::Error;

/// Errors that can occur across the folio crates.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FolioError {
    /// A required input collection is empty or lacks a prerequisite scalar field.
    #[error("No data available: {0}")]
    NoDataAvailable(String),

    /// A calculation ran but every candidate point failed a sanity bound.
    #[error("No valid data available: {0}")]
    NoValidDataAvailable(String),

    /// An upstream payload could not be parsed or had an unexpected shape.
    #[error("Invalid response format: {0}")]
    InvalidResponseFormat(String),

    /// The session token is missing or invalid.
    #[error("Unauthorized")]
    Unauthorized,

    /// The persistence collaborator returned an error.
    #[error("Database error: {0}")]
    Database(String),

    /// Network-related errors (connection failures, timeouts, etc.).
    #[error("Network error: {0}")]
    Network(String),

    /// Rate limit exceeded by a provider.
    #[error("Rate limited by {provider}: retry after {retry_after:?}")]
    RateLimited {
        /// The provider that rate limited the request.
        provider: String,
        /// Suggested time to wait before retrying.
        retry_after: Option<std::time::Duration>,
    },

    /// The requested symbol or record was not found.
    #[error("Not found: {0}")]
    SymbolNotFound(String),

    /// Error parsing a value.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Durable client storage failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// An invalid parameter was provided.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The requested feature is not supported.
    #[error("Feature not supported: {0}")]
    NotSupported(String),

    /// Any other error.
    #[error("{0}")]
    Other(String),
}

impl FolioError {
    /// Returns true for the two calculator conditions that callers log and
    /// swallow without touching state.
    #[must_use]
    pub const fn is_recoverable_no_data(&self) -> bool {
        matches!(self, Self::NoDataAvailable(_) | Self::NoValidDataAvailable(_))
    }
}

impl From<serde_json::Error> for FolioError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

/// Result type alias using [`FolioError`].
pub type Result<T> = std::result::Result<T, FolioError>;
