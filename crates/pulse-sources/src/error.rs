//! Error types for external data sources

use thiserror::Error;

/// Source-layer errors
#[derive(Debug, Error)]
pub enum SourceError {
    /// Provider has no data for the requested symbol
    #[error("Data not available for {symbol}: {reason}")]
    DataUnavailable { symbol: String, reason: String },

    /// API request failed
    #[error("API error: {0}")]
    ApiError(String),

    /// Network or HTTP error
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Yahoo Finance API error
    #[error("Yahoo Finance error: {0}")]
    YahooFinanceError(String),

    /// Filesystem error from the cache or persistence layer
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type alias for source operations
pub type Result<T> = std::result::Result<T, SourceError>;
