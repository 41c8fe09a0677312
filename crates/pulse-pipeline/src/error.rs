//! Pipeline error taxonomy
//!
//! Each variant maps to one recovery policy:
//!
//! - [`PipelineError::DataUnavailable`] is fatal for the affected market
//!   after the bounded collect retry; the rest of the batch continues.
//! - [`PipelineError::SchemaValidation`] and
//!   [`PipelineError::ExternalService`] trigger one retry of the failed
//!   stage, then the stage's fixed fallback output (the run degrades,
//!   never aborts).
//! - [`PipelineError::Config`] aborts the whole batch before any market
//!   runs.
//! - Cache corruption never reaches this type; the cache layer absorbs
//!   it as a miss.

use pulse_llm::LLMError;
use pulse_sources::SourceError;
use thiserror::Error;

/// Pipeline-layer errors
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Market data provider had nothing for the symbol
    #[error("Data not available for {symbol}: {reason}")]
    DataUnavailable { symbol: String, reason: String },

    /// Generative output did not match the expected shape
    #[error("Schema validation failed in {stage}: {reason}")]
    SchemaValidation { stage: String, reason: String },

    /// An external collaborator (LLM, search, quotes) failed
    #[error("External service error in {stage}: {reason}")]
    ExternalService { stage: String, reason: String },

    /// Invalid or incomplete configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Artifact persistence failure
    #[error("Persistence error: {0}")]
    Persistence(#[from] std::io::Error),

    /// JSON serialization failure while persisting
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PipelineError {
    /// Classify a source-layer error under a stage name.
    pub fn from_source(stage: &str, err: SourceError) -> Self {
        match err {
            SourceError::DataUnavailable { symbol, reason } => {
                Self::DataUnavailable { symbol, reason }
            }
            other => Self::ExternalService {
                stage: stage.to_string(),
                reason: other.to_string(),
            },
        }
    }

    /// Classify an LLM-layer error under a stage name.
    pub fn from_llm(stage: &str, err: LLMError) -> Self {
        match err {
            LLMError::SchemaValidation(reason) => Self::SchemaValidation {
                stage: stage.to_string(),
                reason,
            },
            LLMError::ConfigurationError(reason) => Self::Config(reason),
            other => Self::ExternalService {
                stage: stage.to_string(),
                reason: other.to_string(),
            },
        }
    }

    /// Short stable name for summaries and stage events.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DataUnavailable { .. } => "data_unavailable",
            Self::SchemaValidation { .. } => "schema_validation",
            Self::ExternalService { .. } => "external_service",
            Self::Config(_) => "config",
            Self::Persistence(_) => "persistence",
            Self::Serialization(_) => "serialization",
        }
    }
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;
