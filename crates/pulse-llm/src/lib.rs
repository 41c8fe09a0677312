//! Language-model provider abstraction for market-pulse
//!
//! The pipeline issues schema-constrained generative calls: every response
//! is deserialized against a typed target immediately on receipt, and a
//! mismatch is a [`LLMError::SchemaValidation`], never silently-trusted
//! text. Providers implement [`LanguageModel`]; the only shipped
//! implementation targets OpenAI-compatible chat-completions endpoints
//! (including Azure OpenAI deployments via a custom base URL).

pub mod completion;
pub mod error;
pub mod provider;
pub mod providers;

pub use completion::{CompletionRequest, CompletionRequestBuilder};
pub use error::{LLMError, Result};
pub use provider::{complete_structured, parse_structured, LanguageModel};
pub use providers::{OpenAIConfig, OpenAIProvider};
