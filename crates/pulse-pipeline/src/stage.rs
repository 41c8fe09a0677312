//! Shared plumbing for degradable stages

use pulse_llm::{complete_structured, CompletionRequest, LanguageModel};
use serde::de::DeserializeOwned;
use tracing::warn;

/// Output of a stage that degrades instead of failing.
#[derive(Debug, Clone)]
pub struct StageOutput<T> {
    pub value: T,
    /// True when the stage's fixed fallback produced the value
    pub fallback_used: bool,
}

impl<T> StageOutput<T> {
    pub fn ok(value: T) -> Self {
        Self {
            value,
            fallback_used: false,
        }
    }

    pub fn fallback(value: T) -> Self {
        Self {
            value,
            fallback_used: true,
        }
    }
}

/// One structured completion, retried once on any failure.
///
/// The single retry covers both transport errors and malformed output;
/// callers map a second failure onto their stage's fixed fallback.
pub(crate) async fn structured_with_retry<T: DeserializeOwned>(
    stage: &str,
    model: &dyn LanguageModel,
    request: CompletionRequest,
) -> pulse_llm::Result<T> {
    match complete_structured::<T>(model, request.clone()).await {
        Ok(value) => Ok(value),
        Err(first) => {
            warn!(stage, error = %first, "model call failed, retrying once");
            complete_structured::<T>(model, request).await
        }
    }
}
