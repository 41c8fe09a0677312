//! LLM provider trait and structured-output helper

use crate::{CompletionRequest, LLMError, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;

/// Trait for language-model providers.
///
/// Implementations provide access to different LLM services; the pipeline
/// only ever sees this trait.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Generate a completion and return the raw text of the response.
    async fn complete(&self, request: CompletionRequest) -> Result<String>;

    /// Provider name (e.g. "openai")
    fn name(&self) -> &str;
}

/// Run a completion and deserialize the response into `T`.
///
/// Generated text is never trusted as structured data: it is validated by
/// deserialization immediately on receipt, and any mismatch surfaces as
/// [`LLMError::SchemaValidation`].
pub async fn complete_structured<T: DeserializeOwned>(
    model: &dyn LanguageModel,
    request: CompletionRequest,
) -> Result<T> {
    let text = model.complete(request).await?;
    parse_structured(&text)
}

/// Deserialize model output into `T`, tolerating markdown code fences.
pub fn parse_structured<T: DeserializeOwned>(text: &str) -> Result<T> {
    let body = strip_code_fences(text);
    serde_json::from_str(body).map_err(|e| LLMError::SchemaValidation(e.to_string()))
}

/// Models in JSON mode occasionally still wrap the object in ``` fences.
fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Skip an optional language tag on the fence line
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.trim_start_matches(['\r', '\n'])
        .strip_suffix("```")
        .map_or(trimmed, str::trim)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Payload {
        value: i32,
    }

    #[test]
    fn test_parse_plain_json() {
        let parsed: Payload = parse_structured(r#"{"value": 7}"#).unwrap();
        assert_eq!(parsed, Payload { value: 7 });
    }

    #[test]
    fn test_parse_fenced_json() {
        let parsed: Payload = parse_structured("```json\n{\"value\": 3}\n```").unwrap();
        assert_eq!(parsed, Payload { value: 3 });

        let parsed: Payload = parse_structured("```\n{\"value\": 4}\n```").unwrap();
        assert_eq!(parsed, Payload { value: 4 });
    }

    #[test]
    fn test_invalid_json_is_schema_error() {
        let result: Result<Payload> = parse_structured("not json at all");
        assert!(matches!(result, Err(LLMError::SchemaValidation(_))));
    }

    #[test]
    fn test_shape_mismatch_is_schema_error() {
        let result: Result<Payload> = parse_structured(r#"{"other": true}"#);
        assert!(matches!(result, Err(LLMError::SchemaValidation(_))));
    }
}
