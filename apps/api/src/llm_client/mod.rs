/// LLM Client: the single point of entry for all chat-completion calls in Postforge.
///
/// ARCHITECTURAL RULE: No other module may call the completion API directly.
/// All LLM interactions MUST go through this module.
///
/// Model: gpt-4o-mini (hardcoded, not configurable)
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::errors::AppError;

pub mod prompts;

/// The model used for all completion calls in Postforge.
/// This is intentionally hardcoded to prevent accidental drift.
pub const MODEL: &str = "gpt-4o-mini";
const REQUEST_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(String),

    #[error("LLM returned empty content")]
    EmptyContent,
}

impl From<LlmError> for AppError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Parse(reason) => AppError::Parse(reason),
            other => AppError::Llm(other.to_string()),
        }
    }
}

/// Sampling parameters for a single completion call.
#[derive(Debug, Clone, Copy)]
pub struct CompletionParams {
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    pub choices: Vec<Choice>,
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
pub struct AssistantMessage {
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl ChatResponse {
    /// Extracts the text of the first choice, if it carries any non-blank content.
    pub fn text(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .filter(|t| !t.trim().is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// Result of a strict structured parse of model output.
///
/// Callers decide what a malformed response means: some stages surface it as
/// an error, the visual-prompt stage substitutes a fallback value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome<T> {
    Parsed(T),
    Malformed { raw: String, reason: String },
}

impl<T> ParseOutcome<T> {
    pub fn into_result(self) -> Result<T, LlmError> {
        match self {
            ParseOutcome::Parsed(value) => Ok(value),
            ParseOutcome::Malformed { reason, .. } => Err(LlmError::Parse(reason)),
        }
    }
}

/// Parses model output as `T`, tolerating markdown code fences around the JSON.
pub fn parse_structured<T: DeserializeOwned>(text: &str) -> ParseOutcome<T> {
    match serde_json::from_str::<T>(strip_json_fences(text)) {
        Ok(value) => ParseOutcome::Parsed(value),
        Err(e) => ParseOutcome::Malformed {
            raw: text.to_string(),
            reason: e.to_string(),
        },
    }
}

/// The single chat-completion client used by all services in Postforge.
/// One request per call; failures are returned to the caller, never retried.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl LlmClient {
    pub fn new(api_key: String, base_url: String) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .build()?,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Makes a raw call to the completion endpoint, returning the full response object.
    pub async fn call(
        &self,
        system: &str,
        prompt: &str,
        params: CompletionParams,
    ) -> Result<ChatResponse, LlmError> {
        let request_body = ChatRequest {
            model: MODEL,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: params.temperature,
            max_tokens: params.max_tokens,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Completion API returned {}: {}", status, body);
            let message = serde_json::from_str::<ApiErrorEnvelope>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let chat_response: ChatResponse = response.json().await?;

        if let Some(usage) = &chat_response.usage {
            debug!(
                "LLM call succeeded: prompt_tokens={}, completion_tokens={}",
                usage.prompt_tokens, usage.completion_tokens
            );
        }

        Ok(chat_response)
    }

    /// Calls the LLM and returns the completion text verbatim.
    pub async fn complete(
        &self,
        system: &str,
        prompt: &str,
        params: CompletionParams,
    ) -> Result<String, LlmError> {
        let response = self.call(system, prompt, params).await?;
        response
            .text()
            .map(str::to_string)
            .ok_or(LlmError::EmptyContent)
    }

    /// Convenience method that calls the LLM and deserializes the text response as JSON.
    /// The prompt must instruct the model to return valid JSON.
    pub async fn call_json<T: DeserializeOwned>(
        &self,
        system: &str,
        prompt: &str,
        params: CompletionParams,
    ) -> Result<T, LlmError> {
        let text = self.complete(system, prompt, params).await?;
        let outcome = parse_structured(&text);
        if let ParseOutcome::Malformed { raw, reason } = &outcome {
            warn!("Model returned malformed JSON ({reason}): {raw}");
        }
        outcome.into_result()
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    let inner = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"));
    match inner {
        Some(stripped) => {
            let stripped = stripped.trim_start();
            stripped
                .strip_suffix("```")
                .map(str::trim)
                .unwrap_or(stripped)
        }
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Sample {
        key: String,
    }

    #[test]
    fn test_strip_json_fences_with_json_tag() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_without_tag() {
        let input = "```\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_no_fences() {
        let input = "{\"key\": \"value\"}";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_parse_structured_accepts_fenced_json() {
        let outcome: ParseOutcome<Sample> = parse_structured("```json\n{\"key\": \"v\"}\n```");
        assert_eq!(
            outcome,
            ParseOutcome::Parsed(Sample {
                key: "v".to_string()
            })
        );
    }

    #[test]
    fn test_parse_structured_reports_malformed_with_raw_text() {
        let outcome: ParseOutcome<Sample> = parse_structured("Sure! Here are your prompts:");
        match outcome {
            ParseOutcome::Malformed { raw, reason } => {
                assert_eq!(raw, "Sure! Here are your prompts:");
                assert!(!reason.is_empty());
            }
            ParseOutcome::Parsed(_) => panic!("prose must not parse as JSON"),
        }
    }

    #[test]
    fn test_into_result_maps_malformed_to_parse_error() {
        let outcome: ParseOutcome<Sample> = parse_structured("{\"other\": 1}");
        assert!(matches!(outcome.into_result(), Err(LlmError::Parse(_))));
    }

    #[test]
    fn test_chat_response_text_skips_blank_content() {
        let response: ChatResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"   "}}]}"#,
        )
        .unwrap();
        assert!(response.text().is_none());
    }

    #[test]
    fn test_chat_request_shape() {
        let request = ChatRequest {
            model: MODEL,
            messages: vec![ChatMessage {
                role: "user",
                content: "hi",
            }],
            temperature: 0.7,
            max_tokens: 800,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["model"], "gpt-4o-mini");
        assert_eq!(value["messages"][0]["role"], "user");
        assert_eq!(value["max_tokens"], 800);
    }

    #[test]
    fn test_llm_parse_error_becomes_app_parse_error() {
        let app: AppError = LlmError::Parse("eof".to_string()).into();
        assert!(matches!(app, AppError::Parse(_)));
        let app: AppError = LlmError::EmptyContent.into();
        assert!(matches!(app, AppError::Llm(_)));
    }
}
