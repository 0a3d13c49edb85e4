//! OpenAI-compatible chat completions backend.
//!
//! Serves both OpenAI and ZhipuAI, which exposes the same request and
//! response shape under its own base URL.

use super::client::{FinishReason, Generation, Message, TextGenerator};
use crate::config::{LlmConfig, Provider};
use crate::error::{OutlineError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Native finish reason for output truncated by `max_tokens`.
const LENGTH_SIGNAL: &str = "length";

/// Request body for chat completion.
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: String,
    messages: Vec<&'a Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    temperature: f32,
}

/// Response from chat completion.
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI API error response.
#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Chat completions client for OpenAI-compatible APIs.
#[derive(Clone)]
pub struct OpenAiBackend {
    client: Client,
    provider: Provider,
    api_base: String,
    api_key: String,
    max_tokens: u32,
}

impl OpenAiBackend {
    /// Create a backend from LLM configuration.
    pub fn new(config: &LlmConfig) -> Self {
        Self {
            client: Client::new(),
            provider: config.provider,
            api_base: config.effective_api_base().to_string(),
            api_key: config.api_key.clone(),
            max_tokens: config.max_tokens,
        }
    }

    /// Get the API endpoint URL.
    fn endpoint(&self) -> String {
        let base = self.api_base.trim_end_matches('/');
        format!("{}/chat/completions", base)
    }

    fn parse_response(body: &str) -> Result<Generation> {
        let completion: ChatCompletionResponse = serde_json::from_str(body)?;

        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| OutlineError::LlmApi("No choices in response".to_string()))?;

        Ok(Generation::new(
            choice.message.content.unwrap_or_default(),
            FinishReason::from_native(choice.finish_reason.as_deref(), LENGTH_SIGNAL),
        ))
    }
}

#[async_trait]
impl TextGenerator for OpenAiBackend {
    async fn generate(&self, model: &str, prompt: &str, history: &[Message]) -> Result<Generation> {
        let user = Message::user(prompt);
        let request = ChatCompletionRequest {
            model: self.provider.resolve_model(model),
            messages: history.iter().chain(std::iter::once(&user)).collect(),
            max_tokens: Some(self.max_tokens),
            temperature: 0.0,
        };

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            if let Ok(api_error) = serde_json::from_str::<ApiError>(&body) {
                return Err(OutlineError::LlmApi(format!(
                    "API error ({}): {}",
                    status, api_error.error.message
                )));
            }
            return Err(OutlineError::LlmApi(format!(
                "Request failed ({}): {}",
                status, body
            )));
        }

        Self::parse_response(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_construction() {
        let config = LlmConfig {
            api_base: "https://api.example.com/v1/".to_string(),
            ..Default::default()
        };
        let backend = OpenAiBackend::new(&config);
        assert_eq!(backend.endpoint(), "https://api.example.com/v1/chat/completions");

        let zhipu = OpenAiBackend::new(&LlmConfig {
            provider: Provider::Zhipu,
            ..Default::default()
        });
        assert_eq!(
            zhipu.endpoint(),
            "https://open.bigmodel.cn/api/paas/v4/chat/completions"
        );
    }

    #[test]
    fn test_parse_response_finish_reasons() {
        let body = r#"{"choices": [{"message": {"content": "partial"}, "finish_reason": "length"}]}"#;
        let generation = OpenAiBackend::parse_response(body).unwrap();
        assert_eq!(generation.text, "partial");
        assert_eq!(generation.finish_reason, FinishReason::MaxOutputReached);

        let body = r#"{"choices": [{"message": {"content": "done"}, "finish_reason": "stop"}]}"#;
        let generation = OpenAiBackend::parse_response(body).unwrap();
        assert_eq!(generation.finish_reason, FinishReason::Finished);
    }

    #[test]
    fn test_parse_response_without_choices() {
        let result = OpenAiBackend::parse_response(r#"{"choices": []}"#);
        assert!(matches!(result, Err(OutlineError::LlmApi(_))));
    }

    #[test]
    fn test_request_places_history_first() {
        let history = vec![Message::user("earlier"), Message::assistant("reply")];
        let user = Message::user("now");
        let request = ChatCompletionRequest {
            model: "gpt-4o".to_string(),
            messages: history.iter().chain(std::iter::once(&user)).collect(),
            max_tokens: None,
            temperature: 0.0,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["messages"][0]["content"], "earlier");
        assert_eq!(json["messages"][2]["role"], "user");
        assert_eq!(json["temperature"], 0.0);
        assert!(json.get("max_tokens").is_none());
    }
}
