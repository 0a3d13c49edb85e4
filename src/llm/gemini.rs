//! Google Gemini REST backend (`models/{model}:generateContent`).
//!
//! The REST API has no chat turns in the shape the rest of the crate uses,
//! so prior messages are flattened into the prompt as `role: content` lines.

use super::client::{FinishReason, Generation, Message, TextGenerator};
use crate::config::{LlmConfig, Provider};
use crate::error::{OutlineError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const LENGTH_SIGNAL: &str = "MAX_TOKENS";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_k: u32,
    top_p: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

/// Gemini `generateContent` client.
#[derive(Clone)]
pub struct GeminiBackend {
    client: Client,
    api_base: String,
    api_key: String,
}

impl GeminiBackend {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| OutlineError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_base: config.effective_api_base().to_string(),
            api_key: config.api_key.clone(),
        })
    }

    fn endpoint(&self, model: &str) -> String {
        format!(
            "{}/{}:generateContent",
            self.api_base.trim_end_matches('/'),
            Provider::Gemini.resolve_model(model)
        )
    }

    /// Prompt with prior turns flattened in front of it.
    fn build_prompt(prompt: &str, history: &[Message]) -> String {
        if history.is_empty() {
            return prompt.to_string();
        }

        history
            .iter()
            .map(|m| format!("{}: {}", m.role.as_str(), m.content))
            .chain(std::iter::once(format!("user: {}", prompt)))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn parse_response(body: &str) -> Result<Generation> {
        let response: GenerateResponse = serde_json::from_str(body)?;

        let candidate = response.candidates.into_iter().next();
        let text = candidate
            .as_ref()
            .and_then(|c| c.content.as_ref())
            .and_then(|c| c.parts.first())
            .and_then(|p| p.text.clone());

        match (text, candidate) {
            (Some(text), Some(candidate)) => Ok(Generation::new(
                text,
                FinishReason::from_native(candidate.finish_reason.as_deref(), LENGTH_SIGNAL),
            )),
            _ => Err(OutlineError::LlmApi(format!(
                "Unexpected response format: {}",
                body.chars().take(200).collect::<String>()
            ))),
        }
    }
}

#[async_trait]
impl TextGenerator for GeminiBackend {
    async fn generate(&self, model: &str, prompt: &str, history: &[Message]) -> Result<Generation> {
        let full_prompt = Self::build_prompt(prompt, history);
        let request = GenerateRequest {
            contents: [Content {
                parts: [Part { text: &full_prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.0,
                top_k: 1,
                top_p: 1.0,
            },
        };

        let response = self
            .client
            .post(self.endpoint(model))
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(OutlineError::LlmApi(format!(
                "Gemini API error: {} - {}",
                status, body
            )));
        }

        Self::parse_response(&body)
    }
}
