//! Backend-neutral generation types.
//!
//! Every vendor backend implements [`TextGenerator`]; the rest of the crate
//! only talks to that trait (usually through
//! [`GenerationClient`](super::GenerationClient), which adds retries).

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Message role in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// A message in the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Why the model stopped generating, normalized across vendors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Finished,
    MaxOutputReached,
    /// No usable output: every attempt failed.
    Error,
}

impl FinishReason {
    /// Map a vendor finish signal; only `length_signal` means truncation.
    pub fn from_native(signal: Option<&str>, length_signal: &str) -> Self {
        match signal {
            Some(s) if s == length_signal => FinishReason::MaxOutputReached,
            _ => FinishReason::Finished,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FinishReason::Finished => "finished",
            FinishReason::MaxOutputReached => "max_output_reached",
            FinishReason::Error => "error",
        }
    }
}

/// Text produced by one generation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Generation {
    pub text: String,
    pub finish_reason: FinishReason,
}

impl Generation {
    /// Text callers see after every attempt failed.
    pub const ERROR_TEXT: &'static str = "Error";

    pub fn new(text: impl Into<String>, finish_reason: FinishReason) -> Self {
        Self {
            text: text.into(),
            finish_reason,
        }
    }

    /// The terminal `("Error", error)` sentinel.
    pub fn error() -> Self {
        Self::new(Self::ERROR_TEXT, FinishReason::Error)
    }

    pub fn is_error(&self) -> bool {
        self.finish_reason == FinishReason::Error
    }
}

/// A single, non-retrying call to a text-generation backend.
///
/// Implementations sample with temperature 0 and place `history` before
/// `prompt` in whatever form the vendor supports.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, model: &str, prompt: &str, history: &[Message]) -> Result<Generation>;
}
