//! Bounded retries around a [`TextGenerator`].
//!
//! A call moves through [`RetryState`]: each failed attempt is logged and,
//! unless it was the last one, followed by a fixed delay. Exhaustion is not
//! an error; callers receive the [`Generation::error`] sentinel instead.

use super::client::{Generation, Message, TextGenerator};
use super::gemini::GeminiBackend;
use super::openai::OpenAiBackend;
use crate::config::{LlmConfig, Provider};
use crate::error::{OutlineError, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;

/// Attempts per call, including the first.
pub const MAX_ATTEMPTS: usize = 10;

/// Pause between a failed attempt and the next one.
pub const RETRY_DELAY: Duration = Duration::from_secs(2);

/// How often and how patiently a call is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            delay: RETRY_DELAY,
        }
    }
}

/// Progress of one retried call.
#[derive(Debug, Clone, PartialEq)]
pub enum RetryState {
    /// About to issue the given attempt (1-based).
    Attempting(usize),
    Succeeded(Generation),
    Exhausted,
}

impl RetryPolicy {
    /// State after `attempt` finished with `outcome`.
    fn advance(&self, attempt: usize, outcome: Result<Generation>, prompt: &str) -> RetryState {
        let error = match outcome {
            Ok(generation) => return RetryState::Succeeded(generation),
            Err(e) => e,
        };

        let max_attempts = self.max_attempts.max(1);
        tracing::warn!(attempt, max_attempts, error = %error, "Generation failed, retrying");

        if attempt < max_attempts {
            RetryState::Attempting(attempt + 1)
        } else {
            let prompt_head: String = prompt.chars().take(100).collect();
            tracing::error!(prompt = %prompt_head, "Max retries reached for prompt");
            RetryState::Exhausted
        }
    }
}

/// Build the backend selected by `config.provider`.
pub fn backend_from_config(config: &LlmConfig) -> Result<Arc<dyn TextGenerator>> {
    Ok(match config.provider {
        Provider::OpenAi | Provider::Zhipu => Arc::new(OpenAiBackend::new(config)),
        Provider::Gemini => Arc::new(GeminiBackend::new(config)?),
    })
}

/// Retrying generation client for async callers.
///
/// Both the transport call and the backoff delay yield to the runtime, so
/// many calls can share one task.
#[derive(Clone)]
pub struct GenerationClient {
    generator: Arc<dyn TextGenerator>,
    policy: RetryPolicy,
}

impl GenerationClient {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            generator,
            policy: RetryPolicy::default(),
        }
    }

    /// Create a client for the configured provider.
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        Ok(Self::new(backend_from_config(config)?))
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Generate text and report why generation stopped.
    pub async fn generate_with_finish_reason(
        &self,
        model: &str,
        prompt: &str,
        history: &[Message],
    ) -> Generation {
        let mut state = RetryState::Attempting(1);
        loop {
            match state {
                RetryState::Attempting(attempt) => {
                    let outcome = self.generator.generate(model, prompt, history).await;
                    state = self.policy.advance(attempt, outcome, prompt);
                    if matches!(state, RetryState::Attempting(_)) {
                        tokio::time::sleep(self.policy.delay).await;
                    }
                }
                RetryState::Succeeded(generation) => return generation,
                RetryState::Exhausted => return Generation::error(),
            }
        }
    }

    /// Generate text only; `"Error"` when every attempt failed.
    pub async fn generate(&self, model: &str, prompt: &str) -> String {
        self.generate_with_finish_reason(model, prompt, &[]).await.text
    }

    /// Single unretried round trip, surfacing the transport error.
    pub async fn test_connection(&self, model: &str) -> Result<()> {
        let generation = self
            .generator
            .generate(model, "Say 'hello' and nothing else.", &[])
            .await?;

        if generation.text.to_lowercase().contains("hello") {
            Ok(())
        } else {
            Err(OutlineError::LlmApi(format!(
                "Unexpected response: {}",
                generation.text
            )))
        }
    }
}

/// Retrying generation client for synchronous callers.
///
/// Drives the backend on its own current-thread runtime and blocks the
/// calling thread during backoff. Must not be used from inside an async
/// runtime; async code should use [`GenerationClient`].
pub struct BlockingGenerationClient {
    generator: Arc<dyn TextGenerator>,
    policy: RetryPolicy,
    runtime: Runtime,
}

impl BlockingGenerationClient {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| OutlineError::Runtime(e.to_string()))?;

        Ok(Self {
            generator,
            policy: RetryPolicy::default(),
            runtime,
        })
    }

    /// Create a client for the configured provider.
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        Self::new(backend_from_config(config)?)
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Blocking counterpart of [`GenerationClient::generate_with_finish_reason`].
    pub fn generate_with_finish_reason(
        &self,
        model: &str,
        prompt: &str,
        history: &[Message],
    ) -> Generation {
        let mut state = RetryState::Attempting(1);
        loop {
            match state {
                RetryState::Attempting(attempt) => {
                    let outcome = self
                        .runtime
                        .block_on(self.generator.generate(model, prompt, history));
                    state = self.policy.advance(attempt, outcome, prompt);
                    if matches!(state, RetryState::Attempting(_)) {
                        std::thread::sleep(self.policy.delay);
                    }
                }
                RetryState::Succeeded(generation) => return generation,
                RetryState::Exhausted => return Generation::error(),
            }
        }
    }

    pub fn generate(&self, model: &str, prompt: &str) -> String {
        self.generate_with_finish_reason(model, prompt, &[]).text
    }
}
