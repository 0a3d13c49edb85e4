//! LLM integration module.
//!
//! Provides the vendor-neutral [`TextGenerator`] trait, its OpenAI-compatible
//! and Gemini implementations, the retrying clients built on top of them and
//! the prompts used for summaries.

mod client;
mod gemini;
mod openai;
mod prompts;
mod retry;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{FinishReason, Generation, Message, Role, TextGenerator};
pub use gemini::GeminiBackend;
pub use openai::OpenAiBackend;
pub use prompts::Prompts;
pub use retry::{
    BlockingGenerationClient, GenerationClient, MAX_ATTEMPTS, RETRY_DELAY, RetryPolicy,
    RetryState, backend_from_config,
};
