//! In-memory [`TextGenerator`] for tests.

use super::client::{Generation, Message, TextGenerator};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

type Script = dyn Fn(&str, usize) -> Result<Generation> + Send + Sync;

/// Answers each call with `script(prompt, call_index)`.
pub struct ScriptedGenerator {
    script: Box<Script>,
    calls: AtomicUsize,
    last_history: Mutex<Vec<Message>>,
}

impl ScriptedGenerator {
    pub fn new(script: impl Fn(&str, usize) -> Result<Generation> + Send + Sync + 'static) -> Self {
        Self {
            script: Box::new(script),
            calls: AtomicUsize::new(0),
            last_history: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_history(&self) -> Vec<Message> {
        self.last_history.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, _model: &str, prompt: &str, history: &[Message]) -> Result<Generation> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_history.lock().unwrap() = history.to_vec();
        // let other scheduled calls interleave, like a real transport
        tokio::task::yield_now().await;
        (self.script)(prompt, call)
    }
}
