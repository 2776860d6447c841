//! Scripted completion backend for tests.
//!
//! Plays back a fixed sequence of outcomes, one per `complete` call, so the
//! orchestration loop can be exercised without the network. Once the script
//! is exhausted it keeps returning a terminal text answer.

use super::{ChatBackend, ChatMessage, ChatOutcome, ToolSpec};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Mutex;

/// Completion backend that replays a scripted outcome sequence.
pub struct MockBackend {
    script: Mutex<Vec<ChatOutcome>>,
    /// Transcript lengths observed on each call, for assertions.
    observed_lens: Mutex<Vec<usize>>,
}

impl MockBackend {
    /// Create a backend that yields the given outcomes in order.
    pub fn with_script(outcomes: Vec<ChatOutcome>) -> Self {
        let mut script = outcomes;
        script.reverse(); // pop() from the back
        Self {
            script: Mutex::new(script),
            observed_lens: Mutex::new(Vec::new()),
        }
    }

    /// Number of completion calls made so far.
    pub fn calls(&self) -> usize {
        self.observed_lens.lock().unwrap().len()
    }

    /// Transcript length seen on each call.
    pub fn observed_lens(&self) -> Vec<usize> {
        self.observed_lens.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatBackend for MockBackend {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        _tools: &[ToolSpec],
    ) -> Result<ChatOutcome> {
        self.observed_lens.lock().unwrap().push(messages.len());

        Ok(self
            .script
            .lock()
            .unwrap()
            .pop()
            .unwrap_or_else(|| ChatOutcome::Text("(script exhausted)".to_string())))
    }
}
