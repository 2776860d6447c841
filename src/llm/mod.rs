//! Completion-service abstraction.
//!
//! The orchestration loop talks to the language model through [`ChatBackend`]:
//! given a message transcript and the tool catalog, the service returns
//! exactly one of a final text answer or a batch of tool invocations. The
//! OpenAI backend is the production implementation; the mock backend scripts
//! outcomes for tests.

pub mod mock;
mod openai;

pub use openai::OpenAIBackend;

use crate::error::Result;
use async_trait::async_trait;

/// One message in a completion request transcript.
#[derive(Debug, Clone)]
pub enum ChatMessage {
    System(String),
    User(String),
    Assistant(String),
    /// Assistant turn that requested tool invocations.
    ToolRequest(Vec<ToolInvocation>),
    /// Observation produced by a prior tool invocation.
    ToolResult { call_id: String, content: String },
}

/// A tool invocation requested by the completion service.
#[derive(Debug, Clone)]
pub struct ToolInvocation {
    /// Correlation id assigned by the service.
    pub call_id: String,
    pub name: String,
    /// Raw JSON argument mapping.
    pub arguments: String,
}

/// Outcome of one completion call.
#[derive(Debug, Clone)]
pub enum ChatOutcome {
    /// Final answer text; the turn is done.
    Text(String),
    /// The service wants one or more tools invoked first.
    ToolCalls(Vec<ToolInvocation>),
}

/// A tool advertised to the completion service.
#[derive(Debug, Clone)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    /// JSON schema for the argument mapping.
    pub parameters: serde_json::Value,
}

/// Trait for completion-service backends.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Submit a transcript plus the tool catalog; get text or tool calls.
    async fn complete(&self, messages: &[ChatMessage], tools: &[ToolSpec])
        -> Result<ChatOutcome>;
}
