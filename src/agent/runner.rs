//! Agent runner with the tool-calling loop.
//!
//! One user turn becomes a bounded sequence of completion passes and tool
//! invocations, ending in exactly one assistant answer. Tool failures are
//! fed back to the completion service as observations rather than ending
//! the turn; only the iteration cap and the wall-clock budget are terminal.

use super::tools::{parse_tool_call, tool_specs, ToolContext};
use crate::config::Settings;
use crate::error::{Result, SvarError};
use crate::llm::{ChatBackend, ChatMessage, ChatOutcome, OpenAIBackend};
use crate::session::{Role, SessionStore, Turn};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default system prompt for the assistant.
const DEFAULT_SYSTEM_PROMPT: &str = r#"You are a helpful assistant that can look up announcements, download and analyze their document attachments, manage calendar events, and answer date questions. You have access to tools for these tasks.

Guidelines:
- If a tool returns an error, inform the user clearly about the error.
- When a user asks about an attachment after mentioning a specific announcement, use 'find_announcement_by_title' first to confirm the announcement, then 'get_announcement_attachment' with the search_term set to that title.
- To analyze a document, download the attachment first and pass its local path to 'analyze_document'.
- Use the date tools to resolve phrases like "last week" or "next month" before searching the calendar.
- Always maintain context between conversation turns."#;

/// Cap on completion passes per turn.
const DEFAULT_MAX_ITERATIONS: usize = 8;
/// Wall-clock budget per turn.
const DEFAULT_TURN_TIMEOUT_SECS: u64 = 120;

/// The conversational agent: completion backend plus tool context.
pub struct Agent {
    backend: Arc<dyn ChatBackend>,
    tools: ToolContext,
    max_iterations: usize,
    turn_timeout: Duration,
    system_prompt: String,
}

impl Agent {
    /// Create an agent from explicit parts.
    pub fn new(backend: Arc<dyn ChatBackend>, tools: ToolContext) -> Self {
        Self {
            backend,
            tools,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            turn_timeout: Duration::from_secs(DEFAULT_TURN_TIMEOUT_SECS),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }

    /// Assemble the production agent from settings.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let backend = Arc::new(OpenAIBackend::new(&settings.agent.model));
        let tools = ToolContext::from_settings(settings)?;

        let mut agent = Self::new(backend, tools);
        agent.max_iterations = settings.agent.max_iterations;
        agent.turn_timeout = Duration::from_secs(settings.agent.turn_timeout_seconds);
        if let Some(ref prompt) = settings.agent.system_prompt {
            agent.system_prompt = prompt.clone();
        }
        Ok(agent)
    }

    /// Set a custom system prompt.
    pub fn with_system_prompt(mut self, prompt: &str) -> Self {
        self.system_prompt = prompt.to_string();
        self
    }

    /// Set the maximum completion passes per turn.
    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    /// Set the wall-clock budget per turn.
    pub fn with_turn_timeout(mut self, timeout: Duration) -> Self {
        self.turn_timeout = timeout;
        self
    }

    /// Handle one user turn against a session.
    ///
    /// Appends the user turn, drives the tool loop, appends the assistant
    /// answer, and returns it. Never fails: every error renders as a
    /// user-visible answer.
    pub async fn handle_turn(
        &self,
        sessions: &SessionStore,
        session_id: &str,
        user_text: &str,
    ) -> TurnResult {
        sessions.append_turn(session_id, Role::User, user_text);
        let history = sessions.history(session_id);

        let result = match tokio::time::timeout(self.turn_timeout, self.run(&history)).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                warn!("Turn failed: {}", e);
                TurnResult::error_answer(format!(
                    "I ran into a problem handling that request: {}",
                    e
                ))
            }
            Err(_) => {
                warn!("Turn exceeded wall-clock budget of {:?}", self.turn_timeout);
                TurnResult::error_answer(
                    "Sorry, that request took too long to complete and was abandoned.".to_string(),
                )
            }
        };

        sessions.append_turn(session_id, Role::Assistant, &result.answer);
        result
    }

    /// Drive the completion/tool loop over an already-assembled history.
    ///
    /// The history must end with the user turn being answered.
    async fn run(&self, history: &[Turn]) -> Result<TurnResult> {
        let mut messages: Vec<ChatMessage> = vec![ChatMessage::System(self.system_prompt.clone())];
        messages.extend(history.iter().map(|turn| match turn.role {
            Role::User => ChatMessage::User(turn.text.clone()),
            Role::Assistant => ChatMessage::Assistant(turn.text.clone()),
        }));

        let specs = tool_specs();
        let mut iterations = 0;
        let mut tool_calls_made = Vec::new();

        loop {
            iterations += 1;
            if iterations > self.max_iterations {
                return Err(SvarError::Agent(format!(
                    "the request could not be completed within {} tool iterations",
                    self.max_iterations
                )));
            }

            debug!("Agent iteration {}, {} messages", iterations, messages.len());

            match self.backend.complete(&messages, &specs).await? {
                ChatOutcome::Text(answer) => {
                    return Ok(TurnResult {
                        answer,
                        tool_calls: tool_calls_made,
                        iterations,
                    });
                }
                ChatOutcome::ToolCalls(invocations) => {
                    messages.push(ChatMessage::ToolRequest(invocations.clone()));

                    for invocation in invocations {
                        let record = self.execute_invocation(&invocation).await;

                        messages.push(ChatMessage::ToolResult {
                            call_id: invocation.call_id,
                            content: record.result.clone(),
                        });
                        tool_calls_made.push(record);
                    }
                }
            }
        }
    }

    /// Execute one invocation and record it. Parse failures, unknown tool
    /// names, and adapter errors all become observation text.
    async fn execute_invocation(
        &self,
        invocation: &crate::llm::ToolInvocation,
    ) -> ToolCallRecord {
        info!(
            "Calling tool: {} with args: {}",
            invocation.name, invocation.arguments
        );

        let result = match parse_tool_call(&invocation.name, &invocation.arguments) {
            Ok(tool) => match self.tools.execute(&tool).await {
                Ok(output) => output,
                Err(e) => format!("Tool error: {}", e),
            },
            Err(e) => format!("Failed to parse tool call: {}", e),
        };

        ToolCallRecord {
            name: invocation.name.clone(),
            arguments: invocation.arguments.clone(),
            result,
        }
    }
}

/// Outcome of one handled turn.
#[derive(Debug)]
pub struct TurnResult {
    /// The assistant's final answer.
    pub answer: String,
    /// Record of all tool calls made during the turn.
    pub tool_calls: Vec<ToolCallRecord>,
    /// Number of completion passes used.
    pub iterations: usize,
}

impl TurnResult {
    fn error_answer(answer: String) -> Self {
        Self {
            answer,
            tool_calls: Vec::new(),
            iterations: 0,
        }
    }
}

/// Record of a tool call made by the agent.
#[derive(Debug, Clone)]
pub struct ToolCallRecord {
    /// Name of the tool called.
    pub name: String,
    /// JSON arguments passed to the tool.
    pub arguments: String,
    /// Observation returned by the tool.
    pub result: String,
}

impl std::fmt::Display for ToolCallRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.name, self.arguments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::DocumentAnalyzer;
    use crate::calendar::CalendarClient;
    use crate::download::Downloader;
    use crate::llm::mock::MockBackend;
    use crate::llm::{ChatOutcome, ToolInvocation};
    use crate::records::{Announcement, Attachment, MemoryRecordStore};
    use chrono::TimeZone;

    fn seeded_tools() -> ToolContext {
        let tmp = std::env::temp_dir().join("svar-runner-tests");
        let store = MemoryRecordStore::with_records(vec![Announcement {
            id: "rec001".to_string(),
            title: "Q2 Results".to_string(),
            description: "Second quarter summary".to_string(),
            sent_time: Some(chrono::Utc.with_ymd_and_hms(2024, 3, 14, 12, 0, 0).unwrap()),
            attachments: vec![Attachment {
                url: "https://files.example/q2.pdf".to_string(),
                filename: "q2.pdf".to_string(),
            }],
        }]);

        ToolContext::new(
            Arc::new(store),
            CalendarClient::new("", "", Duration::from_secs(5)).unwrap(),
            Downloader::new(&tmp, Duration::from_secs(5)).unwrap(),
            DocumentAnalyzer::new("gpt-4o-mini", &tmp, Duration::from_secs(5), 100, 1000),
        )
    }

    fn invocation(id: &str, name: &str, arguments: &str) -> ToolInvocation {
        ToolInvocation {
            call_id: id.to_string(),
            name: name.to_string(),
            arguments: arguments.to_string(),
        }
    }

    #[test]
    fn test_tool_call_record_display() {
        let record = ToolCallRecord {
            name: "search_announcements".to_string(),
            arguments: r#"{"search_text": "Q2"}"#.to_string(),
            result: "Found 1 matching announcement(s)".to_string(),
        };
        assert_eq!(
            format!("{}", record),
            r#"search_announcements({"search_text": "Q2"})"#
        );
    }

    #[tokio::test]
    async fn test_text_only_turn() {
        let backend = Arc::new(MockBackend::with_script(vec![ChatOutcome::Text(
            "Hello there".to_string(),
        )]));
        let agent = Agent::new(backend.clone(), seeded_tools());
        let sessions = SessionStore::new();

        let result = agent.handle_turn(&sessions, "s1", "hi").await;

        assert_eq!(result.answer, "Hello there");
        assert_eq!(result.iterations, 1);
        assert!(result.tool_calls.is_empty());

        let history = sessions.history("s1");
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, Role::User);
        assert_eq!(history[1].role, Role::Assistant);
        assert_eq!(history[1].text, "Hello there");
    }

    #[tokio::test]
    async fn test_chained_tool_calls_append_observations_in_order() {
        let backend = Arc::new(MockBackend::with_script(vec![
            ChatOutcome::ToolCalls(vec![invocation(
                "call_1",
                "search_announcements",
                r#"{"search_text": "Q2"}"#,
            )]),
            ChatOutcome::ToolCalls(vec![invocation(
                "call_2",
                "find_announcement_by_title",
                r#"{"title": "Q2 Results"}"#,
            )]),
            ChatOutcome::Text("Here is what I found.".to_string()),
        ]));
        let agent = Agent::new(backend.clone(), seeded_tools());
        let sessions = SessionStore::new();

        let result = agent.handle_turn(&sessions, "s1", "tell me about Q2").await;

        assert_eq!(result.answer, "Here is what I found.");
        assert_eq!(result.iterations, 3);
        // Exactly two tool observations before the final answer
        assert_eq!(result.tool_calls.len(), 2);
        assert_eq!(result.tool_calls[0].name, "search_announcements");
        assert_eq!(result.tool_calls[1].name, "find_announcement_by_title");

        // Transcript grows by one request + one observation per tool pass:
        // system+user, then +2, then +2
        assert_eq!(backend.observed_lens(), vec![2, 4, 6]);
    }

    #[tokio::test]
    async fn test_unknown_tool_becomes_observation_and_loop_continues() {
        let backend = Arc::new(MockBackend::with_script(vec![
            ChatOutcome::ToolCalls(vec![invocation("call_1", "send_email", r#"{}"#)]),
            ChatOutcome::Text("I cannot send email.".to_string()),
        ]));
        let agent = Agent::new(backend, seeded_tools());
        let sessions = SessionStore::new();

        let result = agent.handle_turn(&sessions, "s1", "email this").await;

        assert_eq!(result.answer, "I cannot send email.");
        assert_eq!(result.tool_calls.len(), 1);
        assert!(result.tool_calls[0]
            .result
            .contains("Unknown tool: send_email"));
    }

    #[tokio::test]
    async fn test_tool_error_becomes_observation() {
        let backend = Arc::new(MockBackend::with_script(vec![
            ChatOutcome::ToolCalls(vec![invocation(
                "call_1",
                "find_announcement_by_title",
                r#"{"title": "Missing"}"#,
            )]),
            ChatOutcome::Text("No such announcement exists.".to_string()),
        ]));
        let agent = Agent::new(backend, seeded_tools());
        let sessions = SessionStore::new();

        let result = agent.handle_turn(&sessions, "s1", "find Missing").await;

        assert_eq!(result.answer, "No such announcement exists.");
        assert!(result.tool_calls[0].result.starts_with("Tool error:"));
    }

    #[tokio::test]
    async fn test_iteration_cap_aborts_turn_but_not_session() {
        // A backend that requests unknown tools forever
        let script: Vec<ChatOutcome> = (0..20)
            .map(|i| {
                ChatOutcome::ToolCalls(vec![invocation(
                    &format!("call_{}", i),
                    "bogus_tool",
                    r#"{}"#,
                )])
            })
            .collect();
        let backend = Arc::new(MockBackend::with_script(script));
        let agent = Agent::new(backend.clone(), seeded_tools()).with_max_iterations(3);
        let sessions = SessionStore::new();

        let result = agent.handle_turn(&sessions, "s1", "loop forever").await;

        assert!(result.answer.contains("problem handling that request"));
        // The completion service is consulted at most max_iterations times
        assert_eq!(backend.calls(), 3);

        // The session survives and records the aborted turn
        let history = sessions.history("s1");
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].role, Role::Assistant);
    }

    #[tokio::test]
    async fn test_history_is_replayed_across_turns() {
        let backend = Arc::new(MockBackend::with_script(vec![
            ChatOutcome::Text("first answer".to_string()),
            ChatOutcome::Text("second answer".to_string()),
        ]));
        let agent = Agent::new(backend.clone(), seeded_tools());
        let sessions = SessionStore::new();

        agent.handle_turn(&sessions, "s1", "first question").await;
        agent.handle_turn(&sessions, "s1", "second question").await;

        // Second turn sees system + 3 prior turns
        assert_eq!(backend.observed_lens(), vec![2, 4]);
    }
}
