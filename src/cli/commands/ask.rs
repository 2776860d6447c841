//! Ask command implementation: one message, one answer.

use crate::agent::Agent;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::error::Result;
use crate::session::SessionStore;
use uuid::Uuid;

/// Run the ask command.
pub async fn run_ask(message: &str, model: Option<String>, mut settings: Settings) -> Result<()> {
    // Pre-flight checks
    if let Err(e) = preflight::check(Operation::Chat) {
        Output::error(&format!("{}", e));
        Output::info("Run 'svar doctor' for detailed diagnostics.");
        return Err(e);
    }

    if let Some(model) = model {
        settings.agent.model = model;
    }

    let agent = Agent::from_settings(&settings)?;
    let sessions = SessionStore::new();
    let session_id = Uuid::new_v4().to_string();

    let spinner = Output::spinner("Thinking...");
    let result = agent.handle_turn(&sessions, &session_id, message).await;
    spinner.finish_and_clear();

    for record in &result.tool_calls {
        Output::tool_call(&record.name, !record.result.starts_with("Tool error"));
    }

    println!("\n{}\n", result.answer);

    Ok(())
}
