//! Svar - Conversational Assistant with Tools
//!
//! An AI assistant that answers natural-language requests by selecting and
//! chaining tools: announcement lookup, attachment download, PDF document
//! analysis, calendar management, and date arithmetic.
//!
//! The name "Svar" comes from the Norwegian/Scandinavian word for "answer."
//!
//! # Overview
//!
//! Svar allows you to:
//! - Chat with an assistant that remembers the conversation per session
//! - Look up and search announcements in a remote record base
//! - Download announcement attachments and analyze them as page images
//! - Search, create, and delete calendar events through a webhook
//! - Resolve phrases like "last week" into concrete date ranges
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration management
//! - `session` - Per-session conversation memory
//! - `llm` - Completion-service abstraction (OpenAI + mock backends)
//! - `agent` - Orchestration loop and tool catalog
//! - `records` - Announcement record store abstraction
//! - `download` - Attachment download
//! - `analysis` - PDF document analysis pipeline
//! - `calendar` - Calendar webhook client
//! - `dates` - Date range calculations
//!
//! # Example
//!
//! ```rust,no_run
//! use svar::agent::Agent;
//! use svar::config::Settings;
//! use svar::session::SessionStore;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let agent = Agent::from_settings(&settings)?;
//!     let sessions = SessionStore::new();
//!
//!     let result = agent
//!         .handle_turn(&sessions, "demo", "Summarize the latest announcement attachment")
//!         .await;
//!     println!("{}", result.answer);
//!
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod analysis;
pub mod calendar;
pub mod cli;
pub mod config;
pub mod dates;
pub mod download;
pub mod error;
pub mod llm;
pub mod openai;
pub mod records;
pub mod session;

pub use error::{Result, SvarError};
