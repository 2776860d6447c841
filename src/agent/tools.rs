//! Tool definitions and implementations for the agent system.
//!
//! The catalog is static: every tool is a `ToolCall` variant with a fixed
//! schema, resolved by name and validated before dispatch. Unknown tool
//! names and bad arguments produce recoverable errors, never a panic, so
//! the completion service can self-correct on its next pass.

use crate::analysis::DocumentAnalyzer;
use crate::calendar::{CalendarClient, EventDraft};
use crate::config::Settings;
use crate::dates::{self, Period, Reference};
use crate::download::Downloader;
use crate::error::{Result, SvarError};
use crate::llm::ToolSpec;
use crate::records::{self, Announcement, AirtableStore, RecordStore};
use chrono::Local;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Default page cap for document analysis.
const DEFAULT_MAX_PAGES: u32 = 5;
/// Default result cap for calendar searches.
const DEFAULT_MAX_RESULTS: u32 = 10;

/// Available tools for the agent.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolCall {
    /// Fetch every announcement.
    GetAllAnnouncements,

    /// Search announcements by text in title or description.
    SearchAnnouncements { search_text: String },

    /// Find one announcement by its exact title.
    FindAnnouncementByTitle { title: String },

    /// Resolve an announcement's first attachment and download it.
    GetAnnouncementAttachment {
        announcement_id: Option<String>,
        search_term: Option<String>,
        get_latest: bool,
    },

    /// Analyze a downloaded PDF document.
    AnalyzeDocument {
        pdf_path: String,
        analysis_type: String,
        custom_prompt: Option<String>,
        max_pages: u32,
    },

    /// Search calendar events.
    SearchCalendarEvents {
        query: Option<String>,
        start_date: Option<String>,
        end_date: Option<String>,
        max_results: u32,
    },

    /// Create a calendar event.
    CreateCalendarEvent {
        title: String,
        start_datetime: String,
        end_datetime: Option<String>,
        description: Option<String>,
        location: Option<String>,
        attendees: Vec<String>,
        reminder_minutes: Option<i64>,
    },

    /// Create a reminder.
    CreateReminder {
        title: String,
        due_date: String,
        description: Option<String>,
    },

    /// Delete a calendar event by id.
    DeleteCalendarEvent { event_id: String },

    /// Get today's date.
    GetCurrentDate { include_time: bool },

    /// Resolve a named period to a start/end date range.
    GetDateRange { period: String },

    /// Resolve a reference point plus a day offset to a single date.
    GetRelativeDate { reference: String, offset_days: i64 },
}

/// Tool execution context holding the injected capability adapters.
pub struct ToolContext {
    records: Arc<dyn RecordStore>,
    calendar: CalendarClient,
    downloader: Downloader,
    analyzer: DocumentAnalyzer,
}

impl ToolContext {
    /// Create a context from explicit adapters.
    pub fn new(
        records: Arc<dyn RecordStore>,
        calendar: CalendarClient,
        downloader: Downloader,
        analyzer: DocumentAnalyzer,
    ) -> Self {
        Self {
            records,
            calendar,
            downloader,
            analyzer,
        }
    }

    /// Assemble the production adapters from settings.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let api_key = std::env::var("AIRTABLE_API_KEY").unwrap_or_default();

        let records: Arc<dyn RecordStore> = Arc::new(AirtableStore::new(
            &settings.records.api_url,
            &settings.records.base_id,
            &settings.records.table,
            &api_key,
            Duration::from_secs(settings.records.timeout_seconds),
        )?);

        let calendar = CalendarClient::new(
            &settings.calendar.search_url,
            &settings.calendar.mutate_url,
            Duration::from_secs(settings.calendar.timeout_seconds),
        )?;

        let downloader = Downloader::new(
            &settings.download_dir(),
            Duration::from_secs(settings.download.timeout_seconds),
        )?;

        let analyzer = DocumentAnalyzer::new(
            &settings.analysis.model,
            &settings.temp_dir(),
            Duration::from_secs(settings.analysis.timeout_seconds),
            settings.analysis.dpi,
            settings.analysis.max_tokens,
        );

        Ok(Self::new(records, calendar, downloader, analyzer))
    }

    /// Execute a tool call and return the observation text.
    pub async fn execute(&self, tool: &ToolCall) -> Result<String> {
        match tool {
            ToolCall::GetAllAnnouncements => self.execute_get_all().await,
            ToolCall::SearchAnnouncements { search_text } => {
                self.execute_search(search_text).await
            }
            ToolCall::FindAnnouncementByTitle { title } => {
                self.execute_find_by_title(title).await
            }
            ToolCall::GetAnnouncementAttachment {
                announcement_id,
                search_term,
                get_latest,
            } => {
                self.execute_get_attachment(
                    announcement_id.as_deref(),
                    search_term.as_deref(),
                    *get_latest,
                )
                .await
            }
            ToolCall::AnalyzeDocument {
                pdf_path,
                analysis_type,
                custom_prompt,
                max_pages,
            } => {
                self.analyzer
                    .analyze(pdf_path, analysis_type, custom_prompt.as_deref(), *max_pages)
                    .await
            }
            ToolCall::SearchCalendarEvents {
                query,
                start_date,
                end_date,
                max_results,
            } => {
                self.calendar
                    .search_events(
                        query.as_deref(),
                        start_date.as_deref(),
                        end_date.as_deref(),
                        *max_results,
                    )
                    .await
            }
            ToolCall::CreateCalendarEvent {
                title,
                start_datetime,
                end_datetime,
                description,
                location,
                attendees,
                reminder_minutes,
            } => {
                self.calendar
                    .create_event(EventDraft {
                        title: title.clone(),
                        start_datetime: start_datetime.clone(),
                        end_datetime: end_datetime.clone(),
                        description: description.clone(),
                        location: location.clone(),
                        attendees: attendees.clone(),
                        reminder_minutes: *reminder_minutes,
                    })
                    .await
            }
            ToolCall::CreateReminder {
                title,
                due_date,
                description,
            } => {
                self.calendar
                    .create_reminder(title, due_date, description.as_deref())
                    .await
            }
            ToolCall::DeleteCalendarEvent { event_id } => {
                self.calendar.delete_event(event_id).await
            }
            ToolCall::GetCurrentDate { include_time } => Ok(dates::current_date(
                Local::now().naive_local(),
                *include_time,
            )),
            ToolCall::GetDateRange { period } => self.execute_date_range(period),
            ToolCall::GetRelativeDate {
                reference,
                offset_days,
            } => self.execute_relative_date(reference, *offset_days),
        }
    }

    async fn execute_get_all(&self) -> Result<String> {
        let announcements = self.records.get_all().await?;

        if announcements.is_empty() {
            return Ok("No announcements found.".to_string());
        }

        Ok(format!(
            "Found {} announcement(s):\n\n{}",
            announcements.len(),
            format_announcements(&announcements)
        ))
    }

    async fn execute_search(&self, search_text: &str) -> Result<String> {
        let matches = records::search(self.records.as_ref(), search_text).await?;

        if matches.is_empty() {
            return Ok(format!(
                "No announcements found matching '{}'.",
                search_text
            ));
        }

        Ok(format!(
            "Found {} matching announcement(s):\n\n{}",
            matches.len(),
            format_announcements(&matches)
        ))
    }

    async fn execute_find_by_title(&self, title: &str) -> Result<String> {
        let all = self.records.get_all().await?;
        let found = all
            .into_iter()
            .find(|a| a.title.eq_ignore_ascii_case(title))
            .ok_or_else(|| {
                SvarError::RecordNotFound(format!("no announcement with title '{}'", title))
            })?;

        Ok(format_announcement_detail(&found))
    }

    async fn execute_get_attachment(
        &self,
        announcement_id: Option<&str>,
        search_term: Option<&str>,
        get_latest: bool,
    ) -> Result<String> {
        let resolved = records::resolve_attachment(
            self.records.as_ref(),
            announcement_id,
            search_term,
            get_latest,
        )
        .await?;

        let path = self.downloader.fetch(&resolved.url).await?;

        Ok(format!(
            "Attachment '{}' from announcement '{}' downloaded successfully to {}",
            resolved.filename,
            resolved.announcement_title,
            path.display()
        ))
    }

    fn execute_date_range(&self, period: &str) -> Result<String> {
        // Unknown periods resolve to today rather than failing the call
        let parsed = period.parse::<Period>().unwrap_or_else(|e| {
            warn!("{}; defaulting to today", e);
            Period::Today
        });

        let range = dates::date_range(parsed, Local::now().naive_local());
        Ok(serde_json::to_string_pretty(&range)?)
    }

    fn execute_relative_date(&self, reference: &str, offset_days: i64) -> Result<String> {
        let parsed = reference.parse::<Reference>().unwrap_or_else(|e| {
            warn!("{}; defaulting to today", e);
            Reference::Today
        });

        let date = dates::relative_date(parsed, offset_days, Local::now().naive_local());
        Ok(serde_json::to_string_pretty(&date)?)
    }
}

/// Format a list of announcements for the observation channel.
fn format_announcements(announcements: &[Announcement]) -> String {
    announcements
        .iter()
        .enumerate()
        .map(|(i, a)| {
            format!(
                "{}. {} (id: {}, sent: {}, {} attachment(s))\n   {}",
                i + 1,
                a.title,
                a.id,
                a.sent_time
                    .map(|t| t.format("%Y-%m-%d").to_string())
                    .unwrap_or_else(|| "unknown".to_string()),
                a.attachments.len(),
                a.description.chars().take(200).collect::<String>()
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Format one announcement with its attachment filenames.
fn format_announcement_detail(a: &Announcement) -> String {
    let attachments = if a.attachments.is_empty() {
        "none".to_string()
    } else {
        a.attachments
            .iter()
            .map(|att| att.filename.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    };

    format!(
        "Title: {}\nID: {}\nSent: {}\nDescription: {}\nAttachments: {}",
        a.title,
        a.id,
        a.sent_time
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "unknown".to_string()),
        a.description,
        attachments
    )
}

/// The static tool catalog advertised to the completion service.
pub fn tool_specs() -> Vec<ToolSpec> {
    vec![
        ToolSpec {
            name: "get_all_announcements",
            description: "Fetches all announcements. Use this when the user wants to see \
                          every available announcement.",
            parameters: json!({
                "type": "object",
                "properties": {}
            }),
        },
        ToolSpec {
            name: "search_announcements",
            description: "Searches announcements by text in their title or description. \
                          Returns the matching announcements.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "search_text": {
                        "type": "string",
                        "description": "The text to search for in announcement titles or descriptions"
                    }
                },
                "required": ["search_text"]
            }),
        },
        ToolSpec {
            name: "find_announcement_by_title",
            description: "Finds an announcement by its exact title and returns its details, \
                          including attachment filenames.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "title": {
                        "type": "string",
                        "description": "The exact announcement title"
                    }
                },
                "required": ["title"]
            }),
        },
        ToolSpec {
            name: "get_announcement_attachment",
            description: "Retrieves and downloads an attachment from an announcement. \
                          Specify how to find the announcement: by its id, by a search term, \
                          or request the latest. Returns the local path to the downloaded file.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "announcement_id": {
                        "type": "string",
                        "description": "The id of a specific announcement"
                    },
                    "search_term": {
                        "type": "string",
                        "description": "A search term to find an announcement"
                    },
                    "get_latest": {
                        "type": "boolean",
                        "description": "Set to true to use the most recently sent announcement",
                        "default": false
                    }
                }
            }),
        },
        ToolSpec {
            name: "analyze_document",
            description: "Analyzes the content of a downloaded PDF document. Requires the \
                          local path to the PDF. Analysis types: 'summarize', \
                          'extract_action_items', or 'sentiment'. A custom prompt can \
                          override the analysis type.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "pdf_path": {
                        "type": "string",
                        "description": "Local file path to the PDF document"
                    },
                    "analysis_type": {
                        "type": "string",
                        "description": "Type of analysis to perform",
                        "default": "summarize"
                    },
                    "custom_prompt": {
                        "type": "string",
                        "description": "A custom analysis prompt, overriding analysis_type"
                    },
                    "max_pages": {
                        "type": "integer",
                        "description": "Maximum number of pages to analyze",
                        "default": 5
                    }
                },
                "required": ["pdf_path"]
            }),
        },
        ToolSpec {
            name: "search_calendar_events",
            description: "Searches for calendar events, optionally filtered by text and a \
                          start/end date window (YYYY-MM-DD).",
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Search term to find events"
                    },
                    "start_date": {
                        "type": "string",
                        "description": "Window start in YYYY-MM-DD format"
                    },
                    "end_date": {
                        "type": "string",
                        "description": "Window end in YYYY-MM-DD format"
                    },
                    "max_results": {
                        "type": "integer",
                        "description": "Maximum number of results",
                        "default": 10
                    }
                }
            }),
        },
        ToolSpec {
            name: "create_calendar_event",
            description: "Creates a new calendar event. The end time defaults to one hour \
                          after the start when omitted. Datetimes are ISO format \
                          (YYYY-MM-DDTHH:MM:SSZ).",
            parameters: json!({
                "type": "object",
                "properties": {
                    "title": {
                        "type": "string",
                        "description": "Title of the event"
                    },
                    "start_datetime": {
                        "type": "string",
                        "description": "Start date and time in ISO format"
                    },
                    "end_datetime": {
                        "type": "string",
                        "description": "End date and time in ISO format"
                    },
                    "description": {
                        "type": "string",
                        "description": "Description of the event"
                    },
                    "location": {
                        "type": "string",
                        "description": "Location of the event"
                    },
                    "attendees": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "Email addresses of attendees"
                    },
                    "reminder_minutes": {
                        "type": "integer",
                        "description": "Reminder time in minutes before the event"
                    }
                },
                "required": ["title", "start_datetime"]
            }),
        },
        ToolSpec {
            name: "create_reminder",
            description: "Creates a reminder due at a given date and time (ISO format).",
            parameters: json!({
                "type": "object",
                "properties": {
                    "title": {
                        "type": "string",
                        "description": "Title of the reminder"
                    },
                    "due_date": {
                        "type": "string",
                        "description": "Due date and time in ISO format"
                    },
                    "description": {
                        "type": "string",
                        "description": "Description of the reminder"
                    }
                },
                "required": ["title", "due_date"]
            }),
        },
        ToolSpec {
            name: "delete_calendar_event",
            description: "Deletes a calendar event by its id.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "event_id": {
                        "type": "string",
                        "description": "Id of the event to delete"
                    }
                },
                "required": ["event_id"]
            }),
        },
        ToolSpec {
            name: "get_current_date",
            description: "Gets today's date. Useful before any date-relative request.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "include_time": {
                        "type": "boolean",
                        "description": "Include the current time in the result",
                        "default": false
                    }
                }
            }),
        },
        ToolSpec {
            name: "get_date_range",
            description: "Computes the start and end dates of a named period: today, \
                          yesterday, this_week, last_week, this_month, last_month, \
                          next_month, this_year, or last_year.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "period": {
                        "type": "string",
                        "description": "The named period to resolve"
                    }
                },
                "required": ["period"]
            }),
        },
        ToolSpec {
            name: "get_relative_date",
            description: "Computes a date from a reference point (today, yesterday, \
                          start_of_week, end_of_week, start_of_month, end_of_month) plus a \
                          day offset, which may be negative.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "reference": {
                        "type": "string",
                        "description": "The reference point",
                        "default": "today"
                    },
                    "offset_days": {
                        "type": "integer",
                        "description": "Number of days to offset, may be negative",
                        "default": 0
                    }
                }
            }),
        },
    ]
}

/// Parse a tool call from the completion service's name and raw JSON
/// arguments. Missing required arguments fail; unknown arguments are
/// ignored; optional arguments take their defaults.
pub fn parse_tool_call(name: &str, arguments: &str) -> Result<ToolCall> {
    let args: Value = if arguments.trim().is_empty() {
        json!({})
    } else {
        serde_json::from_str(arguments)
            .map_err(|e| SvarError::Agent(format!("invalid tool arguments: {}", e)))?
    };

    match name {
        "get_all_announcements" => Ok(ToolCall::GetAllAnnouncements),
        "search_announcements" => Ok(ToolCall::SearchAnnouncements {
            search_text: required_str(&args, "search_text")?,
        }),
        "find_announcement_by_title" => Ok(ToolCall::FindAnnouncementByTitle {
            title: required_str(&args, "title")?,
        }),
        "get_announcement_attachment" => Ok(ToolCall::GetAnnouncementAttachment {
            announcement_id: optional_str(&args, "announcement_id"),
            search_term: optional_str(&args, "search_term"),
            get_latest: args["get_latest"].as_bool().unwrap_or(false),
        }),
        "analyze_document" => Ok(ToolCall::AnalyzeDocument {
            pdf_path: required_str(&args, "pdf_path")?,
            analysis_type: optional_str(&args, "analysis_type")
                .unwrap_or_else(|| "summarize".to_string()),
            custom_prompt: optional_str(&args, "custom_prompt"),
            max_pages: args["max_pages"].as_u64().unwrap_or(DEFAULT_MAX_PAGES as u64) as u32,
        }),
        "search_calendar_events" => Ok(ToolCall::SearchCalendarEvents {
            query: optional_str(&args, "query"),
            start_date: optional_str(&args, "start_date"),
            end_date: optional_str(&args, "end_date"),
            max_results: args["max_results"]
                .as_u64()
                .unwrap_or(DEFAULT_MAX_RESULTS as u64) as u32,
        }),
        "create_calendar_event" => Ok(ToolCall::CreateCalendarEvent {
            title: required_str(&args, "title")?,
            start_datetime: required_str(&args, "start_datetime")?,
            end_datetime: optional_str(&args, "end_datetime"),
            description: optional_str(&args, "description"),
            location: optional_str(&args, "location"),
            attendees: args["attendees"]
                .as_array()
                .map(|list| {
                    list.iter()
                        .filter_map(|v| v.as_str().map(str::to_string))
                        .collect()
                })
                .unwrap_or_default(),
            reminder_minutes: args["reminder_minutes"].as_i64(),
        }),
        "create_reminder" => Ok(ToolCall::CreateReminder {
            title: required_str(&args, "title")?,
            due_date: required_str(&args, "due_date")?,
            description: optional_str(&args, "description"),
        }),
        "delete_calendar_event" => Ok(ToolCall::DeleteCalendarEvent {
            event_id: required_str(&args, "event_id")?,
        }),
        "get_current_date" => Ok(ToolCall::GetCurrentDate {
            include_time: args["include_time"].as_bool().unwrap_or(false),
        }),
        "get_date_range" => Ok(ToolCall::GetDateRange {
            period: required_str(&args, "period")?,
        }),
        "get_relative_date" => Ok(ToolCall::GetRelativeDate {
            reference: optional_str(&args, "reference").unwrap_or_else(|| "today".to_string()),
            offset_days: args["offset_days"].as_i64().unwrap_or(0),
        }),
        _ => Err(SvarError::Agent(format!("Unknown tool: {}", name))),
    }
}

fn required_str(args: &Value, key: &str) -> Result<String> {
    args[key]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| SvarError::Agent(format!("Missing '{}' argument", key)))
}

fn optional_str(args: &Value, key: &str) -> Option<String> {
    args[key].as_str().map(str::to_string)
}
