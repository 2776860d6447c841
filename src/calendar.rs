//! Calendar webhook client.
//!
//! Search, create, reminder, and delete operations map 1:1 onto remote
//! webhook calls: search is a GET with query parameters, mutations are JSON
//! POSTs. Non-success responses surface the remote status code and body
//! verbatim so the completion service can relay them.

use crate::error::{Result, SvarError};
use chrono::{DateTime, Duration, SecondsFormat};
use serde_json::json;
use std::time::Duration as StdDuration;
use tracing::info;

/// Client for the remote calendar webhook pair.
pub struct CalendarClient {
    http: reqwest::Client,
    search_url: String,
    mutate_url: String,
}

/// Fields for a new calendar event.
#[derive(Debug, Clone, Default)]
pub struct EventDraft {
    pub title: String,
    pub start_datetime: String,
    pub end_datetime: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub attendees: Vec<String>,
    pub reminder_minutes: Option<i64>,
}

impl CalendarClient {
    /// Create a client for the given webhook endpoints.
    pub fn new(search_url: &str, mutate_url: &str, timeout: StdDuration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            search_url: search_url.to_string(),
            mutate_url: mutate_url.to_string(),
        })
    }

    /// Search for events, optionally filtered by text and a date window.
    pub async fn search_events(
        &self,
        query: Option<&str>,
        start_date: Option<&str>,
        end_date: Option<&str>,
        max_results: u32,
    ) -> Result<String> {
        self.ensure_configured()?;

        let mut params: Vec<(&str, String)> = vec![
            ("action", "search_events".to_string()),
            ("max_results", max_results.to_string()),
        ];
        if let Some(q) = query {
            params.push(("query", q.to_string()));
        }
        if let Some(s) = start_date {
            params.push(("start_date", s.to_string()));
        }
        if let Some(e) = end_date {
            params.push(("end_date", e.to_string()));
        }

        let response = self
            .http
            .get(&self.search_url)
            .query(&params)
            .send()
            .await
            .map_err(|e| SvarError::Calendar(format!("search request failed: {}", e)))?;

        Self::read_body("search_events", response).await
    }

    /// Create an event. The end time defaults to one hour after the start
    /// when not provided.
    pub async fn create_event(&self, draft: EventDraft) -> Result<String> {
        self.ensure_configured()?;

        let end_datetime = match draft.end_datetime {
            Some(end) => end,
            None => default_end_time(&draft.start_datetime)?,
        };

        info!("Creating calendar event '{}'", draft.title);

        let mut body = json!({
            "action": "create_event",
            "title": draft.title,
            "start_datetime": draft.start_datetime,
            "end_datetime": end_datetime,
        });
        if let Some(d) = draft.description {
            body["description"] = json!(d);
        }
        if let Some(l) = draft.location {
            body["location"] = json!(l);
        }
        if !draft.attendees.is_empty() {
            body["attendees"] = json!(draft.attendees);
        }
        if let Some(m) = draft.reminder_minutes {
            body["reminder_minutes"] = json!(m);
        }

        self.post("create_event", body).await
    }

    /// Create a reminder due at the given time.
    pub async fn create_reminder(
        &self,
        title: &str,
        due_date: &str,
        description: Option<&str>,
    ) -> Result<String> {
        self.ensure_configured()?;

        let mut body = json!({
            "action": "create_reminder",
            "title": title,
            "due_date": due_date,
        });
        if let Some(d) = description {
            body["description"] = json!(d);
        }

        self.post("create_reminder", body).await
    }

    /// Delete an event by id.
    pub async fn delete_event(&self, event_id: &str) -> Result<String> {
        self.ensure_configured()?;

        let body = json!({
            "action": "delete_event",
            "event_id": event_id,
        });

        self.post("delete_event", body).await
    }

    async fn post(&self, action: &str, body: serde_json::Value) -> Result<String> {
        let response = self
            .http
            .post(&self.mutate_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| SvarError::Calendar(format!("{} request failed: {}", action, e)))?;

        Self::read_body(action, response).await
    }

    async fn read_body(action: &str, response: reqwest::Response) -> Result<String> {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if status.is_success() {
            Ok(body)
        } else {
            Err(SvarError::Calendar(format!(
                "{} failed with status {}: {}",
                action, status, body
            )))
        }
    }

    fn ensure_configured(&self) -> Result<()> {
        if self.search_url.is_empty() || self.mutate_url.is_empty() {
            return Err(SvarError::Config(
                "calendar webhook URLs are not configured (see [calendar] in config.toml)"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

/// Compute the default end time: one hour after the start.
fn default_end_time(start_datetime: &str) -> Result<String> {
    let start = DateTime::parse_from_rfc3339(start_datetime).map_err(|e| {
        SvarError::InvalidInput(format!(
            "start_datetime '{}' is not an ISO datetime: {}",
            start_datetime, e
        ))
    })?;

    let end = start + Duration::hours(1);
    Ok(end.to_rfc3339_opts(SecondsFormat::Secs, true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_end_time_is_start_plus_one_hour() {
        let end = default_end_time("2024-03-15T10:00:00Z").unwrap();
        assert_eq!(end, "2024-03-15T11:00:00Z");
    }

    #[test]
    fn test_default_end_time_preserves_offset() {
        let end = default_end_time("2024-03-15T23:30:00+02:00").unwrap();
        assert_eq!(end, "2024-03-16T00:30:00+02:00");
    }

    #[test]
    fn test_default_end_time_rejects_garbage() {
        let err = default_end_time("next tuesday").unwrap_err();
        assert!(matches!(err, SvarError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_unconfigured_client_fails_closed() {
        let client = CalendarClient::new("", "", StdDuration::from_secs(5)).unwrap();
        let err = client.delete_event("evt1").await.unwrap_err();
        assert!(matches!(err, SvarError::Config(_)));
    }
}
