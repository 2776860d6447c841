//! Airtable-backed record store implementation.
//!
//! Talks to the Airtable REST API with bearer auth, following pagination
//! offsets until the table is exhausted.

use super::{Announcement, Attachment, RecordStore};
use crate::error::{Result, SvarError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Record store backed by an Airtable base.
pub struct AirtableStore {
    http: reqwest::Client,
    table_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct ApiPage {
    #[serde(default)]
    records: Vec<ApiRecord>,
    offset: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiRecord {
    id: String,
    #[serde(default)]
    fields: ApiFields,
}

#[derive(Debug, Default, Deserialize)]
struct ApiFields {
    #[serde(rename = "Title", default)]
    title: String,
    #[serde(rename = "Description", default)]
    description: String,
    #[serde(rename = "SentTime")]
    sent_time: Option<DateTime<Utc>>,
    #[serde(rename = "Attachments", default)]
    attachments: Vec<Attachment>,
}

impl ApiRecord {
    fn into_announcement(self) -> Announcement {
        Announcement {
            id: self.id,
            title: self.fields.title,
            description: self.fields.description,
            sent_time: self.fields.sent_time,
            attachments: self.fields.attachments,
        }
    }
}

impl AirtableStore {
    /// Create a store for one table of one base.
    pub fn new(api_url: &str, base_id: &str, table: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            table_url: format!("{}/{}/{}", api_url.trim_end_matches('/'), base_id, table),
            api_key: api_key.to_string(),
        })
    }
}

#[async_trait]
impl RecordStore for AirtableStore {
    async fn get_all(&self) -> Result<Vec<Announcement>> {
        let mut announcements = Vec::new();
        let mut offset: Option<String> = None;

        loop {
            let mut request = self.http.get(&self.table_url).bearer_auth(&self.api_key);
            if let Some(ref o) = offset {
                request = request.query(&[("offset", o.as_str())]);
            }

            let response = request.send().await.map_err(|e| {
                SvarError::Records(format!("announcement base unreachable: {}", e))
            })?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(SvarError::Records(format!(
                    "list request failed with status {}: {}",
                    status, body
                )));
            }

            let page: ApiPage = response.json().await.map_err(|e| {
                SvarError::Records(format!("invalid response from announcement base: {}", e))
            })?;

            announcements.extend(page.records.into_iter().map(ApiRecord::into_announcement));

            match page.offset {
                Some(o) => offset = Some(o),
                None => break,
            }
        }

        debug!("Fetched {} announcements", announcements.len());
        Ok(announcements)
    }

    async fn get_by_id(&self, id: &str) -> Result<Announcement> {
        let url = format!("{}/{}", self.table_url, id);
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| SvarError::Records(format!("announcement base unreachable: {}", e)))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(SvarError::RecordNotFound(id.to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SvarError::Records(format!(
                "get request failed with status {}: {}",
                status, body
            )));
        }

        let record: ApiRecord = response.json().await.map_err(|e| {
            SvarError::Records(format!("invalid response from announcement base: {}", e))
        })?;

        Ok(record.into_announcement())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_deserialization() {
        let json = r#"{
            "id": "rec123",
            "createdTime": "2024-03-01T09:00:00.000Z",
            "fields": {
                "Title": "Q2 Results",
                "Description": "Second quarter summary",
                "SentTime": "2024-03-14T12:00:00Z",
                "Attachments": [
                    {"url": "https://files.example/q2.pdf", "filename": "q2.pdf"}
                ]
            }
        }"#;

        let record: ApiRecord = serde_json::from_str(json).unwrap();
        let announcement = record.into_announcement();
        assert_eq!(announcement.id, "rec123");
        assert_eq!(announcement.title, "Q2 Results");
        assert_eq!(announcement.attachments.len(), 1);
        assert!(announcement.sent_time.is_some());
    }

    #[test]
    fn test_record_with_sparse_fields() {
        // Airtable omits empty fields entirely
        let json = r#"{"id": "rec456", "fields": {"Title": "Bare"}}"#;

        let record: ApiRecord = serde_json::from_str(json).unwrap();
        let announcement = record.into_announcement();
        assert_eq!(announcement.title, "Bare");
        assert!(announcement.description.is_empty());
        assert!(announcement.sent_time.is_none());
        assert!(announcement.attachments.is_empty());
    }

    #[test]
    fn test_page_without_offset_terminates() {
        let json = r#"{"records": []}"#;
        let page: ApiPage = serde_json::from_str(json).unwrap();
        assert!(page.offset.is_none());
        assert!(page.records.is_empty());
    }
}
