//! Announcement record store abstraction.
//!
//! Provides a trait-based interface over the remote announcement base, plus
//! an in-memory backend for tests and offline use. Records are read-only
//! from the agent's perspective.

mod http;
mod memory;

pub use http::AirtableStore;
pub use memory::MemoryRecordStore;

use crate::error::{Result, SvarError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A file attached to an announcement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub url: String,
    #[serde(default)]
    pub filename: String,
}

/// One announcement record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Announcement {
    /// Record id assigned by the store.
    pub id: String,
    pub title: String,
    pub description: String,
    /// When the announcement was sent, if the store recorded it.
    pub sent_time: Option<DateTime<Utc>>,
    pub attachments: Vec<Attachment>,
}

/// Trait for announcement store backends.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetch all announcements in store order.
    async fn get_all(&self) -> Result<Vec<Announcement>>;

    /// Fetch a single announcement by record id.
    ///
    /// Returns [`SvarError::RecordNotFound`] when no record has that id.
    async fn get_by_id(&self, id: &str) -> Result<Announcement>;
}

/// Search announcements by case-insensitive substring over title and
/// description, preserving store order.
pub async fn search(store: &dyn RecordStore, text: &str) -> Result<Vec<Announcement>> {
    let needle = text.to_lowercase();
    let all = store.get_all().await?;

    Ok(all
        .into_iter()
        .filter(|a| {
            a.title.to_lowercase().contains(&needle)
                || a.description.to_lowercase().contains(&needle)
        })
        .collect())
}

/// An attachment resolved from an announcement, ready to download.
#[derive(Debug, Clone)]
pub struct ResolvedAttachment {
    pub url: String,
    pub filename: String,
    /// Title of the announcement the attachment came from.
    pub announcement_title: String,
}

/// Resolve the first attachment of an announcement selected by id, search
/// term, or recency — in that priority order.
///
/// "Record not found" and "record has no attachment" are distinct errors so
/// the completion service can explain each case accurately.
pub async fn resolve_attachment(
    store: &dyn RecordStore,
    announcement_id: Option<&str>,
    search_term: Option<&str>,
    get_latest: bool,
) -> Result<ResolvedAttachment> {
    let record = if let Some(id) = announcement_id {
        store.get_by_id(id).await?
    } else if let Some(term) = search_term {
        let matches = search(store, term).await?;
        matches.into_iter().next().ok_or_else(|| {
            SvarError::RecordNotFound(format!("no announcement matching '{}'", term))
        })?
    } else if get_latest {
        let mut all = store.get_all().await?;
        // Newest first; records without a SentTime sort last
        all.sort_by(|a, b| b.sent_time.cmp(&a.sent_time));
        all.into_iter()
            .next()
            .ok_or_else(|| SvarError::RecordNotFound("no announcements exist".to_string()))?
    } else {
        return Err(SvarError::InvalidInput(
            "no criteria (id, search term, or latest) provided to find an announcement"
                .to_string(),
        ));
    };

    let title = record.title.clone();
    record
        .attachments
        .into_iter()
        .next()
        .map(|a| ResolvedAttachment {
            url: a.url,
            filename: if a.filename.is_empty() {
                "downloaded_file".to_string()
            } else {
                a.filename
            },
            announcement_title: title.clone(),
        })
        .ok_or(SvarError::AttachmentMissing(title))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn announcement(
        id: &str,
        title: &str,
        description: &str,
        sent_days_ago: i64,
        attachments: Vec<Attachment>,
    ) -> Announcement {
        Announcement {
            id: id.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            sent_time: Some(
                Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap()
                    - chrono::Duration::days(sent_days_ago),
            ),
            attachments,
        }
    }

    fn fixture_store() -> MemoryRecordStore {
        MemoryRecordStore::with_records(vec![
            announcement(
                "rec001",
                "Q1 Results",
                "First quarter summary",
                10,
                vec![Attachment {
                    url: "https://files.example/q1.pdf".to_string(),
                    filename: "q1.pdf".to_string(),
                }],
            ),
            announcement(
                "rec002",
                "Office Move",
                "We are moving to a new building",
                5,
                vec![],
            ),
            announcement(
                "rec003",
                "Q2 Results",
                "Second quarter summary",
                1,
                vec![Attachment {
                    url: "https://files.example/q2.pdf".to_string(),
                    filename: "q2.pdf".to_string(),
                }],
            ),
        ])
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive_over_both_fields() {
        let store = fixture_store();

        let by_title = search(&store, "q2").await.unwrap();
        assert_eq!(by_title.len(), 1);
        assert_eq!(by_title[0].id, "rec003");

        let by_description = search(&store, "BUILDING").await.unwrap();
        assert_eq!(by_description.len(), 1);
        assert_eq!(by_description[0].id, "rec002");

        let both = search(&store, "results").await.unwrap();
        assert_eq!(both.len(), 2);
        // Store order preserved
        assert_eq!(both[0].id, "rec001");
        assert_eq!(both[1].id, "rec003");
    }

    #[tokio::test]
    async fn test_resolve_latest_picks_most_recent_sent_time() {
        let store = fixture_store();
        let resolved = resolve_attachment(&store, None, None, true).await.unwrap();
        assert_eq!(resolved.url, "https://files.example/q2.pdf");
        assert_eq!(resolved.announcement_title, "Q2 Results");
    }

    #[tokio::test]
    async fn test_resolve_priority_id_over_search_term() {
        let store = fixture_store();
        let resolved = resolve_attachment(&store, Some("rec001"), Some("Q2"), false)
            .await
            .unwrap();
        assert_eq!(resolved.filename, "q1.pdf");
    }

    #[tokio::test]
    async fn test_missing_record_and_missing_attachment_are_distinct() {
        let store = fixture_store();

        let not_found = resolve_attachment(&store, Some("recNONEXISTENT"), None, false)
            .await
            .unwrap_err();
        assert!(matches!(not_found, SvarError::RecordNotFound(_)));

        // rec002 exists but carries no attachment
        let no_attachment = resolve_attachment(&store, Some("rec002"), None, false)
            .await
            .unwrap_err();
        assert!(matches!(no_attachment, SvarError::AttachmentMissing(_)));
    }

    #[tokio::test]
    async fn test_resolve_without_criteria_is_invalid_input() {
        let store = fixture_store();
        let err = resolve_attachment(&store, None, None, false).await.unwrap_err();
        assert!(matches!(err, SvarError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_resolve_by_search_term_uses_first_match() {
        let store = fixture_store();
        let resolved = resolve_attachment(&store, None, Some("results"), false)
            .await
            .unwrap();
        assert_eq!(resolved.filename, "q1.pdf");
    }
}
