//! In-memory record store implementation.
//!
//! Useful for testing and offline runs.

use super::{Announcement, RecordStore};
use crate::error::{Result, SvarError};
use async_trait::async_trait;
use std::sync::RwLock;

/// In-memory announcement store.
pub struct MemoryRecordStore {
    records: RwLock<Vec<Announcement>>,
}

impl MemoryRecordStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
        }
    }

    /// Create a store seeded with records.
    pub fn with_records(records: Vec<Announcement>) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }

    /// Add a record to the store.
    pub fn add(&self, record: Announcement) {
        self.records.write().unwrap().push(record);
    }
}

impl Default for MemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn get_all(&self) -> Result<Vec<Announcement>> {
        Ok(self.records.read().unwrap().clone())
    }

    async fn get_by_id(&self, id: &str) -> Result<Announcement> {
        self.records
            .read()
            .unwrap()
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or_else(|| SvarError::RecordNotFound(id.to_string()))
    }
}
