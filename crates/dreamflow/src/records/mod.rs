//! Dream record store boundary.
//!
//! Storage and similarity search are external capabilities from the
//! engine's point of view: `store` returns the stored record, `search`
//! returns a ranked list (empty when nothing matches, not an error).
//! Every operation is scoped by the owning user.

mod file;
mod memory;

pub use file::JsonFileRecords;
pub use memory::MemoryRecords;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A stored dream submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DreamRecord {
    pub id: String,
    pub title: String,
    pub text: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub tags: Vec<String>,
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub archived: bool,
}

/// A dream submission about to be stored.
#[derive(Debug, Clone)]
pub struct NewDream {
    pub title: String,
    pub text: String,
    /// Defaults to today when absent.
    pub date: Option<NaiveDate>,
    pub tags: Vec<String>,
    pub owner_id: String,
}

/// Filter applied before similarity ranking.
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    /// Restrict to records owned by this user.
    pub owner_id: Option<String>,
    /// Records to leave out of the ranking (e.g. the one just stored).
    pub exclude_ids: Vec<String>,
    /// Archived records are skipped unless set.
    pub include_archived: bool,
}

impl RecordFilter {
    pub fn owned_by(owner_id: impl Into<String>) -> Self {
        Self { owner_id: Some(owner_id.into()), ..Default::default() }
    }

    pub fn excluding(mut self, id: impl Into<String>) -> Self {
        self.exclude_ids.push(id.into());
        self
    }

    pub(crate) fn matches(&self, record: &DreamRecord) -> bool {
        if let Some(owner) = &self.owner_id {
            if &record.owner_id != owner {
                return false;
            }
        }
        if self.exclude_ids.iter().any(|id| id == &record.id) {
            return false;
        }
        if record.archived && !self.include_archived {
            return false;
        }
        true
    }
}

/// A record paired with its similarity score, higher is closer.
#[derive(Debug, Clone)]
pub struct ScoredRecord {
    pub record: DreamRecord,
    pub score: f32,
}

/// Errors from the record store.
#[derive(Debug, Error)]
pub enum RecordsError {
    #[error("record store failed: {0}")]
    Store(String),

    #[error("no record '{id}' owned by '{owner_id}'")]
    NotFound { id: String, owner_id: String },
}

impl RecordsError {
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store(message.into())
    }

    pub fn not_found(id: impl Into<String>, owner_id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into(), owner_id: owner_id.into() }
    }
}

/// Trait for storing and retrieving dream records.
#[async_trait]
pub trait DreamRecords: Send + Sync {
    /// Persist a new record and return it with its assigned id.
    async fn store(&self, dream: NewDream) -> Result<DreamRecord, RecordsError>;

    /// Rank records against `query`, best first, at most `k` results.
    /// An empty result is a valid answer, not an error.
    async fn search(
        &self,
        query: &str,
        filter: &RecordFilter,
        k: usize,
    ) -> Result<Vec<ScoredRecord>, RecordsError>;

    /// Mark a record as archived. Fails when the record does not exist or
    /// belongs to another owner.
    async fn archive(&self, id: &str, owner_id: &str) -> Result<DreamRecord, RecordsError>;

    /// Remove a record. Same ownership rules as `archive`.
    async fn delete(&self, id: &str, owner_id: &str) -> Result<(), RecordsError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, owner: &str, archived: bool) -> DreamRecord {
        DreamRecord {
            id: id.to_string(),
            title: "t".to_string(),
            text: "x".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            tags: vec![],
            owner_id: owner.to_string(),
            created_at: Utc::now(),
            archived,
        }
    }

    #[test]
    fn test_filter_owner_scoping() {
        let filter = RecordFilter::owned_by("alice");
        assert!(filter.matches(&record("1", "alice", false)));
        assert!(!filter.matches(&record("1", "bob", false)));
    }

    #[test]
    fn test_filter_exclusion_and_archived() {
        let filter = RecordFilter::owned_by("alice").excluding("1");
        assert!(!filter.matches(&record("1", "alice", false)));
        assert!(filter.matches(&record("2", "alice", false)));
        assert!(!filter.matches(&record("3", "alice", true)));

        let mut filter = RecordFilter::owned_by("alice");
        filter.include_archived = true;
        assert!(filter.matches(&record("3", "alice", true)));
    }
}
