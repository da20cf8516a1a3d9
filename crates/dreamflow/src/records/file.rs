//! JSON-file-persisted record store.
//!
//! Keeps the full record set in memory (delegating search and filtering to
//! [`MemoryRecords`]) and rewrites a single JSON file after every
//! mutation, via a temporary file plus rename.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;

use super::{DreamRecord, DreamRecords, MemoryRecords, NewDream, RecordFilter, RecordsError, ScoredRecord};

/// Record store persisted to one JSON file.
#[derive(Debug)]
pub struct JsonFileRecords {
    path: PathBuf,
    inner: MemoryRecords,
}

impl JsonFileRecords {
    /// Open (or create) the store at `path`.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, RecordsError> {
        let path = path.into();

        let records = match fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice::<Vec<DreamRecord>>(&bytes)
                .map_err(|e| RecordsError::store(format!("corrupt record file: {}", e)))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(RecordsError::store(format!("failed to read record file: {}", e))),
        };

        Ok(Self { path, inner: MemoryRecords::with_records(records) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self) -> Result<(), RecordsError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| RecordsError::store(format!("failed to create directory: {}", e)))?;
        }

        let snapshot = self.inner.snapshot().await;
        let json = serde_json::to_vec_pretty(&snapshot)
            .map_err(|e| RecordsError::store(format!("serialization failed: {}", e)))?;

        let temp = self.path.with_extension("tmp");
        fs::write(&temp, &json)
            .await
            .map_err(|e| RecordsError::store(format!("failed to write record file: {}", e)))?;
        fs::rename(&temp, &self.path)
            .await
            .map_err(|e| RecordsError::store(format!("failed to rename record file: {}", e)))?;

        Ok(())
    }
}

#[async_trait]
impl DreamRecords for JsonFileRecords {
    async fn store(&self, dream: NewDream) -> Result<DreamRecord, RecordsError> {
        let record = self.inner.store(dream).await?;
        self.persist().await?;
        Ok(record)
    }

    async fn search(
        &self,
        query: &str,
        filter: &RecordFilter,
        k: usize,
    ) -> Result<Vec<ScoredRecord>, RecordsError> {
        self.inner.search(query, filter, k).await
    }

    async fn archive(&self, id: &str, owner_id: &str) -> Result<DreamRecord, RecordsError> {
        let record = self.inner.archive(id, owner_id).await?;
        self.persist().await?;
        Ok(record)
    }

    async fn delete(&self, id: &str, owner_id: &str) -> Result<(), RecordsError> {
        self.inner.delete(id, owner_id).await?;
        self.persist().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn new_dream(owner: &str, text: &str) -> NewDream {
        NewDream {
            title: "A dream".to_string(),
            text: text.to_string(),
            date: None,
            tags: vec![],
            owner_id: owner.to_string(),
        }
    }

    #[tokio::test]
    async fn test_records_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dreams.json");

        let stored = {
            let store = JsonFileRecords::open(&path).await.unwrap();
            store.store(new_dream("alice", "a blue door")).await.unwrap()
        };

        let reopened = JsonFileRecords::open(&path).await.unwrap();
        let hits = reopened
            .search("blue door", &RecordFilter::owned_by("alice"), 3)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].record.id, stored.id);
    }

    #[tokio::test]
    async fn test_open_missing_file_starts_empty() {
        let dir = tempdir().unwrap();
        let store = JsonFileRecords::open(dir.path().join("dreams.json")).await.unwrap();
        let hits = store
            .search("anything", &RecordFilter::default(), 3)
            .await
            .unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_open_rejects_corrupt_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dreams.json");
        fs::write(&path, b"not json").await.unwrap();

        let err = JsonFileRecords::open(&path).await.unwrap_err();
        assert!(matches!(err, RecordsError::Store(_)));
    }

    #[tokio::test]
    async fn test_delete_persists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dreams.json");

        let store = JsonFileRecords::open(&path).await.unwrap();
        let stored = store.store(new_dream("alice", "a blue door")).await.unwrap();
        store.delete(&stored.id, "alice").await.unwrap();
        drop(store);

        let reopened = JsonFileRecords::open(&path).await.unwrap();
        let hits = reopened
            .search("blue door", &RecordFilter::owned_by("alice"), 3)
            .await
            .unwrap();
        assert!(hits.is_empty());
    }
}
