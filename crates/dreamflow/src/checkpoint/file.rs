//! File-based checkpoint store.
//!
//! Stores one JSON file per thread under a base directory, optionally
//! compressed with zstd:
//!
//! ```text
//! checkpoints/
//! ├── alice.json
//! └── bob.json.zst
//! ```
//!
//! Writes go through a temporary file plus rename so a crash mid-write
//! never corrupts the live checkpoint. The optimistic version check reads
//! the stored version before committing.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use super::{Checkpoint, CheckpointError, Checkpointer};
use crate::state::FlowState;

/// File-based checkpointer, one file per thread.
#[derive(Debug)]
pub struct FileCheckpointer {
    base_path: PathBuf,
    compression: bool,
}

impl FileCheckpointer {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self { base_path: base_path.into(), compression: false }
    }

    /// Enable zstd compression of checkpoint files.
    pub fn with_compression(mut self, compression: bool) -> Self {
        self.compression = compression;
        self
    }

    /// Thread ids come from callers; only a conservative character set is
    /// allowed into filenames.
    fn sanitize(thread_id: &str) -> String {
        thread_id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect()
    }

    fn checkpoint_path(&self, thread_id: &str) -> PathBuf {
        let name = if self.compression {
            format!("{}.json.zst", Self::sanitize(thread_id))
        } else {
            format!("{}.json", Self::sanitize(thread_id))
        };
        self.base_path.join(name)
    }

    fn temp_path(&self, thread_id: &str) -> PathBuf {
        self.base_path.join(format!("{}.tmp", Self::sanitize(thread_id)))
    }

    async fn ensure_dir(&self) -> Result<(), CheckpointError> {
        fs::create_dir_all(&self.base_path)
            .await
            .map_err(|e| CheckpointError::io(format!("failed to create directory: {}", e)))
    }

    fn compress(data: &[u8]) -> Result<Vec<u8>, CheckpointError> {
        let mut encoder = zstd::stream::Encoder::new(Vec::new(), 3)
            .map_err(|e| CheckpointError::io(format!("compression init failed: {}", e)))?;
        encoder
            .write_all(data)
            .map_err(|e| CheckpointError::io(format!("compression write failed: {}", e)))?;
        encoder
            .finish()
            .map_err(|e| CheckpointError::io(format!("compression finish failed: {}", e)))
    }

    fn decompress(data: &[u8]) -> Result<Vec<u8>, CheckpointError> {
        zstd::stream::decode_all(data)
            .map_err(|e| CheckpointError::io(format!("decompression failed: {}", e)))
    }

    async fn read_file(&self, path: &Path) -> Result<Option<Vec<u8>>, CheckpointError> {
        if !path.exists() {
            return Ok(None);
        }

        let mut file = fs::File::open(path)
            .await
            .map_err(|e| CheckpointError::io(format!("failed to open file: {}", e)))?;

        let mut data = Vec::new();
        file.read_to_end(&mut data)
            .await
            .map_err(|e| CheckpointError::io(format!("failed to read file: {}", e)))?;

        if self.compression {
            Ok(Some(Self::decompress(&data)?))
        } else {
            Ok(Some(data))
        }
    }
}

#[async_trait]
impl<S> Checkpointer<S> for FileCheckpointer
where
    S: FlowState + Serialize + DeserializeOwned,
{
    async fn load(&self, thread_id: &str) -> Result<Option<Checkpoint<S>>, CheckpointError> {
        let path = self.checkpoint_path(thread_id);
        let Some(json) = self.read_file(&path).await? else {
            return Ok(None);
        };

        let checkpoint: Checkpoint<S> = serde_json::from_slice(&json)
            .map_err(|e| CheckpointError::serialization(format!("deserialization failed: {}", e)))?;

        Ok(Some(checkpoint))
    }

    async fn save(&self, checkpoint: &Checkpoint<S>) -> Result<(), CheckpointError> {
        self.ensure_dir().await?;

        let stored = <Self as Checkpointer<S>>::load(self, &checkpoint.thread_id)
            .await?
            .map(|c| c.version)
            .unwrap_or(0);

        if checkpoint.version != stored + 1 {
            return Err(CheckpointError::VersionConflict {
                thread_id: checkpoint.thread_id.clone(),
                stored,
            });
        }

        let json = serde_json::to_vec_pretty(checkpoint)
            .map_err(|e| CheckpointError::serialization(format!("serialization failed: {}", e)))?;

        let data = if self.compression { Self::compress(&json)? } else { json };

        let temp_path = self.temp_path(&checkpoint.thread_id);
        let final_path = self.checkpoint_path(&checkpoint.thread_id);

        let mut file = fs::File::create(&temp_path)
            .await
            .map_err(|e| CheckpointError::io(format!("failed to create temp file: {}", e)))?;

        file.write_all(&data)
            .await
            .map_err(|e| CheckpointError::io(format!("failed to write data: {}", e)))?;

        file.sync_all()
            .await
            .map_err(|e| CheckpointError::io(format!("failed to sync file: {}", e)))?;

        fs::rename(&temp_path, &final_path)
            .await
            .map_err(|e| CheckpointError::io(format!("failed to rename file: {}", e)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::tempdir;

    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    struct TestState {
        next: String,
        notes: Vec<String>,
    }

    impl FlowState for TestState {
        type Patch = String;
        type Input = String;

        fn init(input: String) -> Self {
            Self { next: input, notes: Vec::new() }
        }

        fn merge_input(&mut self, input: String) {
            self.next = input;
        }

        fn apply(&mut self, patch: String) {
            self.notes.push(patch.clone());
            self.next = patch;
        }

        fn next(&self) -> &str {
            &self.next
        }
    }

    #[tokio::test]
    async fn test_file_save_load_roundtrip() {
        let dir = tempdir().unwrap();
        let store = FileCheckpointer::new(dir.path());

        let mut state = TestState::default();
        state.notes.push("remembered".into());
        store.save(&Checkpoint::new("alice", 1, state)).await.unwrap();

        let loaded: Checkpoint<TestState> = store.load("alice").await.unwrap().unwrap();
        assert_eq!(loaded.version, 1);
        assert_eq!(loaded.state.notes, vec!["remembered".to_string()]);
    }

    #[tokio::test]
    async fn test_file_load_missing_thread() {
        let dir = tempdir().unwrap();
        let store = FileCheckpointer::new(dir.path());

        let loaded: Option<Checkpoint<TestState>> = store.load("nobody").await.unwrap();
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn test_file_version_cas() {
        let dir = tempdir().unwrap();
        let store = FileCheckpointer::new(dir.path());

        store.save(&Checkpoint::new("alice", 1, TestState::default())).await.unwrap();

        let err = store
            .save(&Checkpoint::new("alice", 1, TestState::default()))
            .await
            .unwrap_err();
        assert!(matches!(err, CheckpointError::VersionConflict { stored: 1, .. }));

        store.save(&Checkpoint::new("alice", 2, TestState::default())).await.unwrap();
    }

    #[tokio::test]
    async fn test_file_compression_roundtrip() {
        let dir = tempdir().unwrap();
        let store = FileCheckpointer::new(dir.path()).with_compression(true);

        store.save(&Checkpoint::new("alice", 1, TestState::default())).await.unwrap();

        let path = dir.path().join("alice.json.zst");
        assert!(path.exists());

        let loaded: Checkpoint<TestState> = store.load("alice").await.unwrap().unwrap();
        assert_eq!(loaded.version, 1);
    }

    #[tokio::test]
    async fn test_file_atomic_write_leaves_no_temp() {
        let dir = tempdir().unwrap();
        let store = FileCheckpointer::new(dir.path());

        store.save(&Checkpoint::new("alice", 1, TestState::default())).await.unwrap();

        assert!(!dir.path().join("alice.tmp").exists());
        assert!(dir.path().join("alice.json").exists());
    }

    #[tokio::test]
    async fn test_thread_id_sanitization() {
        let dir = tempdir().unwrap();
        let store = FileCheckpointer::new(dir.path());

        store
            .save(&Checkpoint::new("user/../etc", 1, TestState::default()))
            .await
            .unwrap();

        assert!(dir.path().join("user____etc.json").exists());
        let loaded: Checkpoint<TestState> = store.load("user/../etc").await.unwrap().unwrap();
        assert_eq!(loaded.thread_id, "user/../etc");
    }
}
