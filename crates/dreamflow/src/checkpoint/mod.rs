//! Checkpoint store for per-thread workflow state.
//!
//! One checkpoint per conversation thread, replaced (never mutated in
//! place) at every suspension or completion boundary. Writes carry a
//! monotonically increasing version and commit optimistically: a save whose
//! version does not follow the stored one fails with
//! [`CheckpointError::VersionConflict`], which is how concurrent
//! invocations for the same thread are serialized.

mod file;

pub use file::FileCheckpointer;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

use crate::state::FlowState;

/// Descriptor of an outstanding suspension, persisted with the checkpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingInterrupt {
    /// Id of the interrupt request that raised this suspension.
    pub id: String,
    /// The node to re-enter when the thread is resumed.
    pub node: String,
    /// Serializable description of what is being asked.
    pub payload: Value,
    pub raised_at: DateTime<Utc>,
}

impl PendingInterrupt {
    pub fn new(id: impl Into<String>, node: impl Into<String>, payload: Value) -> Self {
        Self {
            id: id.into(),
            node: node.into(),
            payload,
            raised_at: Utc::now(),
        }
    }
}

/// A persisted snapshot of one thread's workflow state.
///
/// A checkpoint is either *runnable* (`pending_interrupt` is `None`) or
/// *suspended*; at most one interrupt is pending at a time. The executor
/// never advances a suspended checkpoint except through an explicit resume.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint<S> {
    pub thread_id: String,
    /// Strictly increasing; bumped on every persisted write.
    pub version: u64,
    pub state: S,
    pub pending_interrupt: Option<PendingInterrupt>,
    pub updated_at: DateTime<Utc>,
}

impl<S> Checkpoint<S> {
    pub fn new(thread_id: impl Into<String>, version: u64, state: S) -> Self {
        Self {
            thread_id: thread_id.into(),
            version,
            state,
            pending_interrupt: None,
            updated_at: Utc::now(),
        }
    }

    pub fn with_pending(mut self, pending: PendingInterrupt) -> Self {
        self.pending_interrupt = Some(pending);
        self
    }

    pub fn is_suspended(&self) -> bool {
        self.pending_interrupt.is_some()
    }
}

/// Errors from the checkpoint store.
#[derive(Debug, Error)]
pub enum CheckpointError {
    /// The stored checkpoint advanced since it was loaded. Retryable.
    #[error("version conflict on thread '{thread_id}': stored version is {stored}")]
    VersionConflict { thread_id: String, stored: u64 },

    #[error("checkpoint io: {0}")]
    Io(String),

    #[error("checkpoint serialization: {0}")]
    Serialization(String),
}

impl CheckpointError {
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io(message.into())
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization(message.into())
    }
}

/// Trait for persisting one checkpoint per thread.
#[async_trait]
pub trait Checkpointer<S>: Send + Sync
where
    S: FlowState,
{
    /// Load the live checkpoint for a thread, `None` if the thread is new.
    async fn load(&self, thread_id: &str) -> Result<Option<Checkpoint<S>>, CheckpointError>;

    /// Persist a checkpoint.
    ///
    /// The write commits only if `checkpoint.version` is exactly one ahead
    /// of the stored version (or `1` when the thread has no checkpoint);
    /// otherwise it fails with [`CheckpointError::VersionConflict`] and the
    /// stored checkpoint is left untouched.
    async fn save(&self, checkpoint: &Checkpoint<S>) -> Result<(), CheckpointError>;
}

/// In-memory checkpointer.
///
/// Not durable; used for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryCheckpointer<S> {
    threads: tokio::sync::RwLock<HashMap<String, Checkpoint<S>>>,
}

impl<S> MemoryCheckpointer<S> {
    pub fn new() -> Self {
        Self { threads: tokio::sync::RwLock::new(HashMap::new()) }
    }
}

#[async_trait]
impl<S> Checkpointer<S> for MemoryCheckpointer<S>
where
    S: FlowState,
{
    async fn load(&self, thread_id: &str) -> Result<Option<Checkpoint<S>>, CheckpointError> {
        let threads = self.threads.read().await;
        Ok(threads.get(thread_id).cloned())
    }

    async fn save(&self, checkpoint: &Checkpoint<S>) -> Result<(), CheckpointError> {
        let mut threads = self.threads.write().await;
        let stored = threads.get(&checkpoint.thread_id).map(|c| c.version).unwrap_or(0);

        if checkpoint.version != stored + 1 {
            return Err(CheckpointError::VersionConflict {
                thread_id: checkpoint.thread_id.clone(),
                stored,
            });
        }

        threads.insert(checkpoint.thread_id.clone(), checkpoint.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    struct TestState {
        next: String,
    }

    impl FlowState for TestState {
        type Patch = String;
        type Input = String;

        fn init(input: String) -> Self {
            Self { next: input }
        }

        fn merge_input(&mut self, input: String) {
            self.next = input;
        }

        fn apply(&mut self, patch: String) {
            self.next = patch;
        }

        fn next(&self) -> &str {
            &self.next
        }
    }

    #[tokio::test]
    async fn test_memory_save_load_roundtrip() {
        let store = MemoryCheckpointer::<TestState>::new();

        let checkpoint = Checkpoint::new("t1", 1, TestState::default());
        store.save(&checkpoint).await.unwrap();

        let loaded = store.load("t1").await.unwrap().unwrap();
        assert_eq!(loaded.version, 1);
        assert!(!loaded.is_suspended());

        assert!(store.load("other").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_memory_version_cas() {
        let store = MemoryCheckpointer::<TestState>::new();

        store.save(&Checkpoint::new("t1", 1, TestState::default())).await.unwrap();
        store.save(&Checkpoint::new("t1", 2, TestState::default())).await.unwrap();

        // Re-saving version 2 loses the race against the stored version.
        let err = store
            .save(&Checkpoint::new("t1", 2, TestState::default()))
            .await
            .unwrap_err();
        assert!(matches!(err, CheckpointError::VersionConflict { stored: 2, .. }));

        // A fresh thread must start at version 1.
        let err = store
            .save(&Checkpoint::new("new", 5, TestState::default()))
            .await
            .unwrap_err();
        assert!(matches!(err, CheckpointError::VersionConflict { stored: 0, .. }));
    }

    #[tokio::test]
    async fn test_pending_interrupt_survives_roundtrip() {
        let store = MemoryCheckpointer::<TestState>::new();

        let pending = PendingInterrupt::new("int-1", "confirm", serde_json::json!({"q": "ok?"}));
        let checkpoint = Checkpoint::new("t1", 1, TestState::default()).with_pending(pending);
        store.save(&checkpoint).await.unwrap();

        let loaded = store.load("t1").await.unwrap().unwrap();
        assert!(loaded.is_suspended());
        let pending = loaded.pending_interrupt.unwrap();
        assert_eq!(pending.id, "int-1");
        assert_eq!(pending.node, "confirm");
        assert_eq!(pending.payload["q"], "ok?");
    }
}
