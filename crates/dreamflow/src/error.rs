//! Engine-level error taxonomy.
//!
//! Node failures, caller misuse, and store conflicts are kept apart so the
//! application layer can map them to the right surface: caller errors are
//! 4xx-equivalent, concurrency conflicts are retryable, everything else is
//! operational and never reaches the user as conversational text.

use thiserror::Error;

use crate::checkpoint::CheckpointError;
use crate::llm::ModelError;
use crate::records::RecordsError;

/// Failure inside a single node invocation.
///
/// Fatal to the current run: the executor aborts without persisting a
/// changed checkpoint, leaving the prior committed checkpoint intact.
#[derive(Debug, Error)]
pub enum NodeError {
    /// The node's model call failed (transport or schema violation).
    #[error(transparent)]
    Model(#[from] ModelError),

    /// The node's record-store call failed.
    #[error(transparent)]
    Records(#[from] RecordsError),

    /// The node produced output that fails validation (e.g. a structured
    /// value outside the declared enum/shape).
    #[error("invalid node output: {0}")]
    InvalidOutput(String),
}

impl NodeError {
    pub fn invalid_output(message: impl Into<String>) -> Self {
        Self::InvalidOutput(message.into())
    }
}

/// Errors surfaced by the executor.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A node's external call or output validation failed.
    #[error("node '{node}' failed: {source}")]
    NodeExecution {
        node: String,
        #[source]
        source: NodeError,
    },

    /// The per-call hop ceiling was exceeded; the graph is likely cyclic.
    #[error("step limit of {0} exceeded")]
    StepLimitExceeded(usize),

    /// `resume` was called on a thread with no pending interrupt
    /// (including a thread that was already resumed).
    #[error("no pending interrupt for thread '{0}'")]
    NoPendingInterrupt(String),

    /// `run` was called on a suspended thread; it requires `resume`.
    #[error("thread '{0}' is suspended awaiting a resume value")]
    InterruptPending(String),

    /// A node raised an interrupt in the very step it was resumed into.
    #[error("node '{node}' raised an interrupt while one was being resumed")]
    DuplicateInterrupt { node: String },

    /// A conditional edge table has no entry for the produced value.
    #[error("no edge from '{node}' matches next value '{value}'")]
    NoMatchingEdge { node: String, value: String },

    /// A hop referenced a node that is not registered.
    #[error("unknown node '{0}'")]
    UnknownNode(String),

    /// Another invocation advanced the thread's checkpoint concurrently.
    #[error("concurrent modification on thread '{0}'")]
    ConcurrentModification(String),

    /// The checkpoint store failed outside of a version conflict.
    #[error("checkpoint store: {0}")]
    Checkpoint(#[from] CheckpointError),
}

impl EngineError {
    pub fn node_execution(node: impl Into<String>, source: NodeError) -> Self {
        Self::NodeExecution { node: node.into(), source }
    }

    /// Caller misuse: map to a 4xx-equivalent, not an operational alert.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            EngineError::NoPendingInterrupt(_)
                | EngineError::InterruptPending(_)
                | EngineError::DuplicateInterrupt { .. }
        )
    }

    /// The caller may retry the same call and expect it to succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::ConcurrentModification(_))
    }
}
