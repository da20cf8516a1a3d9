//! Node contract and the interrupt request type.
//!
//! A node is a named unit of workflow logic with a one-external-effect
//! budget per invocation. Instead of blocking for human input, a node
//! returns `NodeOutcome::Suspend` and the executor unwinds, persists the
//! paused state, and hands the interrupt payload back to the caller.
//! Resumption is a new call that re-enters the same node with the resume
//! value delivered through [`NodeContext::resume`].

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::error::NodeError;
use crate::state::FlowState;

/// A request to suspend the workflow and await human input.
#[derive(Debug, Clone)]
pub struct InterruptRequest {
    /// Unique id for this suspension, echoed in the persisted checkpoint.
    pub id: String,
    /// Serializable description of what is being asked.
    pub payload: Value,
}

impl InterruptRequest {
    pub fn new(payload: Value) -> Self {
        Self { id: Uuid::new_v4().to_string(), payload }
    }

    /// Convenience constructor for a question with a fixed answer set.
    pub fn question(question: impl Into<String>, options: &[&str]) -> Self {
        Self::new(serde_json::json!({
            "question": question.into(),
            "options": options,
        }))
    }
}

/// What a node invocation produced: a patch to merge, or a suspension.
#[derive(Debug)]
pub enum NodeOutcome<P> {
    /// Merge this patch into the state and route via `state.next`.
    Continue(P),
    /// Unwind, persist the paused state, and return the payload.
    Suspend(InterruptRequest),
}

/// Per-invocation context handed to a node alongside the state.
#[derive(Debug, Clone)]
pub struct NodeContext {
    /// The thread being executed, for logging and scoping.
    pub thread_id: String,
    /// The resume value, present only in the step that re-enters the node
    /// which raised the pending interrupt.
    pub resume: Option<Value>,
}

impl NodeContext {
    pub fn fresh(thread_id: impl Into<String>) -> Self {
        Self { thread_id: thread_id.into(), resume: None }
    }

    pub fn resuming(thread_id: impl Into<String>, value: Value) -> Self {
        Self { thread_id: thread_id.into(), resume: Some(value) }
    }

    /// The resume value rendered as trimmed text, for nodes that expect a
    /// plain human reply.
    pub fn resume_text(&self) -> Option<String> {
        self.resume.as_ref().map(|v| match v {
            Value::String(s) => s.trim().to_string(),
            other => other.to_string(),
        })
    }
}

/// A named unit of workflow logic.
///
/// Implementations should be idempotent-safe to re-invocation after a
/// resume only for the logic that follows the suspension point; the engine
/// does not replay effects completed before a suspension.
#[async_trait]
pub trait Node<S: FlowState>: Send + Sync {
    async fn run(
        &self,
        state: &S,
        ctx: &NodeContext,
    ) -> Result<NodeOutcome<S::Patch>, NodeError>;
}
