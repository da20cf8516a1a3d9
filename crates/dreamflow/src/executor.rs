//! Executor: drives a thread's checkpoint through the workflow graph.
//!
//! A single `run` or `resume` call loads the checkpoint (or initializes
//! one), steps the graph node-by-node until a terminal or interrupt
//! condition, and persists exactly one new checkpoint at that boundary.
//! A failed call persists nothing: the prior committed checkpoint stays
//! valid and resumable.
//!
//! Checkpoint states and transitions:
//!
//! ```text
//! Runnable ──(node hops)──▶ Runnable
//! Runnable ──(interrupt)──▶ Suspended      (pending_interrupt persisted)
//! Suspended ──(resume)────▶ Runnable       (same node re-entered)
//! Runnable ──(next = end)─▶ Terminal       (final state returned)
//! ```
//!
//! Concurrency is optimistic: the version loaded at the start of the call
//! must still be the stored version when the final checkpoint commits,
//! otherwise the call fails with `ConcurrentModification` and may be
//! retried by the caller.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::checkpoint::{Checkpoint, CheckpointError, Checkpointer, PendingInterrupt};
use crate::error::EngineError;
use crate::graph::Graph;
use crate::node::{NodeContext, NodeOutcome};
use crate::state::FlowState;

/// Default ceiling on node hops per `run`/`resume` call.
pub const DEFAULT_MAX_STEPS: usize = 25;

/// The caller-visible view of a raised interrupt.
#[derive(Debug, Clone)]
pub struct InterruptView {
    pub id: String,
    pub payload: Value,
}

/// Result of one `run`/`resume` call.
#[derive(Debug)]
pub enum RunOutcome<S> {
    /// The workflow reached the terminal value; the final merged state.
    Complete { state: S },
    /// The workflow suspended awaiting human input.
    Suspended { interrupt: InterruptView },
}

/// Executor over one workflow graph and one checkpoint store.
///
/// The graph and store are constructed once at startup and shared
/// read-only thereafter; the executor itself is cheap to clone via `Arc`.
pub struct Executor<S: FlowState> {
    graph: Arc<Graph<S>>,
    checkpointer: Arc<dyn Checkpointer<S>>,
    max_steps: usize,
}

impl<S> Executor<S>
where
    S: FlowState + Serialize + DeserializeOwned,
{
    pub fn new(graph: Arc<Graph<S>>, checkpointer: Arc<dyn Checkpointer<S>>) -> Self {
        Self { graph, checkpointer, max_steps: DEFAULT_MAX_STEPS }
    }

    /// Override the per-call hop ceiling.
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Inspect a thread's live checkpoint without advancing it.
    pub async fn checkpoint(&self, thread_id: &str) -> Result<Option<Checkpoint<S>>, EngineError> {
        Ok(self.checkpointer.load(thread_id).await?)
    }

    /// Whether the thread is parked on a pending interrupt.
    pub async fn is_suspended(&self, thread_id: &str) -> Result<bool, EngineError> {
        Ok(self
            .checkpointer
            .load(thread_id)
            .await?
            .map(|c| c.is_suspended())
            .unwrap_or(false))
    }

    /// Start a new turn on a thread, initializing the checkpoint on first
    /// contact. Rejected with [`EngineError::InterruptPending`] while the
    /// thread is suspended: a parked thread takes only `resume`.
    pub async fn run(&self, thread_id: &str, input: S::Input) -> Result<RunOutcome<S>, EngineError> {
        let loaded = self.checkpointer.load(thread_id).await?;

        let (state, base_version) = match loaded {
            Some(checkpoint) if checkpoint.is_suspended() => {
                return Err(EngineError::InterruptPending(thread_id.to_string()));
            }
            Some(checkpoint) => {
                let mut state = checkpoint.state;
                state.merge_input(input);
                (state, checkpoint.version)
            }
            None => (S::init(input), 0),
        };

        tracing::debug!(thread_id, version = base_version, "starting run");
        self.step_loop(thread_id, state, base_version, self.graph.entry().to_string(), None)
            .await
    }

    /// Resume a suspended thread with a value for its pending interrupt.
    ///
    /// Valid only while the checkpoint is suspended; a runnable, terminal,
    /// or already-resumed thread is rejected with
    /// [`EngineError::NoPendingInterrupt`] rather than reprocessed.
    pub async fn resume(&self, thread_id: &str, value: Value) -> Result<RunOutcome<S>, EngineError> {
        let checkpoint = self
            .checkpointer
            .load(thread_id)
            .await?
            .ok_or_else(|| EngineError::NoPendingInterrupt(thread_id.to_string()))?;

        let Some(pending) = checkpoint.pending_interrupt else {
            return Err(EngineError::NoPendingInterrupt(thread_id.to_string()));
        };

        tracing::debug!(
            thread_id,
            interrupt_id = %pending.id,
            node = %pending.node,
            "resuming suspended thread"
        );

        self.step_loop(thread_id, checkpoint.state, checkpoint.version, pending.node, Some(value))
            .await
    }

    /// Step nodes until terminal or interrupt, then persist once.
    async fn step_loop(
        &self,
        thread_id: &str,
        mut state: S,
        base_version: u64,
        entry_node: String,
        mut resume: Option<Value>,
    ) -> Result<RunOutcome<S>, EngineError> {
        let mut current = entry_node;

        for step in 0..self.max_steps {
            let node = self.graph.node(&current)?;
            let resuming = resume.is_some();
            let ctx = match resume.take() {
                Some(value) => NodeContext::resuming(thread_id, value),
                None => NodeContext::fresh(thread_id),
            };

            tracing::debug!(thread_id, node = %current, step, resuming, "invoking node");

            let outcome = node
                .run(&state, &ctx)
                .await
                .map_err(|e| EngineError::node_execution(current.clone(), e))?;

            match outcome {
                NodeOutcome::Continue(patch) => {
                    state.apply(patch);

                    match self.graph.successor(&current, state.next())? {
                        Some(next) => current = next.to_string(),
                        None => {
                            self.commit(thread_id, base_version, state.clone(), None).await?;
                            tracing::info!(thread_id, steps = step + 1, "run complete");
                            return Ok(RunOutcome::Complete { state });
                        }
                    }
                }
                NodeOutcome::Suspend(request) => {
                    // A node that suspends in the very step it was resumed
                    // into never consumed the delivered value.
                    if resuming {
                        return Err(EngineError::DuplicateInterrupt { node: current });
                    }

                    let pending =
                        PendingInterrupt::new(request.id.clone(), current.clone(), request.payload.clone());
                    self.commit(thread_id, base_version, state, Some(pending)).await?;

                    tracing::info!(thread_id, node = %current, interrupt_id = %request.id, "run suspended");
                    return Ok(RunOutcome::Suspended {
                        interrupt: InterruptView { id: request.id, payload: request.payload },
                    });
                }
            }
        }

        tracing::error!(thread_id, max_steps = self.max_steps, "step limit exceeded");
        Err(EngineError::StepLimitExceeded(self.max_steps))
    }

    async fn commit(
        &self,
        thread_id: &str,
        base_version: u64,
        state: S,
        pending: Option<PendingInterrupt>,
    ) -> Result<(), EngineError> {
        let mut checkpoint = Checkpoint::new(thread_id, base_version + 1, state);
        if let Some(pending) = pending {
            checkpoint = checkpoint.with_pending(pending);
        }

        self.checkpointer.save(&checkpoint).await.map_err(|e| match e {
            CheckpointError::VersionConflict { thread_id, .. } => {
                EngineError::ConcurrentModification(thread_id)
            }
            other => EngineError::Checkpoint(other),
        })
    }
}
