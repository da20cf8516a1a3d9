//! Caller-facing entry points for the dream assistant.
//!
//! Wraps the executor with the conventions the transport layer relies on:
//! thread id equals the caller's user id, one turn in, one reply or one
//! interrupt payload out.

use std::sync::Arc;

use serde_json::Value;

use crate::checkpoint::Checkpointer;
use crate::error::EngineError;
use crate::executor::{Executor, InterruptView, RunOutcome};
use crate::graph::GraphError;
use crate::llm::LanguageModel;
use crate::records::{DreamRecord, DreamRecords};
use crate::state::last_assistant;

use super::ops::OperationRegistry;
use super::state::{AnalysisMode, DreamState, Persona, TurnInput};
use super::build_dream_workflow;

/// The completed-turn payload handed back to the caller.
#[derive(Debug, Clone)]
pub struct TurnReply {
    /// The last assistant-authored message of the turn.
    pub reply: String,
    /// Related records attached to the analysis, for the caller's UI.
    pub context: Vec<DreamRecord>,
    pub mode: AnalysisMode,
    pub persona: Option<Persona>,
}

/// Outcome of one caller interaction.
#[derive(Debug)]
pub enum TurnOutcome {
    /// The turn ran to completion.
    Reply(TurnReply),
    /// The workflow suspended; the payload describes what input is needed.
    AwaitingInput(InterruptView),
}

/// The assembled dream assistant: workflow graph, executor, and the
/// standard operation registry over one record store.
pub struct Assistant {
    executor: Executor<DreamState>,
}

impl Assistant {
    pub fn new(
        model: Arc<dyn LanguageModel>,
        records: Arc<dyn DreamRecords>,
        checkpointer: Arc<dyn Checkpointer<DreamState>>,
    ) -> Result<Self, GraphError> {
        let registry = OperationRegistry::standard(records.clone());
        let graph = build_dream_workflow(model, records, registry)?;

        Ok(Self { executor: Executor::new(Arc::new(graph), checkpointer) })
    }

    /// Start a new turn, creating the thread on first contact.
    pub async fn start_or_continue(
        &self,
        thread_id: &str,
        input: TurnInput,
    ) -> Result<TurnOutcome, EngineError> {
        let outcome = self.executor.run(thread_id, input).await?;
        Ok(Self::map_outcome(outcome))
    }

    /// Resume a suspended thread with the human's reply.
    pub async fn resume(
        &self,
        thread_id: &str,
        value: impl Into<String>,
    ) -> Result<TurnOutcome, EngineError> {
        let outcome = self
            .executor
            .resume(thread_id, Value::String(value.into()))
            .await?;
        Ok(Self::map_outcome(outcome))
    }

    /// Whether the thread is parked on a pending interrupt.
    pub async fn is_awaiting_input(&self, thread_id: &str) -> Result<bool, EngineError> {
        self.executor.is_suspended(thread_id).await
    }

    fn map_outcome(outcome: RunOutcome<DreamState>) -> TurnOutcome {
        match outcome {
            RunOutcome::Complete { state } => TurnOutcome::Reply(TurnReply {
                reply: last_assistant(&state.messages)
                    .map(|m| m.content.clone())
                    .unwrap_or_default(),
                context: state.context,
                mode: state.mode,
                persona: state.persona,
            }),
            RunOutcome::Suspended { interrupt } => TurnOutcome::AwaitingInput(interrupt),
        }
    }
}
