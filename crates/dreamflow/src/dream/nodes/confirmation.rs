//! Confirmation gate: consumer half of the staged-operation pattern.
//!
//! On first entry with unapproved operations it renders a summary of every
//! operation that needs sign-off and suspends. Re-entered with the human's
//! reply (or pre-approved by the intent node), it either executes the
//! whole batch (one outcome message per operation, execution failures
//! included) or cancels every operation and routes the correction back to
//! intent for re-interpretation.

use async_trait::async_trait;
use serde_json::json;

use crate::dream::ops::{describe_action, OperationRegistry};
use crate::dream::prompts::{AFFIRMATIVE, NEGATIVE};
use crate::dream::state::{DreamPatch, DreamState};
use crate::error::NodeError;
use crate::node::{InterruptRequest, Node, NodeContext, NodeOutcome};
use crate::state::Message;

pub struct ConfirmationNode {
    registry: OperationRegistry,
}

impl ConfirmationNode {
    pub fn new(registry: OperationRegistry) -> Self {
        Self { registry }
    }

    fn confirmation_request(&self, state: &DreamState) -> InterruptRequest {
        let summaries: Vec<String> = state
            .confirmations
            .iter()
            .filter(|a| a.requires_confirmation)
            .map(|a| describe_action(&self.registry, a))
            .collect();

        let question = format!(
            "Before proceeding, check that everything is right:\n\n{}\n\n\
             Answer **{}** to confirm, or tell me what needs fixing.",
            summaries.join("\n\n"),
            AFFIRMATIVE
        );

        InterruptRequest::new(json!({
            "question": question,
            "options": [AFFIRMATIVE, NEGATIVE],
            "actions": state.confirmations,
        }))
    }
}

#[async_trait]
impl Node<DreamState> for ConfirmationNode {
    async fn run(
        &self,
        state: &DreamState,
        ctx: &NodeContext,
    ) -> Result<NodeOutcome<DreamPatch>, NodeError> {
        let feedback = if state.approved {
            AFFIRMATIVE.to_string()
        } else {
            match ctx.resume_text() {
                Some(reply) => reply,
                None => {
                    tracing::info!(
                        thread_id = %ctx.thread_id,
                        staged = state.confirmations.len(),
                        "awaiting human confirmation"
                    );
                    return Ok(NodeOutcome::Suspend(self.confirmation_request(state)));
                }
            }
        };

        let approved = feedback.eq_ignore_ascii_case(AFFIRMATIVE);

        if approved {
            let mut messages = Vec::new();
            let mut outcomes = Vec::new();

            // Every staged operation yields exactly one outcome message;
            // an execution failure is that operation's outcome, never a
            // run-level error.
            for action in &state.confirmations {
                let outcome = match self.registry.get(&action.operation) {
                    Some(op) => match op.execute(&action.arguments, &state.session).await {
                        Ok(result) => result,
                        Err(e) => format!(
                            "⚠️ The operation '{}' failed: {}",
                            op.friendly_name(),
                            e
                        ),
                    },
                    None => format!("⚠️ Unknown operation '{}'.", action.operation),
                };
                messages.push(Message::tool(outcome.clone()));
                outcomes.push(outcome);
            }

            tracing::info!(
                thread_id = %ctx.thread_id,
                executed = outcomes.len(),
                "confirmation batch executed"
            );

            let summary = format!("Here is the outcome of your request:\n\n{}", outcomes.join("\n\n"));
            messages.push(Message::assistant(summary));

            Ok(NodeOutcome::Continue(
                DreamPatch::next("end")
                    .with_messages(messages)
                    .with_confirmations(Vec::new())
                    .with_approved(false),
            ))
        } else {
            let mut messages = Vec::new();
            for action in &state.confirmations {
                let friendly = self
                    .registry
                    .get(&action.operation)
                    .map(|op| op.friendly_name().to_string())
                    .unwrap_or_else(|| action.operation.clone());
                messages.push(Message::tool(format!(
                    "The user cancelled the operation '{}'.",
                    friendly
                )));
            }
            messages.push(Message::user(feedback));

            tracing::info!(
                thread_id = %ctx.thread_id,
                cancelled = state.confirmations.len(),
                "confirmation rejected; returning to intent"
            );

            Ok(NodeOutcome::Continue(
                DreamPatch::next("intent")
                    .with_messages(messages)
                    .with_confirmations(Vec::new())
                    .with_approved(false),
            ))
        }
    }
}
