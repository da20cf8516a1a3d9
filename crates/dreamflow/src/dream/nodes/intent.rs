//! Intent node: proposes journal operations for the user's request.
//!
//! Producer half of the confirmation gate. One structured model call
//! yields either a direct reply or a list of operations; operations are
//! resolved against the registry and staged in `state.confirmations`,
//! pre-approved only when none of them requires confirmation.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use crate::dream::ops::OperationRegistry;
use crate::dream::prompts::DreamPrompts;
use crate::dream::state::{DreamPatch, DreamState, PendingAction};
use crate::error::NodeError;
use crate::llm::{parse_structured, LanguageModel};
use crate::node::{Node, NodeContext, NodeOutcome};
use crate::state::Message;

pub struct IntentNode {
    model: Arc<dyn LanguageModel>,
    registry: OperationRegistry,
}

impl IntentNode {
    pub fn new(model: Arc<dyn LanguageModel>, registry: OperationRegistry) -> Self {
        Self { model, registry }
    }
}

#[derive(Debug, Deserialize)]
struct ProposedOperation {
    operation: String,
    #[serde(default)]
    arguments: Value,
}

#[derive(Debug, Deserialize)]
struct IntentDecision {
    reply: Option<String>,
    #[serde(default)]
    operations: Vec<ProposedOperation>,
}

fn decision_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "reply": {"type": ["string", "null"]},
            "operations": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "operation": {"type": "string"},
                        "arguments": {"type": "object"}
                    },
                    "required": ["operation"]
                }
            }
        },
        "required": ["reply", "operations"],
        "additionalProperties": false
    })
}

#[async_trait]
impl Node<DreamState> for IntentNode {
    async fn run(
        &self,
        state: &DreamState,
        ctx: &NodeContext,
    ) -> Result<NodeOutcome<DreamPatch>, NodeError> {
        let mut messages = vec![Message::system(DreamPrompts::intent(&self.registry.catalog()))];
        messages.extend(state.messages.iter().cloned());

        let value = self.model.generate_json(&messages, &decision_schema()).await?;
        let decision: IntentDecision = parse_structured(value)?;

        let mut actions = Vec::new();
        for proposed in decision.operations {
            let Some(op) = self.registry.get(&proposed.operation) else {
                tracing::warn!(
                    thread_id = %ctx.thread_id,
                    operation = %proposed.operation,
                    "model proposed an unregistered operation; skipping"
                );
                continue;
            };

            actions.push(PendingAction {
                id: Uuid::new_v4().to_string(),
                operation: op.name().to_string(),
                arguments: proposed.arguments,
                requires_confirmation: op.requires_confirmation(),
            });
        }

        if actions.is_empty() {
            let reply = decision
                .reply
                .filter(|r| !r.trim().is_empty())
                .unwrap_or_else(|| "There's nothing for me to do there. Could you rephrase?".to_string());
            return Ok(NodeOutcome::Continue(
                DreamPatch::next("end").with_message(Message::assistant(reply)),
            ));
        }

        let approved = !actions.iter().any(|a| a.requires_confirmation);

        tracing::debug!(
            thread_id = %ctx.thread_id,
            staged = actions.len(),
            pre_approved = approved,
            "staged operations for confirmation"
        );

        let mut patch = DreamPatch::next("confirmation")
            .with_confirmations(actions)
            .with_approved(approved);
        if let Some(reply) = decision.reply.filter(|r| !r.trim().is_empty()) {
            patch = patch.with_message(Message::assistant(reply));
        }

        Ok(NodeOutcome::Continue(patch))
    }
}
