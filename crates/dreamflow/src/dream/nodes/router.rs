//! Decision router: classifies the user's utterance into a route.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::dream::prompts::DreamPrompts;
use crate::dream::state::{DreamPatch, DreamState};
use crate::error::NodeError;
use crate::llm::{parse_structured, LanguageModel};
use crate::node::{Node, NodeContext, NodeOutcome};
use crate::state::Message;

/// Entry node: one structured classification call decides where the turn
/// goes. Small talk gets its reply from the same call, so the router stays
/// within its single-effect budget.
pub struct RouterNode {
    model: Arc<dyn LanguageModel>,
}

impl RouterNode {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
enum Route {
    Report,
    Search,
    Command,
    Chat,
}

#[derive(Debug, Deserialize)]
struct RouterDecision {
    route: Route,
    reply: Option<String>,
}

fn decision_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "route": {"type": "string", "enum": ["report", "search", "command", "chat"]},
            "reply": {"type": ["string", "null"]}
        },
        "required": ["route"],
        "additionalProperties": false
    })
}

#[async_trait]
impl Node<DreamState> for RouterNode {
    async fn run(
        &self,
        state: &DreamState,
        ctx: &NodeContext,
    ) -> Result<NodeOutcome<DreamPatch>, NodeError> {
        let messages = vec![
            Message::system(DreamPrompts::router()),
            Message::user(&state.text),
        ];

        let value = self.model.generate_json(&messages, &decision_schema()).await?;
        let decision: RouterDecision = parse_structured(value)?;

        tracing::debug!(thread_id = %ctx.thread_id, route = ?decision.route, "routed utterance");

        let patch = match decision.route {
            Route::Report => DreamPatch::next("store"),
            Route::Search => DreamPatch::next("search"),
            Route::Command => DreamPatch::next("intent"),
            Route::Chat => {
                let reply = decision
                    .reply
                    .filter(|r| !r.trim().is_empty())
                    .unwrap_or_else(|| "I'm here to talk about your dreams whenever you are.".to_string());
                DreamPatch::next("end").with_message(Message::assistant(reply))
            }
        };

        Ok(NodeOutcome::Continue(patch))
    }
}
