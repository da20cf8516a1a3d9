//! Analysis node: produces the persona-guided reading of the dream.

use async_trait::async_trait;
use std::sync::Arc;

use crate::dream::prompts::DreamPrompts;
use crate::dream::state::{DreamPatch, DreamState};
use crate::error::NodeError;
use crate::llm::LanguageModel;
use crate::node::{Node, NodeContext, NodeOutcome};
use crate::state::Message;

/// One model call over the persona system prompt, the dream text, and the
/// retrieved context; the response becomes the turn's assistant reply.
pub struct AnalysisNode {
    model: Arc<dyn LanguageModel>,
}

impl AnalysisNode {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }
}

#[async_trait]
impl Node<DreamState> for AnalysisNode {
    async fn run(
        &self,
        state: &DreamState,
        ctx: &NodeContext,
    ) -> Result<NodeOutcome<DreamPatch>, NodeError> {
        let messages = vec![
            Message::system(DreamPrompts::analysis_system(state.mode, state.persona)),
            Message::user(DreamPrompts::dream_with_context(&state.text, &state.context)),
        ];

        let reply = self.model.generate(&messages).await?;

        tracing::debug!(
            thread_id = %ctx.thread_id,
            mode = %state.mode,
            chars = reply.len(),
            "analysis produced"
        );

        Ok(NodeOutcome::Continue(
            DreamPatch::next("end").with_message(Message::assistant(reply)),
        ))
    }
}
