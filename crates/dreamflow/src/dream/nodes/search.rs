//! Search node: answers "find my dream about ..." requests.

use async_trait::async_trait;
use std::sync::Arc;

use crate::dream::prompts::render_search_hits;
use crate::dream::state::{DreamPatch, DreamState};
use crate::error::NodeError;
use crate::node::{Node, NodeContext, NodeOutcome};
use crate::records::{DreamRecords, RecordFilter};
use crate::state::Message;

/// Queries the owner's journal with the user's own words. An empty result
/// set is answered conversationally, not treated as a failure.
pub struct SearchNode {
    records: Arc<dyn DreamRecords>,
    k: usize,
}

impl SearchNode {
    pub fn new(records: Arc<dyn DreamRecords>) -> Self {
        Self { records, k: 3 }
    }

    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }
}

#[async_trait]
impl Node<DreamState> for SearchNode {
    async fn run(
        &self,
        state: &DreamState,
        ctx: &NodeContext,
    ) -> Result<NodeOutcome<DreamPatch>, NodeError> {
        let filter = RecordFilter::owned_by(&state.session.user_id);
        let hits = self.records.search(&state.text, &filter, self.k).await?;

        tracing::debug!(thread_id = %ctx.thread_id, hits = hits.len(), "journal search");

        let reply = if hits.is_empty() {
            "No dreams about that were found...".to_string()
        } else {
            let records: Vec<_> = hits.into_iter().map(|h| h.record).collect();
            render_search_hits(&records)
        };

        Ok(NodeOutcome::Continue(
            DreamPatch::next("end").with_message(Message::assistant(reply)),
        ))
    }
}
