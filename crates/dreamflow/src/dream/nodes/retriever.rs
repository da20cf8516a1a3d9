//! Retriever node: collects related past dreams for the analysis prompt.

use async_trait::async_trait;
use std::sync::Arc;

use crate::dream::state::{DreamPatch, DreamState};
use crate::error::NodeError;
use crate::node::{Node, NodeContext, NodeOutcome};
use crate::records::{DreamRecords, RecordFilter};

/// Searches the owner's journal for dreams similar to the current one,
/// leaving out the record stored earlier this turn.
pub struct RetrieverNode {
    records: Arc<dyn DreamRecords>,
    k: usize,
}

impl RetrieverNode {
    pub fn new(records: Arc<dyn DreamRecords>) -> Self {
        Self { records, k: 3 }
    }

    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }
}

#[async_trait]
impl Node<DreamState> for RetrieverNode {
    async fn run(
        &self,
        state: &DreamState,
        ctx: &NodeContext,
    ) -> Result<NodeOutcome<DreamPatch>, NodeError> {
        let mut filter = RecordFilter::owned_by(&state.session.user_id);
        if let Some(added) = &state.added {
            filter = filter.excluding(added.id.clone());
        }

        let hits = self.records.search(&state.text, &filter, self.k).await?;
        let context: Vec<_> = hits.into_iter().map(|h| h.record).collect();

        tracing::debug!(thread_id = %ctx.thread_id, related = context.len(), "retrieved context");

        Ok(NodeOutcome::Continue(DreamPatch::next("analysis").with_context(context)))
    }
}
