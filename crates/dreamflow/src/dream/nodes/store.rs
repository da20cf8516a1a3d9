//! Store node: persists a reported dream before analysis.

use async_trait::async_trait;
use std::sync::Arc;

use crate::dream::ops::derive_title;
use crate::dream::state::{DreamPatch, DreamState};
use crate::error::NodeError;
use crate::node::{Node, NodeContext, NodeOutcome};
use crate::records::{DreamRecords, NewDream};

/// Stores the reported dream under the session's owner and hands the new
/// record to the retriever via `state.added`. The title is derived from
/// the opening words; the model budget belongs to the analysis step.
pub struct StoreNode {
    records: Arc<dyn DreamRecords>,
}

impl StoreNode {
    pub fn new(records: Arc<dyn DreamRecords>) -> Self {
        Self { records }
    }
}

#[async_trait]
impl Node<DreamState> for StoreNode {
    async fn run(
        &self,
        state: &DreamState,
        ctx: &NodeContext,
    ) -> Result<NodeOutcome<DreamPatch>, NodeError> {
        let record = self
            .records
            .store(NewDream {
                title: derive_title(&state.text),
                text: state.text.clone(),
                date: None,
                tags: Vec::new(),
                owner_id: state.session.user_id.clone(),
            })
            .await?;

        tracing::debug!(thread_id = %ctx.thread_id, record_id = %record.id, "stored dream");

        Ok(NodeOutcome::Continue(DreamPatch::next("retriever").with_added(record)))
    }
}
