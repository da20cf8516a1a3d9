//! The dream-analysis workflow.
//!
//! # Workflow Structure
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Dream Analysis Workflow                     │
//! │                                                              │
//! │   START ──▶ router ──┬─▶ store ──▶ retriever ──▶ analysis   │
//! │                      ├─▶ search ─────────────────────▶ END  │
//! │                      ├─▶ intent ◀──┐                        │
//! │                      │      │      │ (rejected)             │
//! │                      │      ▼      │                        │
//! │                      │  confirmation ──▶ END                │
//! │                      │   (suspends for approval)            │
//! │                      └────────────────────────────▶ END     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The router classifies each utterance: dream reports flow through
//! store → retriever → analysis; journal searches answer directly; journal
//! commands go through the intent/confirmation gate, which suspends the
//! thread while the human approves or corrects the staged operations.

pub mod nodes;
pub mod ops;
pub mod prompts;

mod assistant;
mod state;

pub use assistant::{Assistant, TurnOutcome, TurnReply};
pub use state::{AnalysisMode, DreamPatch, DreamState, PendingAction, Persona, Session, TurnInput};

use std::sync::Arc;

use crate::graph::{Graph, GraphBuilder, GraphError, END};
use crate::llm::LanguageModel;
use crate::records::DreamRecords;

use nodes::{
    AnalysisNode, ConfirmationNode, IntentNode, RetrieverNode, RouterNode, SearchNode, StoreNode,
};
use ops::OperationRegistry;

/// Build the dream-analysis workflow graph.
pub fn build_dream_workflow(
    model: Arc<dyn LanguageModel>,
    records: Arc<dyn DreamRecords>,
    registry: OperationRegistry,
) -> Result<Graph<DreamState>, GraphError> {
    GraphBuilder::new()
        .name("dream_analysis")
        .node("router", RouterNode::new(model.clone()))
        .node("store", StoreNode::new(records.clone()))
        .node("retriever", RetrieverNode::new(records.clone()))
        .node("analysis", AnalysisNode::new(model.clone()))
        .node("search", SearchNode::new(records))
        .node("intent", IntentNode::new(model, registry.clone()))
        .node("confirmation", ConfirmationNode::new(registry))
        .entry("router")
        .conditional_edges(
            "router",
            vec![
                ("store", "store"),
                ("search", "search"),
                ("intent", "intent"),
                ("end", END),
            ],
        )
        .edge("store", "retriever")
        .edge("retriever", "analysis")
        .edge("analysis", END)
        .edge("search", END)
        .conditional_edges("intent", vec![("confirmation", "confirmation"), ("end", END)])
        .conditional_edges("confirmation", vec![("intent", "intent"), ("end", END)])
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ModelError;
    use crate::records::MemoryRecords;
    use crate::state::Message;
    use async_trait::async_trait;
    use serde_json::Value;

    struct NoopModel;

    #[async_trait]
    impl LanguageModel for NoopModel {
        async fn generate(&self, _messages: &[Message]) -> Result<String, ModelError> {
            Ok(String::new())
        }

        async fn generate_json(
            &self,
            _messages: &[Message],
            _schema: &Value,
        ) -> Result<Value, ModelError> {
            Ok(Value::Null)
        }

        fn name(&self) -> &str {
            "noop"
        }
    }

    #[test]
    fn test_workflow_graph_builds() {
        let model = Arc::new(NoopModel);
        let records = Arc::new(MemoryRecords::new());
        let registry = OperationRegistry::standard(records.clone());

        let graph = build_dream_workflow(model, records, registry).unwrap();
        assert_eq!(graph.entry(), "router");
        assert_eq!(graph.name(), "dream_analysis");
    }
}
