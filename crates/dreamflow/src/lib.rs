//! dreamflow: a resumable workflow engine with human-in-the-loop
//! interrupts, powering a dream-analysis assistant.
//!
//! The engine drives a conversation through a static directed graph of
//! nodes, persists progress per thread as versioned checkpoints, suspends
//! execution when a node needs human input, and resumes exactly where it
//! left off:
//!
//! - [`graph`]: node registry, direct and conditional edges, build-time
//!   validation, the `end` terminal sentinel.
//! - [`node`]: the node contract: `Continue(patch)` or
//!   `Suspend(InterruptRequest)` as a tagged return value.
//! - [`checkpoint`]: one versioned checkpoint per thread with optimistic
//!   concurrency; in-memory and file-backed stores.
//! - [`executor`]: the step loop: load, hop, persist once at the terminal
//!   or suspension boundary.
//! - [`llm`] / [`records`]: the external collaborators behind traits.
//! - [`dream`]: the dream-analysis workflow built on all of the above,
//!   including the intent/confirmation gate.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use dreamflow::checkpoint::MemoryCheckpointer;
//! use dreamflow::dream::{Assistant, TurnInput, TurnOutcome};
//! use dreamflow::llm::OpenAiClient;
//! use dreamflow::records::MemoryRecords;
//!
//! let model = Arc::new(OpenAiClient::new("https://api.openai.com/v1", key, "gpt-4.1-mini"));
//! let records = Arc::new(MemoryRecords::new());
//! let assistant = Assistant::new(model, records, Arc::new(MemoryCheckpointer::new()))?;
//!
//! match assistant.start_or_continue("alice", TurnInput { /* ... */ }).await? {
//!     TurnOutcome::Reply(reply) => println!("{}", reply.reply),
//!     TurnOutcome::AwaitingInput(interrupt) => {
//!         // show interrupt.payload, then assistant.resume("alice", answer)
//!     }
//! }
//! ```

pub mod checkpoint;
pub mod dream;
pub mod error;
pub mod executor;
pub mod graph;
pub mod llm;
pub mod node;
pub mod records;
pub mod state;

// Re-exports for convenience
pub use checkpoint::{Checkpoint, CheckpointError, Checkpointer, FileCheckpointer, MemoryCheckpointer, PendingInterrupt};
pub use error::{EngineError, NodeError};
pub use executor::{Executor, InterruptView, RunOutcome, DEFAULT_MAX_STEPS};
pub use graph::{Graph, GraphBuilder, GraphError, END};
pub use llm::{LanguageModel, ModelError, OpenAiClient};
pub use node::{InterruptRequest, Node, NodeContext, NodeOutcome};
pub use records::{DreamRecord, DreamRecords, JsonFileRecords, MemoryRecords, NewDream, RecordFilter, RecordsError, ScoredRecord};
pub use state::{FlowState, Message, Role};

// Dream workflow exports
pub use dream::{
    build_dream_workflow, AnalysisMode, Assistant, DreamPatch, DreamState, PendingAction, Persona,
    Session, TurnInput, TurnOutcome, TurnReply,
};
