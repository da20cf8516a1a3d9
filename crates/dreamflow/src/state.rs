//! Workflow state abstraction and chat message types.
//!
//! The engine never inspects workflow state beyond what this trait exposes:
//! how to seed it from caller input, how to merge a node's patch, and which
//! control value routes the next hop. Each workflow defines a fixed state
//! struct (no open field mapping) so structured model output is validated at
//! the boundary where it enters the state.

use serde::{Deserialize, Serialize};

/// Trait for state driven through a workflow graph.
///
/// A state type pairs with a `Patch` type produced by its nodes and an
/// `Input` type supplied by the caller once per turn. Applying a patch must
/// never remove or reorder existing message history; turns only append.
///
/// # Example
///
/// ```ignore
/// impl FlowState for DreamState {
///     type Patch = DreamPatch;
///     type Input = TurnInput;
///
///     fn init(input: TurnInput) -> Self { /* fresh thread */ }
///     fn merge_input(&mut self, input: TurnInput) { /* new turn, old history */ }
///     fn apply(&mut self, patch: DreamPatch) { /* merge node output */ }
///     fn next(&self) -> &str { &self.next }
/// }
/// ```
pub trait FlowState: Clone + Send + Sync + 'static {
    /// The update type produced by nodes.
    type Patch: Send + Sync + 'static;

    /// The per-turn input supplied by the caller.
    type Input: Send + 'static;

    /// Create the state for a brand-new thread from the first input.
    fn init(input: Self::Input) -> Self;

    /// Merge a new turn's input into state carried over from the previous
    /// turn. Message history is preserved; per-turn scratch fields reset.
    fn merge_input(&mut self, input: Self::Input);

    /// Apply a node's patch. Must be append-only with respect to history.
    fn apply(&mut self, patch: Self::Patch);

    /// The control value the graph reads to pick the next hop.
    fn next(&self) -> &str;
}

/// Role of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    /// Result of an executed operation, attributed to the tool layer.
    Tool,
}

/// A role-tagged message in a conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }

    pub fn tool(content: impl Into<String>) -> Self {
        Self { role: Role::Tool, content: content.into() }
    }
}

/// Last assistant-authored message in a history, if any.
pub fn last_assistant(messages: &[Message]) -> Option<&Message> {
    messages.iter().rev().find(|m| m.role == Role::Assistant)
}

/// Last user-authored message in a history, if any.
pub fn last_user(messages: &[Message]) -> Option<&Message> {
    messages.iter().rev().find(|m| m.role == Role::User)
}
