//! Typed state for the dream-analysis workflow.
//!
//! The original open field mapping becomes a fixed struct: control and
//! scratch fields are explicit members, structured model output is
//! validated before it enters the state, and patches are merged through
//! [`FlowState::apply`] so message history can only grow.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::records::DreamRecord;
use crate::state::{FlowState, Message};

/// Caller-supplied context, read-only to nodes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: String,
}

/// How the analysis persona is chosen for a turn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMode {
    /// Fall back to the default persona.
    #[default]
    Auto,
    /// Use exactly the persona the caller picked.
    Specific,
    /// Compose all personas into one reading.
    Ensemble,
}

impl fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AnalysisMode::Auto => "auto",
            AnalysisMode::Specific => "specific",
            AnalysisMode::Ensemble => "ensemble",
        };
        f.write_str(name)
    }
}

impl FromStr for AnalysisMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(AnalysisMode::Auto),
            "specific" => Ok(AnalysisMode::Specific),
            "ensemble" => Ok(AnalysisMode::Ensemble),
            other => Err(format!("unknown analysis mode: {}", other)),
        }
    }
}

/// Analysis persona.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Persona {
    Jung,
    Narrative,
    Cognitive,
}

impl fmt::Display for Persona {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Persona::Jung => "jung",
            Persona::Narrative => "narrative",
            Persona::Cognitive => "cognitive",
        };
        f.write_str(name)
    }
}

impl FromStr for Persona {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "jung" => Ok(Persona::Jung),
            "narrative" => Ok(Persona::Narrative),
            "cognitive" => Ok(Persona::Cognitive),
            other => Err(format!("unknown persona: {}", other)),
        }
    }
}

/// A proposed side-effecting operation awaiting approval or rejection.
///
/// Lives only between the node that proposed it and the confirmation gate
/// that consumes it; never beyond one suspension/resume cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingAction {
    pub id: String,
    pub operation: String,
    pub arguments: Value,
    pub requires_confirmation: bool,
}

/// One turn's caller input.
#[derive(Debug, Clone, Default)]
pub struct TurnInput {
    pub text: String,
    pub mode: Option<AnalysisMode>,
    pub persona: Option<Persona>,
    pub user_id: String,
}

/// Workflow state for one conversation thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DreamState {
    /// Conversation history; append-only within a turn.
    pub messages: Vec<Message>,
    /// The current user utterance.
    pub text: String,
    pub mode: AnalysisMode,
    pub persona: Option<Persona>,
    /// Control field read by conditional edges.
    pub next: String,
    /// Whether the pending operations were pre-approved by the proposer.
    pub approved: bool,
    /// Operations staged for the confirmation gate.
    pub confirmations: Vec<PendingAction>,
    /// The record stored earlier in this turn, if any.
    pub added: Option<DreamRecord>,
    /// Related records retrieved for the analysis prompt.
    pub context: Vec<DreamRecord>,
    pub session: Session,
}

/// Patch produced by one node invocation.
///
/// `next` is mandatory; everything else merges only when set. Messages
/// append, they never replace.
#[derive(Debug, Clone, Default)]
pub struct DreamPatch {
    pub next: String,
    pub messages: Vec<Message>,
    pub persona: Option<Persona>,
    pub approved: Option<bool>,
    pub confirmations: Option<Vec<PendingAction>>,
    pub added: Option<DreamRecord>,
    pub context: Option<Vec<DreamRecord>>,
}

impl DreamPatch {
    pub fn next(next: impl Into<String>) -> Self {
        Self { next: next.into(), ..Default::default() }
    }

    pub fn with_message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }

    pub fn with_messages(mut self, messages: Vec<Message>) -> Self {
        self.messages.extend(messages);
        self
    }

    pub fn with_persona(mut self, persona: Persona) -> Self {
        self.persona = Some(persona);
        self
    }

    pub fn with_approved(mut self, approved: bool) -> Self {
        self.approved = Some(approved);
        self
    }

    pub fn with_confirmations(mut self, confirmations: Vec<PendingAction>) -> Self {
        self.confirmations = Some(confirmations);
        self
    }

    pub fn with_added(mut self, record: DreamRecord) -> Self {
        self.added = Some(record);
        self
    }

    pub fn with_context(mut self, context: Vec<DreamRecord>) -> Self {
        self.context = Some(context);
        self
    }
}

impl FlowState for DreamState {
    type Patch = DreamPatch;
    type Input = TurnInput;

    fn init(input: TurnInput) -> Self {
        let mut state = Self {
            messages: Vec::new(),
            text: String::new(),
            mode: AnalysisMode::default(),
            persona: None,
            next: String::new(),
            approved: false,
            confirmations: Vec::new(),
            added: None,
            context: Vec::new(),
            session: Session::default(),
        };
        state.merge_input(input);
        state
    }

    fn merge_input(&mut self, input: TurnInput) {
        self.messages.push(Message::user(&input.text));
        self.text = input.text;
        if let Some(mode) = input.mode {
            self.mode = mode;
        }
        if let Some(persona) = input.persona {
            self.persona = Some(persona);
        }
        self.session.user_id = input.user_id;

        // Per-turn scratch resets; history stays.
        self.next.clear();
        self.approved = false;
        self.confirmations.clear();
        self.added = None;
        self.context.clear();
    }

    fn apply(&mut self, patch: DreamPatch) {
        self.next = patch.next;
        self.messages.extend(patch.messages);
        if let Some(persona) = patch.persona {
            self.persona = Some(persona);
        }
        if let Some(approved) = patch.approved {
            self.approved = approved;
        }
        if let Some(confirmations) = patch.confirmations {
            self.confirmations = confirmations;
        }
        if let Some(added) = patch.added {
            self.added = Some(added);
        }
        if let Some(context) = patch.context {
            self.context = context;
        }
    }

    fn next(&self) -> &str {
        &self.next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(text: &str) -> TurnInput {
        TurnInput {
            text: text.to_string(),
            mode: None,
            persona: None,
            user_id: "alice".to_string(),
        }
    }

    #[test]
    fn test_init_seeds_history_and_session() {
        let state = DreamState::init(input("I dreamed of a blue door"));

        assert_eq!(state.messages.len(), 1);
        assert_eq!(state.text, "I dreamed of a blue door");
        assert_eq!(state.session.user_id, "alice");
        assert_eq!(state.mode, AnalysisMode::Auto);
        assert!(state.next.is_empty());
    }

    #[test]
    fn test_merge_input_keeps_history_resets_scratch() {
        let mut state = DreamState::init(input("first dream"));
        state.apply(
            DreamPatch::next("end")
                .with_message(Message::assistant("analysis one"))
                .with_approved(true)
                .with_context(vec![]),
        );

        let mut second = input("second dream");
        second.persona = Some(Persona::Narrative);
        state.merge_input(second);

        assert_eq!(state.messages.len(), 3);
        assert_eq!(state.messages[2].content, "second dream");
        assert_eq!(state.text, "second dream");
        assert_eq!(state.persona, Some(Persona::Narrative));
        assert!(!state.approved);
        assert!(state.next.is_empty());
    }

    #[test]
    fn test_apply_appends_never_replaces_history() {
        let mut state = DreamState::init(input("a dream"));
        let before = state.messages.clone();

        state.apply(DreamPatch::next("analysis").with_message(Message::assistant("hm")));

        assert_eq!(&state.messages[..before.len()], &before[..]);
        assert_eq!(state.messages.len(), before.len() + 1);
        assert_eq!(state.next, "analysis");
    }

    #[test]
    fn test_mode_and_persona_parsing() {
        assert_eq!("ensemble".parse::<AnalysisMode>().unwrap(), AnalysisMode::Ensemble);
        assert_eq!("JUNG".parse::<Persona>().unwrap(), Persona::Jung);
        assert!("freudian".parse::<Persona>().is_err());
        assert!("fast".parse::<AnalysisMode>().is_err());
    }

    #[test]
    fn test_state_serialization_roundtrip() {
        let state = DreamState::init(input("a dream"));
        let json = serde_json::to_string(&state).unwrap();
        let back: DreamState = serde_json::from_str(&json).unwrap();
        assert_eq!(back.text, "a dream");
        assert_eq!(back.session.user_id, "alice");
    }
}
