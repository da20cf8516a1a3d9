//! Prompt templates and rendering helpers for the dream workflow.

use crate::records::DreamRecord;

use super::state::{AnalysisMode, Persona};

/// The affirmative token the confirmation gate accepts.
pub const AFFIRMATIVE: &str = "YES";

/// The negative token offered alongside free-text corrections.
pub const NEGATIVE: &str = "NO";

/// Prompt text for the dream workflow's nodes.
pub struct DreamPrompts;

impl DreamPrompts {
    /// System prompt for the router's classification call.
    pub fn router() -> String {
        "You are the decision router of a dream-analysis chatbot.\n\
         Classify the user's message:\n\
         - \"report\" when the user recounts a dream they had.\n\
         - \"search\" when the user asks to look up or find a past dream.\n\
         - \"command\" when the user asks for an action on their journal \
         (saving, archiving, managing entries).\n\
         - \"chat\" for anything else; then also write a short friendly reply.\n\
         Answer as JSON with fields `route` and `reply` (reply null unless chat)."
            .to_string()
    }

    /// System prompt for the intent node's operation-proposal call.
    pub fn intent(catalog: &str) -> String {
        format!(
            "You manage a dream journal on the user's behalf. Decide which of \
             the available operations the user's request calls for.\n\n\
             Available operations:\n{}\n\n\
             Answer as JSON with fields `reply` and `operations`. Propose every \
             operation the request needs, in order, each with its `operation` \
             name and an `arguments` object. When no operation applies, leave \
             `operations` empty and write a helpful `reply` instead.",
            catalog
        )
    }

    fn persona_prompt(persona: Persona) -> &'static str {
        match persona {
            Persona::Jung => {
                "Persona: JUNGIAN ANALYST. Style: symbolic, archetypes, mythopoeia, \
                 shadow, anima/animus.\n\
                 - Offer multiple hypotheses, never determinism.\n\
                 - No medical diagnoses.\n\
                 Structure:\n\
                 1) Central symbols and possible archetypes\n\
                 2) Relation to individuation and psychic tensions\n\
                 3) Mythological and cultural echoes, if any\n\
                 4) Relations with similar dreams\n\
                 5) Questions to go deeper"
            }
            Persona::Narrative => {
                "Persona: NARRATIVE ANALYST. Focus: plot, characters, conflict, \
                 turns, vivid metaphors.\n\
                 - Highlight structure (setup, conflict, climax, resolution or opening).\n\
                 - Suggest symbolic rewrites.\n\
                 Structure:\n\
                 1) Plot map (setup/conflict/climax/ending)\n\
                 2) Characters and forces at play\n\
                 3) Metaphors and recurring themes\n\
                 4) Relations with similar dreams\n\
                 5) Narrative experiments (if the dreamer revisited the scene...)"
            }
            Persona::Cognitive => {
                "Persona: COGNITIVE-AFFECTIVE ANALYST. Focus: emotion, anxiety, \
                 memory, learning, regulation.\n\
                 - Practical language, parsimonious hypotheses, cognitive biases, \
                 stress cues.\n\
                 - Offer light self-reflection exercises (non-clinical).\n\
                 Structure:\n\
                 1) Dominant emotions and likely triggers\n\
                 2) Hypotheses on the dream's function (consolidation/rehearsal/threat management)\n\
                 3) Relations with current routine and stressors\n\
                 4) Relations with similar dreams\n\
                 5) Small experiments / journal notes for the coming days"
            }
        }
    }

    /// Compose the analysis system prompt for the turn's mode and persona.
    pub fn analysis_system(mode: AnalysisMode, persona: Option<Persona>) -> String {
        let body = match mode {
            AnalysisMode::Ensemble => [Persona::Jung, Persona::Narrative, Persona::Cognitive]
                .iter()
                .map(|p| Self::persona_prompt(*p))
                .collect::<Vec<_>>()
                .join("\n\n"),
            AnalysisMode::Auto | AnalysisMode::Specific => {
                Self::persona_prompt(persona.unwrap_or(Persona::Jung)).to_string()
            }
        };

        format!(
            "You analyze dreams following the methodology of this persona:\n\n{}",
            body
        )
    }

    /// Render the dream plus its retrieved context as the analysis user prompt.
    pub fn dream_with_context(text: &str, context: &[DreamRecord]) -> String {
        format!("DREAM: {}\n\nSIMILAR:\n{}", text, render_context(context))
    }
}

/// Numbered rendering of retrieved records for the analysis prompt.
pub fn render_context(records: &[DreamRecord]) -> String {
    if records.is_empty() {
        return "(none)".to_string();
    }
    records
        .iter()
        .enumerate()
        .map(|(i, r)| format!("#{} ({}; id={})\n{}", i + 1, r.date, r.id, r.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// User-facing rendering of search hits.
pub fn render_search_hits(records: &[DreamRecord]) -> String {
    records
        .iter()
        .enumerate()
        .map(|(i, r)| format!("#{} [{}] = {}\n\n{}", i + 1, r.date, r.title, r.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}
