//! Language model boundary.
//!
//! The engine treats model generation as an external, stateless-per-call
//! collaborator behind [`LanguageModel`]. Transport failures and
//! non-conforming structured output are the only failure modes the engine
//! distinguishes; timeout policy belongs to the implementation, not the
//! engine.

mod openai;

pub use openai::OpenAiClient;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::state::Message;

/// Errors from a model call.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Transport-level failure: connection, timeout, non-success status.
    #[error("model unavailable: {0}")]
    Unavailable(String),

    /// A structured-output call returned a value that does not conform to
    /// the requested schema.
    #[error("model response violated schema: {0}")]
    SchemaViolation(String),
}

/// Provider-agnostic chat model interface.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Generate a free-text completion for a conversation.
    async fn generate(&self, messages: &[Message]) -> Result<String, ModelError>;

    /// Generate a JSON value conforming to `schema`.
    ///
    /// Implementations return [`ModelError::SchemaViolation`] when the
    /// model's output cannot be parsed as JSON; callers validate the shape
    /// further via [`parse_structured`].
    async fn generate_json(
        &self,
        messages: &[Message],
        schema: &Value,
    ) -> Result<Value, ModelError>;

    /// Provider name for logging.
    fn name(&self) -> &str;
}

/// Deserialize a structured model output into a typed value, mapping any
/// mismatch to [`ModelError::SchemaViolation`].
pub fn parse_structured<T: DeserializeOwned>(value: Value) -> Result<T, ModelError> {
    serde_json::from_value(value).map_err(|e| ModelError::SchemaViolation(e.to_string()))
}
