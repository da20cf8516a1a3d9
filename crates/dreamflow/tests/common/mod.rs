//! Shared test support: a scripted language model.
#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;

use dreamflow::llm::{LanguageModel, ModelError};
use dreamflow::state::Message;
use dreamflow::TurnInput;

/// One scripted model response.
pub enum Scripted {
    Text(String),
    Json(Value),
    Fail(String),
}

/// A language model that replays a fixed script of responses.
///
/// Responses are consumed in order regardless of which generate method is
/// called, mirroring the order of model calls along a workflow path.
pub struct ScriptedModel {
    script: Mutex<VecDeque<Scripted>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self { script: Mutex::new(VecDeque::new()) }
    }

    pub fn push_text(self, text: impl Into<String>) -> Self {
        self.script.lock().unwrap().push_back(Scripted::Text(text.into()));
        self
    }

    pub fn push_json(self, value: Value) -> Self {
        self.script.lock().unwrap().push_back(Scripted::Json(value));
        self
    }

    pub fn push_fail(self, message: impl Into<String>) -> Self {
        self.script.lock().unwrap().push_back(Scripted::Fail(message.into()));
        self
    }

    fn pop(&self) -> Scripted {
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .expect("scripted model ran out of responses")
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn generate(&self, _messages: &[Message]) -> Result<String, ModelError> {
        match self.pop() {
            Scripted::Text(text) => Ok(text),
            Scripted::Json(value) => Ok(value.to_string()),
            Scripted::Fail(message) => Err(ModelError::Unavailable(message)),
        }
    }

    async fn generate_json(
        &self,
        _messages: &[Message],
        _schema: &Value,
    ) -> Result<Value, ModelError> {
        match self.pop() {
            Scripted::Json(value) => Ok(value),
            Scripted::Text(text) => serde_json::from_str(&text)
                .map_err(|e| ModelError::SchemaViolation(e.to_string())),
            Scripted::Fail(message) => Err(ModelError::Unavailable(message)),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// A turn of plain user text for `user_id`.
pub fn turn(user_id: &str, text: &str) -> TurnInput {
    TurnInput {
        text: text.to_string(),
        mode: None,
        persona: None,
        user_id: user_id.to_string(),
    }
}
