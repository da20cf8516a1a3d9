//! OpenAI-compatible chat completion client.
//!
//! Talks to any endpoint implementing the `/chat/completions` wire format.
//! Structured output uses the `json_schema` response format. The client
//! enforces its own request timeout; the engine imposes none of its own,
//! so a hung endpoint surfaces here as [`ModelError::Unavailable`].

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use super::{LanguageModel, ModelError};
use crate::state::Message;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Client for an OpenAI-compatible chat completion endpoint.
pub struct OpenAiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

impl OpenAiClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .expect("default reqwest client");

        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Override the request timeout (default 60s).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("reqwest client with timeout");
        self
    }

    fn request_body(&self, messages: &[Message], response_format: Option<Value>) -> Value {
        let mut body = json!({
            "model": self.model,
            "messages": messages,
        });

        if let Some(temperature) = self.temperature {
            body["temperature"] = json!(temperature);
        }
        if let Some(max_tokens) = self.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }
        if let Some(format) = response_format {
            body["response_format"] = format;
        }

        body
    }

    async fn complete(&self, body: Value) -> Result<String, ModelError> {
        let url = format!("{}/chat/completions", self.base_url);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ModelError::Unavailable(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(ModelError::Unavailable(format!(
                "endpoint returned {}: {}",
                status, detail
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| ModelError::Unavailable(format!("malformed response: {}", e)))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ModelError::Unavailable("response carried no content".to_string()))
    }
}

#[async_trait]
impl LanguageModel for OpenAiClient {
    async fn generate(&self, messages: &[Message]) -> Result<String, ModelError> {
        let body = self.request_body(messages, None);
        self.complete(body).await
    }

    async fn generate_json(
        &self,
        messages: &[Message],
        schema: &Value,
    ) -> Result<Value, ModelError> {
        let format = json!({
            "type": "json_schema",
            "json_schema": {
                "name": "structured_output",
                "schema": schema,
            },
        });

        let body = self.request_body(messages, Some(format));
        let text = self.complete(body).await?;

        serde_json::from_str(&text)
            .map_err(|e| ModelError::SchemaViolation(format!("not valid JSON: {}", e)))
    }

    fn name(&self) -> &str {
        "openai-compatible"
    }
}
