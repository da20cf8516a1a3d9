//! Configuration for the dream-agent CLI.
//!
//! Settings come from environment variables (optionally via a `.env`
//! file), with CLI flags overriding on top. Validation fails fast with a
//! clear message rather than letting a bad value surface mid-conversation.

use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

/// Runtime configuration for the assistant.
#[derive(Debug, Clone)]
pub struct Config {
    /// Chat model identifier (e.g. "gpt-4.1-mini").
    pub model: String,

    /// Base URL of the OpenAI-compatible endpoint.
    pub api_base: String,

    /// API key for the endpoint.
    pub api_key: String,

    /// Directory for the dream journal and checkpoints.
    pub data_dir: PathBuf,

    /// Sampling temperature for model calls.
    pub temperature: f32,

    /// Response token cap for model calls.
    pub max_tokens: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: "gpt-4.1-mini".to_string(),
            api_base: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            data_dir: PathBuf::from("./data"),
            temperature: 1.0,
            max_tokens: 700,
        }
    }
}

impl Config {
    /// Load configuration from environment variables, starting from the
    /// defaults. A `.env` file is loaded when present.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();

        let mut config = Config::default();

        if let Ok(val) = env::var("MODEL") {
            config.model = val;
        }
        if let Ok(val) = env::var("OPENAI_API_BASE") {
            config.api_base = val;
        }
        if let Ok(val) = env::var("OPENAI_API_KEY") {
            config.api_key = val;
        }
        if let Ok(val) = env::var("DREAM_DATA_DIR") {
            config.data_dir = PathBuf::from(val);
        }
        if let Ok(val) = env::var("TEMPERATURE") {
            config.temperature = val
                .parse()
                .context("TEMPERATURE must be a valid floating-point number (e.g. 0.7)")?;
        }
        if let Ok(val) = env::var("MAX_TOKENS") {
            config.max_tokens = val
                .parse()
                .context("MAX_TOKENS must be a valid positive integer")?;
        }

        Ok(config)
    }

    /// Validate values before the assistant starts.
    pub fn validate(&self) -> Result<()> {
        if self.model.is_empty() {
            anyhow::bail!("MODEL cannot be empty");
        }
        if self.api_key.is_empty() {
            anyhow::bail!("OPENAI_API_KEY is not set");
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            anyhow::bail!(
                "Temperature must be between 0.0 and 2.0, got: {}",
                self.temperature
            );
        }
        if self.max_tokens == 0 {
            anyhow::bail!("MAX_TOKENS must be at least 1");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.model, "gpt-4.1-mini");
        assert_eq!(config.api_base, "https://api.openai.com/v1");
        assert_eq!(config.max_tokens, 700);
    }

    #[test]
    fn test_validation_requires_api_key() {
        let config = Config::default();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.api_key = "sk-test".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_bad_temperature() {
        let mut config = Config::default();
        config.api_key = "sk-test".to_string();
        config.temperature = 3.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_zero_max_tokens() {
        let mut config = Config::default();
        config.api_key = "sk-test".to_string();
        config.max_tokens = 0;
        assert!(config.validate().is_err());
    }
}
