//! Word content generation through a chat-completion provider.

pub mod catalog;
pub mod chat;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub use catalog::{CloudModel, ModelCatalog};
pub use chat::ChatCompletionGenerator;

/// Language-model backend used to fill in word content
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    #[default]
    Openrouter,
    Ollama,
}

impl Provider {
    /// Model used when the caller does not pick one
    pub fn default_model(self) -> &'static str {
        match self {
            Provider::Openrouter => "openai/gpt-3.5-turbo",
            Provider::Ollama => "llama3",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Provider::Openrouter => "openrouter",
            Provider::Ollama => "ollama",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openrouter" => Ok(Provider::Openrouter),
            "ollama" => Ok(Provider::Ollama),
            other => Err(format!("Unknown provider '{other}'. Use 'openrouter' or 'ollama'")),
        }
    }
}

/// Provider and model chosen for one job or one request
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ModelSelection {
    pub provider: Provider,
    pub model: Option<String>,
}

impl ModelSelection {
    pub fn new(provider: Provider, model: Option<String>) -> Self {
        let model = model
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty());
        Self { provider, model }
    }

    pub fn model_name(&self) -> &str {
        self.model
            .as_deref()
            .unwrap_or_else(|| self.provider.default_model())
    }
}

/// Slide content for one word
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq, Default)]
pub struct WordContent {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub word: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub definition: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub sentence: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub morphology: String,
    /// Comma-separated
    #[serde(default, deserialize_with = "null_as_empty")]
    pub synonyms: String,
    /// Comma-separated
    #[serde(default, deserialize_with = "null_as_empty")]
    pub antonyms: String,
}

/// Reads an optional string field; `null` counts as empty
pub(crate) fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Endpoints and credentials shared by the generator and the model catalog
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub ollama_url: String,
    pub openrouter_url: String,
    pub openrouter_api_key: Option<String>,
    pub request_timeout: Duration,
}

impl ProviderSettings {
    pub(crate) fn chat_base(&self, provider: Provider) -> String {
        match provider {
            Provider::Openrouter => self.openrouter_url.trim_end_matches('/').to_string(),
            Provider::Ollama => format!("{}/v1", self.ollama_url.trim_end_matches('/')),
        }
    }
}

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("OpenRouter API key is not configured")]
    MissingApiKey,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Provider returned HTTP {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Failed to parse response: {0}")]
    Parsing(String),

    #[error("Provider returned no content")]
    EmptyResponse,
}

impl From<reqwest::Error> for GenerateError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}

impl From<serde_json::Error> for GenerateError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parsing(err.to_string())
    }
}

/// Produces slide content for a word
#[async_trait]
pub trait ItemGenerator: Send + Sync {
    async fn generate(&self, word: &str, selection: &ModelSelection) -> Result<WordContent, GenerateError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_parses_case_insensitively() {
        assert_eq!("Ollama".parse::<Provider>(), Ok(Provider::Ollama));
        assert_eq!(" openrouter ".parse::<Provider>(), Ok(Provider::Openrouter));
        assert!("gpt".parse::<Provider>().is_err());
    }

    #[test]
    fn blank_model_falls_back_to_provider_default() {
        let selection = ModelSelection::new(Provider::Ollama, Some("  ".into()));
        assert_eq!(selection.model, None);
        assert_eq!(selection.model_name(), "llama3");

        let selection = ModelSelection::new(Provider::Openrouter, Some("google/gemini-flash-1.5".into()));
        assert_eq!(selection.model_name(), "google/gemini-flash-1.5");
    }

    #[test]
    fn provider_parses_lowercase_names() {
        let provider: Provider = serde_json::from_str("\"ollama\"").unwrap();
        assert_eq!(provider, Provider::Ollama);
        assert!(serde_json::from_str::<Provider>("\"gpt\"").is_err());
    }

    #[test]
    fn ollama_chat_base_gets_v1_suffix() {
        let settings = ProviderSettings {
            ollama_url: "http://localhost:11434/".into(),
            openrouter_url: "https://openrouter.ai/api/v1".into(),
            openrouter_api_key: None,
            request_timeout: Duration::from_secs(5),
        };
        assert_eq!(settings.chat_base(Provider::Ollama), "http://localhost:11434/v1");
        assert_eq!(settings.chat_base(Provider::Openrouter), "https://openrouter.ai/api/v1");
    }
}
