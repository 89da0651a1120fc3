use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{GenerateError, ProviderSettings};

/// Model offered by the cloud provider
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct CloudModel {
    pub id: String,
    pub name: String,
}

#[derive(Deserialize)]
struct OllamaTags {
    #[serde(default)]
    models: Vec<OllamaModel>,
}

#[derive(Deserialize)]
struct OllamaModel {
    name: String,
}

#[derive(Deserialize)]
struct OpenRouterModels {
    #[serde(default)]
    data: Vec<OpenRouterModel>,
}

#[derive(Deserialize)]
struct OpenRouterModel {
    id: String,
    #[serde(default)]
    name: Option<String>,
}

/// Lists the models each provider can serve
#[derive(Debug, Clone)]
pub struct ModelCatalog {
    client: Client,
    settings: ProviderSettings,
}

impl ModelCatalog {
    pub fn new(settings: ProviderSettings) -> Result<Self, GenerateError> {
        let client = Client::builder().timeout(settings.request_timeout).build()?;
        Ok(Self { client, settings })
    }

    /// Model names installed in the local Ollama instance
    pub async fn local_models(&self) -> Result<Vec<String>, GenerateError> {
        let url = format!("{}/api/tags", self.settings.ollama_url.trim_end_matches('/'));
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(GenerateError::Api { status, body });
        }

        let tags: OllamaTags = response
            .json()
            .await
            .map_err(|e| GenerateError::Parsing(e.to_string()))?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    /// Models offered by OpenRouter; entries without a display name reuse the id
    pub async fn cloud_models(&self) -> Result<Vec<CloudModel>, GenerateError> {
        let url = format!("{}/models", self.settings.openrouter_url.trim_end_matches('/'));
        let mut request = self.client.get(&url);
        if let Some(key) = self.settings.openrouter_api_key.as_deref() {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(GenerateError::Api { status, body });
        }

        let models: OpenRouterModels = response
            .json()
            .await
            .map_err(|e| GenerateError::Parsing(e.to_string()))?;
        Ok(models
            .data
            .into_iter()
            .map(|m| CloudModel {
                name: m.name.unwrap_or_else(|| m.id.clone()),
                id: m.id,
            })
            .collect())
    }
}
