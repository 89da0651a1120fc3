use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{null_as_empty, GenerateError, ItemGenerator, ModelSelection, Provider, ProviderSettings, WordContent};

const SYSTEM_PROMPT: &str = "You are a helpful educational assistant. Output only valid JSON.";

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

/// Fields as the model returns them. Models answer with either
/// `morphology` or `etymology`, sometimes both, and use `null` for "none".
#[derive(Deserialize)]
struct GeneratedFields {
    #[serde(default, deserialize_with = "null_as_empty")]
    definition: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    sentence: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    morphology: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    etymology: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    synonyms: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    antonyms: String,
}

impl GeneratedFields {
    fn into_content(self, word: &str) -> WordContent {
        let morphology = if self.morphology.trim().is_empty() {
            self.etymology
        } else {
            self.morphology
        };
        WordContent {
            word: word.to_string(),
            definition: self.definition,
            sentence: self.sentence,
            morphology,
            synonyms: self.synonyms,
            antonyms: self.antonyms,
        }
    }
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Generator speaking the OpenAI-compatible `/chat/completions` API,
/// which both OpenRouter and Ollama expose
#[derive(Debug, Clone)]
pub struct ChatCompletionGenerator {
    client: Client,
    settings: ProviderSettings,
}

impl ChatCompletionGenerator {
    pub fn new(settings: ProviderSettings) -> Result<Self, GenerateError> {
        let client = Client::builder().timeout(settings.request_timeout).build()?;
        Ok(Self { client, settings })
    }

    fn api_key(&self, provider: Provider) -> Result<String, GenerateError> {
        match provider {
            // Ollama ignores the key but the header must be present
            Provider::Ollama => Ok("ollama".to_string()),
            Provider::Openrouter => self
                .settings
                .openrouter_api_key
                .clone()
                .filter(|key| !key.trim().is_empty())
                .ok_or(GenerateError::MissingApiKey),
        }
    }
}

fn word_prompt(word: &str) -> String {
    format!(
        r#"Provide a JSON object for the word "{word}" with the following fields:
- definition: A clear, simple definition suitable for students.
- sentence: A sentence using the word in context.
- synonyms: A comma-separated string of 5-6 synonyms. Ensure they match the part of speech of "{word}".
- morphology: Explain the word's origin (etymology) and parts (morphology) simply, as if teaching a 10-year-old. Break it down (e.g., prefix, root) if applicable.
- antonyms: A comma-separated string of 3-4 antonyms. CRITICAL: These MUST match the part of speech of "{word}" (e.g., if "{word}" is a noun, antonyms must be nouns). If there are no clear antonyms, return an empty string.

Ensure the response is valid JSON only."#
    )
}

/// Parse model output into word content, tolerating markdown code fences
pub(crate) fn parse_content(word: &str, raw: &str) -> Result<WordContent, GenerateError> {
    let cleaned = raw.replace("```json", "").replace("```", "");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return Err(GenerateError::EmptyResponse);
    }

    let fields: GeneratedFields = serde_json::from_str(cleaned)?;
    Ok(fields.into_content(word))
}

#[async_trait]
impl ItemGenerator for ChatCompletionGenerator {
    async fn generate(&self, word: &str, selection: &ModelSelection) -> Result<WordContent, GenerateError> {
        let api_key = self.api_key(selection.provider)?;
        let url = format!("{}/chat/completions", self.settings.chat_base(selection.provider));
        let model = selection.model_name();

        debug!(provider = %selection.provider, model, word, "Requesting word content");

        let request = ChatRequest {
            model,
            messages: vec![
                ChatMessage { role: "system", content: SYSTEM_PROMPT.to_string() },
                ChatMessage { role: "user", content: word_prompt(word) },
            ],
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(provider = %selection.provider, status = status.as_u16(), "Chat completion rejected");
            return Err(GenerateError::Api { status: status.as_u16(), body });
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| GenerateError::Parsing(e.to_string()))?;

        let raw = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(GenerateError::EmptyResponse)?;

        parse_content(word, &raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings(server: &MockServer, key: Option<&str>) -> ProviderSettings {
        ProviderSettings {
            ollama_url: server.uri(),
            openrouter_url: format!("{}/api/v1", server.uri()),
            openrouter_api_key: key.map(str::to_string),
            request_timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn fenced_json_is_accepted() {
        let raw = "```json\n{\"definition\": \"a small pet\", \"etymology\": \"Old English catt\"}\n```";
        let content = parse_content("cat", raw).unwrap();
        assert_eq!(content.word, "cat");
        assert_eq!(content.definition, "a small pet");
        assert_eq!(content.morphology, "Old English catt");
        assert!(content.synonyms.is_empty());
    }

    #[test]
    fn null_fields_read_as_empty() {
        let raw = r#"{"definition": "a small pet", "sentence": "The cat sat.", "synonyms": "kitty, puss", "antonyms": null, "morphology": null}"#;
        let content = parse_content("cat", raw).unwrap();
        assert_eq!(content.definition, "a small pet");
        assert_eq!(content.synonyms, "kitty, puss");
        assert!(content.antonyms.is_empty());
        assert!(content.morphology.is_empty());
    }

    #[test]
    fn morphology_wins_over_etymology() {
        let both = parse_content("cat", r#"{"morphology": "m", "etymology": "e"}"#).unwrap();
        assert_eq!(both.morphology, "m");

        let blank = parse_content("cat", r#"{"morphology": " ", "etymology": "e"}"#).unwrap();
        assert_eq!(blank.morphology, "e");
    }

    #[test]
    fn non_json_content_is_a_parse_error() {
        assert!(matches!(parse_content("cat", "I don't know"), Err(GenerateError::Parsing(_))));
        assert!(matches!(parse_content("cat", "``` ```"), Err(GenerateError::EmptyResponse)));
    }

    #[tokio::test]
    async fn ollama_request_hits_v1_chat_endpoint() {
        let server = MockServer::start().await;
        let content = json!({"definition": "a loyal animal", "sentence": "The dog barked.", "synonyms": "hound, pup"});
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": content.to_string()}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let generator = ChatCompletionGenerator::new(settings(&server, None)).unwrap();
        let result = generator
            .generate("dog", &ModelSelection::new(Provider::Ollama, None))
            .await
            .unwrap();

        assert_eq!(result.word, "dog");
        assert_eq!(result.sentence, "The dog barked.");
        assert_eq!(result.synonyms, "hound, pup");
    }

    #[tokio::test]
    async fn openrouter_sends_bearer_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/chat/completions"))
            .and(header("authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": "{\"definition\": \"d\"}"}}]
            })))
            .mount(&server)
            .await;

        let generator = ChatCompletionGenerator::new(settings(&server, Some("secret"))).unwrap();
        let result = generator
            .generate("cat", &ModelSelection::default())
            .await
            .unwrap();
        assert_eq!(result.definition, "d");
    }

    #[tokio::test]
    async fn openrouter_without_key_fails_fast() {
        let server = MockServer::start().await;
        let generator = ChatCompletionGenerator::new(settings(&server, None)).unwrap();

        let err = generator.generate("cat", &ModelSelection::default()).await.unwrap_err();
        assert!(matches!(err, GenerateError::MissingApiKey));
    }

    #[tokio::test]
    async fn http_errors_carry_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .mount(&server)
            .await;

        let generator = ChatCompletionGenerator::new(settings(&server, None)).unwrap();
        let err = generator
            .generate("cat", &ModelSelection::new(Provider::Ollama, Some("llama3".into())))
            .await
            .unwrap_err();

        match err {
            GenerateError::Api { status, body } => {
                assert_eq!(status, 429);
                assert_eq!(body, "slow down");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
