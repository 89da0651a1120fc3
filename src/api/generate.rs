use actix_web::{
    http::header::{ContentDisposition, DispositionParam, DispositionType},
    post,
    web::{Data, ServiceConfig},
    HttpResponse,
};
use actix_web_validator::Json;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use validator::Validate;

use crate::api::error::ServiceError;
use crate::artifact::{render_word_deck, safe_file_stem, PPTX_CONTENT_TYPE};
use crate::generator::{null_as_empty, ItemGenerator, ModelSelection, Provider, WordContent};

/// Body of a single-word deck request. Any field left empty is generated.
#[derive(Deserialize, Debug, Validate)]
pub struct GenerateWordRequest {
    #[validate(length(min = 1, max = 100, message = "Word must be between 1 and 100 characters"))]
    pub word: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub definition: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub sentence: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub etymology: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub morphology: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub synonyms: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub antonyms: String,
    #[serde(default)]
    pub provider: Provider,
    #[serde(default)]
    pub model: Option<String>,
}

impl GenerateWordRequest {
    /// What the caller already filled in
    fn provided(&self) -> WordContent {
        let morphology = if self.morphology.trim().is_empty() {
            &self.etymology
        } else {
            &self.morphology
        };
        WordContent {
            word: self.word.trim().to_string(),
            definition: self.definition.trim().to_string(),
            sentence: self.sentence.trim().to_string(),
            morphology: morphology.trim().to_string(),
            synonyms: self.synonyms.trim().to_string(),
            antonyms: self.antonyms.trim().to_string(),
        }
    }
}

/// Builds a single deck on request, outside of any batch job
pub struct WordService {
    generator: Arc<dyn ItemGenerator>,
}

impl WordService {
    pub fn new(generator: Arc<dyn ItemGenerator>) -> Self {
        Self { generator }
    }

    /// Complete the caller's content and render it
    ///
    /// # Business Logic
    /// - The generator only runs when no definition was supplied
    /// - Non-empty fields from the caller win over generated ones
    pub async fn build_deck(&self, request: &GenerateWordRequest) -> Result<(String, Vec<u8>), ServiceError> {
        let mut content = request.provided();
        if content.word.is_empty() {
            return Err(ServiceError::ValidationError("Word must not be blank".to_string()));
        }

        if content.definition.is_empty() {
            let selection = ModelSelection::new(request.provider, request.model.clone());
            info!(
                "Service: Generating content for '{}' (provider={}, model={})",
                content.word,
                selection.provider,
                selection.model_name()
            );
            let generated = self.generator.generate(&content.word, &selection).await?;
            content = merge(content, generated);
        }

        let bytes = render_word_deck(&content)?;
        Ok((format!("Generated_{}.pptx", safe_file_stem(&content.word)), bytes))
    }
}

fn merge(provided: WordContent, generated: WordContent) -> WordContent {
    let pick = |mine: String, theirs: String| if mine.is_empty() { theirs } else { mine };
    WordContent {
        word: provided.word,
        definition: pick(provided.definition, generated.definition),
        sentence: pick(provided.sentence, generated.sentence),
        morphology: pick(provided.morphology, generated.morphology),
        synonyms: pick(provided.synonyms, generated.synonyms),
        antonyms: pick(provided.antonyms, generated.antonyms),
    }
}

/// Generate and download a deck for one word
#[post("/generate-word")]
async fn generate_word(
    service: Data<WordService>,
    request: Json<GenerateWordRequest>,
) -> Result<HttpResponse, ServiceError> {
    let (filename, bytes) = service.build_deck(&request).await?;
    Ok(HttpResponse::Ok()
        .content_type(PPTX_CONTENT_TYPE)
        .insert_header(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename(filename)],
        })
        .body(bytes))
}

pub fn generate_config(config: &mut ServiceConfig) {
    config.service(generate_word);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::validation::json_config;
    use crate::generator::GenerateError;
    use actix_web::{http::StatusCode, test, App};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::json;

    /// Records calls; fails for "xyz" words
    #[derive(Default)]
    struct RecordingGenerator {
        calls: Mutex<Vec<(String, ModelSelection)>>,
    }

    #[async_trait]
    impl ItemGenerator for RecordingGenerator {
        async fn generate(&self, word: &str, selection: &ModelSelection) -> Result<WordContent, GenerateError> {
            self.calls.lock().push((word.to_string(), selection.clone()));
            if word.starts_with("xyz") {
                return Err(GenerateError::EmptyResponse);
            }
            Ok(WordContent {
                word: word.to_string(),
                definition: "generated definition".to_string(),
                sentence: "generated sentence".to_string(),
                morphology: "generated origin".to_string(),
                synonyms: "a, b".to_string(),
                antonyms: String::new(),
            })
        }
    }

    fn request(body: serde_json::Value) -> GenerateWordRequest {
        serde_json::from_value(body).unwrap()
    }

    #[tokio::test]
    async fn user_fields_win_over_generated_ones() {
        let generator = Arc::new(RecordingGenerator::default());
        let service = WordService::new(generator.clone());

        let provided = request(json!({
            "word": " cat ",
            "sentence": "My cat sleeps.",
            "etymology": "Old English catt",
            "provider": "ollama",
            "model": "mistral"
        }))
        .provided();
        let generated = generator
            .generate("cat", &ModelSelection::default())
            .await
            .unwrap();
        let merged = merge(provided, generated);

        assert_eq!(merged.word, "cat");
        assert_eq!(merged.definition, "generated definition");
        assert_eq!(merged.sentence, "My cat sleeps.");
        assert_eq!(merged.morphology, "Old English catt");
        assert_eq!(merged.synonyms, "a, b");

        let (filename, bytes) = service
            .build_deck(&request(json!({"word": "cat", "provider": "ollama", "model": "mistral"})))
            .await
            .unwrap();
        assert_eq!(filename, "Generated_cat.pptx");
        assert!(bytes.starts_with(b"PK"));

        let calls = generator.calls.lock();
        let (word, selection) = calls.last().unwrap();
        assert_eq!(word, "cat");
        assert_eq!(selection.provider, Provider::Ollama);
        assert_eq!(selection.model_name(), "mistral");
    }

    #[::core::prelude::v1::test]
    fn null_fields_count_as_missing() {
        let provided = request(json!({
            "word": "cat",
            "definition": null,
            "morphology": null,
            "etymology": "Old English catt",
            "antonyms": null
        }))
        .provided();

        assert!(provided.definition.is_empty());
        assert_eq!(provided.morphology, "Old English catt");
        assert!(provided.antonyms.is_empty());
    }

    #[tokio::test]
    async fn supplied_definition_skips_generation() {
        let generator = Arc::new(RecordingGenerator::default());
        let service = WordService::new(generator.clone());

        let (filename, _) = service
            .build_deck(&request(json!({"word": "ice cream", "definition": "a frozen dessert"})))
            .await
            .unwrap();

        assert_eq!(filename, "Generated_ice_cream.pptx");
        assert!(generator.calls.lock().is_empty());
    }

    #[actix_web::test]
    async fn endpoint_returns_pptx_attachment() {
        let app = test::init_service(
            App::new()
                .app_data(Data::new(WordService::new(Arc::new(RecordingGenerator::default()))))
                .app_data(json_config())
                .configure(generate_config),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/generate-word")
            .set_json(json!({"word": "dog"}))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get("content-type").unwrap().to_str().unwrap(),
            PPTX_CONTENT_TYPE
        );
        let disposition = resp.headers().get("content-disposition").unwrap().to_str().unwrap();
        assert_eq!(disposition, "attachment; filename=\"Generated_dog.pptx\"");
    }

    #[actix_web::test]
    async fn generation_failure_is_a_server_error_with_detail() {
        let app = test::init_service(
            App::new()
                .app_data(Data::new(WordService::new(Arc::new(RecordingGenerator::default()))))
                .app_data(json_config())
                .configure(generate_config),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/generate-word")
            .set_json(json!({"word": "xyz123"}))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["detail"], "Provider returned no content");
    }

    #[actix_web::test]
    async fn empty_word_fails_validation() {
        let app = test::init_service(
            App::new()
                .app_data(Data::new(WordService::new(Arc::new(RecordingGenerator::default()))))
                .app_data(json_config())
                .configure(generate_config),
        )
        .await;

        for body in [json!({"word": ""}), json!({"word": "   "})] {
            let req = test::TestRequest::post()
                .uri("/generate-word")
                .set_json(body)
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
            let body: serde_json::Value = test::read_body_json(resp).await;
            assert!(body["detail"].is_string());
        }
    }
}
