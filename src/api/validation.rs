use actix_web::HttpResponse;
use serde::Serialize;

/// Error body shared by every endpoint
#[derive(Serialize)]
pub struct ErrorResponse {
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
            fields: None,
        }
    }
}

/// Creates a configured JsonConfig with standardized error handling for the entire project
pub fn json_config() -> actix_web_validator::JsonConfig {
    actix_web_validator::JsonConfig::default()
        .error_handler(|err, _req| {
            let mut fields = serde_json::Map::new();

            let detail = match err {
                actix_web_validator::Error::Validate(validation_errors) => {
                    for (field, errors) in validation_errors.field_errors() {
                        let messages: Vec<String> = errors
                            .iter()
                            .map(|e| {
                                e.message
                                    .as_ref()
                                    .map(|m| m.to_string())
                                    .unwrap_or_else(|| format!("Validation error in field: {}", field))
                            })
                            .collect();
                        fields.insert(
                            field.to_string(),
                            serde_json::json!({"errors": messages})
                        );
                    }
                    "Validation failed"
                }
                actix_web_validator::Error::Deserialize(de_err) => {
                    let err_string = de_err.to_string();

                    if err_string.contains("EOF while parsing") {
                        fields.insert(
                            "message".to_string(),
                            serde_json::json!("Request body is empty. Expected JSON payload")
                        );
                    } else if err_string.contains("unknown variant") {
                        fields.insert(
                            "message".to_string(),
                            serde_json::json!("Invalid provider. Use 'openrouter' or 'ollama'")
                        );
                    } else {
                        fields.insert(
                            "message".to_string(),
                            serde_json::json!("Invalid JSON format")
                        );
                    }
                    "Request validation failed"
                }
                _ => {
                    fields.insert(
                        "message".to_string(),
                        serde_json::json!("Validation error")
                    );
                    "Validation failed"
                }
            };

            let error_response = ErrorResponse {
                detail: detail.to_string(),
                fields: Some(serde_json::Value::Object(fields)),
            };
            actix_web::error::InternalError::from_response(
                "",
                HttpResponse::BadRequest().json(error_response)
            ).into()
        })
}

/// Creates a MultipartFormConfig whose errors use the same JSON body as `json_config`
pub fn multipart_config(limit: usize) -> actix_multipart::form::MultipartFormConfig {
    actix_multipart::form::MultipartFormConfig::default()
        .total_limit(limit)
        .memory_limit(limit)
        .error_handler(|err, _req| {
            let message = err.to_string();
            let error_response = ErrorResponse {
                detail: "Invalid upload".to_string(),
                fields: Some(serde_json::json!({ "message": message })),
            };
            actix_web::error::InternalError::from_response(
                err,
                HttpResponse::BadRequest().json(error_response)
            ).into()
        })
}
