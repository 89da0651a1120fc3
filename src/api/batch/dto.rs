use actix_multipart::form::{bytes::Bytes, text::Text, MultipartForm};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::generator::{ModelSelection, Provider};

/// Multipart body of a batch upload
#[derive(MultipartForm)]
pub struct BatchUploadForm {
    /// CSV with a `Word` column
    pub file: Bytes,
    pub provider: Option<Text<Provider>>,
    pub model: Option<Text<String>>,
}

impl BatchUploadForm {
    pub fn selection(&self) -> ModelSelection {
        ModelSelection::new(
            self.provider.as_ref().map(|p| p.0).unwrap_or_default(),
            self.model.as_ref().map(|m| m.0.clone()),
        )
    }
}

/// Response for batch creation
#[derive(Serialize, Deserialize, Debug)]
pub struct BatchCreated {
    pub job_id: Uuid,
}
