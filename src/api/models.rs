use actix_web::{
    get,
    web::{Data, Json, ServiceConfig},
};
use tracing::warn;

use crate::generator::{CloudModel, ModelCatalog};

/// Models installed in the local Ollama instance. Empty when Ollama is unreachable.
#[get("/models")]
async fn local_models(catalog: Data<ModelCatalog>) -> Json<Vec<String>> {
    match catalog.local_models().await {
        Ok(models) => Json(models),
        Err(e) => {
            warn!("Could not list Ollama models: {}", e);
            Json(Vec::new())
        }
    }
}

/// Models offered by OpenRouter. Empty on any failure.
#[get("/openrouter-models")]
async fn cloud_models(catalog: Data<ModelCatalog>) -> Json<Vec<CloudModel>> {
    match catalog.cloud_models().await {
        Ok(models) => Json(models),
        Err(e) => {
            warn!("Could not list OpenRouter models: {}", e);
            Json(Vec::new())
        }
    }
}

pub fn models_config(config: &mut ServiceConfig) {
    config.service(local_models).service(cloud_models);
}
