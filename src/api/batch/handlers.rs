use actix_multipart::form::MultipartForm;
use actix_web::{
    get, post,
    web::{scope, Data, Json, Path, ServiceConfig},
};

use super::dto::{BatchCreated, BatchUploadForm};
use super::service::BatchService;
use crate::api::error::ServiceError;
use crate::jobs::JobRecord;

/// Accept a CSV upload and start generating one deck per word
#[post("/upload")]
async fn upload_batch(
    service: Data<BatchService>,
    MultipartForm(form): MultipartForm<BatchUploadForm>,
) -> Json<BatchCreated> {
    let selection = form.selection();
    Json(service.create_batch(form.file.data.to_vec(), selection).await)
}

/// Live snapshot of a batch job
#[get("/{job_id}/status")]
async fn batch_status(
    service: Data<BatchService>,
    job_id: Path<String>,
) -> Result<Json<JobRecord>, ServiceError> {
    service.status(&job_id).map(Json)
}

pub fn batch_config(config: &mut ServiceConfig) {
    config.service(scope("/api/batch").service(upload_batch).service(batch_status));
}
