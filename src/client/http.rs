use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::Deserialize;
use std::time::Duration;
use uuid::Uuid;

use super::{BatchApi, BatchUpload, ClientError};
use crate::jobs::JobRecord;

#[derive(Deserialize)]
struct CreatedJob {
    job_id: Uuid,
}

#[derive(Deserialize)]
struct ErrorBody {
    detail: String,
}

/// `BatchApi` over HTTP against a running server
#[derive(Debug, Clone)]
pub struct HttpBatchApi {
    client: Client,
    base_url: String,
}

impl HttpBatchApi {
    /// `timeout` bounds every single request, not the whole session
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ClientError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Fetch an artifact by the `download_url` from a status snapshot
    pub async fn download(&self, download_url: &str) -> Result<Vec<u8>, ClientError> {
        let response = self.client.get(self.url(download_url)).send().await?;
        let response = ensure_ok(response).await?;
        Ok(response.bytes().await?.to_vec())
    }
}

async fn ensure_ok(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<ErrorBody>(&body)
        .map(|e| e.detail)
        .unwrap_or(body);
    Err(ClientError::Status {
        status: status.as_u16(),
        detail,
    })
}

#[async_trait]
impl BatchApi for HttpBatchApi {
    async fn create_batch(&self, upload: &BatchUpload) -> Result<Uuid, ClientError> {
        let file = Part::bytes(upload.contents.clone())
            .file_name(upload.file_name.clone())
            .mime_str("text/csv")?;
        let mut form = Form::new()
            .part("file", file)
            .text("provider", upload.selection.provider.as_str());
        if let Some(model) = &upload.selection.model {
            form = form.text("model", model.clone());
        }

        let response = self
            .client
            .post(self.url("/api/batch/upload"))
            .multipart(form)
            .send()
            .await?;
        let created: CreatedJob = ensure_ok(response).await?.json().await?;
        Ok(created.job_id)
    }

    async fn batch_status(&self, job_id: Uuid) -> Result<JobRecord, ClientError> {
        let response = self
            .client
            .get(self.url(&format!("/api/batch/{job_id}/status")))
            .send()
            .await?;
        Ok(ensure_ok(response).await?.json().await?)
    }
}
