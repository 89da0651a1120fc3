//! Consumer side of the batch API: create a job, poll it until it settles.

pub mod http;
pub mod poller;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::generator::ModelSelection;
use crate::jobs::JobRecord;

pub use http::HttpBatchApi;
pub use poller::{BatchPoller, PollEvent, PollOutcome, PollState};

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Server answered HTTP {status}: {detail}")]
    Status { status: u16, detail: String },

    #[error("Unexpected response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ClientError::Decode(err.to_string())
        } else {
            ClientError::Network(err.to_string())
        }
    }
}

/// A CSV upload plus the model to run it with
#[derive(Debug, Clone)]
pub struct BatchUpload {
    pub file_name: String,
    pub contents: Vec<u8>,
    pub selection: ModelSelection,
}

/// Server operations the poller needs
#[async_trait]
pub trait BatchApi: Send + Sync {
    async fn create_batch(&self, upload: &BatchUpload) -> Result<Uuid, ClientError>;

    async fn batch_status(&self, job_id: Uuid) -> Result<JobRecord, ClientError>;
}
