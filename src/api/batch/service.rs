use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::dto::BatchCreated;
use crate::api::error::ServiceError;
use crate::generator::ModelSelection;
use crate::jobs::JobRecord;
use crate::worker::BatchRunner;

/// Batch service containing business logic
pub struct BatchService {
    runner: Arc<BatchRunner>,
}

impl BatchService {
    /// Create a new BatchService instance
    pub fn new(runner: Arc<BatchRunner>) -> Self {
        Self { runner }
    }

    /// Start a batch from an uploaded CSV
    ///
    /// # Business Logic
    /// - Ingests the word list off the request thread
    /// - Creates the job (already `failed` when ingestion fails)
    /// - Hands the words to the runner without waiting on them
    pub async fn create_batch(&self, source: Vec<u8>, selection: ModelSelection) -> BatchCreated {
        info!(
            "Service: Creating batch from {} byte upload (provider={})",
            source.len(),
            selection.provider
        );
        let job_id = self.runner.submit(source, selection).await;
        BatchCreated { job_id }
    }

    /// Current snapshot of a job
    ///
    /// # Returns
    /// - `Ok(JobRecord)` - Live state at read time
    /// - `Err(ServiceError::JobNotFound)` - Unknown or malformed id
    pub fn status(&self, job_id: &str) -> Result<JobRecord, ServiceError> {
        let id = Uuid::parse_str(job_id).map_err(|_| ServiceError::JobNotFound(job_id.to_string()))?;
        self.runner
            .store()
            .get(&id)
            .map_err(|_| ServiceError::JobNotFound(job_id.to_string()))
    }
}
