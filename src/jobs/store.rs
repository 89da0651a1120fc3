use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use super::record::{ItemResult, JobOutcome, JobRecord, JobStatus};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum StoreError {
    #[error("Job not found: {0}")]
    NotFound(Uuid),
}

/// What happened to an `append_result` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    Recorded { processed_items: usize, total_items: usize },
    /// Unknown job, terminal job, or a result beyond `total_items`
    Ignored,
}

/// In-memory registry of batch jobs
///
/// Every mutation of a record happens under the write lock, so a snapshot
/// taken by `get` always has `processed_items == files.len()`.
#[derive(Default)]
pub struct JobStore {
    jobs: RwLock<HashMap<Uuid, JobRecord>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a new `processing` job with a fixed item count
    pub fn create(&self, total_items: usize) -> Uuid {
        let job_id = Uuid::new_v4();
        self.jobs.write().insert(job_id, JobRecord::new(job_id, total_items));
        debug!("Created job {} with {} items", job_id, total_items);
        job_id
    }

    /// Owned snapshot of the job's current state
    pub fn get(&self, job_id: &Uuid) -> Result<JobRecord, StoreError> {
        self.jobs
            .read()
            .get(job_id)
            .cloned()
            .ok_or(StoreError::NotFound(*job_id))
    }

    /// Record one finished item and advance `processed_items` in the same step
    pub fn append_result(&self, job_id: &Uuid, result: ItemResult) -> AppendOutcome {
        let mut jobs = self.jobs.write();
        let Some(job) = jobs.get_mut(job_id) else {
            debug!("Dropping result for unknown job {}", job_id);
            return AppendOutcome::Ignored;
        };

        if job.status.is_terminal() || job.processed_items >= job.total_items {
            debug!("Dropping late result for word '{}' on job {}", result.word, job_id);
            return AppendOutcome::Ignored;
        }

        job.files.push(result);
        job.processed_items += 1;

        AppendOutcome::Recorded {
            processed_items: job.processed_items,
            total_items: job.total_items,
        }
    }

    /// Move the job to a terminal state. Returns `false` when the job is
    /// unknown or already terminal; the earlier outcome stands.
    pub fn finalize(&self, job_id: &Uuid, outcome: JobOutcome) -> bool {
        let mut jobs = self.jobs.write();
        let Some(job) = jobs.get_mut(job_id) else {
            return false;
        };
        if job.status.is_terminal() {
            return false;
        }

        match outcome {
            JobOutcome::Completed => job.status = JobStatus::Completed,
            JobOutcome::Failed { error } => {
                job.status = JobStatus::Failed;
                job.error = Some(error);
            }
        }
        job.finished_at = Some(Utc::now());
        true
    }

    /// Remove terminal jobs that finished before `cutoff`.
    /// Jobs still processing are never evicted.
    pub fn evict_finished_before(&self, cutoff: DateTime<Utc>) -> usize {
        let mut jobs = self.jobs.write();
        let before = jobs.len();
        jobs.retain(|_, job| match job.finished_at {
            Some(finished_at) => finished_at >= cutoff,
            None => true,
        });
        before - jobs.len()
    }

    pub fn len(&self) -> usize {
        self.jobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
