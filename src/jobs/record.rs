use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Overall state of a batch job
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    /// Terminal states never transition again
    pub fn is_terminal(self) -> bool {
        !matches!(self, JobStatus::Processing)
    }
}

/// How a batch ends
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// Every item has a recorded result, whatever its status
    Completed,
    /// The batch could not proceed at all (ingestion failure)
    Failed { error: String },
}

/// Outcome of one word. Serialized flat next to `word`:
/// `{"status": "success", "filename": .., "download_url": ..}` or
/// `{"status": "failure", "error_message": ..}`
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemOutcome {
    Success {
        filename: String,
        download_url: String,
    },
    Failure {
        error_message: String,
    },
}

/// Result for a single input word, created once the word finishes processing
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct ItemResult {
    pub word: String,
    #[serde(flatten)]
    pub outcome: ItemOutcome,
}

impl ItemResult {
    pub fn success(word: impl Into<String>, filename: impl Into<String>, download_url: impl Into<String>) -> Self {
        Self {
            word: word.into(),
            outcome: ItemOutcome::Success {
                filename: filename.into(),
                download_url: download_url.into(),
            },
        }
    }

    pub fn failure(word: impl Into<String>, error_message: impl Into<String>) -> Self {
        Self {
            word: word.into(),
            outcome: ItemOutcome::Failure {
                error_message: error_message.into(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ItemOutcome::Success { .. })
    }

    pub fn download_url(&self) -> Option<&str> {
        match &self.outcome {
            ItemOutcome::Success { download_url, .. } => Some(download_url),
            ItemOutcome::Failure { .. } => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.outcome {
            ItemOutcome::Success { .. } => None,
            ItemOutcome::Failure { error_message } => Some(error_message),
        }
    }
}

/// State of one batch, also the wire shape of the status endpoint
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct JobRecord {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub total_items: usize,
    pub processed_items: usize,
    pub files: Vec<ItemResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl JobRecord {
    pub(crate) fn new(job_id: Uuid, total_items: usize) -> Self {
        Self {
            job_id,
            status: JobStatus::Processing,
            total_items,
            processed_items: 0,
            files: Vec::with_capacity(total_items),
            error: None,
            created_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn succeeded(&self) -> impl Iterator<Item = &ItemResult> {
        self.files.iter().filter(|item| item.is_success())
    }

    pub fn failed(&self) -> impl Iterator<Item = &ItemResult> {
        self.files.iter().filter(|item| !item.is_success())
    }
}
