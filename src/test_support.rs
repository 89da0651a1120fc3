//! Collaborator fakes shared by unit tests.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::artifact::{Artifact, ArtifactBuilder, ArtifactError};
use crate::generator::{GenerateError, ItemGenerator, ModelSelection, WordContent};
use crate::jobs::{JobRecord, JobStore};
use crate::worker::BatchRunner;

/// Fails on words starting with "xyz", hangs on "slow", panics on "boom"
pub struct ScriptedGenerator;

#[async_trait]
impl ItemGenerator for ScriptedGenerator {
    async fn generate(&self, word: &str, _selection: &ModelSelection) -> Result<WordContent, GenerateError> {
        if word.starts_with("xyz") {
            return Err(GenerateError::Parsing(format!("no entry for {word}")));
        }
        if word == "slow" {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        if word == "boom" {
            panic!("generator exploded");
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
        Ok(WordContent {
            word: word.to_string(),
            definition: format!("meaning of {word}"),
            sentence: format!("A sentence with {word}."),
            ..Default::default()
        })
    }
}

/// Hands out URLs without touching the filesystem
pub struct MemoryBuilder;

#[async_trait]
impl ArtifactBuilder for MemoryBuilder {
    async fn build(&self, job_id: Uuid, content: &WordContent) -> Result<Artifact, ArtifactError> {
        let filename = format!("{}.pptx", content.word);
        Ok(Artifact {
            download_url: format!("/api/download/{job_id}/{filename}"),
            filename,
        })
    }
}

pub fn runner(item_timeout: Duration) -> Arc<BatchRunner> {
    Arc::new(BatchRunner::new(
        Arc::new(JobStore::new()),
        Arc::new(ScriptedGenerator),
        Arc::new(MemoryBuilder),
        2,
        item_timeout,
    ))
}

/// Poll the store until the job settles, checking the count invariant on every read
pub async fn wait_terminal(store: &JobStore, job_id: Uuid) -> JobRecord {
    for _ in 0..500 {
        let job = store.get(&job_id).unwrap();
        assert_eq!(job.processed_items, job.files.len());
        if job.status.is_terminal() {
            return job;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {job_id} never finished");
}
