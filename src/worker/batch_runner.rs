use futures_util::future::join_all;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{Notify, Semaphore};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::artifact::{ArtifactBuilder, ArtifactError};
use crate::generator::{GenerateError, ItemGenerator, ModelSelection};
use crate::jobs::{AppendOutcome, ItemResult, JobOutcome, JobStore};

use super::ingest::read_words;

/// Why a single word failed
#[derive(Error, Debug)]
pub enum ItemError {
    #[error("Content generation failed: {0}")]
    Generate(#[from] GenerateError),

    #[error("Presentation build failed: {0}")]
    Artifact(#[from] ArtifactError),

    #[error("Timed out after {} seconds", .0.as_secs_f32())]
    TimedOut(Duration),
}

/// Drives batches of words through generation and deck building
pub struct BatchRunner {
    store: Arc<JobStore>,
    generator: Arc<dyn ItemGenerator>,
    builder: Arc<dyn ArtifactBuilder>,
    semaphore: Arc<Semaphore>,
    item_timeout: Duration,
    active_batches: AtomicUsize,
    idle: Notify,
}

impl BatchRunner {
    /// Create a runner
    ///
    /// # Arguments
    /// - `max_concurrent_items` - Items processed at once, across all jobs
    /// - `item_timeout` - Budget for one word; a hang past it becomes a failure result
    pub fn new(
        store: Arc<JobStore>,
        generator: Arc<dyn ItemGenerator>,
        builder: Arc<dyn ArtifactBuilder>,
        max_concurrent_items: usize,
        item_timeout: Duration,
    ) -> Self {
        Self {
            store,
            generator,
            builder,
            semaphore: Arc::new(Semaphore::new(max_concurrent_items.max(1))),
            item_timeout,
            active_batches: AtomicUsize::new(0),
            idle: Notify::new(),
        }
    }

    pub fn store(&self) -> &Arc<JobStore> {
        &self.store
    }

    pub fn active_batches(&self) -> usize {
        self.active_batches.load(Ordering::SeqCst)
    }

    /// Ingest an uploaded CSV and start the batch in the background
    ///
    /// Returns the job id once the words are read; CSV parsing runs on the
    /// blocking pool. An unreadable or empty upload still gets a job, finalized
    /// as `failed` with the ingestion error and no items.
    pub async fn submit(self: &Arc<Self>, source: Vec<u8>, selection: ModelSelection) -> Uuid {
        let ingested = match tokio::task::spawn_blocking(move || read_words(&source)).await {
            Ok(result) => result.map_err(|e| e.to_string()),
            Err(e) => Err(format!("Could not read CSV: {e}")),
        };
        let words = match ingested {
            Ok(words) => words,
            Err(error) => {
                let job_id = self.store.create(0);
                warn!("Job {}: ingestion failed: {}", job_id, error);
                self.store.finalize(&job_id, JobOutcome::Failed { error });
                return job_id;
            }
        };

        let job_id = self.store.create(words.len());
        info!(
            "Job {}: accepted {} words (provider={}, model={})",
            job_id,
            words.len(),
            selection.provider,
            selection.model_name()
        );

        self.active_batches.fetch_add(1, Ordering::SeqCst);
        let runner = Arc::clone(self);
        tokio::spawn(async move {
            Arc::clone(&runner).run(job_id, words, selection).await;
            runner.active_batches.fetch_sub(1, Ordering::SeqCst);
            runner.idle.notify_waiters();
        });

        job_id
    }

    /// Process every word of a job, then finalize it
    ///
    /// # Concurrency Model
    /// - Each word takes a semaphore permit before its task is spawned
    /// - The permit travels with the task and is released when the word is recorded
    /// - Results are appended in completion order
    async fn run(self: Arc<Self>, job_id: Uuid, words: Vec<String>, selection: ModelSelection) {
        let selection = Arc::new(selection);
        let mut workers = Vec::with_capacity(words.len());

        for word in words {
            let permit = match self.semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    error!("Job {}: semaphore closed: {:?}", job_id, e);
                    self.record(job_id, ItemResult::failure(word, "Worker pool unavailable"));
                    continue;
                }
            };

            let runner = Arc::clone(&self);
            let selection = Arc::clone(&selection);
            let task_word = word.clone();
            let handle = tokio::spawn(async move {
                let result = runner.process_item(job_id, task_word, selection).await;
                runner.record(job_id, result);
                drop(permit);
            });
            workers.push((word, handle));
        }

        let words: Vec<String> = workers.iter().map(|(word, _)| word.clone()).collect();
        let outcomes = join_all(workers.into_iter().map(|(_, handle)| handle)).await;
        for (word, outcome) in words.into_iter().zip(outcomes) {
            if let Err(e) = outcome {
                // The task died before it could record anything
                error!("Job {}: worker for '{}' crashed: {:?}", job_id, word, e);
                self.record(job_id, ItemResult::failure(word, "Worker crashed"));
            }
        }

        self.store.finalize(&job_id, JobOutcome::Completed);
        match self.store.get(&job_id) {
            Ok(job) => info!(
                "Job {}: completed, {} succeeded, {} failed",
                job_id,
                job.succeeded().count(),
                job.failed().count()
            ),
            Err(e) => warn!("Job {}: finished but no longer tracked: {}", job_id, e),
        }
    }

    /// Run one word in its own task. Generation runs under the item timeout;
    /// the deck is only built from content that arrived in time, and that build
    /// is never cut short, so no file outlives its item result.
    /// Never fails: every way out is turned into an `ItemResult`.
    async fn process_item(&self, job_id: Uuid, word: String, selection: Arc<ModelSelection>) -> ItemResult {
        let generator = Arc::clone(&self.generator);
        let builder = Arc::clone(&self.builder);
        let item_timeout = self.item_timeout;
        let pipeline_word = word.clone();
        let pipeline = tokio::spawn(async move {
            let content = timeout(item_timeout, generator.generate(&pipeline_word, &selection))
                .await
                .map_err(|_| ItemError::TimedOut(item_timeout))??;
            let artifact = builder.build(job_id, &content).await?;
            Ok::<_, ItemError>(artifact)
        });

        match pipeline.await {
            Ok(Ok(artifact)) => {
                debug!("Job {}: '{}' -> {}", job_id, word, artifact.download_url);
                ItemResult::success(word, artifact.filename, artifact.download_url)
            }
            Ok(Err(e @ ItemError::TimedOut(_))) => {
                warn!("Job {}: '{}' timed out after {:?}", job_id, word, self.item_timeout);
                ItemResult::failure(word, e.to_string())
            }
            Ok(Err(e)) => {
                warn!("Job {}: failed for '{}': {}", job_id, word, e);
                ItemResult::failure(word, e.to_string())
            }
            Err(e) => {
                error!("Job {}: pipeline for '{}' panicked: {:?}", job_id, word, e);
                ItemResult::failure(word, "Unexpected error while generating presentation")
            }
        }
    }

    fn record(&self, job_id: Uuid, result: ItemResult) {
        match self.store.append_result(&job_id, result) {
            AppendOutcome::Recorded { processed_items, total_items } => {
                info!("Job {}: progress {}/{}", job_id, processed_items, total_items);
            }
            AppendOutcome::Ignored => debug!("Job {}: result ignored", job_id),
        }
    }

    /// Wait until no batch is running, or the grace period runs out.
    /// Returns `true` if everything drained.
    pub async fn drain(&self, grace: Duration) -> bool {
        let wait = async {
            loop {
                let notified = self.idle.notified();
                if self.active_batches() == 0 {
                    return;
                }
                notified.await;
            }
        };
        timeout(grace, wait).await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::{Artifact, FileArtifactBuilder};
    use crate::generator::WordContent;
    use crate::jobs::JobStatus;
    use crate::test_support::{runner, wait_terminal, ScriptedGenerator};
    use tempfile::TempDir;

    #[tokio::test]
    async fn failing_word_does_not_sink_the_batch() {
        let runner = runner(Duration::from_secs(5));
        let job_id = runner.submit(b"Word\ncat\nxyz123\ndog\n".to_vec(), ModelSelection::default()).await;

        let job = wait_terminal(runner.store(), job_id).await;
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.total_items, 3);
        assert_eq!(job.processed_items, 3);
        assert_eq!(job.files.len(), 3);
        assert!(job.error.is_none());

        let ok: Vec<_> = job.succeeded().collect();
        assert_eq!(ok.len(), 2);
        assert!(ok.iter().all(|item| item.download_url().is_some_and(|u| u.ends_with(".pptx"))));

        let failed: Vec<_> = job.failed().collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].word, "xyz123");
        assert!(!failed[0].error_message().unwrap().is_empty());
    }

    #[tokio::test]
    async fn all_failures_still_complete() {
        let runner = runner(Duration::from_secs(5));
        let job_id = runner.submit(b"Word\nxyz1\nxyz2\nxyz3\nxyz4\n".to_vec(), ModelSelection::default()).await;

        let job = wait_terminal(runner.store(), job_id).await;
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.processed_items, 4);
        assert_eq!(job.failed().count(), 4);
    }

    #[tokio::test]
    async fn ingestion_failure_fails_the_job_without_items() {
        let runner = runner(Duration::from_secs(5));
        let job_id = runner.submit(b"Word\n\n".to_vec(), ModelSelection::default()).await;

        let job = runner.store().get(&job_id).unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.files.is_empty());
        assert_eq!(job.total_items, 0);
        assert_eq!(job.error.as_deref(), Some("No words found in CSV."));
        assert_eq!(runner.active_batches(), 0);
    }

    #[tokio::test]
    async fn hung_item_becomes_a_timeout_failure() {
        let runner = runner(Duration::from_millis(100));
        let job_id = runner.submit(b"Word\nslow\ncat\n".to_vec(), ModelSelection::default()).await;

        let job = wait_terminal(runner.store(), job_id).await;
        assert_eq!(job.status, JobStatus::Completed);
        let slow = job.files.iter().find(|f| f.word == "slow").unwrap();
        assert!(slow.error_message().unwrap().starts_with("Timed out"));
        assert!(job.files.iter().find(|f| f.word == "cat").unwrap().is_success());
    }

    /// Builder that takes longer than the item timeout before writing to disk
    struct SlowFileBuilder(FileArtifactBuilder);

    #[async_trait::async_trait]
    impl ArtifactBuilder for SlowFileBuilder {
        async fn build(&self, job_id: Uuid, content: &WordContent) -> Result<Artifact, ArtifactError> {
            tokio::time::sleep(Duration::from_millis(200)).await;
            self.0.build(job_id, content).await
        }
    }

    #[tokio::test]
    async fn every_deck_on_disk_belongs_to_a_success() {
        let dir = TempDir::new().unwrap();
        let runner = Arc::new(BatchRunner::new(
            Arc::new(JobStore::new()),
            Arc::new(ScriptedGenerator),
            Arc::new(SlowFileBuilder(FileArtifactBuilder::new(dir.path()))),
            2,
            Duration::from_millis(100),
        ));
        let job_id = runner.submit(b"Word\nslow\ncat\n".to_vec(), ModelSelection::default()).await;

        let job = wait_terminal(runner.store(), job_id).await;
        let slow = job.files.iter().find(|f| f.word == "slow").unwrap();
        assert!(slow.error_message().unwrap().starts_with("Timed out"));
        let cat = job.files.iter().find(|f| f.word == "cat").unwrap();
        assert!(cat.is_success());

        let written: Vec<_> = std::fs::read_dir(dir.path().join(job_id.to_string()))
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(written, vec!["cat.pptx".to_string()]);
    }

    #[tokio::test]
    async fn panicking_item_is_recorded_as_failure() {
        let runner = runner(Duration::from_secs(5));
        let job_id = runner.submit(b"Word\nboom\nowl\n".to_vec(), ModelSelection::default()).await;

        let job = wait_terminal(runner.store(), job_id).await;
        assert_eq!(job.processed_items, 2);
        assert!(!job.files.iter().find(|f| f.word == "boom").unwrap().is_success());
    }

    #[tokio::test]
    async fn drain_waits_for_running_batches() {
        let runner = runner(Duration::from_secs(5));
        let job_id = runner.submit(b"Word\na\nb\nc\nd\ne\n".to_vec(), ModelSelection::default()).await;

        assert!(runner.drain(Duration::from_secs(5)).await);
        assert_eq!(runner.active_batches(), 0);
        assert_eq!(runner.store().get(&job_id).unwrap().status, JobStatus::Completed);
    }

    #[tokio::test]
    async fn terminal_snapshot_is_stable() {
        let runner = runner(Duration::from_secs(5));
        let job_id = runner.submit(b"Word\ncat\ndog\n".to_vec(), ModelSelection::default()).await;
        wait_terminal(runner.store(), job_id).await;

        let first = serde_json::to_string(&runner.store().get(&job_id).unwrap()).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        let second = serde_json::to_string(&runner.store().get(&job_id).unwrap()).unwrap();
        assert_eq!(first, second);
    }
}
