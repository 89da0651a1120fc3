use std::time::Duration;
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{BatchApi, BatchUpload, ClientError};
use crate::jobs::{JobRecord, JobStatus};

/// Default delay between status reads
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1500);

/// How a polling session ended
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// The batch reached `completed`; per-item results are in the snapshot
    Succeeded(JobRecord),
    /// Creation failed, a read failed, or the batch reached `failed`
    Failed {
        job_id: Option<Uuid>,
        snapshot: Option<JobRecord>,
        reason: String,
    },
    /// The caller stopped watching. The batch keeps running on the server.
    Cancelled {
        job_id: Option<Uuid>,
        snapshot: Option<JobRecord>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum PollState {
    Idle,
    JobCreated { job_id: Uuid },
    Polling { job_id: Uuid, latest: Option<JobRecord> },
    Terminal(PollOutcome),
}

/// Inputs that move the state machine
#[derive(Debug)]
pub enum PollEvent {
    Created(Result<Uuid, ClientError>),
    StatusRead(Result<JobRecord, ClientError>),
    Cancelled,
}

impl PollState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PollState::Terminal(_))
    }

    pub fn job_id(&self) -> Option<Uuid> {
        match self {
            PollState::Idle => None,
            PollState::JobCreated { job_id } | PollState::Polling { job_id, .. } => Some(*job_id),
            PollState::Terminal(
                PollOutcome::Failed { job_id, .. } | PollOutcome::Cancelled { job_id, .. },
            ) => *job_id,
            PollState::Terminal(PollOutcome::Succeeded(job)) => Some(job.job_id),
        }
    }

    fn latest(self) -> Option<JobRecord> {
        match self {
            PollState::Polling { latest, .. } => latest,
            _ => None,
        }
    }

    /// Apply one event. Terminal states absorb everything.
    pub fn on_event(self, event: PollEvent) -> PollState {
        if self.is_terminal() {
            return self;
        }

        match event {
            PollEvent::Cancelled => PollState::Terminal(PollOutcome::Cancelled {
                job_id: self.job_id(),
                snapshot: self.latest(),
            }),
            PollEvent::Created(Ok(job_id)) => match self {
                PollState::Idle => PollState::JobCreated { job_id },
                other => other,
            },
            PollEvent::Created(Err(e)) => PollState::Terminal(PollOutcome::Failed {
                job_id: None,
                snapshot: None,
                reason: e.to_string(),
            }),
            PollEvent::StatusRead(Ok(job)) => {
                let Some(job_id) = self.job_id() else {
                    return self;
                };
                match job.status {
                    JobStatus::Processing => PollState::Polling { job_id, latest: Some(job) },
                    JobStatus::Completed => PollState::Terminal(PollOutcome::Succeeded(job)),
                    JobStatus::Failed => PollState::Terminal(PollOutcome::Failed {
                        job_id: Some(job_id),
                        reason: job
                            .error
                            .clone()
                            .unwrap_or_else(|| "Batch failed".to_string()),
                        snapshot: Some(job),
                    }),
                }
            }
            PollEvent::StatusRead(Err(e)) => {
                let job_id = self.job_id();
                PollState::Terminal(PollOutcome::Failed {
                    job_id,
                    snapshot: self.latest(),
                    reason: e.to_string(),
                })
            }
        }
    }
}

/// Timer-driven client loop: create a job, then read its status every
/// `interval` until it leaves `processing`.
///
/// Setting the cancel flag (or dropping its sender) ends the session at the
/// next wait; it never touches the job on the server.
pub struct BatchPoller<A> {
    api: A,
    interval: Duration,
    cancel: watch::Receiver<bool>,
}

impl<A: BatchApi> BatchPoller<A> {
    pub fn new(api: A, interval: Duration, cancel: watch::Receiver<bool>) -> Self {
        Self {
            api,
            interval,
            cancel,
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    fn cancelled(&self) -> bool {
        *self.cancel.borrow()
    }

    /// Run a session to its end. `on_progress` sees every snapshot read.
    pub async fn run(
        &mut self,
        upload: &BatchUpload,
        mut on_progress: impl FnMut(&JobRecord),
    ) -> PollOutcome {
        let mut state = PollState::Idle;
        if self.cancelled() {
            state = state.on_event(PollEvent::Cancelled);
        } else {
            let created = self.api.create_batch(upload).await;
            if let Ok(job_id) = &created {
                info!("Batch job {} created", job_id);
            }
            state = state.on_event(PollEvent::Created(created));
        }

        loop {
            let job_id = match &state {
                PollState::Terminal(outcome) => return outcome.clone(),
                PollState::JobCreated { job_id } => *job_id,
                PollState::Polling { job_id, .. } => {
                    let job_id = *job_id;
                    // Wait out the interval unless cancelled first
                    let cancelled = tokio::select! {
                        _ = sleep(self.interval) => false,
                        changed = self.cancel.changed() => changed.is_err() || *self.cancel.borrow(),
                    };
                    if cancelled || self.cancelled() {
                        debug!("Polling for job {} cancelled", job_id);
                        state = state.on_event(PollEvent::Cancelled);
                        continue;
                    }
                    job_id
                }
                PollState::Idle => unreachable!("creation always leaves Idle"),
            };

            let read = self.api.batch_status(job_id).await;
            match &read {
                Ok(job) => {
                    debug!(
                        "Job {}: {:?} {}/{}",
                        job_id, job.status, job.processed_items, job.total_items
                    );
                    on_progress(job);
                }
                Err(e) => warn!("Status read for job {} failed: {}", job_id, e),
            }
            state = state.on_event(PollEvent::StatusRead(read));
        }
    }
}
