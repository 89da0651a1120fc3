use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::client::{poller::DEFAULT_POLL_INTERVAL, BatchPoller, BatchUpload, ClientError, HttpBatchApi, PollOutcome};
use crate::generator::{ModelSelection, Provider};
use crate::jobs::{ItemOutcome, JobRecord};

#[derive(Parser, Debug)]
#[command(name = "spelling-decks", version, about = "Turn vocabulary lists into slide decks")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP server (the default)
    Serve,
    /// Upload a CSV to a running server and wait for its decks
    Submit(SubmitArgs),
}

#[derive(Args, Debug)]
pub struct SubmitArgs {
    /// CSV file with a `Word` column
    pub csv: PathBuf,

    #[arg(long, default_value = "http://127.0.0.1:8000")]
    pub server: String,

    /// openrouter or ollama
    #[arg(long, default_value_t = Provider::Openrouter)]
    pub provider: Provider,

    #[arg(long)]
    pub model: Option<String>,

    /// Delay between status reads
    #[arg(long, default_value_t = DEFAULT_POLL_INTERVAL.as_millis() as u64)]
    pub interval_ms: u64,

    /// Where finished decks are saved
    #[arg(long, default_value = "decks")]
    pub out: PathBuf,
}

#[derive(Error, Debug)]
pub enum SubmitError {
    #[error("Cannot read {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },

    #[error("Cannot write decks: {0}")]
    Write(#[from] std::io::Error),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("Batch did not complete: {0}")]
    Unfinished(String),
}

/// Upload, follow progress until the job settles, then fetch every deck
pub async fn submit(args: SubmitArgs) -> Result<(), SubmitError> {
    let contents = tokio::fs::read(&args.csv).await.map_err(|source| SubmitError::Read {
        path: args.csv.clone(),
        source,
    })?;
    let upload = BatchUpload {
        file_name: args
            .csv
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "words.csv".to_string()),
        contents,
        selection: ModelSelection::new(args.provider, args.model),
    };

    let api = HttpBatchApi::new(&args.server, Duration::from_secs(30))?;

    // CTRL+C stops watching; the batch keeps running on the server
    let (cancel_tx, cancel_rx) = watch::channel(false);
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = cancel_tx.send(true);
        }
    });

    let mut poller = BatchPoller::new(api, Duration::from_millis(args.interval_ms), cancel_rx);
    let outcome = poller
        .run(&upload, |job| {
            println!("{:?}: {}/{} words processed", job.status, job.processed_items, job.total_items);
        })
        .await;
    ctrl_c.abort();

    match outcome {
        PollOutcome::Succeeded(job) => {
            report_failures(&job);
            let saved = save_decks(poller.api(), &job, &args.out).await?;
            println!("Saved {} of {} decks to {}", saved, job.total_items, args.out.display());
            Ok(())
        }
        PollOutcome::Failed { reason, .. } => Err(SubmitError::Unfinished(reason)),
        PollOutcome::Cancelled { job_id, snapshot } => {
            let progress = snapshot
                .map(|job| format!(" at {}/{}", job.processed_items, job.total_items))
                .unwrap_or_default();
            match job_id {
                Some(id) => println!("Stopped watching job {id}{progress}; it keeps running on the server"),
                None => println!("Cancelled before the job was created"),
            }
            Ok(())
        }
    }
}

fn report_failures(job: &JobRecord) {
    for item in job.failed() {
        println!("  {}: {}", item.word, item.error_message().unwrap_or_default());
    }
}

/// Download every successful deck into `out`. A deck that cannot be fetched is
/// skipped with a warning; returns how many were written.
async fn save_decks(api: &HttpBatchApi, job: &JobRecord, out: &Path) -> Result<usize, SubmitError> {
    tokio::fs::create_dir_all(out).await?;

    let mut saved = 0;
    for item in job.succeeded() {
        let ItemOutcome::Success { filename, download_url } = &item.outcome else {
            continue;
        };
        // Never let a server-supplied name leave `out`
        let Some(name) = Path::new(filename).file_name() else {
            warn!("Skipping '{}': unusable file name {:?}", item.word, filename);
            continue;
        };

        match api.download(download_url).await {
            Ok(bytes) => {
                tokio::fs::write(out.join(name), bytes).await?;
                info!("Saved deck for '{}'", item.word);
                saved += 1;
            }
            Err(e) => warn!("Could not download deck for '{}': {}", item.word, e),
        }
    }
    Ok(saved)
}
