use actix_web::dev::ServerHandle;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::worker::BatchRunner;

/// Handles graceful shutdown of the application
///
/// On SIGTERM or CTRL+C:
/// 1. Stop the HTTP server (no new uploads or status reads)
/// 2. Signal background tasks such as the retention sweeper
/// 3. Give running batches a grace period to finish
pub struct ShutdownCoordinator {
    server_handle: ServerHandle,
    server_task: JoinHandle<Result<(), std::io::Error>>,
    background_handles: Vec<JoinHandle<()>>,
    shutdown_tx: watch::Sender<bool>,
    runner: Arc<BatchRunner>,
    grace: Duration,
}

impl ShutdownCoordinator {
    pub fn new(
        server_handle: ServerHandle,
        server_task: JoinHandle<Result<(), std::io::Error>>,
        background_handles: Vec<JoinHandle<()>>,
        shutdown_tx: watch::Sender<bool>,
        runner: Arc<BatchRunner>,
        grace: Duration,
    ) -> Self {
        Self {
            server_handle,
            server_task,
            background_handles,
            shutdown_tx,
            runner,
            grace,
        }
    }

    /// Wait for a shutdown signal, then shut down in order
    pub async fn wait_for_shutdown(self) -> Result<(), std::io::Error> {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        let mut terminate = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
        #[cfg(unix)]
        let terminate = terminate.recv();

        #[cfg(not(unix))]
        let terminate = std::future::pending::<Option<()>>();

        tokio::select! {
            result = ctrl_c => {
                result?;
                info!("Received CTRL+C signal, initiating graceful shutdown...");
            }
            _ = terminate => {
                info!("Received SIGTERM signal, initiating graceful shutdown...");
            }
        }

        self.shutdown().await
    }

    async fn shutdown(self) -> Result<(), std::io::Error> {
        // 1. Stop accepting requests
        info!("Stopping HTTP server (no longer accepting new requests)...");
        self.server_handle.stop(true).await;

        // 2. Background tasks
        if let Err(e) = self.shutdown_tx.send(true) {
            error!("Failed to send shutdown signal to background tasks: {:?}", e);
        }
        for handle in self.background_handles {
            if let Err(e) = handle.await {
                error!("Background task failed to stop: {:?}", e);
            }
        }
        info!("Background tasks stopped");

        // 3. Batches in flight
        let active = self.runner.active_batches();
        if active > 0 {
            info!("Waiting up to {:?} for {} running batches...", self.grace, active);
            if self.runner.drain(self.grace).await {
                info!("All batches finished");
            } else {
                warn!(
                    "{} batches still running after {:?}; their jobs stay unfinished",
                    self.runner.active_batches(),
                    self.grace
                );
            }
        }

        match self.server_task.await {
            Ok(Ok(_)) => info!("HTTP server shut down successfully"),
            Ok(Err(e)) => error!("HTTP server encountered error during shutdown: {:?}", e),
            Err(e) => error!("HTTP server task panicked: {:?}", e),
        }

        info!("Graceful shutdown completed");
        Ok(())
    }
}
