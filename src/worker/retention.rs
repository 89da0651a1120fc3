use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{debug, info};

use crate::jobs::JobStore;

/// Background sweeper that evicts finished jobs once they are older than `retention`
pub struct RetentionSweeper {
    store: Arc<JobStore>,
    retention: Duration,
    interval: Duration,
}

impl RetentionSweeper {
    pub fn new(store: Arc<JobStore>, retention: Duration, interval: Duration) -> Self {
        Self {
            store,
            retention,
            interval,
        }
    }

    /// Evict once. Returns how many jobs were removed.
    pub fn sweep(&self) -> usize {
        // Retention too large to represent: nothing is ever old enough
        let Ok(retention) = chrono::Duration::from_std(self.retention) else {
            return 0;
        };
        let Some(cutoff) = chrono::Utc::now().checked_sub_signed(retention) else {
            return 0;
        };
        self.store.evict_finished_before(cutoff)
    }

    /// Sweep on a fixed interval until the shutdown flag flips
    pub async fn run(self, mut shutdown_rx: watch::Receiver<bool>) {
        info!(
            "Retention sweeper started (retention={:?}, interval={:?})",
            self.retention, self.interval
        );

        loop {
            tokio::select! {
                _ = sleep(self.interval) => {
                    let evicted = self.sweep();
                    if evicted > 0 {
                        info!("Evicted {} expired jobs ({} still tracked)", evicted, self.store.len());
                    } else {
                        debug!("Retention sweep found nothing to evict");
                    }
                }
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("Retention sweeper stopping");
                        return;
                    }
                }
            }
        }
    }
}
