use std::sync::Arc;

use crate::jobs::JobStore;
use crate::worker::BatchRunner;

/// Process-wide handles the operational endpoints read from
pub struct AppState {
    app_name: String,
    runner: Arc<BatchRunner>,
}

impl AppState {
    pub fn new(name: &str, runner: Arc<BatchRunner>) -> Self {
        AppState {
            app_name: name.into(),
            runner,
        }
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn store(&self) -> &JobStore {
        self.runner.store()
    }

    pub fn active_batches(&self) -> usize {
        self.runner.active_batches()
    }
}
