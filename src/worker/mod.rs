pub mod batch_runner;
pub mod ingest;
pub mod retention;

pub use batch_runner::BatchRunner;
pub use retention::RetentionSweeper;
