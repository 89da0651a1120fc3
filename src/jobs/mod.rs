pub mod record;
pub mod store;

pub use record::{ItemOutcome, ItemResult, JobOutcome, JobRecord, JobStatus};
pub use store::{AppendOutcome, JobStore, StoreError};
