//! Incremental downloader for Garmin Connect activity files.
//!
//! [`orchestrator::Orchestrator`] lists the activities in a date range and
//! saves each one under a deterministic name, skipping files that already
//! exist so repeated runs only fetch what is missing.

pub mod archive;
pub mod cli;
pub mod error;
pub mod logging;
pub mod naming;
pub mod orchestrator;
pub mod prompt;
pub mod request;
pub mod summary;
pub mod writer;

pub use error::{DownloadError, DownloadResult, FailureReason};
pub use orchestrator::{Orchestrator, run};
pub use request::DownloadRequest;
pub use summary::{ActivityOutcome, DownloadOutcome, Progress, RunSummary};
