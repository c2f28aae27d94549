//! SchoolNet background worker.
//!
//! Each periodic job lives in [`jobs`] as a plain async function taking the
//! current time, so it can be driven directly from tests. The [`Scheduler`]
//! runs every job on its own interval until cancelled.

pub mod config;
pub mod jobs;
pub mod scheduler;

pub use config::WorkerConfig;
pub use jobs::{Job, JobContext, JobError, JobResult};
pub use scheduler::Scheduler;
