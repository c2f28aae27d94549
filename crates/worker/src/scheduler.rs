use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::WorkerConfig;
use crate::jobs::{Job, JobContext};

/// Runs every enabled job on its own interval.
///
/// Jobs run independently: a slow digest never delays the one-minute unread
/// message check. Within one job, ticks missed while a run was in progress
/// are skipped rather than replayed.
pub struct Scheduler {
    ctx: JobContext,
    config: WorkerConfig,
}

impl Scheduler {
    pub fn new(ctx: JobContext, config: WorkerConfig) -> Self {
        Self { ctx, config }
    }

    /// Spawn one task per enabled job. Each stops when `cancel` fires.
    pub fn spawn(&self, cancel: CancellationToken) -> Vec<(Job, JoinHandle<()>)> {
        Job::ALL
            .into_iter()
            .filter(|job| self.config.is_enabled(*job))
            .map(|job| {
                let ctx = self.ctx.clone();
                let period = self.config.interval(job);
                let cancel = cancel.clone();
                tracing::info!(job = job.name(), interval_secs = period.as_secs(), "Scheduling job");
                (job, tokio::spawn(run_job(job, ctx, period, cancel)))
            })
            .collect()
    }

    /// Wait for spawned jobs to stop, giving up on any that take longer
    /// than `timeout`.
    pub async fn join(handles: Vec<(Job, JoinHandle<()>)>, timeout: Duration) {
        for (job, handle) in handles {
            match tokio::time::timeout(timeout, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::error!(job = job.name(), error = %e, "Job task panicked"),
                Err(_) => tracing::warn!(job = job.name(), "Job did not stop in time"),
            }
        }
    }
}

async fn run_job(job: Job, ctx: JobContext, period: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!(job = job.name(), "Job stopping");
                break;
            }
            _ = interval.tick() => {
                match job.run(&ctx, Utc::now()).await {
                    Ok(0) => tracing::debug!(job = job.name(), "Nothing to do"),
                    Ok(count) => tracing::info!(job = job.name(), count, "Job finished"),
                    Err(e) => tracing::error!(job = job.name(), error = %e, "Job failed"),
                }
            }
        }
    }
}
