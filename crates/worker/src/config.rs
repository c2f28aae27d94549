use std::collections::{HashMap, HashSet};
use std::time::Duration;

use crate::jobs::Job;

/// Worker configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Per-job poll intervals. Jobs missing here use their default.
    pub intervals: HashMap<Job, Duration>,
    /// Jobs that are not scheduled at all.
    pub disabled: HashSet<Job>,
    /// Skip the counselor digests on Saturday and Sunday (UTC).
    pub skip_weekends: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            intervals: HashMap::new(),
            disabled: HashSet::new(),
            skip_weekends: true,
        }
    }
}

impl WorkerConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable                       | Default | Meaning                                |
    /// |--------------------------------|---------|----------------------------------------|
    /// | `WORKER_<JOB>_INTERVAL_SECS`   | per job | Override one job's interval            |
    /// | `WORKER_DISABLED_JOBS`         | (none)  | Comma-separated job names to skip      |
    /// | `WORKER_SKIP_WEEKENDS`         | `true`  | Hold counselor digests over weekends   |
    ///
    /// `<JOB>` is the upper-cased job name, e.g.
    /// `WORKER_UNREAD_MESSAGES_INTERVAL_SECS`.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        for job in Job::ALL {
            let key = format!("WORKER_{}_INTERVAL_SECS", job.name().to_uppercase());
            if let Ok(raw) = std::env::var(&key) {
                match raw.parse::<u64>() {
                    Ok(secs) if secs > 0 => {
                        config.intervals.insert(job, Duration::from_secs(secs));
                    }
                    _ => tracing::warn!(key, value = raw, "Ignoring invalid job interval"),
                }
            }
        }

        if let Ok(raw) = std::env::var("WORKER_DISABLED_JOBS") {
            for name in raw.split(',').map(str::trim).filter(|n| !n.is_empty()) {
                match Job::from_name(name) {
                    Some(job) => {
                        config.disabled.insert(job);
                    }
                    None => tracing::warn!(job = name, "Unknown job in WORKER_DISABLED_JOBS"),
                }
            }
        }

        if let Ok(raw) = std::env::var("WORKER_SKIP_WEEKENDS") {
            config.skip_weekends = !matches!(raw.trim(), "false" | "0" | "no");
        }

        config
    }

    pub fn interval(&self, job: Job) -> Duration {
        self.intervals
            .get(&job)
            .copied()
            .unwrap_or_else(|| job.default_interval())
    }

    pub fn is_enabled(&self, job: Job) -> bool {
        !self.disabled.contains(&job)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_overrides() {
        let config = WorkerConfig::default();
        assert_eq!(config.interval(Job::UnreadMessages), Duration::from_secs(60));
        assert_eq!(config.interval(Job::CounselorWeeklyDigest), Duration::from_secs(7 * 86_400));
        assert!(config.is_enabled(Job::TutorTimeCards));
        assert!(config.skip_weekends);
    }

    #[test]
    fn overrides_and_disabled_jobs() {
        let mut config = WorkerConfig::default();
        config
            .intervals
            .insert(Job::InviteReminders, Duration::from_secs(30));
        config.disabled.insert(Job::LastMeetings);
        assert_eq!(config.interval(Job::InviteReminders), Duration::from_secs(30));
        assert!(!config.is_enabled(Job::LastMeetings));
    }
}
