#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use serde::Serialize;

use crate::job::model::{Job, JobStatus, Priority};
use crate::job::phase::Phase;

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct JobStats {
    pub total: usize,
    pub average_progress: u8,
    pub by_status: BTreeMap<JobStatus, usize>,
    pub by_priority: BTreeMap<Priority, usize>,
    pub by_phase: BTreeMap<Phase, usize>,
}

impl JobStats {
    /// Every status, priority and phase key is present, zero-filled.
    #[must_use]
    pub fn collect(jobs: &[Job]) -> Self {
        let mut by_status: BTreeMap<JobStatus, usize> =
            JobStatus::ALL.into_iter().map(|s| (s, 0)).collect();
        let mut by_priority: BTreeMap<Priority, usize> =
            Priority::ALL.into_iter().map(|p| (p, 0)).collect();
        let mut by_phase: BTreeMap<Phase, usize> =
            Phase::ALL.into_iter().map(|p| (p, 0)).collect();

        let mut sum: u64 = 0;
        for job in jobs {
            *by_status.entry(job.status()).or_insert(0) += 1;
            *by_priority.entry(job.priority).or_insert(0) += 1;
            *by_phase.entry(job.phase()).or_insert(0) += 1;
            sum += u64::from(job.percent_complete);
        }

        Self {
            total: jobs.len(),
            average_progress: average(sum, jobs.len()),
            by_status,
            by_priority,
            by_phase,
        }
    }

    #[must_use]
    pub fn status_count(&self, status: JobStatus) -> usize {
        self.by_status.get(&status).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn priority_count(&self, priority: Priority) -> usize {
        self.by_priority.get(&priority).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn phase_count(&self, phase: Phase) -> usize {
        self.by_phase.get(&phase).copied().unwrap_or(0)
    }
}

/// Rounded mean, half away from zero. Empty input averages to 0.
fn average(sum: u64, count: usize) -> u8 {
    if count == 0 {
        return 0;
    }
    let count = count as u64;
    let rounded = (sum * 2 + count) / (count * 2);
    u8::try_from(rounded.min(100)).unwrap_or(100)
}
