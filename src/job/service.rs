#![forbid(unsafe_code)]

use time::OffsetDateTime;
use tracing::info;

use crate::error::ValveError;
use crate::job::model::{Job, JobPatch, JobStatus, NewJob, Priority};
use crate::job::sample::sample_jobs;
use crate::job::stats::JobStats;
use crate::job::storage::JobStore;
use crate::sheet::decode::ParsedBatch;
use crate::sync::merge::{MergeSummary, reconcile};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobFilter {
    pub status: Option<JobStatus>,
    pub priority: Option<Priority>,
    /// Case-insensitive substring over valve ID, description, technician and notes.
    pub search: Option<String>,
}

impl JobFilter {
    #[must_use]
    pub fn matches(&self, job: &Job) -> bool {
        if self.status.is_some_and(|s| job.status() != s) {
            return false;
        }
        if self.priority.is_some_and(|p| job.priority != p) {
            return false;
        }
        let Some(needle) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) else {
            return true;
        };
        let needle = needle.to_lowercase();
        [
            Some(job.valve_id.as_str()),
            Some(job.description.as_str()),
            job.assigned_to.as_deref(),
            job.notes.as_deref(),
        ]
        .into_iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(&needle))
    }
}

/// Record operations over an injected store.
///
/// Every mutating call is one load, compute, save sequence. Callers must not
/// run two of them at once against the same store; nothing here locks.
#[derive(Debug, Clone)]
pub struct JobBook<S> {
    store: S,
}

impl<S: JobStore> JobBook<S> {
    #[must_use]
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn all(&self) -> Result<Vec<Job>, ValveError> {
        self.store.load_all()
    }

    /// Matching jobs, most recently updated first.
    pub fn list(&self, filter: &JobFilter) -> Result<Vec<Job>, ValveError> {
        let mut jobs: Vec<Job> = self
            .store
            .load_all()?
            .into_iter()
            .filter(|j| filter.matches(j))
            .collect();
        jobs.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then_with(|| a.valve_id.cmp(&b.valve_id))
        });
        Ok(jobs)
    }

    pub fn get(&self, id: &str) -> Result<Job, ValveError> {
        self.store
            .load_all()?
            .into_iter()
            .find(|j| j.id == id)
            .ok_or_else(|| ValveError::NotFound(id.to_owned()))
    }

    /// Exact id, then exact valve ID, then a unique id prefix.
    pub fn find(&self, pattern: &str) -> Result<Job, ValveError> {
        let pattern = pattern.trim();
        if pattern.is_empty() {
            return Err(ValveError::Validation("job ID or valve ID is required".to_owned()));
        }
        let jobs = self.store.load_all()?;
        if let Some(job) = jobs.iter().find(|j| j.id == pattern) {
            return Ok(job.clone());
        }
        if let Some(job) = jobs.iter().find(|j| j.valve_id == pattern) {
            return Ok(job.clone());
        }
        let mut prefixed = jobs.into_iter().filter(|j| j.id.starts_with(pattern));
        match (prefixed.next(), prefixed.next()) {
            (Some(job), None) => Ok(job),
            (Some(_), Some(_)) => Err(ValveError::Validation(format!(
                "'{pattern}' matches more than one job"
            ))),
            _ => Err(ValveError::NotFound(pattern.to_owned())),
        }
    }

    pub fn create(&self, input: NewJob, now: OffsetDateTime) -> Result<Job, ValveError> {
        let valve_id = required(&input.valve_id, "valve ID")?;
        let description = required(&input.description, "description")?;

        let mut jobs = self.store.load_all()?;
        if jobs.iter().any(|j| j.valve_id == valve_id) {
            return Err(ValveError::DuplicateValveId(valve_id));
        }

        let job = Job {
            id: Job::new_id(now),
            valve_id,
            description,
            priority: input.priority,
            assigned_to: optional(input.assigned_to.as_deref()),
            notes: optional(input.notes.as_deref()),
            percent_complete: input.percent_complete.min(100),
            created_at: now,
            updated_at: now,
            estimated_completion: input.estimated_completion,
        };
        jobs.push(job.clone());
        self.store.save_all(&jobs)?;
        info!(id = %job.id, valve_id = %job.valve_id, "created job");
        Ok(job)
    }

    pub fn update(
        &self,
        id: &str,
        patch: JobPatch,
        now: OffsetDateTime,
    ) -> Result<Job, ValveError> {
        let mut jobs = self.store.load_all()?;
        let idx = jobs
            .iter()
            .position(|j| j.id == id)
            .ok_or_else(|| ValveError::NotFound(id.to_owned()))?;

        let mut job = jobs[idx].clone();
        if let Some(raw) = patch.valve_id.as_deref() {
            let valve_id = required(raw, "valve ID")?;
            if jobs.iter().any(|j| j.id != id && j.valve_id == valve_id) {
                return Err(ValveError::DuplicateValveId(valve_id));
            }
            job.valve_id = valve_id;
        }
        if let Some(raw) = patch.description.as_deref() {
            job.description = required(raw, "description")?;
        }
        if let Some(priority) = patch.priority {
            job.priority = priority;
        }
        if let Some(raw) = patch.assigned_to.as_deref() {
            job.assigned_to = optional(Some(raw));
        }
        if let Some(raw) = patch.notes.as_deref() {
            job.notes = optional(Some(raw));
        }
        if let Some(percent) = patch.percent_complete {
            job.percent_complete = percent.min(100);
        }
        if let Some(eta) = patch.estimated_completion {
            job.estimated_completion = eta;
        }
        job.updated_at = now.max(job.created_at);

        jobs[idx] = job.clone();
        self.store.save_all(&jobs)?;
        info!(id = %job.id, valve_id = %job.valve_id, "updated job");
        Ok(job)
    }

    pub fn delete(&self, id: &str) -> Result<Job, ValveError> {
        let mut jobs = self.store.load_all()?;
        let idx = jobs
            .iter()
            .position(|j| j.id == id)
            .ok_or_else(|| ValveError::NotFound(id.to_owned()))?;
        let removed = jobs.remove(idx);
        self.store.save_all(&jobs)?;
        info!(id = %removed.id, valve_id = %removed.valve_id, "deleted job");
        Ok(removed)
    }

    pub fn reset(&self) -> Result<(), ValveError> {
        self.store.clear()?;
        info!("cleared all jobs");
        Ok(())
    }

    /// Appends the sample jobs; existing jobs are untouched.
    pub fn load_sample(&self, now: OffsetDateTime) -> Result<Vec<Job>, ValveError> {
        let mut jobs = self.store.load_all()?;
        let samples = sample_jobs(now);
        jobs.extend(samples.iter().cloned());
        self.store.save_all(&jobs)?;
        info!(count = samples.len(), "loaded sample jobs");
        Ok(samples)
    }

    pub fn stats(&self) -> Result<JobStats, ValveError> {
        Ok(JobStats::collect(&self.store.load_all()?))
    }

    /// Reconciles a decoded batch into the store.
    ///
    /// Nothing is persisted unless the whole merged set is written; on a
    /// failed save the previous data stays as it was.
    pub fn import(
        &self,
        batch: ParsedBatch,
        now: OffsetDateTime,
    ) -> Result<MergeSummary, ValveError> {
        let existing = self.store.load_all()?;
        let outcome = reconcile(existing, batch.jobs, now);
        self.store.save_all(&outcome.merged)?;
        info!(added = outcome.added, updated = outcome.updated, "imported jobs");
        Ok(outcome.summary())
    }

    /// Same computation as `import`, without saving.
    pub fn preview_import(
        &self,
        batch: ParsedBatch,
        now: OffsetDateTime,
    ) -> Result<MergeSummary, ValveError> {
        let existing = self.store.load_all()?;
        Ok(reconcile(existing, batch.jobs, now).summary())
    }
}

fn required(raw: &str, what: &str) -> Result<String, ValveError> {
    let v = raw.trim();
    if v.is_empty() {
        return Err(ValveError::Validation(format!("{what} is required")));
    }
    Ok(v.to_owned())
}

fn optional(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim).filter(|s| !s.is_empty()).map(str::to_owned)
}
