#![forbid(unsafe_code)]

use std::collections::HashMap;

use serde::Serialize;
use time::OffsetDateTime;
use tracing::{debug, warn};

use crate::job::model::Job;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub merged: Vec<Job>,
    pub added: usize,
    pub updated: usize,
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct MergeSummary {
    pub added: usize,
    pub updated: usize,
}

impl MergeOutcome {
    #[must_use]
    pub fn summary(&self) -> MergeSummary {
        MergeSummary {
            added: self.added,
            updated: self.updated,
        }
    }
}

/// Folds `incoming` into `existing` by valve ID.
///
/// A matched record takes every field from the incoming candidate except its
/// own `id` and `created_at`; `updated_at` becomes `now`, or the kept
/// `created_at` if that is later. Unmatched candidates are appended as new
/// records. Existing order is kept and duplicate keys in `existing` collapse
/// into one slot holding the last of them.
///
/// Pure computation: persisting the result is the caller's job, so a failed
/// write never leaves a half-merged set behind.
#[must_use]
pub fn reconcile(existing: Vec<Job>, incoming: Vec<Job>, now: OffsetDateTime) -> MergeOutcome {
    let mut merged: Vec<Job> = Vec::with_capacity(existing.len() + incoming.len());
    let mut index: HashMap<String, usize> = HashMap::with_capacity(merged.capacity());

    for job in existing {
        if let Some(&slot) = index.get(&job.valve_id) {
            warn!(valve_id = %job.valve_id, "duplicate valve ID in stored jobs, keeping the last");
            merged[slot] = job;
            continue;
        }
        index.insert(job.valve_id.clone(), merged.len());
        merged.push(job);
    }

    let mut added = 0;
    let mut updated = 0;
    for candidate in incoming {
        if let Some(&slot) = index.get(&candidate.valve_id) {
            let current = &merged[slot];
            let replacement = Job {
                id: current.id.clone(),
                created_at: current.created_at,
                updated_at: now.max(current.created_at),
                ..candidate
            };
            merged[slot] = replacement;
            updated += 1;
        } else {
            index.insert(candidate.valve_id.clone(), merged.len());
            merged.push(candidate);
            added += 1;
        }
    }

    debug!(added, updated, total = merged.len(), "reconciled import batch");
    MergeOutcome {
        merged,
        added,
        updated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::model::Priority;
    use std::collections::HashSet;
    use time::macros::datetime;

    fn job(id: &str, valve: &str, description: &str, at: OffsetDateTime) -> Job {
        Job {
            id: id.to_owned(),
            valve_id: valve.to_owned(),
            description: description.to_owned(),
            priority: Priority::Medium,
            assigned_to: None,
            notes: None,
            percent_complete: 0,
            created_at: at,
            updated_at: at,
            estimated_completion: None,
        }
    }

    #[test]
    fn empty_incoming_is_identity() {
        let t = datetime!(2024-01-01 0:00 UTC);
        let existing = vec![job("1", "A", "a", t), job("2", "B", "b", t)];
        let out = reconcile(existing.clone(), Vec::new(), datetime!(2024-02-01 0:00 UTC));
        assert_eq!(out.merged, existing);
        assert_eq!(out.added, 0);
        assert_eq!(out.updated, 0);
    }

    #[test]
    fn updates_matched_and_adds_new() {
        let created = datetime!(2024-01-01 0:00 UTC);
        let decoded = datetime!(2024-02-01 0:00 UTC);
        let now = datetime!(2024-02-01 0:00:05 UTC);

        let mut original = job("orig-a", "A", "old", created);
        original.assigned_to = Some("Sam".to_owned());
        let mut incoming_a = job("imported-a", "A", "new", decoded);
        incoming_a.percent_complete = 70;
        let incoming_b = job("imported-b", "B", "fresh", decoded);

        let out = reconcile(vec![original], vec![incoming_a, incoming_b], now);
        assert_eq!(out.updated, 1);
        assert_eq!(out.added, 1);
        assert_eq!(out.merged.len(), 2);

        let a = out.merged.iter().find(|j| j.valve_id == "A").unwrap();
        assert_eq!(a.id, "orig-a");
        assert_eq!(a.created_at, created);
        assert_eq!(a.updated_at, now);
        assert_eq!(a.description, "new");
        assert_eq!(a.percent_complete, 70);
        // Full replacement: absent incoming fields clear stored ones.
        assert_eq!(a.assigned_to, None);

        let b = out.merged.iter().find(|j| j.valve_id == "B").unwrap();
        assert_eq!(b.id, "imported-b");
        assert_eq!(b.description, "fresh");
        assert_eq!(b.created_at, decoded);
    }

    #[test]
    fn every_key_appears_once() {
        let t = datetime!(2024-01-01 0:00 UTC);
        let existing = vec![job("1", "A", "a1", t), job("2", "B", "b", t), job("3", "A", "a2", t)];
        let incoming = vec![job("4", "C", "c", t), job("5", "B", "b2", t), job("6", "C", "c2", t)];

        let out = reconcile(existing, incoming, t);
        let keys: Vec<&str> = out.merged.iter().map(|j| j.valve_id.as_str()).collect();
        let unique: HashSet<&str> = keys.iter().copied().collect();
        assert_eq!(keys.len(), unique.len());
        assert_eq!(unique, HashSet::from(["A", "B", "C"]));

        // Last duplicate wins for stored data.
        let a = out.merged.iter().find(|j| j.valve_id == "A").unwrap();
        assert_eq!(a.description, "a2");

        // C is added once, then updated by its second occurrence.
        assert_eq!(out.added, 1);
        assert_eq!(out.updated, 2);
        let c = out.merged.iter().find(|j| j.valve_id == "C").unwrap();
        assert_eq!(c.id, "4");
        assert_eq!(c.description, "c2");
    }

    #[test]
    fn updated_never_precedes_kept_created() {
        let future = datetime!(2099-12-31 0:00 UTC);
        let now = datetime!(2024-07-01 12:00 UTC);
        let stored = job("orig", "FUT", "x", future);
        let out = reconcile(vec![stored], vec![job("imp", "FUT", "y", now)], now);
        let merged = &out.merged[0];
        assert_eq!(merged.created_at, future);
        assert!(merged.updated_at >= merged.created_at);

        let fresh = reconcile(Vec::new(), vec![job("imp", "NEW", "z", now)], now);
        assert!(fresh.merged.iter().all(|j| j.updated_at >= j.created_at));
    }

    #[test]
    fn valve_id_match_is_case_sensitive() {
        let t = datetime!(2024-01-01 0:00 UTC);
        let out = reconcile(vec![job("1", "vlv-1", "x", t)], vec![job("2", "VLV-1", "y", t)], t);
        assert_eq!(out.added, 1);
        assert_eq!(out.updated, 0);
        assert_eq!(out.merged.len(), 2);
    }
}
