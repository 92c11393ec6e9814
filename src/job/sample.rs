#![forbid(unsafe_code)]

use time::{Duration, OffsetDateTime};

use crate::job::model::{Job, Priority};

struct SampleJob {
    valve_id: &'static str,
    description: &'static str,
    priority: Priority,
    assigned_to: Option<&'static str>,
    notes: Option<&'static str>,
    percent: u8,
    created_ago: Duration,
    updated_ago: Duration,
    eta_offset: Option<Duration>,
}

const SAMPLES: [SampleJob; 5] = [
    SampleJob {
        valve_id: "VLV-001",
        description: "Replace valve seat and stem",
        priority: Priority::High,
        assigned_to: Some("John Smith"),
        notes: Some("Customer requested expedited service"),
        percent: 30,
        created_ago: Duration::days(2),
        updated_ago: Duration::hours(1),
        eta_offset: Some(Duration::days(1)),
    },
    SampleJob {
        valve_id: "VLV-002",
        description: "Pressure test and recalibration",
        priority: Priority::Medium,
        assigned_to: Some("Sarah Johnson"),
        notes: Some("Waiting for parts delivery"),
        percent: 10,
        created_ago: Duration::days(1),
        updated_ago: Duration::days(1),
        eta_offset: Some(Duration::days(3)),
    },
    SampleJob {
        valve_id: "VLV-003",
        description: "Complete overhaul and inspection",
        priority: Priority::Low,
        assigned_to: Some("Mike Davis"),
        notes: Some("All tests passed successfully"),
        percent: 100,
        created_ago: Duration::days(5),
        updated_ago: Duration::hours(6),
        eta_offset: Some(Duration::hours(-6)),
    },
    SampleJob {
        valve_id: "VLV-004",
        description: "Leak repair and seal replacement",
        priority: Priority::High,
        assigned_to: Some("Emily Brown"),
        notes: Some("Awaiting customer approval for additional work"),
        percent: 65,
        created_ago: Duration::days(3),
        updated_ago: Duration::days(2),
        eta_offset: None,
    },
    SampleJob {
        valve_id: "VLV-005",
        description: "Routine maintenance check",
        priority: Priority::Low,
        assigned_to: None,
        notes: None,
        percent: 0,
        created_ago: Duration::hours(12),
        updated_ago: Duration::hours(12),
        eta_offset: Some(Duration::days(5)),
    },
];

/// Five demo jobs. IDs and valve IDs carry a timestamp suffix so repeated
/// loads never collide with each other or with real keys.
#[must_use]
pub fn sample_jobs(now: OffsetDateTime) -> Vec<Job> {
    let millis = now.unix_timestamp_nanos() / 1_000_000;
    SAMPLES
        .iter()
        .enumerate()
        .map(|(i, s)| Job {
            id: format!("sample-{millis}-{i}"),
            valve_id: format!("{}-{millis}", s.valve_id),
            description: s.description.to_owned(),
            priority: s.priority,
            assigned_to: s.assigned_to.map(str::to_owned),
            notes: s.notes.map(str::to_owned),
            percent_complete: s.percent,
            created_at: now - s.created_ago,
            updated_at: now - s.updated_ago,
            estimated_completion: s.eta_offset.map(|d| now + d),
        })
        .collect()
}
