#![forbid(unsafe_code)]

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::job::phase::{self, ColorToken, Phase};

/// Coarse filter bucket. Always derived from `percent_complete`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum JobStatus {
    Pending,
    InProgress,
    OnHold,
    Completed,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl JobStatus {
    pub const ALL: [JobStatus; 4] = [
        JobStatus::Pending,
        JobStatus::InProgress,
        JobStatus::OnHold,
        JobStatus::Completed,
    ];

    #[must_use]
    pub fn from_phase(phase: Phase) -> Self {
        match phase {
            Phase::Planned => JobStatus::Pending,
            Phase::Received
            | Phase::PreTest
            | Phase::Teardown
            | Phase::Evaluation
            | Phase::Assembly
            | Phase::FinalTesting
            | Phase::PreparingForShipment => JobStatus::InProgress,
            Phase::AdvisedCostHold | Phase::WaitingOnParts | Phase::OnHold => JobStatus::OnHold,
            Phase::Shipped => JobStatus::Completed,
        }
    }

    #[must_use]
    pub fn from_percent(percent: u8) -> Self {
        Self::from_phase(Phase::from_percent(percent))
    }

    /// Percent used when only a status is known. Maps back to the same status.
    #[must_use]
    pub fn seed_percent(self) -> u8 {
        match self {
            JobStatus::Pending => Phase::Planned.floor(),
            JobStatus::InProgress => Phase::Received.floor(),
            JobStatus::OnHold => Phase::OnHold.floor(),
            JobStatus::Completed => Phase::Shipped.floor(),
        }
    }

    /// Lower-cases and accepts `in progress` / `in_progress` spellings.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let norm = raw.trim().to_lowercase().replace([' ', '_'], "-");
        match norm.as_str() {
            "pending" => Some(JobStatus::Pending),
            "in-progress" => Some(JobStatus::InProgress),
            "on-hold" => Some(JobStatus::OnHold),
            "completed" => Some(JobStatus::Completed),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::InProgress => "in-progress",
            JobStatus::OnHold => "on-hold",
            JobStatus::Completed => "completed",
        }
    }

    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            JobStatus::Pending => "Pending",
            JobStatus::InProgress => "In Progress",
            JobStatus::OnHold => "On Hold",
            JobStatus::Completed => "Completed",
        }
    }
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::High, Priority::Medium, Priority::Low];

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "low" => Some(Priority::Low),
            "medium" => Some(Priority::Medium),
            "high" => Some(Priority::High),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(from = "JobRecord", into = "JobRecord")]
pub struct Job {
    pub id: String,
    pub valve_id: String,
    pub description: String,
    pub priority: Priority,
    pub assigned_to: Option<String>,
    pub notes: Option<String>,
    pub percent_complete: u8,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub estimated_completion: Option<OffsetDateTime>,
}

impl Job {
    /// Time-based identifier with a random suffix.
    #[must_use]
    pub fn new_id(now: OffsetDateTime) -> String {
        let millis = now.unix_timestamp_nanos() / 1_000_000;
        let rand = Uuid::new_v4().simple().to_string();
        let short: String = rand.chars().take(6).collect();
        format!("job-{millis}-{short}")
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        Phase::from_percent(self.percent_complete)
    }

    #[must_use]
    pub fn status(&self) -> JobStatus {
        JobStatus::from_percent(self.percent_complete)
    }

    #[must_use]
    pub fn status_label(&self) -> &'static str {
        phase::derive_status_label(self.percent_complete)
    }

    #[must_use]
    pub fn color(&self) -> ColorToken {
        phase::derive_status_color(self.percent_complete)
    }
}

/// Input for manual creation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewJob {
    pub valve_id: String,
    pub description: String,
    pub priority: Priority,
    pub assigned_to: Option<String>,
    pub notes: Option<String>,
    pub percent_complete: u8,
    pub estimated_completion: Option<OffsetDateTime>,
}

/// Partial edit. `None` leaves a field untouched; an empty string clears
/// an optional text field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobPatch {
    pub valve_id: Option<String>,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    pub assigned_to: Option<String>,
    pub notes: Option<String>,
    pub percent_complete: Option<u8>,
    pub estimated_completion: Option<Option<OffsetDateTime>>,
}

impl JobPatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Persisted shape. Tolerates missing optional fields and unknown enum strings
/// so an older or hand-edited blob still loads.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobRecord {
    id: String,
    valve_id: String,
    #[serde(default)]
    description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    priority: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    assigned_to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    notes: Option<String>,
    #[serde(default, deserialize_with = "de_percent")]
    percent_complete: Option<u8>,
    #[serde(with = "time::serde::rfc3339")]
    created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    updated_at: OffsetDateTime,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    estimated_completion: Option<OffsetDateTime>,
}

#[allow(clippy::cast_possible_truncation)]
fn de_percent<'de, D>(deserializer: D) -> Result<Option<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<f64> = Option::deserialize(deserializer)?;
    Ok(raw
        .filter(|v| v.is_finite())
        .map(|v| phase::clamp_percent(v.round() as i64)))
}

impl From<JobRecord> for Job {
    fn from(r: JobRecord) -> Self {
        let percent_complete = r.percent_complete.unwrap_or_else(|| {
            r.status
                .as_deref()
                .and_then(JobStatus::parse)
                .map_or(0, JobStatus::seed_percent)
        });
        Self {
            id: r.id,
            valve_id: r.valve_id,
            description: r.description,
            priority: r
                .priority
                .as_deref()
                .and_then(Priority::parse)
                .unwrap_or_default(),
            assigned_to: r.assigned_to,
            notes: r.notes,
            percent_complete,
            created_at: r.created_at,
            updated_at: r.updated_at,
            estimated_completion: r.estimated_completion,
        }
    }
}

impl From<Job> for JobRecord {
    fn from(j: Job) -> Self {
        Self {
            status: Some(j.status().as_str().to_owned()),
            priority: Some(j.priority.as_str().to_owned()),
            id: j.id,
            valve_id: j.valve_id,
            description: j.description,
            assigned_to: j.assigned_to,
            notes: j.notes,
            percent_complete: Some(j.percent_complete),
            created_at: j.created_at,
            updated_at: j.updated_at,
            estimated_completion: j.estimated_completion,
        }
    }
}
