#![forbid(unsafe_code)]

use std::fmt;

use serde::Serialize;
use time::OffsetDateTime;
use tracing::debug;

use crate::job::model::{Job, JobStatus, Priority};
use crate::job::phase::{self, Phase};
use crate::sheet::columns::{Field, RawRow, resolve};
use crate::sheet::dates::parse_date;

pub const PLACEHOLDER_DESCRIPTION: &str = "No description";

#[derive(Debug, Clone)]
pub struct DecodeOptions {
    /// Prefix for synthetic valve IDs given to rows without one.
    pub valve_id_prefix: String,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            valve_id_prefix: "VLV".to_owned(),
        }
    }
}

/// Something in a row that could not be used as-is. The row is still imported.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RowWarning {
    /// Spreadsheet row number; the header is row 1.
    pub row: usize,
    pub field: &'static str,
    pub value: String,
    pub message: String,
}

impl fmt::Display for RowWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "row {}: {} '{}' {}",
            self.row, self.field, self.value, self.message
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct ParsedBatch {
    pub jobs: Vec<Job>,
    pub warnings: Vec<RowWarning>,
}

impl ParsedBatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

/// Turns raw rows into job candidates stamped with `now`.
///
/// Never fails: unusable cells fall back to defaults and are reported as
/// warnings. Rows with no cells at all are skipped.
#[must_use]
pub fn parse_rows(rows: &[RawRow], opts: &DecodeOptions, now: OffsetDateTime) -> ParsedBatch {
    let millis = now.unix_timestamp_nanos() / 1_000_000;
    let mut batch = ParsedBatch::default();

    for (index, row) in rows.iter().enumerate() {
        if row.values().all(|v| v.trim().is_empty()) {
            continue;
        }
        let mut ctx = RowContext {
            row: index + 2,
            warnings: &mut batch.warnings,
        };

        let valve_id = resolve(row, Field::ValveId).map_or_else(
            || format!("{}-{millis}-{index}", opts.valve_id_prefix),
            str::to_owned,
        );
        let description = resolve(row, Field::Description)
            .unwrap_or(PLACEHOLDER_DESCRIPTION)
            .to_owned();

        let percent = resolve(row, Field::PercentComplete).and_then(|raw| {
            let parsed = parse_percent(raw);
            if parsed.is_none() {
                ctx.warn(Field::PercentComplete, raw, "is not a number, ignored");
            }
            parsed
        });
        let status_seed = resolve(row, Field::Status).and_then(|raw| {
            let seed = status_seed(raw);
            if seed.is_none() {
                ctx.warn(Field::Status, raw, "is not a known status, ignored");
            }
            seed
        });
        let percent_complete = percent.or(status_seed).unwrap_or(0);

        let priority = match resolve(row, Field::Priority) {
            None => Priority::default(),
            Some(raw) => Priority::parse(raw).unwrap_or_else(|| {
                ctx.warn(Field::Priority, raw, "is not a known priority, using medium");
                Priority::default()
            }),
        };

        // Never later than `now`, which becomes `updated_at`.
        let created_at = resolve(row, Field::CreatedAt)
            .and_then(|raw| match parse_date(raw) {
                None => {
                    ctx.warn(Field::CreatedAt, raw, "is not a date, using import time");
                    None
                }
                Some(dt) if dt > now => {
                    ctx.warn(Field::CreatedAt, raw, "is in the future, using import time");
                    None
                }
                Some(dt) => Some(dt),
            })
            .unwrap_or(now);
        let estimated_completion = resolve(row, Field::EstimatedCompletion).and_then(|raw| {
            let parsed = parse_date(raw);
            if parsed.is_none() {
                ctx.warn(Field::EstimatedCompletion, raw, "is not a date, left empty");
            }
            parsed
        });

        batch.jobs.push(Job {
            id: format!("imported-{millis}-{index}"),
            valve_id,
            description,
            priority,
            assigned_to: resolve(row, Field::AssignedTo).map(str::to_owned),
            notes: resolve(row, Field::Notes).map(str::to_owned),
            percent_complete,
            created_at,
            updated_at: now,
            estimated_completion,
        });
    }

    debug!(
        rows = rows.len(),
        jobs = batch.jobs.len(),
        warnings = batch.warnings.len(),
        "decoded import rows"
    );
    batch
}

struct RowContext<'a> {
    row: usize,
    warnings: &'a mut Vec<RowWarning>,
}

impl RowContext<'_> {
    fn warn(&mut self, field: Field, value: &str, message: &str) {
        self.warnings.push(RowWarning {
            row: self.row,
            field: field.name(),
            value: value.to_owned(),
            message: message.to_owned(),
        });
    }
}

/// `45`, `45.6`, `45%`. Clamped to 0..=100.
#[allow(clippy::cast_possible_truncation)]
fn parse_percent(raw: &str) -> Option<u8> {
    let s = raw.trim().trim_end_matches('%').trim();
    let v: f64 = s.parse().ok()?;
    if !v.is_finite() {
        return None;
    }
    Some(phase::clamp_percent(v.round() as i64))
}

/// A status value or a phase label, turned into the percent it stands for.
fn status_seed(raw: &str) -> Option<u8> {
    if let Some(status) = JobStatus::parse(raw) {
        return Some(status.seed_percent());
    }
    Phase::from_label(raw).map(Phase::floor)
}
