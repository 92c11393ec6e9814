#![forbid(unsafe_code)]

use crate::job::model::{Job, JobStatus, Priority};
use crate::job::phase::Phase;
use crate::job::stats::JobStats;
use crate::sheet::dates::format_short_opt;

pub const JOBS_SHEET: &str = "Valve Repair Jobs";
pub const STATS_SHEET: &str = "Statistics";

/// Primary table headers, in output order.
pub const JOB_HEADERS: [&str; 10] = [
    "Valve ID",
    "Description",
    "% Complete",
    "Job Status",
    "Priority",
    "Assigned To",
    "Notes",
    "Created Date",
    "Updated Date",
    "Est. Completion",
];

const JOB_WIDTHS: [f64; 10] = [12.0, 30.0, 10.0, 22.0, 10.0, 15.0, 30.0, 15.0, 15.0, 15.0];

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Blank,
    Text(String),
    Number(f64),
}

impl Cell {
    fn text(s: impl Into<String>) -> Self {
        Cell::Text(s.into())
    }

    #[allow(clippy::cast_precision_loss)]
    fn count(n: usize) -> Self {
        Cell::Number(n as f64)
    }

    /// Plain-text rendering, as it appears in a csv file.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn to_text(&self) -> String {
        match self {
            Cell::Blank => String::new(),
            Cell::Text(s) => s.clone(),
            Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => (*n as i64).to_string(),
            Cell::Number(n) => n.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub headers: Vec<String>,
    pub widths: Vec<f64>,
    pub rows: Vec<Vec<Cell>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub jobs: Sheet,
    pub stats: Option<Sheet>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    pub include_stats: bool,
    /// Primary table only, whatever `include_stats` says.
    pub compact: bool,
}

impl RenderOptions {
    #[must_use]
    pub fn full() -> Self {
        Self {
            include_stats: true,
            compact: false,
        }
    }

    #[must_use]
    pub fn compact() -> Self {
        Self {
            include_stats: false,
            compact: true,
        }
    }

    #[must_use]
    pub fn wants_stats(self) -> bool {
        self.include_stats && !self.compact
    }
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self::full()
    }
}

#[must_use]
pub fn render_rows(jobs: &[Job], opts: RenderOptions) -> Report {
    let rows = jobs.iter().map(job_row).collect();
    let jobs_sheet = Sheet {
        name: JOBS_SHEET.to_owned(),
        headers: JOB_HEADERS.iter().map(|h| (*h).to_owned()).collect(),
        widths: JOB_WIDTHS.to_vec(),
        rows,
    };
    let stats = opts
        .wants_stats()
        .then(|| stats_sheet(&JobStats::collect(jobs)));
    Report {
        jobs: jobs_sheet,
        stats,
    }
}

fn job_row(job: &Job) -> Vec<Cell> {
    vec![
        Cell::text(&job.valve_id),
        Cell::text(&job.description),
        Cell::Number(f64::from(job.percent_complete)),
        Cell::text(job.status_label()),
        Cell::text(job.priority.as_str()),
        Cell::text(job.assigned_to.clone().unwrap_or_default()),
        Cell::text(job.notes.clone().unwrap_or_default()),
        Cell::text(format_short_opt(Some(job.created_at))),
        Cell::text(format_short_opt(Some(job.updated_at))),
        Cell::text(format_short_opt(job.estimated_completion)),
    ]
}

fn stats_sheet(stats: &JobStats) -> Sheet {
    let blank = || vec![Cell::Blank, Cell::Blank];
    let heading = |title: &str| vec![Cell::text(title), Cell::Blank];

    let mut rows = vec![
        vec![Cell::text("Total Jobs"), Cell::count(stats.total)],
        vec![
            Cell::text("Average Progress"),
            Cell::text(format!("{}%", stats.average_progress)),
        ],
        blank(),
        heading("Status Breakdown"),
    ];
    for status in JobStatus::ALL {
        rows.push(vec![
            Cell::text(status.title()),
            Cell::count(stats.status_count(status)),
        ]);
    }
    rows.push(blank());
    rows.push(heading("Priority Breakdown"));
    for priority in Priority::ALL {
        let label = match priority {
            Priority::High => "High Priority",
            Priority::Medium => "Medium Priority",
            Priority::Low => "Low Priority",
        };
        rows.push(vec![
            Cell::text(label),
            Cell::count(stats.priority_count(priority)),
        ]);
    }
    rows.push(blank());
    rows.push(heading("Phase Breakdown"));
    for phase in Phase::ALL {
        rows.push(vec![
            Cell::text(phase.label()),
            Cell::count(stats.phase_count(phase)),
        ]);
    }

    Sheet {
        name: STATS_SHEET.to_owned(),
        headers: vec!["Metric".to_owned(), "Count".to_owned()],
        widths: vec![24.0, 10.0],
        rows,
    }
}
