#![forbid(unsafe_code)]

use std::path::{Path, PathBuf};

use rust_xlsxwriter::{Format, Workbook};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::info;

use crate::error::ValveError;
use crate::sheet::dates::file_timestamp;
use crate::sheet::encode::{Cell, Report, Sheet};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Full workbook: jobs sheet plus optional statistics sheet.
    #[default]
    Xlsx,
    /// Lightweight export: the jobs table only.
    Csv,
}

impl ExportFormat {
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Xlsx => "xlsx",
            ExportFormat::Csv => "csv",
        }
    }

    #[must_use]
    pub fn mime_type(self) -> &'static str {
        match self {
            ExportFormat::Xlsx => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
            ExportFormat::Csv => "text/csv",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "xlsx" | "excel" => Some(ExportFormat::Xlsx),
            "csv" => Some(ExportFormat::Csv),
            _ => None,
        }
    }
}

/// `<prefix>_<timestamp>.<ext>` inside `dir`, never overwriting an existing file.
#[must_use]
pub fn export_path(dir: &Path, prefix: &str, format: ExportFormat, now: OffsetDateTime) -> PathBuf {
    let stem = format!("{prefix}_{}", file_timestamp(now));
    let ext = format.extension();
    let mut path = dir.join(format!("{stem}.{ext}"));
    let mut n = 1;
    while path.exists() {
        path = dir.join(format!("{stem}-{n}.{ext}"));
        n += 1;
    }
    path
}

/// Writes the report to a fresh timestamped file in `dir` and returns its path.
pub fn write_report(
    report: &Report,
    format: ExportFormat,
    dir: &Path,
    prefix: &str,
    now: OffsetDateTime,
) -> Result<PathBuf, ValveError> {
    std::fs::create_dir_all(dir).map_err(|e| ValveError::storage(dir, e))?;
    let path = export_path(dir, prefix, format, now);
    let data = match format {
        ExportFormat::Xlsx => workbook_bytes(report)?,
        ExportFormat::Csv => csv_bytes(&report.jobs)?,
    };

    let tmp = path.with_extension(format!("{}.tmp", format.extension()));
    std::fs::write(&tmp, &data).map_err(|e| ValveError::storage(&tmp, e))?;
    if let Err(e) = std::fs::rename(&tmp, &path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(ValveError::storage(&path, e));
    }
    info!(path = %path.display(), rows = report.jobs.rows.len(), "exported report");
    Ok(path)
}

pub fn workbook_bytes(report: &Report) -> Result<Vec<u8>, ValveError> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    for sheet in std::iter::once(&report.jobs).chain(report.stats.as_ref()) {
        write_sheet(&mut workbook, sheet, &bold)?;
    }
    Ok(workbook.save_to_buffer()?)
}

fn write_sheet(workbook: &mut Workbook, sheet: &Sheet, bold: &Format) -> Result<(), ValveError> {
    let ws = workbook.add_worksheet();
    ws.set_name(&sheet.name)?;
    for (col, header) in sheet.headers.iter().enumerate() {
        ws.write_string_with_format(0, col_num(col)?, header, bold)?;
    }
    for (col, width) in sheet.widths.iter().enumerate() {
        ws.set_column_width(col_num(col)?, *width)?;
    }
    for (idx, row) in sheet.rows.iter().enumerate() {
        let r = u32::try_from(idx + 1)
            .map_err(|_| ValveError::Validation("too many rows for one worksheet".to_owned()))?;
        for (col, cell) in row.iter().enumerate() {
            let c = col_num(col)?;
            match cell {
                Cell::Blank => {}
                Cell::Text(s) => {
                    ws.write_string(r, c, s)?;
                }
                Cell::Number(n) => {
                    ws.write_number(r, c, *n)?;
                }
            }
        }
    }
    ws.set_freeze_panes(1, 0)?;
    Ok(())
}

fn col_num(col: usize) -> Result<u16, ValveError> {
    u16::try_from(col)
        .map_err(|_| ValveError::Validation("too many columns for one worksheet".to_owned()))
}

pub fn csv_bytes(sheet: &Sheet) -> Result<Vec<u8>, ValveError> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(&sheet.headers)?;
    for row in &sheet.rows {
        wtr.write_record(row.iter().map(Cell::to_text))?;
    }
    wtr.into_inner()
        .map_err(|e| ValveError::Csv(csv::Error::from(e.into_error())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheet::encode::{RenderOptions, render_rows};
    use time::macros::datetime;

    #[test]
    fn file_names_sort_and_never_collide() {
        let dir = tempfile::tempdir().expect("tempdir");
        let now = datetime!(2024-09-01 07:08:09 UTC);
        let first = export_path(dir.path(), "valve_repair_report", ExportFormat::Csv, now);
        assert_eq!(
            first.file_name().and_then(|s| s.to_str()),
            Some("valve_repair_report_2024-09-01T07-08-09.csv")
        );
        std::fs::write(&first, b"x").unwrap();
        let second = export_path(dir.path(), "valve_repair_report", ExportFormat::Csv, now);
        assert_ne!(first, second);
    }

    #[test]
    fn csv_contains_only_the_jobs_table() {
        let dir = tempfile::tempdir().expect("tempdir");
        let report = render_rows(&[], RenderOptions::full());
        let path = write_report(
            &report,
            ExportFormat::Csv,
            dir.path(),
            "r",
            datetime!(2024-09-01 0:00 UTC),
        )
        .unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            text.trim_end(),
            "Valve ID,Description,% Complete,Job Status,Priority,Assigned To,Notes,\
             Created Date,Updated Date,Est. Completion"
        );
        assert!(!text.contains("Total Jobs"));
    }

    #[test]
    fn parses_format_names() {
        assert_eq!(ExportFormat::parse("Excel"), Some(ExportFormat::Xlsx));
        assert_eq!(ExportFormat::parse("csv"), Some(ExportFormat::Csv));
        assert_eq!(ExportFormat::parse("pdf"), None);
    }

    #[test]
    fn mime_types_match_formats() {
        assert_eq!(
            ExportFormat::Xlsx.mime_type(),
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
        );
        assert_eq!(ExportFormat::Csv.mime_type(), "text/csv");
    }
}
