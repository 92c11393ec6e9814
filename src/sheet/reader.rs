#![forbid(unsafe_code)]

use std::path::Path;

use calamine::{Data, Reader as _, open_workbook_auto};
use time::{Date, Month, PrimitiveDateTime, Time};
use tracing::debug;

use crate::error::ValveError;
use crate::sheet::columns::RawRow;
use crate::sheet::dates::format_rfc3339;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Csv,
    Workbook,
}

impl SourceKind {
    pub fn detect(path: &Path) -> Result<Self, ValveError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "csv" => Ok(SourceKind::Csv),
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Ok(SourceKind::Workbook),
            "" => Err(ValveError::UnsupportedFormat(format!(
                "{} has no file extension",
                path.display()
            ))),
            other => Err(ValveError::UnsupportedFormat(format!(
                ".{other} (expected .xlsx, .xls, .ods or .csv)"
            ))),
        }
    }
}

/// Reads the first sheet of a spreadsheet file into header-keyed rows.
///
/// The first row is the header. Empty cells are dropped; a blank row comes
/// back as an empty map so list positions keep matching sheet rows. An empty
/// sheet yields no rows; unreadable content is a single parse error.
pub fn read_rows(path: &Path) -> Result<Vec<RawRow>, ValveError> {
    let rows = match SourceKind::detect(path)? {
        SourceKind::Csv => read_csv(path)?,
        SourceKind::Workbook => read_workbook(path)?,
    };
    debug!(path = %path.display(), rows = rows.len(), "read spreadsheet rows");
    Ok(rows)
}

fn read_csv(path: &Path) -> Result<Vec<RawRow>, ValveError> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|e| ValveError::parse(path, e.to_string()))?;
    let headers: Vec<String> = rdr
        .headers()
        .map_err(|e| ValveError::parse(path, e.to_string()))?
        .iter()
        .map(clean_header)
        .collect();

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record.map_err(|e| ValveError::parse(path, e.to_string()))?;
        push_row(&mut rows, &headers, record.iter().map(str::to_owned));
    }
    Ok(rows)
}

fn read_workbook(path: &Path) -> Result<Vec<RawRow>, ValveError> {
    let mut workbook =
        open_workbook_auto(path).map_err(|e| ValveError::parse(path, e.to_string()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ValveError::parse(path, "workbook has no sheets"))?
        .map_err(|e| ValveError::parse(path, e.to_string()))?;

    let mut iter = range.rows();
    let Some(header_row) = iter.next() else {
        return Ok(Vec::new());
    };
    let headers: Vec<String> = header_row
        .iter()
        .map(|c| clean_header(&cell_text(c)))
        .collect();

    let mut rows = Vec::new();
    for cells in iter {
        push_row(&mut rows, &headers, cells.iter().map(cell_text));
    }
    Ok(rows)
}

fn clean_header(raw: &str) -> String {
    raw.trim_start_matches('\u{feff}').trim().to_owned()
}

fn push_row(rows: &mut Vec<RawRow>, headers: &[String], cells: impl Iterator<Item = String>) {
    let mut row = RawRow::new();
    for (header, value) in headers.iter().zip(cells) {
        if header.is_empty() || value.trim().is_empty() {
            continue;
        }
        row.entry(header.clone()).or_insert(value);
    }
    rows.push(row);
}

#[allow(clippy::cast_possible_truncation)]
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => (*f as i64).to_string(),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => excel_serial_to_text(dt.as_f64()),
    }
}

/// Excel serial dates count days from 1899-12-30 (1900 date system).
#[allow(clippy::cast_possible_truncation)]
fn excel_serial_to_text(serial: f64) -> String {
    let Ok(epoch) = Date::from_calendar_date(1899, Month::December, 30) else {
        return serial.to_string();
    };
    let millis = (serial * 86_400_000.0).round() as i64;
    let base = PrimitiveDateTime::new(epoch, Time::MIDNIGHT).assume_utc();
    match base.checked_add(time::Duration::milliseconds(millis)) {
        Some(dt) => format_rfc3339(dt),
        None => serial.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_formats_by_extension() {
        assert_eq!(SourceKind::detect(Path::new("a.CSV")).unwrap(), SourceKind::Csv);
        assert_eq!(SourceKind::detect(Path::new("a.xlsx")).unwrap(), SourceKind::Workbook);
        assert_eq!(SourceKind::detect(Path::new("a.xls")).unwrap(), SourceKind::Workbook);
        assert!(matches!(
            SourceKind::detect(Path::new("a.pdf")),
            Err(ValveError::UnsupportedFormat(_))
        ));
        assert!(SourceKind::detect(Path::new("noext")).is_err());
    }

    #[test]
    fn reads_csv_with_bom_and_blank_rows() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("jobs.csv");
        std::fs::write(
            &path,
            "\u{feff}Valve ID,Description,Notes\nVLV-1,Reface,\n,,\nVLV-2,Repack,loose gland\n",
        )
        .unwrap();

        let rows = read_rows(&path).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].get("Valve ID").map(String::as_str), Some("VLV-1"));
        assert!(!rows[0].contains_key("Notes"));
        assert!(rows[1].is_empty());
        assert_eq!(rows[2].get("Notes").map(String::as_str), Some("loose gland"));
    }

    #[test]
    fn header_only_csv_has_no_rows() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("empty.csv");
        std::fs::write(&path, "valveId,description\n").unwrap();
        assert!(read_rows(&path).unwrap().is_empty());
    }

    #[test]
    fn unreadable_workbook_is_a_parse_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("broken.xlsx");
        std::fs::write(&path, b"definitely not a zip archive").unwrap();
        assert!(matches!(read_rows(&path), Err(ValveError::Parse { .. })));
    }

    #[test]
    fn excel_serials_convert_to_instants() {
        // 45000 = 2023-03-15, .5 = noon
        assert_eq!(excel_serial_to_text(45000.5), "2023-03-15T12:00:00Z");
    }

    #[test]
    fn numeric_cells_drop_trailing_zero() {
        assert_eq!(cell_text(&Data::Float(45.0)), "45");
        assert_eq!(cell_text(&Data::Float(45.5)), "45.5");
        assert_eq!(cell_text(&Data::Int(7)), "7");
        assert_eq!(cell_text(&Data::Empty), "");
    }
}
