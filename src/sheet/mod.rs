#![forbid(unsafe_code)]

//! Spreadsheet import and export.
//!
//! Decoding is split from file access: `reader` turns a file into header-keyed
//! rows and `decode` turns rows into job candidates, so the column-matching
//! rules can be exercised without any file at all. Export mirrors this with
//! `encode` (jobs to sheets) and `writer` (sheets to xlsx or csv).

pub mod columns;
pub mod dates;
pub mod decode;
pub mod encode;
pub mod reader;
pub mod writer;

use std::path::Path;

use time::OffsetDateTime;

use crate::error::ValveError;

pub use columns::{Field, RawRow};
pub use decode::{DecodeOptions, ParsedBatch, RowWarning, parse_rows};
pub use encode::{Cell, RenderOptions, Report, Sheet, render_rows};
pub use writer::{ExportFormat, write_report};

/// Reads and decodes a spreadsheet file in one step.
pub fn parse_file(
    path: &Path,
    opts: &DecodeOptions,
    now: OffsetDateTime,
) -> Result<ParsedBatch, ValveError> {
    let rows = reader::read_rows(path)?;
    Ok(parse_rows(&rows, opts, now))
}
