#![forbid(unsafe_code)]

use std::io;

const RESET: &str = "\x1b[0m";

/// One table cell with an optional ANSI color applied only when printing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cell {
    text: String,
    color: Option<&'static str>,
}

impl Cell {
    #[must_use]
    pub fn colored(text: impl Into<String>, ansi: &'static str) -> Self {
        Self {
            text: text.into(),
            color: Some(ansi),
        }
    }
}

impl From<String> for Cell {
    fn from(text: String) -> Self {
        Self { text, color: None }
    }
}

impl From<&str> for Cell {
    fn from(text: &str) -> Self {
        Self::from(text.to_owned())
    }
}

#[derive(Debug, Default)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<Cell>>,
    color: bool,
}

impl Table {
    pub fn new(headers: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
            color: false,
        }
    }

    #[must_use]
    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    pub fn row(&mut self, cols: impl IntoIterator<Item = impl Into<Cell>>) {
        self.rows.push(cols.into_iter().map(Into::into).collect());
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn print(&self) -> io::Result<()> {
        let mut out = io::stdout().lock();
        self.write_to(&mut out)
    }

    /// Plain csv on stdout; colors never apply.
    pub fn write_csv(&self) -> io::Result<()> {
        self.write_csv_to(io::stdout().lock())
    }

    fn write_csv_to(&self, out: impl io::Write) -> io::Result<()> {
        let mut wtr = csv::Writer::from_writer(out);
        wtr.write_record(&self.headers)?;
        for row in &self.rows {
            wtr.write_record(row.iter().map(|c| c.text.as_str()))?;
        }
        wtr.flush()?;
        Ok(())
    }

    fn write_to(&self, mut out: impl io::Write) -> io::Result<()> {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| visible_width(h)).collect();
        for row in &self.rows {
            for (i, cell) in row.iter().enumerate() {
                if i >= widths.len() {
                    widths.push(0);
                }
                widths[i] = widths[i].max(visible_width(&cell.text));
            }
        }

        let header: Vec<Cell> = self.headers.iter().map(|h| Cell::from(h.as_str())).collect();
        writeln!(&mut out, "{}", self.format_row(&header, &widths))?;
        for row in &self.rows {
            writeln!(&mut out, "{}", self.format_row(row, &widths))?;
        }
        Ok(())
    }

    fn format_row(&self, row: &[Cell], widths: &[usize]) -> String {
        let mut out = String::new();
        for (i, cell) in row.iter().enumerate() {
            if i > 0 {
                out.push_str("  ");
            }
            let w = widths
                .get(i)
                .copied()
                .unwrap_or_else(|| visible_width(&cell.text));
            match cell.color.filter(|_| self.color) {
                Some(ansi) => {
                    out.push_str(ansi);
                    out.push_str(&cell.text);
                    out.push_str(RESET);
                }
                None => out.push_str(&cell.text),
            }
            // No padding after the last column.
            if i + 1 < row.len() {
                let pad = w.saturating_sub(visible_width(&cell.text));
                out.extend(std::iter::repeat_n(' ', pad));
            }
        }
        out
    }
}

fn visible_width(s: &str) -> usize {
    // Best-effort: one column per char.
    s.chars().count()
}
