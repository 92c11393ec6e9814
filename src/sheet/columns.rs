#![forbid(unsafe_code)]

use std::collections::BTreeMap;

/// One imported row: column header -> cell text. Empty cells are left out.
pub type RawRow = BTreeMap<String, String>;

/// Logical job fields an import row can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    ValveId,
    Description,
    Status,
    Priority,
    AssignedTo,
    Notes,
    PercentComplete,
    CreatedAt,
    EstimatedCompletion,
}

impl Field {
    /// Candidate headers in priority order: exact key, snake_case, spaced
    /// title, then any export header that maps onto the same field.
    #[must_use]
    pub fn candidates(self) -> &'static [&'static str] {
        match self {
            Field::ValveId => &["valveId", "valve_id", "Valve ID"],
            Field::Description => &["description", "Description"],
            Field::Status => &["status", "Status", "Job Status"],
            Field::Priority => &["priority", "Priority"],
            Field::AssignedTo => &["assignedTo", "assigned_to", "Assigned To"],
            Field::Notes => &["notes", "Notes"],
            Field::PercentComplete => &[
                "percentComplete",
                "percent_complete",
                "Percent Complete",
                "% Complete",
            ],
            Field::CreatedAt => &["createdAt", "created_at", "Created At", "Created Date"],
            Field::EstimatedCompletion => &[
                "estimatedCompletion",
                "estimated_completion",
                "Estimated Completion",
                "Est. Completion",
            ],
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        self.candidates()[0]
    }
}

/// First non-empty value among the field's candidate headers.
#[must_use]
pub fn resolve(row: &RawRow, field: Field) -> Option<&str> {
    field
        .candidates()
        .iter()
        .filter_map(|key| row.get(*key))
        .map(|v| v.trim())
        .find(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, &str)]) -> RawRow {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn header_variants_resolve_to_same_field() {
        let spaced = row(&[("Valve ID", "VLV-7")]);
        let snake = row(&[("valve_id", "VLV-7")]);
        let exact = row(&[("valveId", "VLV-7")]);
        for r in [&spaced, &snake, &exact] {
            assert_eq!(resolve(r, Field::ValveId), Some("VLV-7"));
        }
    }

    #[test]
    fn earlier_candidate_wins_and_blanks_are_skipped() {
        let r = row(&[("valveId", "  "), ("valve_id", "B"), ("Valve ID", "C")]);
        assert_eq!(resolve(&r, Field::ValveId), Some("B"));

        let r = row(&[("valveId", "A"), ("Valve ID", "C")]);
        assert_eq!(resolve(&r, Field::ValveId), Some("A"));
    }

    #[test]
    fn headers_are_case_sensitive() {
        let r = row(&[("VALVE ID", "X")]);
        assert_eq!(resolve(&r, Field::ValveId), None);
    }
}
