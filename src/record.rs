use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;

use crate::constants::{
    CONTENT_COLUMN, DUE_DATE_COLUMN, OWNER_COLUMN, STUDY_COLUMN, UNBLINDED_MARKER,
};
use crate::error::ReportError;
use crate::table::{Cell, Table};

/// The three fields of a source-report row that the engine reads.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    /// Zero, one or several comma-separated study keys.
    pub study: Cell,
    pub content: Cell,
    pub due_date: Cell,
}

/// A raw record plus its resolved owner. An empty owner means "unassigned"
/// and keeps the record out of the summary.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedRecord {
    pub record: RawRecord,
    pub owner: String,
}

/// Non-fatal conditions met while reading records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Degradation {
    /// No "Content" column; every row counts as not unblinded.
    MissingContentColumn,
    /// A due date that could not be parsed; the row counts as having no date.
    UnparseableDueDate { row: usize, value: String },
}

impl fmt::Display for Degradation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Degradation::MissingContentColumn => write!(
                f,
                "'{}' column missing; 'Unblinded' count will be 0",
                CONTENT_COLUMN
            ),
            Degradation::UnparseableDueDate { row, value } => {
                write!(f, "row {}: unparseable due date {:?}", row, value)
            }
        }
    }
}

impl RawRecord {
    pub fn new(study: impl Into<Cell>, content: impl Into<Cell>, due_date: impl Into<Cell>) -> Self {
        Self {
            study: study.into(),
            content: content.into(),
            due_date: due_date.into(),
        }
    }

    /// Content mentions "unblinded" in any letter case.
    pub fn is_unblinded(&self) -> bool {
        self.content
            .as_text()
            .to_lowercase()
            .contains(UNBLINDED_MARKER)
    }

    pub fn due(&self) -> Option<NaiveDate> {
        self.due_date.as_date()
    }

    /// Read every data row of a source report.
    ///
    /// "Study" and "Task Due Date" are required; a missing "Content" column is
    /// reported as a [`Degradation`] and read as empty.
    pub fn from_table(table: &Table) -> Result<(Vec<RawRecord>, Vec<Degradation>), ReportError> {
        let study = table.require_column(STUDY_COLUMN)?;
        let due = table.require_column(DUE_DATE_COLUMN)?;
        let (content, warnings) = content_column(table);
        let records = (0..table.len())
            .map(|r| read_record(table, r, Some(study), content, due))
            .collect();
        Ok((records, warnings))
    }
}

impl EnrichedRecord {
    /// Read every data row of an already enriched sheet, taking the owner
    /// from "RQC User". A blank owner cell is read as unassigned.
    pub fn from_table(
        table: &Table,
    ) -> Result<(Vec<EnrichedRecord>, Vec<Degradation>), ReportError> {
        let owner = table.require_column(OWNER_COLUMN)?;
        let due = table.require_column(DUE_DATE_COLUMN)?;
        let (content, warnings) = content_column(table);
        let study = table.column_index(STUDY_COLUMN);
        let records = (0..table.len())
            .map(|r| EnrichedRecord {
                record: read_record(table, r, study, content, due),
                owner: table.get(r, owner).as_text(),
            })
            .collect();
        Ok((records, warnings))
    }
}

fn content_column(table: &Table) -> (Option<usize>, Vec<Degradation>) {
    match table.column_index(CONTENT_COLUMN) {
        Some(idx) => (Some(idx), Vec::new()),
        None => (None, vec![Degradation::MissingContentColumn]),
    }
}

fn read_record(
    table: &Table,
    row: usize,
    study: Option<usize>,
    content: Option<usize>,
    due: usize,
) -> RawRecord {
    let cell = |col: Option<usize>| col.map_or(Cell::Empty, |c| table.get(row, c).clone());
    RawRecord {
        study: cell(study),
        content: cell(content),
        due_date: cell(Some(due)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn unblinded_match_ignores_case() {
        assert!(RawRecord::new("S1", "Unblinded data", "").is_unblinded());
        assert!(RawRecord::new("S1", "fully UNBLINDED", "").is_unblinded());
        assert!(!RawRecord::new("S1", "blinded", "").is_unblinded());
        assert!(!RawRecord::new("S1", Cell::Empty, "").is_unblinded());
    }

    #[test]
    fn from_table_requires_study_and_due_date() {
        let t = Table::new("RawData", headers(&["Study", "Content"]), vec![]);
        let err = RawRecord::from_table(&t).unwrap_err();
        assert!(matches!(err, ReportError::MissingColumn { ref column, .. } if column == "Task Due Date"));

        let t = Table::new("RawData", headers(&["Task Due Date"]), vec![]);
        let err = RawRecord::from_table(&t).unwrap_err();
        assert!(matches!(err, ReportError::MissingColumn { ref column, .. } if column == "Study"));
    }

    #[test]
    fn missing_content_degrades() {
        let t = Table::new(
            "RawData",
            headers(&["Study", "Task Due Date"]),
            vec![vec![Cell::from("S1"), Cell::from("2025-03-05")]],
        );
        let (records, warnings) = RawRecord::from_table(&t).unwrap();
        assert_eq!(warnings, vec![Degradation::MissingContentColumn]);
        assert_eq!(records[0].content, Cell::Empty);
        assert_eq!(records[0].due(), NaiveDate::from_ymd_opt(2025, 3, 5));
    }

    #[test]
    fn enriched_rows_take_owner_from_rqc_user() {
        let t = Table::new(
            "RawData",
            headers(&["Task Due Date", "Content", "RQC User"]),
            vec![
                vec![Cell::Empty, Cell::from("x"), Cell::from("Alice")],
                vec![Cell::Empty, Cell::from("y")],
            ],
        );
        let (records, warnings) = EnrichedRecord::from_table(&t).unwrap();
        assert!(warnings.is_empty());
        assert_eq!(records[0].owner, "Alice");
        assert_eq!(records[1].owner, "");
        assert_eq!(records[0].record.study, Cell::Empty);
    }
}
