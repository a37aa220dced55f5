// src/aggregate/mod.rs
use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info, instrument, warn};

use crate::constants::{
    EMPTY_SUMMARY_PLACEHOLDER, OWNER_COLUMN, SUMMARY_DUE_BY_FRIDAY, SUMMARY_DUE_TODAY,
    SUMMARY_UNBLINDED,
};
use crate::error::ReportError;
use crate::record::{Degradation, EnrichedRecord};
use crate::table::{Cell, Table};

/// Per-owner workload counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryRow {
    pub owner: String,
    pub unblinded_count: u64,
    pub due_today_count: u64,
    /// Due on or before the criteria date (the coming Sunday).
    pub due_by_friday_count: u64,
}

/// Output of [`summarize_table`]: counts plus whatever was degraded on the way.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub reference_date: NaiveDate,
    pub criteria_date: NaiveDate,
    pub rows: Vec<SummaryRow>,
    pub warnings: Vec<Degradation>,
}

/// The next Sunday on or after `reference`; a Sunday maps to itself.
pub fn criteria_date(reference: NaiveDate) -> NaiveDate {
    let weekday = i64::from(reference.weekday().num_days_from_monday());
    let days_until_sunday = (6 - weekday + 7) % 7;
    reference + Duration::days(days_until_sunday)
}

#[derive(Default)]
struct Counts {
    unblinded: u64,
    due_today: u64,
    due_by_criteria: u64,
}

/// Count unblinded, due-today and due-by-Sunday tasks per owner.
///
/// Records with an empty owner are skipped entirely. A record without a
/// parseable due date contributes to neither date count. Rows come back
/// sorted by owner.
pub fn aggregate(records: &[EnrichedRecord], reference: NaiveDate) -> Vec<SummaryRow> {
    let cutoff = criteria_date(reference);
    let mut groups: BTreeMap<&str, Counts> = BTreeMap::new();

    for rec in records {
        if rec.owner.is_empty() {
            continue;
        }
        let due = rec.record.due();
        let counts = groups.entry(rec.owner.as_str()).or_default();
        counts.unblinded += u64::from(rec.record.is_unblinded());
        counts.due_today += u64::from(due.is_some_and(|d| d <= reference));
        counts.due_by_criteria += u64::from(due.is_some_and(|d| d <= cutoff));
    }

    groups
        .into_iter()
        .map(|(owner, c)| SummaryRow {
            owner: owner.to_string(),
            unblinded_count: c.unblinded,
            due_today_count: c.due_today,
            due_by_friday_count: c.due_by_criteria,
        })
        .collect()
}

/// Summarize an enriched raw-data sheet as of `reference`.
///
/// Needs "RQC User" and "Task Due Date"; a missing "Content" column and
/// unparseable due dates are reported in [`Summary::warnings`].
#[instrument(level = "info", skip(table), fields(sheet = %table.name, rows = table.len()))]
pub fn summarize_table(table: &Table, reference: NaiveDate) -> Result<Summary, ReportError> {
    let (records, mut warnings) = EnrichedRecord::from_table(table)?;

    for (row, rec) in records.iter().enumerate() {
        let cell = &rec.record.due_date;
        if !cell.is_blank() && cell.as_date().is_none() {
            debug!(row, value = %cell, "unparseable due date");
            warnings.push(Degradation::UnparseableDueDate {
                row,
                value: cell.as_text(),
            });
        }
    }
    for w in &warnings {
        if matches!(w, Degradation::MissingContentColumn) {
            warn!("{}", w);
        }
    }
    let bad_dates = warnings.len()
        - usize::from(warnings.contains(&Degradation::MissingContentColumn));
    if bad_dates > 0 {
        warn!("{} rows have unparseable due dates; treated as undated", bad_dates);
    }

    let criteria = criteria_date(reference);
    info!(%reference, %criteria, "counting tasks due on or before coming Sunday");
    let rows = aggregate(&records, reference);
    if rows.is_empty() {
        warn!("no rows with an owner; summary is empty");
    }

    Ok(Summary {
        reference_date: reference,
        criteria_date: criteria,
        rows,
        warnings,
    })
}

impl Summary {
    /// Render as a sheet: owner column then the three count columns.
    /// An empty summary becomes a single placeholder cell.
    pub fn to_table(&self) -> Table {
        if self.rows.is_empty() {
            return Table::new(
                "Pivot_Summary",
                Vec::new(),
                vec![vec![Cell::from(EMPTY_SUMMARY_PLACEHOLDER)]],
            );
        }
        let headers = [
            OWNER_COLUMN,
            SUMMARY_UNBLINDED,
            SUMMARY_DUE_TODAY,
            SUMMARY_DUE_BY_FRIDAY,
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        let rows = self
            .rows
            .iter()
            .map(|r| {
                vec![
                    Cell::Text(r.owner.clone()),
                    Cell::Number(r.unblinded_count as f64),
                    Cell::Number(r.due_today_count as f64),
                    Cell::Number(r.due_by_friday_count as f64),
                ]
            })
            .collect();
        Table::new("Pivot_Summary", headers, rows)
    }
}
