// src/enrich/mod.rs
use tracing::{info, instrument, trace};

use crate::constants::{NA_OWNER, OWNER_COLUMN, STUDY_COLUMN};
use crate::error::ReportError;
use crate::ownership::OwnershipMap;
use crate::record::{EnrichedRecord, RawRecord};
use crate::table::{Cell, Table};

/// Resolve the owner string for one study cell.
///
/// - blank cell → `"NA"`
/// - otherwise split on `,`, trim each piece and look it up (`"NA"` if unknown)
/// - owners keep first-occurrence order, duplicates dropped, joined with `", "`
pub fn owner_for_cell(cell: &Cell, map: &OwnershipMap) -> String {
    if cell.is_blank() {
        return NA_OWNER.to_string();
    }
    let text = cell.as_text();
    let mut owners: Vec<&str> = Vec::new();
    for piece in text.split(',') {
        let owner = map.lookup(piece.trim());
        if !owners.contains(&owner) {
            owners.push(owner);
        }
    }
    if owners.is_empty() {
        NA_OWNER.to_string()
    } else {
        owners.join(", ")
    }
}

/// Attach an owner to every record, preserving order.
pub fn enrich<I>(records: I, map: &OwnershipMap) -> Vec<EnrichedRecord>
where
    I: IntoIterator<Item = RawRecord>,
{
    records
        .into_iter()
        .map(|record| {
            let owner = owner_for_cell(&record.study, map);
            EnrichedRecord { record, owner }
        })
        .collect()
}

/// Fill the "RQC User" column of a raw-data sheet from its "Study" column.
///
/// Overwrites an existing "RQC User" column rather than adding a second one,
/// so running it twice gives the same sheet. Returns the number of rows written.
#[instrument(level = "info", skip(table, map), fields(sheet = %table.name, rows = table.len()))]
pub fn enrich_table(table: &mut Table, map: &OwnershipMap) -> Result<usize, ReportError> {
    let study = table.require_column(STUDY_COLUMN)?;
    let owners: Vec<Cell> = table
        .column(study)
        .enumerate()
        .map(|(row, cell)| {
            let owner = owner_for_cell(cell, map);
            trace!(row, study = %cell, owner = %owner, "assigned owner");
            Cell::Text(owner)
        })
        .collect();

    let written = owners.len();
    let existed = table.column_index(OWNER_COLUMN).is_some();
    let idx = table.set_column(OWNER_COLUMN, owners);
    info!(
        column = idx,
        overwritten = existed,
        "wrote {} '{}' values",
        written,
        OWNER_COLUMN
    );
    Ok(written)
}
