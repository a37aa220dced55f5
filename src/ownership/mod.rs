// src/ownership/mod.rs
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info, instrument, warn};

use crate::constants::NA_OWNER;
use crate::error::ReportError;
use crate::table::{Cell, Table};

/// A study key that appeared more than once with different owners.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OwnershipConflict {
    pub key: String,
    pub previous: String,
    pub replacement: String,
}

/// Study key → reviewer, built once per run and read-only afterwards.
///
/// Later rows of the allocation table overwrite earlier rows with the same key.
/// Each overwrite that changes the owner is kept in [`OwnershipMap::conflicts`].
#[derive(Debug, Clone, Default)]
pub struct OwnershipMap {
    owners: HashMap<String, String>,
    conflicts: Vec<OwnershipConflict>,
}

impl OwnershipMap {
    /// Build from a headerless allocation sheet: column A is the study, column B the owner.
    pub fn from_table(table: &Table) -> Result<Self, ReportError> {
        let width = table.width();
        if width < 2 {
            return Err(ReportError::ReferenceShape { columns: width });
        }
        let rows = (0..table.len()).map(|r| (table.get(r, 0).clone(), table.get(r, 1).clone()));
        Ok(build_map(rows))
    }

    /// Owner for an exact key, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.owners.get(key).map(String::as_str)
    }

    /// Owner for `key`, or `"NA"` when the key is unknown.
    pub fn lookup(&self, key: &str) -> &str {
        self.get(key).unwrap_or(NA_OWNER)
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    pub fn conflicts(&self) -> &[OwnershipConflict] {
        &self.conflicts
    }

    /// Fail if any key was reassigned to a different owner.
    pub fn ensure_consistent(&self) -> Result<(), ReportError> {
        if self.conflicts.is_empty() {
            Ok(())
        } else {
            Err(ReportError::OwnershipConflicts(self.conflicts.clone()))
        }
    }
}

/// Build the study → owner map from `(key, owner)` cells in table order.
///
/// Keys are used exactly as their string form, without trimming. A blank owner
/// becomes `"NA"`.
///
/// Any non-blank key is accepted as-is, but rows with a blank key are
/// skipped rather than stored under a placeholder key. A trimmed study piece
/// is never blank, so such a row could only ever match by accident.
#[instrument(level = "debug", skip(rows))]
pub fn build_map<I>(rows: I) -> OwnershipMap
where
    I: IntoIterator<Item = (Cell, Cell)>,
{
    let mut map = OwnershipMap::default();

    for (idx, (key_raw, owner_raw)) in rows.into_iter().enumerate() {
        if key_raw.is_blank() {
            debug!(row = idx, "skipping allocation row without a study key");
            continue;
        }
        let key = key_raw.as_text();
        let owner = if owner_raw.is_blank() {
            NA_OWNER.to_string()
        } else {
            owner_raw.as_text()
        };

        if let Some(previous) = map.owners.insert(key.clone(), owner.clone()) {
            if previous != owner {
                warn!(
                    study = %key,
                    previous = %previous,
                    replacement = %owner,
                    "duplicate study key; later row wins"
                );
                map.conflicts.push(OwnershipConflict {
                    key,
                    previous,
                    replacement: owner,
                });
            }
        }
    }

    info!(studies = map.len(), conflicts = map.conflicts.len(), "ownership map built");
    map
}
