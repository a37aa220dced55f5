use std::{io, path::PathBuf};

use thiserror::Error;

use crate::ownership::OwnershipConflict;

/// Failures raised by the consolidation engine and its table readers.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("column '{column}' not found in {table} header")]
    MissingColumn { column: String, table: String },
    #[error("{role} file not found at {}", .path.display())]
    InputMissing { role: String, path: PathBuf },
    #[error("reference table needs at least 2 columns (study, owner), found {columns}")]
    ReferenceShape { columns: usize },
    #[error("sheet '{sheet}' not found in {}", .path.display())]
    SheetNotFound { sheet: String, path: PathBuf },
    #[error("{} duplicate study keys map to different owners", .0.len())]
    OwnershipConflicts(Vec<OwnershipConflict>),
    #[error("unsupported table format: {}", .0.display())]
    UnsupportedFormat(PathBuf),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Spreadsheet(#[from] calamine::Error),
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

impl ReportError {
    pub fn missing_column(column: &str, table: &str) -> Self {
        ReportError::MissingColumn {
            column: column.to_string(),
            table: table.to_string(),
        }
    }
}
