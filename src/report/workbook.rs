use anyhow::{bail, Context, Result};
use chrono::Local;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, info, warn};

use crate::aggregate::Summary;
use crate::table::{write_csv, Table};

/// Everything the pipeline needs from the destination workbook.
pub trait ReportWorkbook {
    /// Replace the raw-data sheet with `table`.
    fn write_raw_data(&mut self, table: &Table) -> Result<()>;
    /// Run the named post-processing macro.
    fn run_macro(&mut self, name: &str) -> Result<()>;
    /// Replace the summary sheet.
    fn write_summary(&mut self, summary: &Summary) -> Result<()>;
    /// Persist the workbook at `path`.
    fn save(&mut self, path: &Path) -> Result<()>;
}

pub const RAW_DATA_FILE: &str = "RawData.csv";
pub const SUMMARY_FILE: &str = "Pivot_Summary.csv";

/// A workbook kept as a directory of CSV sheets.
///
/// Sheets are written into a hidden staging directory; `save` renames it into
/// place so a half-written report never appears under its final name.
pub struct CsvWorkbook {
    staging: Option<PathBuf>,
}

impl CsvWorkbook {
    /// Create an empty staging directory under `output_dir`.
    pub fn create<P: AsRef<Path>>(output_dir: P) -> Result<Self> {
        let output_dir = output_dir.as_ref();
        let stamp = Local::now().format("%Y%m%d_%H%M%S%.6f");
        let staging = output_dir.join(format!(".staging-{}", stamp));
        fs::create_dir_all(&staging)
            .with_context(|| format!("creating staging directory {}", staging.display()))?;
        debug!(staging = %staging.display(), "workbook staging created");
        Ok(Self {
            staging: Some(staging),
        })
    }

    fn staging(&self) -> Result<&Path> {
        match &self.staging {
            Some(p) => Ok(p),
            None => bail!("workbook already saved"),
        }
    }
}

impl ReportWorkbook for CsvWorkbook {
    fn write_raw_data(&mut self, table: &Table) -> Result<()> {
        let path = self.staging()?.join(RAW_DATA_FILE);
        write_csv(table, &path).with_context(|| format!("writing {}", path.display()))?;
        info!(rows = table.len(), "raw data sheet written");
        Ok(())
    }

    fn run_macro(&mut self, name: &str) -> Result<()> {
        warn!(macro_name = %name, "CSV workbooks cannot run macros; skipping");
        Ok(())
    }

    fn write_summary(&mut self, summary: &Summary) -> Result<()> {
        let path = self.staging()?.join(SUMMARY_FILE);
        write_csv(&summary.to_table(), &path)
            .with_context(|| format!("writing {}", path.display()))?;
        info!(owners = summary.rows.len(), "summary sheet written");
        Ok(())
    }

    fn save(&mut self, path: &Path) -> Result<()> {
        let staging = self.staging()?.to_path_buf();
        if path.exists() {
            bail!("{} already exists", path.display());
        }
        fs::rename(&staging, path)
            .with_context(|| format!("moving {} to {}", staging.display(), path.display()))?;
        self.staging = None;
        info!(path = %path.display(), "workbook saved");
        Ok(())
    }
}

impl Drop for CsvWorkbook {
    fn drop(&mut self) {
        if let Some(staging) = self.staging.take() {
            if let Err(e) = fs::remove_dir_all(&staging) {
                warn!("failed to remove {}: {}", staging.display(), e);
            }
        }
    }
}
