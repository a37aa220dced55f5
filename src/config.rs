use serde::{Deserialize, Serialize};
use std::{fs, path::Path};
use tracing::debug;

use crate::error::ReportError;

/// Default config file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "rqcreport.yaml";

/// File names and switches for one report run. Every field has a default, so
/// a YAML file only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Base name of the task export; `" (N)"` copies are resolved to the latest.
    pub source_report_name: String,
    /// Base name of the study → reviewer allocation table.
    pub study_allocation_name: String,
    /// Sheet holding the export inside the source workbook.
    pub source_sheet: String,
    /// Folder (under the working directory) receiving processed reports.
    pub output_folder: String,
    /// Macro the report workbook runs after the raw data is written.
    pub macro_name: String,
    /// Fail when the allocation table assigns one study to two reviewers.
    pub strict_ownership: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            source_report_name:
                "DMA Report - Documents in Available and Assigned tasks for RQC.xlsx".into(),
            study_allocation_name: "RQC Studies & POC list.xlsx".into(),
            source_sheet: "Sheet0".into(),
            output_folder: "output_reports".into(),
            macro_name: "Module1.CreateFilteredSheetsWithHyperlinks".into(),
            strict_ownership: false,
        }
    }
}

impl ReportConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ReportError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let cfg: ReportConfig = serde_yaml::from_str(&text)?;
        debug!(path = %path.display(), ?cfg, "loaded config");
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn partial_yaml_keeps_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(
            &path,
            "source_report_name: export.csv\nstrict_ownership: true\n",
        )
        .unwrap();

        let cfg = ReportConfig::load(&path).unwrap();
        assert_eq!(cfg.source_report_name, "export.csv");
        assert!(cfg.strict_ownership);
        assert_eq!(cfg.study_allocation_name, "RQC Studies & POC list.xlsx");
        assert_eq!(cfg.source_sheet, "Sheet0");
    }

    #[test]
    fn bad_yaml_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "strict_ownership: [not, a, bool]\n").unwrap();
        assert!(matches!(
            ReportConfig::load(&path),
            Err(ReportError::Yaml(_))
        ));
    }
}
