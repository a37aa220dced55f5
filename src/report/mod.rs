// src/report/mod.rs
pub mod workbook;

pub use workbook::{CsvWorkbook, ReportWorkbook};

use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDate};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{error, info, instrument, warn};

use crate::aggregate::{summarize_table, Summary};
use crate::config::ReportConfig;
use crate::constants::{DUE_DATE_COLUMN, STUDY_COLUMN};
use crate::enrich::enrich_table;
use crate::error::ReportError;
use crate::ownership::OwnershipMap;
use crate::resolve::find_latest_file;
use crate::table::read_table;

/// Inputs for one run, passed explicitly rather than held in globals.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Directory holding the source report and allocation table.
    pub input_dir: PathBuf,
    /// Where processed reports go; defaults to `input_dir/<output_folder>`.
    pub output_dir: Option<PathBuf>,
    /// "Today" for the due-date buckets.
    pub reference_date: NaiveDate,
    pub config: ReportConfig,
}

/// What a finished run produced.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub source_report: PathBuf,
    pub study_allocation: PathBuf,
    pub enriched_rows: usize,
    pub summary: Summary,
    pub saved_to: PathBuf,
}

/// Run the whole job with the CSV workbook.
pub fn run_report(opts: &RunOptions) -> Result<RunOutcome> {
    let output_dir = opts
        .output_dir
        .clone()
        .unwrap_or_else(|| opts.input_dir.join(&opts.config.output_folder));
    fs::create_dir_all(&output_dir)
        .with_context(|| format!("creating output directory {}", output_dir.display()))?;

    let mut workbook = CsvWorkbook::create(&output_dir)?;
    run_pipeline(opts, &mut workbook, &output_dir)
}

/// Resolve, load, enrich, summarize and save through `workbook`.
#[instrument(level = "info", skip_all, fields(dir = %opts.input_dir.display(), date = %opts.reference_date))]
pub fn run_pipeline(
    opts: &RunOptions,
    workbook: &mut dyn ReportWorkbook,
    output_dir: &Path,
) -> Result<RunOutcome> {
    let cfg = &opts.config;

    // ─── 1) resolve latest inputs ───────────────────────────────────
    let source_report = find_latest_file(&cfg.source_report_name, &opts.input_dir);
    let study_allocation = find_latest_file(&cfg.study_allocation_name, &opts.input_dir);

    // ─── 2) validate inputs ─────────────────────────────────────────
    ensure_exists("source report", &source_report)?;
    ensure_exists("study allocation", &study_allocation)?;

    // ─── 3) build ownership map ─────────────────────────────────────
    info!(file = %study_allocation.display(), "loading study allocation");
    let alloc = read_table(&study_allocation, None, false)
        .with_context(|| format!("reading {}", study_allocation.display()))?;
    let map = OwnershipMap::from_table(&alloc)?;
    if cfg.strict_ownership {
        map.ensure_consistent()?;
    }

    // ─── 4) load source report ──────────────────────────────────────
    info!(file = %source_report.display(), "loading source report");
    let mut raw = read_table(&source_report, Some(&cfg.source_sheet), true)
        .with_context(|| format!("reading {}", source_report.display()))?;
    raw.name = "RawData".into();
    raw.require_column(STUDY_COLUMN)?;
    raw.require_column(DUE_DATE_COLUMN)?;

    // ─── 5) enrich with RQC User ────────────────────────────────────
    let enriched_rows = enrich_table(&mut raw, &map)?;

    // ─── 6) raw data sheet + macro ──────────────────────────────────
    workbook.write_raw_data(&raw)?;
    workbook
        .run_macro(&cfg.macro_name)
        .with_context(|| format!("running macro '{}'", cfg.macro_name))?;

    // ─── 7) summary ─────────────────────────────────────────────────
    let summary = summarize_table(&raw, opts.reference_date)?;
    for row in &summary.rows {
        info!(
            owner = %row.owner,
            unblinded = row.unblinded_count,
            due_today = row.due_today_count,
            due_by_sunday = row.due_by_friday_count,
            "summary row"
        );
    }
    workbook.write_summary(&summary)?;

    // ─── 8) save ────────────────────────────────────────────────────
    let now = Local::now();
    let target = output_dir.join(format!("Processed_Report_{}", now.format("%Y%m%d_%H%M%S")));
    let saved_to = save_with_fallback(workbook, &target, now)?;

    info!(path = %saved_to.display(), "report finished");
    Ok(RunOutcome {
        source_report,
        study_allocation,
        enriched_rows,
        summary,
        saved_to,
    })
}

fn ensure_exists(role: &str, path: &Path) -> Result<(), ReportError> {
    if path.exists() {
        Ok(())
    } else {
        error!(role, path = %path.display(), "input file not found");
        Err(ReportError::InputMissing {
            role: role.to_string(),
            path: path.to_path_buf(),
        })
    }
}

/// `<path>_SAVE_ERROR_<HHMMSS>`, keeping any extension at the end.
pub fn alternate_path(path: &Path, now: DateTime<Local>) -> PathBuf {
    let suffix = format!("_SAVE_ERROR_{}", now.format("%H%M%S"));
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{}{}.{}", stem, suffix, ext.to_string_lossy()),
        None => format!("{}{}", stem, suffix),
    };
    path.with_file_name(name)
}

/// Save at `path`; if that fails, try once more at [`alternate_path`].
pub fn save_with_fallback(
    workbook: &mut dyn ReportWorkbook,
    path: &Path,
    now: DateTime<Local>,
) -> Result<PathBuf> {
    match workbook.save(path) {
        Ok(()) => Ok(path.to_path_buf()),
        Err(e) => {
            error!("saving to {} failed: {:#}", path.display(), e);
            let alt = alternate_path(path, now);
            warn!(path = %alt.display(), "attempting alternate save path");
            workbook
                .save(&alt)
                .with_context(|| format!("saving to alternate path {}", alt.display()))?;
            Ok(alt)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::fs;
    use tempfile::tempdir;

    use crate::table::Table;

    /// Records calls; fails the first `fail_saves` saves.
    #[derive(Default)]
    struct Recording {
        calls: Vec<String>,
        fail_saves: usize,
        raw: Option<Table>,
    }

    impl ReportWorkbook for Recording {
        fn write_raw_data(&mut self, table: &Table) -> Result<()> {
            self.calls.push("raw".into());
            self.raw = Some(table.clone());
            Ok(())
        }
        fn run_macro(&mut self, name: &str) -> Result<()> {
            self.calls.push(format!("macro:{}", name));
            Ok(())
        }
        fn write_summary(&mut self, _summary: &Summary) -> Result<()> {
            self.calls.push("summary".into());
            Ok(())
        }
        fn save(&mut self, path: &Path) -> Result<()> {
            self.calls.push(format!("save:{}", path.display()));
            if self.fail_saves > 0 {
                self.fail_saves -= 1;
                anyhow::bail!("disk full");
            }
            Ok(())
        }
    }

    fn noon() -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 3, 5, 12, 34, 56).unwrap()
    }

    fn opts(dir: &Path) -> RunOptions {
        RunOptions {
            input_dir: dir.to_path_buf(),
            output_dir: None,
            reference_date: NaiveDate::from_ymd_opt(2025, 3, 5).unwrap(),
            config: ReportConfig {
                source_report_name: "export.csv".into(),
                study_allocation_name: "alloc.csv".into(),
                ..ReportConfig::default()
            },
        }
    }

    fn write_inputs(dir: &Path) {
        fs::write(dir.join("alloc.csv"), "S1,Alice\nS2,Bob\nS1,Carol\n").unwrap();
        fs::write(
            dir.join("export.csv"),
            "Study,Content,Task Due Date\nS1,Unblinded doc,2025-03-05\n\"S1, S2\",memo,2025-03-08\n",
        )
        .unwrap();
    }

    #[test]
    fn alternate_path_appends_suffix() {
        assert_eq!(
            alternate_path(Path::new("/out/Processed_Report_1.xlsm"), noon()),
            PathBuf::from("/out/Processed_Report_1_SAVE_ERROR_123456.xlsm")
        );
        assert_eq!(
            alternate_path(Path::new("/out/Processed_Report_1"), noon()),
            PathBuf::from("/out/Processed_Report_1_SAVE_ERROR_123456")
        );
    }

    #[test]
    fn fallback_used_once_then_gives_up() {
        let mut wb = Recording {
            fail_saves: 1,
            ..Default::default()
        };
        let saved = save_with_fallback(&mut wb, Path::new("/out/r"), noon()).unwrap();
        assert_eq!(saved, PathBuf::from("/out/r_SAVE_ERROR_123456"));

        let mut wb = Recording {
            fail_saves: 2,
            ..Default::default()
        };
        assert!(save_with_fallback(&mut wb, Path::new("/out/r"), noon()).is_err());
        assert_eq!(wb.calls.len(), 2);
    }

    #[test]
    fn pipeline_calls_workbook_in_order() {
        let dir = tempdir().unwrap();
        write_inputs(dir.path());
        let mut wb = Recording::default();

        let outcome = run_pipeline(&opts(dir.path()), &mut wb, dir.path()).unwrap();

        assert_eq!(outcome.enriched_rows, 2);
        assert_eq!(wb.calls[0], "raw");
        assert_eq!(wb.calls[1], "macro:Module1.CreateFilteredSheetsWithHyperlinks");
        assert_eq!(wb.calls[2], "summary");
        assert!(wb.calls[3].starts_with("save:"));

        let raw = wb.raw.unwrap();
        assert_eq!(raw.headers.last().map(String::as_str), Some("RQC User"));
        assert_eq!(raw.get(1, 3).as_text(), "Carol, Bob");

        let owners: Vec<&str> = outcome.summary.rows.iter().map(|r| r.owner.as_str()).collect();
        assert_eq!(owners, vec!["Carol", "Carol, Bob"]);
        assert_eq!(outcome.summary.rows[0].unblinded_count, 1);
        assert_eq!(outcome.summary.rows[0].due_today_count, 1);
        assert_eq!(outcome.summary.rows[1].due_today_count, 0);
        assert_eq!(outcome.summary.rows[1].due_by_friday_count, 1);
    }

    #[test]
    fn strict_mode_rejects_conflicting_allocation() {
        let dir = tempdir().unwrap();
        write_inputs(dir.path());
        let mut o = opts(dir.path());
        o.config.strict_ownership = true;

        let err = run_pipeline(&o, &mut Recording::default(), dir.path()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ReportError>(),
            Some(ReportError::OwnershipConflicts(c)) if c[0].key == "S1"
        ));
    }

    #[test]
    fn missing_input_is_reported() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("alloc.csv"), "S1,Alice\n").unwrap();
        let mut wb = Recording::default();

        let err = run_pipeline(&opts(dir.path()), &mut wb, dir.path()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ReportError>(),
            Some(ReportError::InputMissing { role, .. }) if role == "source report"
        ));
        assert!(wb.calls.is_empty());
    }

    #[test]
    fn missing_due_date_column_stops_before_writing() {
        let dir = tempdir().unwrap();
        write_inputs(dir.path());
        fs::write(dir.path().join("export.csv"), "Study,Content\nS1,x\n").unwrap();
        let mut wb = Recording::default();

        let err = run_pipeline(&opts(dir.path()), &mut wb, dir.path()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ReportError>(),
            Some(ReportError::MissingColumn { column, .. }) if column == "Task Due Date"
        ));
        assert!(wb.calls.is_empty());
    }
}
