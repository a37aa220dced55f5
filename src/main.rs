use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::Parser;
use rqcreport::{
    config::{ReportConfig, CONFIG_FILE_NAME},
    run_report, RunOptions,
};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Consolidate the RQC task export with study allocations and summarize workload per reviewer"
)]
struct Args {
    /// Directory holding the source report and allocation table
    #[arg(long, default_value = ".")]
    dir: PathBuf,
    /// YAML config; defaults to <dir>/rqcreport.yaml when present
    #[arg(long)]
    config: Option<PathBuf>,
    /// Reference date (YYYY-MM-DD); defaults to today
    #[arg(long)]
    date: Option<NaiveDate>,
    /// Output directory; defaults to <dir>/<output_folder>
    #[arg(long)]
    output: Option<PathBuf>,
    /// Fail when a study is allocated to more than one reviewer
    #[arg(long)]
    strict_ownership: bool,
    /// Print the summary as JSON on stdout
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    info!(dir = %args.dir.display(), "startup");

    // ─── 2) configuration ────────────────────────────────────────────
    let config_path = args
        .config
        .clone()
        .or_else(|| Some(args.dir.join(CONFIG_FILE_NAME)).filter(|p| p.exists()));
    let mut config = match &config_path {
        Some(path) => ReportConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ReportConfig::default(),
    };
    if args.strict_ownership {
        config.strict_ownership = true;
    }

    let opts = RunOptions {
        input_dir: args.dir.clone(),
        output_dir: args.output.clone(),
        reference_date: args.date.unwrap_or_else(|| Local::now().date_naive()),
        config,
    };

    // ─── 3) run ──────────────────────────────────────────────────────
    let outcome = run_report(&opts)?;
    if !outcome.summary.warnings.is_empty() {
        warn!(
            count = outcome.summary.warnings.len(),
            "report completed with degraded rows or columns"
        );
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome.summary)?);
    }
    info!(
        rows = outcome.enriched_rows,
        owners = outcome.summary.rows.len(),
        path = %outcome.saved_to.display(),
        "all done"
    );
    Ok(())
}
