pub mod aggregate;
pub mod config;
pub mod constants;
pub mod enrich;
pub mod error;
pub mod ownership;
pub mod record;
pub mod report;
pub mod resolve;
pub mod table;

pub use aggregate::{aggregate, criteria_date, summarize_table, Summary, SummaryRow};
pub use config::ReportConfig;
pub use enrich::{enrich, enrich_table, owner_for_cell};
pub use error::ReportError;
pub use ownership::{build_map, OwnershipConflict, OwnershipMap};
pub use record::{Degradation, EnrichedRecord, RawRecord};
pub use report::{run_report, RunOptions, RunOutcome};
pub use resolve::{find_latest_file, resolve_latest, FileCandidate, Version};
pub use table::{Cell, Table};
