//! Column names and sentinels shared by the enrichment and summary stages.

/// Owner recorded whenever no reviewer can be resolved.
pub const NA_OWNER: &str = "NA";

/// Raw report column holding one or more comma-separated study keys.
pub const STUDY_COLUMN: &str = "Study";
/// Free-text column scanned for [`UNBLINDED_MARKER`].
pub const CONTENT_COLUMN: &str = "Content";
pub const DUE_DATE_COLUMN: &str = "Task Due Date";
/// Column written by enrichment.
pub const OWNER_COLUMN: &str = "RQC User";

pub const UNBLINDED_MARKER: &str = "unblinded";

pub const SUMMARY_UNBLINDED: &str = "Unblinded";
pub const SUMMARY_DUE_TODAY: &str = "Due By Today";
/// Counts tasks due on or before the coming Sunday; the label is historical.
pub const SUMMARY_DUE_BY_FRIDAY: &str = "Due By Friday";

/// Single-cell placeholder written instead of an empty summary.
pub const EMPTY_SUMMARY_PLACEHOLDER: &str = "No data for Pivot Table";
