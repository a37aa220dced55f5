// src/resolve/mod.rs
//! Pick the newest copy of a downloaded report.
//!
//! Browsers save repeated downloads as `Report.xlsx`, `Report (1).xlsx`,
//! `Report (2).xlsx`, ... The copy with the highest number is the latest; the
//! bare name only wins when no numbered copy exists.

use glob::{glob, Pattern};
use regex::{Regex, RegexBuilder};
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, instrument, warn};

/// A directory entry that matched the base pattern. Only lives during selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCandidate {
    pub name: String,
    /// The `(N)` suffix, or `None` for the bare file.
    pub version: Option<Version>,
}

/// A copy number of any length, kept as canonical ASCII digits without
/// leading zeros so it never overflows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version(String);

impl Version {
    /// Normalize the digits captured by `\d+`. Non-ASCII decimal digits
    /// (e.g. Arabic-Indic `٣`) count with their numeric value.
    fn from_digits(digits: &str, digit: &Regex) -> Option<Self> {
        let mut canonical = String::with_capacity(digits.len());
        for c in digits.chars() {
            let value = decimal_value(c, digit)?;
            if canonical.is_empty() && value == 0 {
                continue;
            }
            canonical.push(char::from(b'0' + value));
        }
        if canonical.is_empty() {
            canonical.push('0');
        }
        Some(Self(canonical))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .len()
            .cmp(&other.0.len())
            .then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Value of a Unicode decimal digit. Decimal digits are assigned in
/// contiguous runs of ten starting at zero, so the offset from the start of
/// the run gives the value.
fn decimal_value(c: char, digit: &Regex) -> Option<u8> {
    if let Some(d) = c.to_digit(10) {
        return Some(d as u8);
    }
    let is_digit = |ch: char| digit.is_match(ch.encode_utf8(&mut [0u8; 4]));
    if !is_digit(c) {
        return None;
    }
    let mut start = c as u32;
    while let Some(prev) = start.checked_sub(1).and_then(char::from_u32) {
        if !is_digit(prev) {
            break;
        }
        start -= 1;
    }
    Some(((c as u32 - start) % 10) as u8)
}

/// Compiled form of a base pattern such as `"Report.xlsx"`.
#[derive(Debug)]
pub struct VersionPattern {
    regex: Regex,
    digit: Regex,
}

impl VersionPattern {
    /// Build the matcher `^<base>(?:\s*\((\d+)\))?<ext>$`, case-insensitive.
    pub fn new(base_pattern: &str) -> Self {
        let (base, ext) = split_extension(base_pattern);
        let source = format!(
            r"^{}(?:\s*\((\d+)\))?{}$",
            regex::escape(base),
            regex::escape(ext)
        );
        let regex = RegexBuilder::new(&source)
            .case_insensitive(true)
            .build()
            .expect("escaped version pattern should compile");
        let digit = Regex::new(r"^\d$").expect("digit class should compile");
        Self { regex, digit }
    }

    /// `Some` if `name` is the bare file or a numbered copy of it.
    pub fn candidate(&self, name: &str) -> Option<FileCandidate> {
        let caps = self.regex.captures(name)?;
        let version = match caps.get(1) {
            Some(digits) => Some(Version::from_digits(digits.as_str(), &self.digit)?),
            None => None,
        };
        Some(FileCandidate {
            name: name.to_string(),
            version,
        })
    }
}

/// Split at the last `.` of the file name. A name that starts with its only
/// dot (`.env`) has no extension.
fn split_extension(pattern: &str) -> (&str, &str) {
    match pattern.rfind('.') {
        Some(idx) if idx > 0 => pattern.split_at(idx),
        _ => (pattern, ""),
    }
}

/// Choose the latest file matching `base_pattern` among `listing`.
///
/// Returns `base_pattern` unchanged when nothing matches; the caller turns
/// that into "file not found" when the path does not exist.
pub fn resolve_latest<I, S>(base_pattern: &str, listing: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let pattern = VersionPattern::new(base_pattern);
    let mut best: Option<FileCandidate> = None;

    for name in listing {
        let Some(cand) = pattern.candidate(name.as_ref()) else {
            continue;
        };
        let better = match &best {
            None => true,
            // numbered beats bare; higher number beats lower; equal numbers
            // fall back to name order so listing order never matters
            Some(cur) => match (&cand.version, &cur.version) {
                (Some(a), Some(b)) => match a.cmp(b) {
                    Ordering::Greater => true,
                    Ordering::Less => false,
                    Ordering::Equal => cand.name < cur.name,
                },
                (Some(_), None) => true,
                (None, Some(_)) => false,
                (None, None) => cand.name < cur.name,
            },
        };
        if better {
            best = Some(cand);
        }
    }

    match best {
        Some(cand) => cand.name,
        None => base_pattern.to_string(),
    }
}

/// List file names directly under `dir`.
pub fn list_directory<P: AsRef<Path>>(dir: P) -> anyhow::Result<Vec<String>> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        anyhow::bail!("directory not found: {}", dir.display());
    }
    let pattern = format!("{}/*", Pattern::escape(&dir.to_string_lossy()));
    let mut names = Vec::new();
    for entry in glob(&pattern)? {
        let path = entry?;
        if let Some(name) = path.file_name().and_then(|s| s.to_str()) {
            names.push(name.to_string());
        }
    }
    Ok(names)
}

/// Resolve `base_pattern` against the files in `dir` and return the full path.
///
/// Never fails: an unreadable directory or a miss yields `dir/base_pattern`,
/// which the caller's existence check reports.
#[instrument(level = "info", skip(dir), fields(dir = %dir.as_ref().display()))]
pub fn find_latest_file<P: AsRef<Path>>(base_pattern: &str, dir: P) -> PathBuf {
    let dir = dir.as_ref();
    let names = match list_directory(dir) {
        Ok(names) => names,
        Err(e) => {
            error!("listing {} failed: {:#}", dir.display(), e);
            return dir.join(base_pattern);
        }
    };
    debug!(entries = names.len(), "listed directory");

    let chosen = resolve_latest(base_pattern, &names);
    if names.iter().any(|n| *n == chosen) {
        info!(file = %chosen, "found latest matching file");
    } else {
        warn!("no files matching '{}' in {}", base_pattern, dir.display());
    }
    dir.join(chosen)
}
