use calamine::{open_workbook_auto, Reader};
use csv::{ReaderBuilder, WriterBuilder};
use std::borrow::Cow;
use std::path::Path;
use tracing::{debug, instrument, warn};

use crate::error::ReportError;
use crate::table::{Cell, Table};

const WORKBOOK_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// Load a table from a workbook sheet or a CSV file, chosen by extension.
///
/// - `sheet`: sheet to read from a workbook; `None` reads the first sheet.
///   Ignored for CSV.
/// - `has_headers`: when true the first row becomes `Table::headers`.
#[instrument(level = "debug", skip(path), fields(path = %path.as_ref().display()))]
pub fn read_table<P: AsRef<Path>>(
    path: P,
    sheet: Option<&str>,
    has_headers: bool,
) -> Result<Table, ReportError> {
    let path = path.as_ref();
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let (name, mut rows) = if ext == "csv" {
        (stem(path), read_csv_rows(path)?)
    } else if WORKBOOK_EXTENSIONS.contains(&ext.as_str()) {
        read_sheet_rows(path, sheet)?
    } else {
        return Err(ReportError::UnsupportedFormat(path.to_path_buf()));
    };

    let headers = if has_headers && !rows.is_empty() {
        rows.remove(0).iter().map(Cell::as_text).collect()
    } else {
        Vec::new()
    };
    debug!(rows = rows.len(), columns = headers.len(), "loaded table");
    Ok(Table::new(name, headers, rows))
}

fn read_csv_rows(path: &Path) -> Result<Vec<Vec<Cell>>, ReportError> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;
    let mut rows: Vec<Vec<Cell>> = Vec::new();
    let mut lossy_rows = 0usize;
    // Excel "Save as CSV" often emits Windows-1252; keep such rows with U+FFFD
    for result in rdr.byte_records() {
        let record = result?;
        let mut lossy = false;
        let row = record
            .iter()
            .map(|field| {
                let text = String::from_utf8_lossy(field);
                lossy |= matches!(text, Cow::Owned(_));
                Cell::from_text(&text)
            })
            .collect::<Vec<Cell>>();
        if lossy {
            lossy_rows += 1;
        }
        rows.push(row);
    }
    if lossy_rows > 0 {
        warn!(rows = lossy_rows, path = %path.display(), "replaced invalid UTF-8 in csv fields");
    }
    Ok(rows)
}

fn read_sheet_rows(
    path: &Path,
    sheet: Option<&str>,
) -> Result<(String, Vec<Vec<Cell>>), ReportError> {
    let mut workbook = open_workbook_auto(path)?;
    let names = workbook.sheet_names().to_vec();
    let name = match sheet.filter(|s| !s.is_empty()) {
        Some(wanted) if names.iter().any(|n| n == wanted) => wanted.to_string(),
        Some(wanted) => {
            return Err(ReportError::SheetNotFound {
                sheet: wanted.to_string(),
                path: path.to_path_buf(),
            })
        }
        None => names
            .first()
            .cloned()
            .ok_or_else(|| ReportError::SheetNotFound {
                sheet: "<first sheet>".to_string(),
                path: path.to_path_buf(),
            })?,
    };

    let range = workbook.worksheet_range(&name)?;
    // calamine trims leading empty columns; pad them back so column A stays index 0
    let col_offset = range.start().map(|(_, c)| c as usize).unwrap_or(0);
    let rows: Vec<Vec<Cell>> = range
        .rows()
        .map(|row| {
            std::iter::repeat(Cell::Empty)
                .take(col_offset)
                .chain(row.iter().map(Cell::from))
                .collect::<Vec<Cell>>()
        })
        .collect();
    Ok((name, rows))
}

/// Write `table` (headers first, when present) as CSV.
pub fn write_csv<P: AsRef<Path>>(table: &Table, path: P) -> Result<(), ReportError> {
    let mut wtr = WriterBuilder::new().flexible(true).from_path(path.as_ref())?;
    if !table.headers.is_empty() {
        wtr.write_record(&table.headers)?;
    }
    for row in &table.rows {
        wtr.write_record(row.iter().map(Cell::as_text))?;
    }
    wtr.flush()?;
    Ok(())
}

fn stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}
