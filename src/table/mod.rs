// src/table/mod.rs
pub mod cell;
pub mod date_parser;
pub mod io;

pub use cell::Cell;
pub use io::{read_table, write_csv};

use crate::error::ReportError;

static EMPTY: Cell = Cell::Empty;

/// A sheet of cells: an optional header row plus data rows.
///
/// Rows may be ragged; reads past the end of a row see `Cell::Empty`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    /// Sheet name, used in error messages.
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(name: impl Into<String>, headers: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self {
            name: name.into(),
            headers,
            rows,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Widest of the header row and every data row.
    pub fn width(&self) -> usize {
        self.rows
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(self.headers.len()))
            .max()
            .unwrap_or(0)
    }

    /// Index of the first header exactly equal to `name`.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn require_column(&self, name: &str) -> Result<usize, ReportError> {
        self.column_index(name)
            .ok_or_else(|| ReportError::missing_column(name, &self.name))
    }

    pub fn get(&self, row: usize, col: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY)
    }

    /// Cells of column `col`, one per data row.
    pub fn column(&self, col: usize) -> impl Iterator<Item = &Cell> + '_ {
        (0..self.rows.len()).map(move |row| self.get(row, col))
    }

    /// Write `values` into the column headed `name`, overwriting it if present
    /// and appending it after the last header otherwise. Returns the column index.
    pub fn set_column(&mut self, name: &str, values: Vec<Cell>) -> usize {
        let idx = match self.column_index(name) {
            Some(idx) => idx,
            None => {
                self.headers.push(name.to_string());
                self.headers.len() - 1
            }
        };
        let mut values = values.into_iter();
        for row in &mut self.rows {
            if row.len() <= idx {
                row.resize(idx + 1, Cell::Empty);
            }
            row[idx] = values.next().unwrap_or(Cell::Empty);
        }
        idx
    }
}
