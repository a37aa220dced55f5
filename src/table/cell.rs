use calamine::Data;
use chrono::{NaiveDate, NaiveDateTime, Timelike};
use std::fmt;

use crate::table::date_parser;

/// One spreadsheet cell, after the reader has decided what kind of value it holds.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDateTime),
}

impl Cell {
    /// Wrap a raw CSV field; an empty field is `Empty`.
    pub fn from_text(raw: &str) -> Self {
        if raw.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(raw.to_string())
        }
    }

    /// `Empty`, or text that is the empty string.
    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    /// String form used for keys, owners and CSV output.
    ///
    /// Whole numbers print without a fractional part so a study id stored as a
    /// number in one sheet matches the same id typed as text in another.
    pub fn as_text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.clone(),
            Cell::Number(n) => format_number(*n),
            Cell::Date(dt) => {
                if dt.time().num_seconds_from_midnight() == 0 && dt.nanosecond() == 0 {
                    dt.format("%Y-%m-%d").to_string()
                } else {
                    dt.format("%Y-%m-%d %H:%M:%S").to_string()
                }
            }
        }
    }

    /// Calendar date of this cell, if it holds one.
    ///
    /// Text goes through the accepted date formats, numbers are read as Excel
    /// serial days. Anything else is `None`.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Cell::Empty => None,
            Cell::Text(s) => date_parser::parse_date(s),
            Cell::Number(n) => date_parser::from_excel_serial(*n),
            Cell::Date(dt) => Some(dt.date()),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_text())
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::from_text(value)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

impl From<NaiveDate> for Cell {
    fn from(value: NaiveDate) -> Self {
        Cell::Date(value.and_time(chrono::NaiveTime::MIN))
    }
}

impl From<&Data> for Cell {
    fn from(value: &Data) -> Self {
        match value {
            Data::Empty => Cell::Empty,
            Data::String(s) => Cell::from_text(s),
            Data::Int(n) => Cell::Number(*n as f64),
            Data::Float(f) => Cell::Number(*f),
            Data::Bool(b) => Cell::Text(if *b { "True" } else { "False" }.to_string()),
            Data::Error(e) => Cell::Text(e.to_string()),
            Data::DateTime(dt) => match dt.as_datetime() {
                Some(naive) => Cell::Date(naive),
                None => Cell::Number(dt.as_f64()),
            },
            Data::DateTimeIso(s) => match date_parser::parse_datetime(s) {
                Some(naive) => Cell::Date(naive),
                None => Cell::from_text(s),
            },
            Data::DurationIso(s) => Cell::from_text(s),
        }
    }
}

fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_numbers_print_as_integers() {
        assert_eq!(Cell::Number(101.0).as_text(), "101");
        assert_eq!(Cell::Number(101.5).as_text(), "101.5");
        assert_eq!(Cell::Number(-3.0).as_text(), "-3");
    }

    #[test]
    fn blank_covers_empty_text() {
        assert!(Cell::Empty.is_blank());
        assert!(Cell::Text(String::new()).is_blank());
        assert!(!Cell::Text(" ".into()).is_blank());
        assert!(!Cell::Number(0.0).is_blank());
    }

    #[test]
    fn date_cells_render_without_midnight_time() {
        let d = NaiveDate::from_ymd_opt(2025, 3, 5).unwrap();
        assert_eq!(Cell::from(d).as_text(), "2025-03-05");
        let dt = d.and_hms_opt(14, 30, 0).unwrap();
        assert_eq!(Cell::Date(dt).as_text(), "2025-03-05 14:30:00");
    }

    #[test]
    fn as_date_reads_every_kind() {
        let want = NaiveDate::from_ymd_opt(2025, 3, 5);
        assert_eq!(Cell::Text("2025-03-05".into()).as_date(), want);
        assert_eq!(Cell::Number(45721.0).as_date(), want);
        assert_eq!(Cell::from(want.unwrap()).as_date(), want);
        assert_eq!(Cell::Empty.as_date(), None);
        assert_eq!(Cell::Text("soon".into()).as_date(), None);
    }

    #[test]
    fn calamine_values_convert() {
        assert_eq!(Cell::from(&Data::Empty), Cell::Empty);
        assert_eq!(Cell::from(&Data::String(String::new())), Cell::Empty);
        assert_eq!(Cell::from(&Data::Int(7)), Cell::Number(7.0));
        assert_eq!(
            Cell::from(&Data::DateTimeIso("2025-03-05T09:00:00".into())),
            Cell::Date(
                NaiveDate::from_ymd_opt(2025, 3, 5)
                    .unwrap()
                    .and_hms_opt(9, 0, 0)
                    .unwrap()
            )
        );
    }
}
