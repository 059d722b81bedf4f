//! Date and timestamp parsing for table cells.

use chrono::{NaiveDate, NaiveDateTime};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::domain::table::Cell;

/// How the date key of a wide table is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DateEncoding {
    /// Real dates, timestamps, or date text (`YYYY-MM-DD`, `YYYY/MM/DD`, ...).
    #[default]
    Calendar,
    /// 8-digit `YYYYMMDD` text or integers.
    Compact,
}

const DATE_FMTS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y", "%Y%m%d"];

const DATETIME_FMTS: [&str; 5] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
];

/// Parse a date from free text, accepting a date-time and keeping the day.
pub fn parse_date_text(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    for fmt in DATE_FMTS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    parse_datetime_text(s).map(|ts| ts.date())
}

pub fn parse_datetime_text(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    for fmt in DATETIME_FMTS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(ts);
        }
    }
    None
}

/// Reformat an 8-digit `YYYYMMDD` key to `YYYY-MM-DD` and parse it.
pub fn parse_compact_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    let s = s.strip_suffix(".0").unwrap_or(s);
    if s.len() != 8 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let iso = format!("{}-{}-{}", &s[0..4], &s[4..6], &s[6..8]);
    NaiveDate::parse_from_str(&iso, "%Y-%m-%d").ok()
}

/// Read a day from a cell under the given encoding.
pub fn cell_to_date(cell: &Cell, encoding: DateEncoding) -> Option<NaiveDate> {
    match (encoding, cell) {
        (_, Cell::Date(d)) => Some(*d),
        (_, Cell::Timestamp(ts)) => Some(ts.date()),
        (DateEncoding::Calendar, Cell::Text(s)) => parse_date_text(s),
        (DateEncoding::Compact, Cell::Text(s)) => parse_compact_date(s),
        (DateEncoding::Compact, Cell::Number(v)) if v.fract() == 0.0 && *v > 0.0 => {
            parse_compact_date(&format!("{}", *v as i64))
        }
        _ => None,
    }
}

/// Read an exact timestamp from a cell; bare dates map to midnight.
pub fn cell_to_timestamp(cell: &Cell) -> Option<NaiveDateTime> {
    match cell {
        Cell::Timestamp(ts) => Some(*ts),
        Cell::Date(d) => d.and_hms_opt(0, 0, 0),
        Cell::Text(s) => parse_datetime_text(s).or_else(|| parse_date_text(s).and_then(|d| d.and_hms_opt(0, 0, 0))),
        _ => None,
    }
}
