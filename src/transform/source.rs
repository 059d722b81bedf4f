//! Cleanup of raw load and weather exports.
//!
//! Raw exports carry bookkeeping columns, several cities and several
//! calibers in one table, and value columns labelled however the exporting
//! system likes. [`normalize_source`] reduces such a table to
//! `date [, city] + catalog labels`, ready for [`read_wide`](super::read_wide).

use tracing::debug;

use crate::domain::{cell_to_date, Cell, DateEncoding, DailyStats, Frequency, Table, WideTable};
use crate::error::CoreError;

/// Columns dropped from raw exports (matched case-insensitively).
pub const BOOKKEEPING_COLUMNS: [&str; 6] = ["ID", "CALIBER_ID", "TYPE", "CREATETIME", "UPDATETIME", "T2400"];

const CALIBER_COLUMN: &str = "CALIBER_ID";

#[derive(Debug, Clone)]
pub struct SourceOptions {
    pub date_column: String,
    pub city_column: String,
    pub date_encoding: DateEncoding,
    /// Keep only rows of this city.
    pub city_id: Option<i64>,
    /// Keep only rows of this caliber.
    pub caliber_id: Option<i64>,
    pub keep_city_column: bool,
}

impl Default for SourceOptions {
    fn default() -> Self {
        Self {
            date_column: "DATE".to_string(),
            city_column: "CITY_ID".to_string(),
            date_encoding: DateEncoding::Calendar,
            city_id: None,
            caliber_id: None,
            keep_city_column: false,
        }
    }
}

/// Normalize a raw export.
///
/// Steps, in order: filter by caliber and city, drop rows whose date does not
/// parse, drop bookkeeping columns, check the number of value columns against
/// the catalog, relabel them with catalog labels, and drop the city column
/// unless asked to keep it. Dates come out as date cells.
pub fn normalize_source(table: &Table, opts: &SourceOptions) -> Result<Table, CoreError> {
    let (table, _) = table.resolve_key(&opts.date_column)?;
    let mut table = table.into_owned();

    if let Some(caliber) = opts.caliber_id {
        let pos = find_column(&table, CALIBER_COLUMN).ok_or_else(|| table.missing_key(CALIBER_COLUMN))?;
        table = table.filter_rows(|row| id_matches(&row[pos], caliber));
    }
    if let Some(city) = opts.city_id {
        let pos = table
            .position(&opts.city_column)
            .ok_or_else(|| table.missing_key(&opts.city_column))?;
        table = table.filter_rows(|row| id_matches(&row[pos], city));
    }

    let date_pos = table
        .position(&opts.date_column)
        .ok_or_else(|| table.missing_key(&opts.date_column))?;
    let before = table.len();
    table = table.filter_rows(|row| cell_to_date(&row[date_pos], opts.date_encoding).is_some());
    if table.len() < before {
        debug!(dropped = before - table.len(), "rows without a parseable date dropped");
    }

    let table = table.drop_columns(&BOOKKEEPING_COLUMNS);
    let date_pos = table
        .position(&opts.date_column)
        .ok_or_else(|| table.missing_key(&opts.date_column))?;
    let city_pos = table.position(&opts.city_column);

    let value_count = table.width() - 1 - usize::from(city_pos.is_some());
    let frequency = Frequency::from_points(value_count).ok_or_else(|| CoreError::ShapeMismatch {
        context: "value columns after dropping bookkeeping columns".to_string(),
        expected: Frequency::ALL.iter().map(|f| f.points()).collect(),
        actual: value_count,
    })?;

    let mut labels = frequency.labels().iter();
    let columns: Vec<String> = table
        .columns()
        .iter()
        .enumerate()
        .map(|(i, name)| {
            if i == date_pos || Some(i) == city_pos {
                name.clone()
            } else {
                labels.next().cloned().unwrap_or_else(|| name.clone())
            }
        })
        .collect();
    let mut table = table.rename_columns(columns)?;

    if !opts.keep_city_column && city_pos.is_some() {
        table = table.drop_columns(&[opts.city_column.as_str()]);
    }

    let date_pos = table
        .position(&opts.date_column)
        .ok_or_else(|| table.missing_key(&opts.date_column))?;
    let rows = table
        .rows()
        .iter()
        .map(|row| {
            let mut row = row.clone();
            if let Some(date) = cell_to_date(&row[date_pos], opts.date_encoding) {
                row[date_pos] = Cell::Date(date);
            }
            row
        })
        .collect();

    debug!(rows = table.len(), points = frequency.points(), "source normalized");
    Table::from_rows(table.columns().to_vec(), rows)
}

/// Render a wide table with `MAX`, `MIN` and `AVG` columns appended.
pub fn with_daily_stats(wide: &WideTable) -> Table {
    let mut columns = vec![wide.date_column().to_string()];
    columns.extend(wide.labels().iter().cloned());
    columns.extend(["MAX", "MIN", "AVG"].map(String::from));

    let stats: Vec<DailyStats> = wide.daily_stats();
    let rows = wide
        .rows()
        .iter()
        .zip(stats)
        .map(|(row, s)| {
            let mut out = Vec::with_capacity(row.values.len() + 4);
            out.push(Cell::Date(row.date));
            out.extend(row.values.iter().map(|v| Cell::from(*v)));
            out.extend([s.max, s.min, s.avg].map(Cell::from));
            out
        })
        .collect();
    Table::from_rows(columns, rows).unwrap_or_default()
}

fn find_column(table: &Table, name: &str) -> Option<usize> {
    table.columns().iter().position(|c| c.eq_ignore_ascii_case(name))
}

fn id_matches(cell: &Cell, id: i64) -> bool {
    match cell {
        Cell::Number(v) => v.fract() == 0.0 && *v as i64 == id,
        Cell::Text(s) => s.trim().parse::<i64>().is_ok_and(|v| v == id),
        _ => false,
    }
}
