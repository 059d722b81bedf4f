//! Wide ⇄ long reshaping.
//!
//! - [`wide_to_long`]: date + N intraday columns → one value per timestamp
//! - [`long_to_wide`]: timestamped values → one row per calendar day
//!
//! Both directions fill the full calendar between the first and last day seen,
//! so the output shape depends only on the date span and the target grid:
//! `days × points` values in long form, `days` rows in wide form.
//! Downsampling selects label subsets (see `Frequency::stride_from`); asking
//! for a finer grid than the source has fails with `UnsupportedUpsample`.

use std::collections::{BTreeMap, HashMap};

use chrono::{NaiveDate, NaiveDateTime};
use tracing::debug;

use crate::domain::{
    cell_to_date, cell_to_timestamp, check_span, DateEncoding, Frequency, LongSeries, Table, WideRow, WideTable,
};
use crate::error::CoreError;

/// Parse a wide source table at its native frequency.
///
/// The date key is looked up among the columns first, then as the index.
/// After that, the table must have exactly 97, 49 or 25 columns (date plus
/// 96/48/24 values); the value columns are taken in their table order.
pub fn read_wide(table: &Table, date_column: &str, encoding: DateEncoding) -> Result<WideTable, CoreError> {
    let (table, date_pos) = table.resolve_key(date_column)?;

    let width = table.width();
    let native = Frequency::from_points(width.saturating_sub(1)).ok_or_else(|| CoreError::ShapeMismatch {
        context: format!("column count of wide table keyed by `{date_column}`"),
        expected: Frequency::ALL.iter().map(|f| f.points() + 1).collect(),
        actual: width,
    })?;

    let value_positions: Vec<usize> = (0..width).filter(|&i| i != date_pos).collect();

    let mut rows = Vec::with_capacity(table.len());
    for (i, row) in table.rows().iter().enumerate() {
        let key = &row[date_pos];
        let date = cell_to_date(key, encoding).ok_or_else(|| CoreError::InvalidDate {
            row: i + 1,
            value: key.render(""),
        })?;
        let values = value_positions.iter().map(|&p| row[p].as_f64()).collect();
        rows.push(WideRow { date, values });
    }

    WideTable::new(date_column, native, rows)
}

impl WideTable {
    /// Same as [`read_wide`].
    pub fn from_table(table: &Table, date_column: &str, encoding: DateEncoding) -> Result<Self, CoreError> {
        read_wide(table, date_column, encoding)
    }
}

/// Flatten a wide table into a gap-free long series at `target` points per day.
///
/// The output covers every calendar day from the earliest to the latest date
/// in the input (input order does not matter); days without a row become
/// runs of `None`. The time column of the output is named `date_column`.
pub fn wide_to_long(
    table: &Table,
    date_column: &str,
    value_column: &str,
    target: Frequency,
    encoding: DateEncoding,
) -> Result<LongSeries, CoreError> {
    let wide = read_wide(table, date_column, encoding)?;
    let stride = target.stride_from(wide.frequency())?;

    let series = LongSeries::from_day_rows(
        date_column.to_string(),
        value_column.to_string(),
        target,
        stride,
        wide.rows().iter().map(|r| (r.date, r.values.as_slice())),
    );

    debug!(
        source_rows = wide.len(),
        days = series.day_count(),
        native = wide.frequency().points(),
        target = target.points(),
        "wide -> long"
    );
    Ok(series)
}

/// Pivot a long table (timestamp + value column) into one row per day.
///
/// Values are matched to the `target` grid by exact timestamp; observations
/// off the grid are ignored and repeated timestamps keep the first value.
/// Fails with `UnsupportedUpsample` when no day in the source holds at least
/// `target` rows.
pub fn long_to_wide(
    table: &Table,
    time_column: &str,
    value_column: &str,
    target: Frequency,
) -> Result<WideTable, CoreError> {
    let (table, time_pos) = table.resolve_key(time_column)?;
    let value_pos = table
        .position(value_column)
        .ok_or_else(|| table.missing_key(value_column))?;

    let mut observations: BTreeMap<NaiveDateTime, Option<f64>> = BTreeMap::new();
    let mut rows_per_day: HashMap<NaiveDate, usize> = HashMap::new();
    let mut repeated = 0usize;

    for (i, row) in table.rows().iter().enumerate() {
        let key = &row[time_pos];
        let ts = cell_to_timestamp(key).ok_or_else(|| CoreError::InvalidDate {
            row: i + 1,
            value: key.render(""),
        })?;
        *rows_per_day.entry(ts.date()).or_default() += 1;
        if observations.contains_key(&ts) {
            repeated += 1;
            continue;
        }
        observations.insert(ts, row[value_pos].as_f64());
    }

    let (Some(first), Some(last)) = (observations.keys().next(), observations.keys().next_back()) else {
        return WideTable::new(time_column, target, Vec::new());
    };
    let (first, last) = (first.date(), last.date());
    check_span(first, last)?;

    let density = rows_per_day.values().copied().max().unwrap_or(0);
    if density < target.points() {
        return Err(CoreError::UnsupportedUpsample {
            source_points: density,
            target_points: target.points(),
        });
    }

    let off_grid = observations
        .keys()
        .filter(|ts| target.slot_of(ts.time()).is_none())
        .count();
    if repeated > 0 || off_grid > 0 {
        debug!(repeated, off_grid, target = target.points(), "long -> wide: ignored observations");
    }

    let rows: Vec<WideRow> = first
        .iter_days()
        .take_while(|day| *day <= last)
        .map(|day| WideRow {
            date: day,
            values: (0..target.points())
                .map(|slot| observations.get(&day.and_time(target.slot_time(slot))).copied().flatten())
                .collect(),
        })
        .collect();

    WideTable::new(time_column, target, rows)
}
