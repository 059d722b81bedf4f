//! Wide and long layouts of an intraday series.
//!
//! - [`WideTable`]: one row per day, one value per grid label.
//! - [`LongSeries`]: one value per timestamp, stored as a contiguous block
//!   starting at `first_day 00:00` with the grid step between values. The
//!   timestamp index is implied by position, so it cannot have gaps: a day
//!   with no data is a run of `None`, never a missing run of rows.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::frequency::Frequency;
use crate::domain::table::{Cell, Table};
use crate::error::CoreError;

/// Longest run of calendar days a table may cover, first and last included.
pub const MAX_SPAN_DAYS: i64 = 36_600;

/// Fails with `SpanTooLong` when `[first, last]` exceeds [`MAX_SPAN_DAYS`].
pub(crate) fn check_span(first: NaiveDate, last: NaiveDate) -> Result<(), CoreError> {
    let days = (last - first).num_days() + 1;
    if days > MAX_SPAN_DAYS {
        return Err(CoreError::SpanTooLong {
            first,
            last,
            days,
            limit: MAX_SPAN_DAYS,
        });
    }
    Ok(())
}

/// One day of a wide table.
#[derive(Debug, Clone, PartialEq)]
pub struct WideRow {
    pub date: NaiveDate,
    pub values: Vec<Option<f64>>,
}

/// Per-day MAX/MIN/AVG over the values that are present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyStats {
    pub date: NaiveDate,
    pub max: Option<f64>,
    pub min: Option<f64>,
    pub avg: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WideTable {
    date_column: String,
    frequency: Frequency,
    rows: Vec<WideRow>,
}

impl WideTable {
    /// Build a wide table. Rows are sorted by date; for repeated dates the
    /// first row wins. The dates may span at most [`MAX_SPAN_DAYS`] days.
    pub fn new(
        date_column: impl Into<String>,
        frequency: Frequency,
        rows: Vec<WideRow>,
    ) -> Result<Self, CoreError> {
        for row in &rows {
            if row.values.len() != frequency.points() {
                return Err(CoreError::ShapeMismatch {
                    context: format!("values for {}", row.date),
                    expected: vec![frequency.points()],
                    actual: row.values.len(),
                });
            }
        }
        let rows = dedup_days(rows);
        if let (Some(first), Some(last)) = (rows.first(), rows.last()) {
            check_span(first.date, last.date)?;
        }
        Ok(Self {
            date_column: date_column.into(),
            frequency,
            rows,
        })
    }

    pub fn date_column(&self) -> &str {
        &self.date_column
    }

    pub fn frequency(&self) -> Frequency {
        self.frequency
    }

    pub fn labels(&self) -> &'static [String] {
        self.frequency.labels()
    }

    pub fn rows(&self) -> &[WideRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, date: NaiveDate) -> Option<&WideRow> {
        self.rows
            .binary_search_by_key(&date, |r| r.date)
            .ok()
            .map(|i| &self.rows[i])
    }

    /// Keep the days for which `keep(date)` holds.
    pub fn filter_dates(&self, mut keep: impl FnMut(NaiveDate) -> bool) -> WideTable {
        WideTable {
            date_column: self.date_column.clone(),
            frequency: self.frequency,
            rows: self.rows.iter().filter(|r| keep(r.date)).cloned().collect(),
        }
    }

    /// Select the coarser grid's labels out of each row.
    pub fn downsample(&self, target: Frequency) -> Result<WideTable, CoreError> {
        let stride = target.stride_from(self.frequency)?;
        let rows = self
            .rows
            .iter()
            .map(|r| WideRow {
                date: r.date,
                values: r.values.iter().step_by(stride).copied().collect(),
            })
            .collect();
        Ok(WideTable {
            date_column: self.date_column.clone(),
            frequency: target,
            rows,
        })
    }

    /// Flatten to a gap-free long series at this table's frequency.
    pub fn to_long(&self, value_column: impl Into<String>) -> LongSeries {
        LongSeries::from_day_rows(
            self.date_column.clone(),
            value_column.into(),
            self.frequency,
            1,
            self.rows.iter().map(|r| (r.date, r.values.as_slice())),
        )
    }

    pub fn daily_stats(&self) -> Vec<DailyStats> {
        self.rows
            .iter()
            .map(|r| {
                let present: Vec<f64> = r.values.iter().flatten().copied().collect();
                let max = present.iter().copied().reduce(f64::max);
                let min = present.iter().copied().reduce(f64::min);
                let avg = (!present.is_empty()).then(|| present.iter().sum::<f64>() / present.len() as f64);
                DailyStats {
                    date: r.date,
                    max,
                    min,
                    avg,
                }
            })
            .collect()
    }

    /// Render as a table indexed by `YYYY-MM-DD` with one column per label.
    pub fn to_table(&self) -> Table {
        let rows = self
            .rows
            .iter()
            .map(|r| r.values.iter().map(|v| Cell::from(*v)).collect())
            .collect();
        let dates = self
            .rows
            .iter()
            .map(|r| Cell::Text(r.date.format("%Y-%m-%d").to_string()))
            .collect();
        // Widths and index length agree by construction.
        Table::from_rows(self.labels().to_vec(), rows)
            .and_then(|t| t.with_index(self.date_column.clone(), dates))
            .unwrap_or_default()
    }
}

fn dedup_days(mut rows: Vec<WideRow>) -> Vec<WideRow> {
    // Stable sort keeps the first occurrence of each date in front.
    rows.sort_by_key(|r| r.date);
    let before = rows.len();
    let mut dupes = Vec::new();
    rows.dedup_by(|later, earlier| {
        let same = later.date == earlier.date;
        if same {
            dupes.push(later.date);
        }
        same
    });
    if !dupes.is_empty() {
        warn!(
            dropped = before - rows.len(),
            dates = ?dupes,
            "duplicate dates in wide table; keeping the first row of each"
        );
    }
    rows
}

#[derive(Debug, Clone, PartialEq)]
pub struct LongSeries {
    time_column: String,
    value_column: String,
    frequency: Frequency,
    first_day: Option<NaiveDate>,
    values: Vec<Option<f64>>,
}

impl LongSeries {
    /// Build a series from whole days of values starting at `first_day`.
    pub fn new(
        time_column: impl Into<String>,
        value_column: impl Into<String>,
        frequency: Frequency,
        first_day: NaiveDate,
        values: Vec<Option<f64>>,
    ) -> Result<Self, CoreError> {
        if values.len() % frequency.points() != 0 {
            return Err(CoreError::ShapeMismatch {
                context: "long series length (whole days)".to_string(),
                expected: vec![values.len().div_ceil(frequency.points()) * frequency.points()],
                actual: values.len(),
            });
        }
        let first_day = (!values.is_empty()).then_some(first_day);
        Ok(Self {
            time_column: time_column.into(),
            value_column: value_column.into(),
            frequency,
            first_day,
            values,
        })
    }

    /// Fill `[min_date, max_date]` day by day, taking every `stride`-th
    /// value of each source row. Days absent from `rows` become `None` runs.
    ///
    /// `rows` must be sorted by date with unique dates.
    pub(crate) fn from_day_rows<'a>(
        time_column: String,
        value_column: String,
        frequency: Frequency,
        stride: usize,
        rows: impl IntoIterator<Item = (NaiveDate, &'a [Option<f64>])>,
    ) -> LongSeries {
        let points = frequency.points();
        let mut first_day = None;
        let mut next_day: Option<NaiveDate> = None;
        let mut values = Vec::new();

        for (date, row) in rows {
            if first_day.is_none() {
                first_day = Some(date);
            }
            if let Some(mut day) = next_day {
                while day < date {
                    values.extend(std::iter::repeat_n(None, points));
                    day = day.succ_opt().unwrap_or(date);
                }
            }
            values.extend(row.iter().step_by(stride).take(points).copied());
            next_day = date.succ_opt();
        }

        LongSeries {
            time_column,
            value_column,
            frequency,
            first_day,
            values,
        }
    }

    pub fn time_column(&self) -> &str {
        &self.time_column
    }

    pub fn value_column(&self) -> &str {
        &self.value_column
    }

    pub fn frequency(&self) -> Frequency {
        self.frequency
    }

    pub fn first_day(&self) -> Option<NaiveDate> {
        self.first_day
    }

    pub fn last_day(&self) -> Option<NaiveDate> {
        let first = self.first_day?;
        first.checked_add_signed(Duration::days(self.day_count() as i64 - 1))
    }

    pub fn day_count(&self) -> usize {
        self.values.len() / self.frequency.points()
    }

    pub fn values(&self) -> &[Option<f64>] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Timestamp of value `i`.
    pub fn timestamp(&self, i: usize) -> Option<NaiveDateTime> {
        let start = self.first_day?.and_hms_opt(0, 0, 0)?;
        let minutes = i64::from(self.frequency.step_minutes()) * i as i64;
        start.checked_add_signed(Duration::minutes(minutes))
    }

    /// Position of `ts` in the series, if it lies on the grid and in range.
    pub fn position(&self, ts: NaiveDateTime) -> Option<usize> {
        let first = self.first_day?;
        let day_offset = (ts.date() - first).num_days();
        if day_offset < 0 {
            return None;
        }
        let slot = self.frequency.slot_of(ts.time())?;
        let pos = day_offset as usize * self.frequency.points() + slot;
        (pos < self.values.len()).then_some(pos)
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDateTime, Option<f64>)> + '_ {
        self.values
            .iter()
            .enumerate()
            .filter_map(|(i, v)| self.timestamp(i).map(|ts| (ts, *v)))
    }

    /// Pivot back to one row per day at `target` points per day.
    pub fn to_wide(&self, target: Frequency) -> Result<WideTable, CoreError> {
        let stride = target.stride_from(self.frequency)?;
        let points = self.frequency.points();
        let mut rows = Vec::with_capacity(self.day_count());
        if let Some(first) = self.first_day {
            for (d, chunk) in self.values.chunks(points).enumerate() {
                let Some(date) = first.checked_add_signed(Duration::days(d as i64)) else {
                    break;
                };
                rows.push(WideRow {
                    date,
                    values: chunk.iter().step_by(stride).copied().collect(),
                });
            }
        }
        Ok(WideTable {
            date_column: self.time_column.clone(),
            frequency: target,
            rows,
        })
    }

    /// Render as a table indexed by timestamp with a single value column.
    pub fn to_table(&self) -> Table {
        let mut index = Vec::with_capacity(self.values.len());
        let mut rows = Vec::with_capacity(self.values.len());
        for (ts, v) in self.iter() {
            index.push(Cell::Timestamp(ts));
            rows.push(vec![Cell::from(v)]);
        }
        Table::from_rows(vec![self.value_column.clone()], rows)
            .and_then(|t| t.with_index(self.time_column.clone(), index))
            .unwrap_or_default()
    }
}
