//! Holiday calendar.
//!
//! A [`HolidayCalendar`] holds two date sets:
//!
//! - holidays, used to split or exclude days during accuracy evaluation
//! - adjusted workdays (weekend days worked in exchange for a holiday),
//!   carried into E files
//!
//! The process-wide calendar is installed once at start-up and read-only
//! afterwards; evaluators take an explicit `&HolidayCalendar` so tests can
//! build their own.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use chrono::NaiveDate;
use tracing::info;

use crate::domain::{cell_to_date, DateEncoding, Table};
use crate::error::CoreError;

/// Column holding the dates in calendar CSV files.
pub const DATE_COLUMN: &str = "Date";

static GLOBAL: OnceLock<HolidayCalendar> = OnceLock::new();

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HolidayCalendar {
    holidays: BTreeSet<NaiveDate>,
    adjusted_workdays: BTreeSet<NaiveDate>,
}

impl HolidayCalendar {
    pub fn from_dates(holidays: impl IntoIterator<Item = NaiveDate>) -> Self {
        Self {
            holidays: holidays.into_iter().collect(),
            adjusted_workdays: BTreeSet::new(),
        }
    }

    pub fn with_adjusted_workdays(mut self, days: impl IntoIterator<Item = NaiveDate>) -> Self {
        self.adjusted_workdays.extend(days);
        self
    }

    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        self.holidays.contains(&date)
    }

    /// Holidays in ascending order.
    pub fn holidays(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.holidays.iter().copied()
    }

    pub fn adjusted_workdays(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.adjusted_workdays.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.holidays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.holidays.is_empty()
    }

    /// Install `self` as the process-wide calendar.
    ///
    /// Fails (handing the calendar back) if one is already installed or
    /// [`global`](Self::global) was read first.
    pub fn install(self) -> Result<(), HolidayCalendar> {
        let (holidays, workdays) = (self.holidays.len(), self.adjusted_workdays.len());
        GLOBAL.set(self)?;
        info!(holidays, adjusted_workdays = workdays, "holiday calendar installed");
        Ok(())
    }

    /// The process-wide calendar; empty if none was installed.
    pub fn global() -> &'static HolidayCalendar {
        GLOBAL.get_or_init(HolidayCalendar::default)
    }
}

/// Read the dates of a calendar table's `Date` column (matched
/// case-insensitively; the index is accepted too).
pub fn dates_from_table(table: &Table) -> Result<Vec<NaiveDate>, CoreError> {
    let name = table
        .columns()
        .iter()
        .find(|c| c.eq_ignore_ascii_case(DATE_COLUMN))
        .cloned()
        .unwrap_or_else(|| DATE_COLUMN.to_string());
    let (table, pos) = table.resolve_key(&name)?;

    table
        .rows()
        .iter()
        .enumerate()
        .filter(|(_, row)| !row[pos].is_null())
        .map(|(i, row)| {
            cell_to_date(&row[pos], DateEncoding::Calendar)
                .or_else(|| cell_to_date(&row[pos], DateEncoding::Compact))
                .ok_or_else(|| CoreError::InvalidDate {
                    row: i + 1,
                    value: row[pos].render(""),
                })
        })
        .collect()
}
