//! Intraday sampling grids.
//!
//! Three grids are supported: 96 points (15 min), 48 points (30 min) and
//! 24 points (60 min), all starting at 00:00. Labels follow the `THHMM`
//! convention used by the load/weather sources (`T0000`, `T0015`, ...).
//!
//! The coarser grids are always subsequences of the 96-point grid: every 2nd
//! label for 48 points and every 4th label for 24 points. Downsampling is a
//! label-subset selection, never interpolation.

use std::sync::LazyLock;

use chrono::{Duration, NaiveTime, Timelike};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

const MINUTES_PER_DAY: u32 = 1440;

static LABELS_96: LazyLock<Vec<String>> = LazyLock::new(|| {
    (0..96u32)
        .map(|i| {
            let minutes = i * 15;
            format!("T{:02}{:02}", minutes / 60, minutes % 60)
        })
        .collect()
});

static LABELS_48: LazyLock<Vec<String>> =
    LazyLock::new(|| LABELS_96.iter().step_by(2).cloned().collect());

static LABELS_24: LazyLock<Vec<String>> =
    LazyLock::new(|| LABELS_96.iter().step_by(4).cloned().collect());

/// Points per day of an intraday grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(try_from = "usize", into = "usize")]
pub enum Frequency {
    #[value(name = "96")]
    P96,
    #[value(name = "48")]
    P48,
    #[value(name = "24")]
    P24,
}

impl Frequency {
    pub const ALL: [Frequency; 3] = [Frequency::P96, Frequency::P48, Frequency::P24];

    /// Look up a grid by its point count.
    pub fn from_points(points: usize) -> Option<Self> {
        match points {
            96 => Some(Frequency::P96),
            48 => Some(Frequency::P48),
            24 => Some(Frequency::P24),
            _ => None,
        }
    }

    pub fn points(self) -> usize {
        match self {
            Frequency::P96 => 96,
            Frequency::P48 => 48,
            Frequency::P24 => 24,
        }
    }

    pub fn step_minutes(self) -> u32 {
        MINUTES_PER_DAY / self.points() as u32
    }

    pub fn step(self) -> Duration {
        Duration::minutes(i64::from(self.step_minutes()))
    }

    /// Ordered `THHMM` labels for this grid.
    pub fn labels(self) -> &'static [String] {
        match self {
            Frequency::P96 => LABELS_96.as_slice(),
            Frequency::P48 => LABELS_48.as_slice(),
            Frequency::P24 => LABELS_24.as_slice(),
        }
    }

    /// Stride that selects this grid's labels out of a `native` grid.
    ///
    /// Fails with `UnsupportedUpsample` when `native` is coarser than `self`.
    pub fn stride_from(self, native: Frequency) -> Result<usize, CoreError> {
        if native.points() < self.points() {
            return Err(CoreError::UnsupportedUpsample {
                source_points: native.points(),
                target_points: self.points(),
            });
        }
        Ok(native.points() / self.points())
    }

    /// Time of day of slot `slot` (0-based), wrapping past midnight.
    pub fn slot_time(self, slot: usize) -> NaiveTime {
        let slot = (slot % self.points()) as i32;
        NaiveTime::MIN.overflowing_add_signed(self.step() * slot).0
    }

    /// Slot index of `time`, or `None` if it is not on this grid.
    pub fn slot_of(self, time: NaiveTime) -> Option<usize> {
        if time.second() != 0 || time.nanosecond() != 0 {
            return None;
        }
        let minutes = time.hour() * 60 + time.minute();
        let step = self.step_minutes();
        (minutes % step == 0).then_some((minutes / step) as usize)
    }
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.points())
    }
}

impl TryFrom<usize> for Frequency {
    type Error = CoreError;

    fn try_from(points: usize) -> Result<Self, Self::Error> {
        Frequency::from_points(points).ok_or(CoreError::UnsupportedFrequency(points))
    }
}

impl From<Frequency> for usize {
    fn from(value: Frequency) -> Self {
        value.points()
    }
}
