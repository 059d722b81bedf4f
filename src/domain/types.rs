//! Accuracy records and run configuration.
//!
//! These types are kept serializable so a report can be:
//!
//! - rendered as text right after evaluation
//! - exported to JSON
//! - reloaded later and rendered again without the source tables

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::domain::dates::DateEncoding;
use crate::domain::frequency::Frequency;
use crate::error::CoreError;

/// What to do with pairs whose actual value is zero.
///
/// The relative error `(forecast - actual) / actual` has no value there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ZeroActualPolicy {
    /// Leave the pair out of the score.
    #[default]
    Exclude,
    /// Fail the computation with `UndefinedMetric`.
    Reject,
}

/// A half-open hour range `[start, end)` used by peak/valley scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HourBand {
    start: u32,
    end: u32,
}

impl HourBand {
    /// Bands scored by default: night, morning, midday, evening peak, late evening.
    pub const DEFAULTS: [HourBand; 5] = [
        HourBand { start: 1, end: 7 },
        HourBand { start: 8, end: 12 },
        HourBand { start: 13, end: 16 },
        HourBand { start: 17, end: 19 },
        HourBand { start: 20, end: 23 },
    ];

    pub fn new(start: u32, end: u32) -> Result<Self, CoreError> {
        if start >= end || end > 24 {
            return Err(CoreError::InvalidBand { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(self) -> u32 {
        self.start
    }

    pub fn end(self) -> u32 {
        self.end
    }

    pub fn contains(self, hour: u32) -> bool {
        hour >= self.start && hour < self.end
    }
}

impl fmt::Display for HourBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

impl FromStr for HourBand {
    type Err = String;

    /// Parses `START-END`, e.g. `8-12`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (a, b) = s
            .split_once('-')
            .ok_or_else(|| format!("Invalid band '{s}'. Expected START-END, e.g. 8-12."))?;
        let start = a.trim().parse::<u32>().map_err(|e| format!("Invalid band start '{a}': {e}"))?;
        let end = b.trim().parse::<u32>().map_err(|e| format!("Invalid band end '{b}': {e}"))?;
        HourBand::new(start, end).map_err(|e| e.to_string())
    }
}

/// Which daily extremum of the actual series a band score is anchored on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Extremum {
    Peak,
    Valley,
}

/// How the pairs behind a score were grouped.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PartitionKey {
    /// Intraday grid label, e.g. `T0815`.
    Label { label: String },
    Month { year: i32, month: u32 },
    /// ISO weekday, 1 = Monday ... 7 = Sunday.
    Weekday { day: u32 },
    Band { band: HourBand, extremum: Extremum },
    Holiday { holiday: bool },
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartitionKey::Label { label } => write!(f, "{label}"),
            PartitionKey::Month { year, month } => write!(f, "{year:04}-{month:02}"),
            PartitionKey::Weekday { day } => write!(f, "{day}"),
            PartitionKey::Band { band, extremum } => write!(f, "{band} {extremum:?}"),
            PartitionKey::Holiday { holiday } => write!(f, "{}", if *holiday { "holiday" } else { "regular" }),
        }
    }
}

/// One accuracy score. `score` is `None` when no pair qualified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccuracyRecord {
    pub key: PartitionKey,
    pub score: Option<f64>,
    /// Pairs (or days, for averaged daily scores) behind the score.
    pub samples: usize,
}

/// Mean daily accuracy on holidays vs. ordinary days.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HolidaySplit {
    pub holiday: AccuracyRecord,
    pub regular: AccuracyRecord,
}

/// Peak and valley scores for one hour band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandAccuracy {
    pub band: HourBand,
    pub peak: AccuracyRecord,
    pub valley: AccuracyRecord,
}

/// Everything `full_report` computes for one actual/forecast pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccuracyReport {
    pub frequency: Frequency,
    pub first_day: Option<chrono::NaiveDate>,
    pub last_day: Option<chrono::NaiveDate>,
    pub exclude_holidays: bool,
    pub zero_actual: ZeroActualPolicy,
    pub holiday_split: HolidaySplit,
    pub time_of_day: Vec<AccuracyRecord>,
    pub monthly: Vec<AccuracyRecord>,
    pub peak_valley: Vec<BandAccuracy>,
    pub weekday: Vec<AccuracyRecord>,
}

/// A full `evaluate` run as understood by the pipeline.
///
/// Derived from CLI flags (plus defaults and `.env`).
#[derive(Debug, Clone)]
pub struct EvalConfig {
    pub actual_path: PathBuf,
    pub forecast_path: PathBuf,
    pub date_column: String,
    pub date_encoding: DateEncoding,
    pub holidays_path: Option<PathBuf>,
    pub adjusted_workdays_path: Option<PathBuf>,
    pub exclude_holidays: bool,
    pub bands: Vec<HourBand>,
    pub zero_actual: ZeroActualPolicy,
    pub top_n: usize,

    pub plot: bool,
    pub plot_width: usize,
    pub plot_height: usize,

    pub export_report: Option<PathBuf>,
    pub export_json: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_parsing_and_validation() {
        let band: HourBand = "8-12".parse().unwrap();
        assert_eq!(band, HourBand::new(8, 12).unwrap());
        assert!(band.contains(8));
        assert!(band.contains(11));
        assert!(!band.contains(12));
        assert!("12-8".parse::<HourBand>().is_err());
        assert!("0-25".parse::<HourBand>().is_err());
        assert!("eight".parse::<HourBand>().is_err());
    }

    #[test]
    fn partition_keys_display() {
        assert_eq!(PartitionKey::Month { year: 2024, month: 3 }.to_string(), "2024-03");
        assert_eq!(PartitionKey::Weekday { day: 7 }.to_string(), "7");
        assert_eq!(
            PartitionKey::Holiday { holiday: false }.to_string(),
            "regular"
        );
    }

    #[test]
    fn records_serialize_with_tagged_keys() {
        let rec = AccuracyRecord {
            key: PartitionKey::Label {
                label: "T0000".to_string(),
            },
            score: Some(0.97),
            samples: 3,
        };
        let json = serde_json::to_string(&rec).unwrap();
        assert!(json.contains(r#""kind":"label""#));
        let back: AccuracyRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, rec);
    }
}
