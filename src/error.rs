//! Error types.
//!
//! - [`CoreError`]: contract violations raised by the reshape engine and the
//!   accuracy evaluator. Every variant carries enough context (expected vs.
//!   actual counts, the column that was sought) to fix the input.
//! - [`AppError`]: what the binary reports, with a process exit code.

use thiserror::Error;

/// Exit code for bad input files, bad flags, and I/O failures.
pub const EXIT_INPUT: u8 = 2;
/// Exit code for data that violates a reshape/accuracy contract.
pub const EXIT_DATA: u8 = 3;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    #[error("{context}: expected {}, got {actual}", fmt_counts(.expected))]
    ShapeMismatch {
        context: String,
        expected: Vec<usize>,
        actual: usize,
    },

    #[error(
        "cannot convert {source_points}-point data to {target_points} points per day (upsampling is not supported)"
    )]
    UnsupportedUpsample {
        source_points: usize,
        target_points: usize,
    },

    #[error("column `{column}` is not in the columns or index (available: {})", .available.join(", "))]
    MissingKeyColumn {
        column: String,
        available: Vec<String>,
    },

    #[error("accuracy is undefined: {0}")]
    UndefinedMetric(String),

    #[error("row {row}: invalid date '{value}'")]
    InvalidDate { row: usize, value: String },

    #[error("invalid hour band [{start}, {end}): need 0 <= start < end <= 24")]
    InvalidBand { start: u32, end: u32 },

    #[error("unsupported frequency {0}: expected 96, 48 or 24 points per day")]
    UnsupportedFrequency(usize),

    #[error("dates {first} to {last} span {days} days (at most {limit} supported)")]
    SpanTooLong {
        first: chrono::NaiveDate,
        last: chrono::NaiveDate,
        days: i64,
        limit: i64,
    },

    #[error("block <{0}> is already present in the E file")]
    DuplicateBlock(String),
}

fn fmt_counts(counts: &[usize]) -> String {
    let parts: Vec<String> = counts.iter().map(ToString::to_string).collect();
    parts.join(" or ")
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        AppError::new(EXIT_DATA, err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_mismatch_lists_expected_counts() {
        let err = CoreError::ShapeMismatch {
            context: "wide table column count".to_string(),
            expected: vec![97, 49, 25],
            actual: 50,
        };
        assert_eq!(
            err.to_string(),
            "wide table column count: expected 97 or 49 or 25, got 50"
        );
    }

    #[test]
    fn missing_key_names_the_column() {
        let err = CoreError::MissingKeyColumn {
            column: "DATE".to_string(),
            available: vec!["day".to_string(), "T0000".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("`DATE`"));
        assert!(msg.contains("day, T0000"));
    }

    #[test]
    fn core_errors_map_to_data_exit_code() {
        let app: AppError = CoreError::UnsupportedFrequency(50).into();
        assert_eq!(app.exit_code(), EXIT_DATA);
        assert!(app.to_string().contains("50"));
    }
}
