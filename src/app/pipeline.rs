//! Shared evaluation pipeline used by `evaluate` and `demo`.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! CSV ingest -> wide parse -> accuracy breakdowns -> rankings
//!
//! The command handlers can then focus on presentation and exports.

use tracing::info;

use crate::accuracy::AccuracyEvaluator;
use crate::calendar::HolidayCalendar;
use crate::domain::{AccuracyReport, EvalConfig, WideTable};
use crate::error::AppError;
use crate::io::ingest::{read_table, IngestOptions};
use crate::report::{rank_records, Rankings};
use crate::transform::read_wide;

/// All computed outputs of a single evaluation.
#[derive(Debug, Clone)]
pub struct EvalOutput {
    pub actual: WideTable,
    pub forecast: WideTable,
    pub report: AccuracyReport,
    pub rankings: Rankings,
}

/// Read both tables named by `config` and evaluate them.
pub fn run_evaluate(
    config: &EvalConfig,
    first_column_index: bool,
    calendar: &HolidayCalendar,
) -> Result<EvalOutput, AppError> {
    let opts = IngestOptions { first_column_index };
    let actual = read_table(&config.actual_path, opts)?;
    let forecast = read_table(&config.forecast_path, opts)?;

    let actual = read_wide(&actual.table, &config.date_column, config.date_encoding)?;
    let forecast = read_wide(&forecast.table, &config.date_column, config.date_encoding)?;

    evaluate_tables(config, actual, forecast, calendar)
}

/// Evaluate tables already in memory.
pub fn evaluate_tables(
    config: &EvalConfig,
    actual: WideTable,
    forecast: WideTable,
    calendar: &HolidayCalendar,
) -> Result<EvalOutput, AppError> {
    let evaluator = AccuracyEvaluator::new(calendar).with_zero_actual(config.zero_actual);
    let report = evaluator.full_report(&actual, &forecast, &config.bands, config.exclude_holidays)?;
    let rankings = rank_records(&report.time_of_day, config.top_n);

    info!(
        actual_days = actual.len(),
        forecast_days = forecast.len(),
        points = actual.frequency().points(),
        "evaluation finished"
    );

    Ok(EvalOutput {
        actual,
        forecast,
        report,
        rankings,
    })
}
