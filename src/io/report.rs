//! Read/write accuracy report JSON files.
//!
//! A report file holds everything `full_report` computed plus run metadata,
//! so it can be rendered again (`loadgrid report`) without the source tables.

use std::fs::File;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::AccuracyReport;
use crate::error::{AppError, EXIT_INPUT};

/// On-disk wrapper around an [`AccuracyReport`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportFile {
    pub tool: String,
    pub actual: String,
    pub forecast: String,
    pub report: AccuracyReport,
}

pub fn write_report_json(path: &Path, file: &ReportFile) -> Result<(), AppError> {
    let out = File::create(path)
        .map_err(|e| AppError::new(EXIT_INPUT, format!("Failed to create report JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(out, file)
        .map_err(|e| AppError::new(EXIT_INPUT, format!("Failed to write report JSON: {e}")))?;
    Ok(())
}

pub fn read_report_json(path: &Path) -> Result<ReportFile, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(EXIT_INPUT, format!("Failed to open report JSON '{}': {e}", path.display())))?;
    let report: ReportFile =
        serde_json::from_reader(file).map_err(|e| AppError::new(EXIT_INPUT, format!("Invalid report JSON: {e}")))?;
    Ok(report)
}
