//! CSV ingest.
//!
//! Turns a CSV file into a [`Table`] of typed cells. Ingest knows nothing
//! about grids or frequencies; shape checks happen in `transform`.
//!
//! - the header row is required (a UTF-8 BOM on the first header is stripped)
//! - the first column can be read as the table index
//! - rows with the wrong number of fields are skipped and reported

use std::fs::File;
use std::path::Path;

use tracing::{debug, warn};

use crate::calendar::{dates_from_table, HolidayCalendar};
use crate::domain::{Cell, Table};
use crate::error::{AppError, EXIT_DATA, EXIT_INPUT};

/// How to read a data CSV.
#[derive(Debug, Clone, Copy, Default)]
pub struct IngestOptions {
    /// Use the first column as the index.
    pub first_column_index: bool,
}

/// A row skipped during ingest.
#[derive(Debug, Clone)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct IngestedTable {
    pub table: Table,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

/// Read a CSV file into a table.
pub fn read_table(path: &Path, opts: IngestOptions) -> Result<IngestedTable, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(EXIT_INPUT, format!("Failed to open CSV '{}': {e}", path.display())))?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| AppError::new(EXIT_INPUT, format!("Failed to read CSV headers of '{}': {e}", path.display())))?
        .iter()
        .map(normalize_header_name)
        .collect();

    if headers.is_empty() || (opts.first_column_index && headers.len() < 2) {
        return Err(AppError::new(
            EXIT_INPUT,
            format!("CSV '{}' has too few columns.", path.display()),
        ));
    }

    let (index_name, columns) = if opts.first_column_index {
        (Some(headers[0].clone()), headers[1..].to_vec())
    } else {
        (None, headers.clone())
    };

    let mut table = Table::new(columns);
    let mut index = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // records() starts after the header; lines are 1-based.
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };
        if record.len() != headers.len() {
            row_errors.push(RowError {
                line,
                message: format!("expected {} fields, got {}", headers.len(), record.len()),
            });
            continue;
        }

        let mut cells: Vec<Cell> = record.iter().map(Cell::parse).collect();
        if opts.first_column_index {
            index.push(cells.remove(0));
        }
        table.push_row(cells).map_err(|e| AppError::new(EXIT_DATA, e.to_string()))?;
    }

    if let Some(name) = index_name {
        table = table
            .with_index(name, index)
            .map_err(|e| AppError::new(EXIT_DATA, e.to_string()))?;
    }

    for err in &row_errors {
        warn!(path = %path.display(), line = err.line, "{}", err.message);
    }
    debug!(path = %path.display(), rows_read, rows = table.len(), columns = table.width(), "CSV read");

    Ok(IngestedTable {
        table,
        row_errors,
        rows_read,
    })
}

/// Read the `Date` column of a calendar CSV.
pub fn read_calendar_dates(path: &Path) -> Result<Vec<chrono::NaiveDate>, AppError> {
    let ingested = read_table(path, IngestOptions::default())?;
    dates_from_table(&ingested.table)
        .map_err(|e| AppError::new(EXIT_INPUT, format!("Calendar '{}': {e}", path.display())))
}

/// Build a calendar from optional holiday and adjusted-workday CSVs.
pub fn load_calendar(holidays: Option<&Path>, adjusted_workdays: Option<&Path>) -> Result<HolidayCalendar, AppError> {
    let holiday_dates = match holidays {
        Some(p) => read_calendar_dates(p)?,
        None => Vec::new(),
    };
    let workday_dates = match adjusted_workdays {
        Some(p) => read_calendar_dates(p)?,
        None => Vec::new(),
    };
    Ok(HolidayCalendar::from_dates(holiday_dates).with_adjusted_workdays(workday_dates))
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports often prefix the first header with a BOM.
    name.trim().trim_start_matches('\u{feff}').to_string()
}
