//! Write tables to CSV.
//!
//! The index (if any) becomes the first column. Missing cells are written
//! with a caller-chosen marker: empty for spreadsheet use, `null` for the
//! downstream systems that expect it.

use std::fs::File;
use std::path::Path;

use crate::domain::Table;
use crate::error::{AppError, EXIT_INPUT};

pub fn write_table_csv(path: &Path, table: &Table, missing: &str) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(EXIT_INPUT, format!("Failed to create CSV '{}': {e}", path.display())))?;
    write_table(file, table, missing)
        .map_err(|e| AppError::new(EXIT_INPUT, format!("Failed to write CSV '{}': {e}", path.display())))
}

/// Write `table` as CSV to any writer.
pub fn write_table<W: std::io::Write>(out: W, table: &Table, missing: &str) -> Result<(), csv::Error> {
    let table = table.reset_index();
    let mut writer = csv::WriterBuilder::new().from_writer(out);
    writer.write_record(table.columns())?;
    for row in table.rows() {
        writer.write_record(row.iter().map(|c| c.render(missing)))?;
    }
    writer.flush()?;
    Ok(())
}
