//! Input/output helpers.
//!
//! - CSV ingest into tables, calendar loading (`ingest`)
//! - table exports to CSV (`export`)
//! - accuracy report JSON read/write (`report`)
//! - E-file documents (`efile`)

pub mod efile;
pub mod export;
pub mod ingest;
pub mod report;

pub use efile::*;
pub use export::*;
pub use ingest::*;
pub use report::*;
