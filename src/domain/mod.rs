//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the intraday grid catalog (`Frequency`)
//! - generic source tables (`Table`, `Cell`)
//! - the wide and long layouts (`WideTable`, `LongSeries`)
//! - accuracy outputs (`AccuracyRecord`, `AccuracyReport`, etc.)

pub mod dates;
pub mod frequency;
pub mod series;
pub mod table;
pub mod types;

pub use dates::*;
pub use frequency::*;
pub use series::*;
pub use table::*;
pub use types::*;
