//! Forecast accuracy scoring.
//!
//! - [`metric`]: the relative-RMS accuracy score and score averaging
//! - [`evaluator`]: per label, month, weekday, hour band and holiday split

pub mod evaluator;
pub mod metric;

pub use evaluator::*;
pub use metric::*;
