//! Table reshaping.
//!
//! - [`reshape`]: wide ⇄ long conversion on the 96/48/24-point grids
//! - [`source`]: cleanup of raw load/weather exports before reshaping

pub mod reshape;
pub mod source;

pub use reshape::*;
pub use source::*;
