//! Data sources beyond CSV files.

pub mod sample;

pub use sample::*;
