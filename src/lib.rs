//! `loadgrid` library crate.
//!
//! The binary (`loadgrid`) is a thin wrapper around this library so that:
//!
//! - reshaping and scoring are testable without spawning processes
//! - the same tables can feed the CLI, the E-file writer and the tests
//! - code stays easy to navigate as the project grows

pub mod accuracy;
pub mod app;
pub mod calendar;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod io;
pub mod plot;
pub mod report;
pub mod transform;
