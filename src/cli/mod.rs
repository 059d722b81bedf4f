//! Command-line parsing.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! reshaping and scoring code. Calendar paths fall back to environment
//! variables (also read from `.env`).

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use crate::domain::{DateEncoding, Frequency, HourBand, ZeroActualPolicy};

pub const HOLIDAYS_ENV: &str = "LOADGRID_HOLIDAYS";
pub const ADJUSTED_WORKDAYS_ENV: &str = "LOADGRID_ADJUSTED_WORKDAYS";

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "loadgrid", version, about = "Intraday load table reshaping and forecast accuracy")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Flatten a wide table (date + 96/48/24 columns) to one row per timestamp.
    ToLong(ToLongArgs),
    /// Pivot a long table (timestamp + value) to one row per day.
    ToWide(ToWideArgs),
    /// Clean a raw load/weather export into `date + grid labels`.
    Normalize(NormalizeArgs),
    /// Score a forecast against actuals and print the accuracy report.
    Evaluate(EvalArgs),
    /// Plot actual (and forecast) load in the terminal.
    Plot(PlotArgs),
    /// Print a previously exported accuracy report JSON.
    Report(ReportArgs),
    /// Write an E file with the default blocks plus custom ones.
    Efile(EfileArgs),
    /// Generate a synthetic actual/forecast pair and evaluate it.
    Demo(DemoArgs),
}

/// Options shared by commands that read wide tables.
#[derive(Debug, Args, Clone)]
pub struct WideInputArgs {
    /// Name of the date column (or index).
    #[arg(long, default_value = "DATE")]
    pub date_column: String,

    /// How dates are written in the date column.
    #[arg(long, value_enum, default_value_t = DateEncoding::Calendar)]
    pub date_encoding: DateEncoding,

    /// Treat the first CSV column as the index.
    #[arg(long)]
    pub index: bool,
}

#[derive(Debug, Args)]
pub struct ToLongArgs {
    /// Wide CSV.
    #[arg(long, value_name = "CSV")]
    pub input: PathBuf,

    #[command(flatten)]
    pub wide: WideInputArgs,

    /// Name of the value column in the output.
    #[arg(long, default_value = "LOAD")]
    pub value_column: String,

    /// Points per day of the output.
    #[arg(long, value_enum, default_value_t = Frequency::P96)]
    pub frequency: Frequency,

    /// Output CSV (stdout if omitted).
    #[arg(long, value_name = "CSV")]
    pub output: Option<PathBuf>,

    /// Marker written for missing values.
    #[arg(long, default_value = "")]
    pub missing: String,
}

#[derive(Debug, Args)]
pub struct ToWideArgs {
    /// Long CSV.
    #[arg(long, value_name = "CSV")]
    pub input: PathBuf,

    /// Name of the timestamp column (or index). `to-long` names it after
    /// its `--date-column`, so the defaults agree.
    #[arg(long, default_value = "DATE")]
    pub time_column: String,

    #[arg(long, default_value = "LOAD")]
    pub value_column: String,

    /// Treat the first CSV column as the index.
    #[arg(long)]
    pub index: bool,

    /// Points per day of the output.
    #[arg(long, value_enum, default_value_t = Frequency::P96)]
    pub frequency: Frequency,

    /// Append MAX/MIN/AVG columns.
    #[arg(long)]
    pub stats: bool,

    #[arg(long, value_name = "CSV")]
    pub output: Option<PathBuf>,

    #[arg(long, default_value = "")]
    pub missing: String,
}

#[derive(Debug, Args)]
pub struct NormalizeArgs {
    /// Raw export CSV.
    #[arg(long, value_name = "CSV")]
    pub input: PathBuf,

    #[arg(long, default_value = "DATE")]
    pub date_column: String,

    #[arg(long, value_enum, default_value_t = DateEncoding::Calendar)]
    pub date_encoding: DateEncoding,

    #[arg(long, default_value = "CITY_ID")]
    pub city_column: String,

    /// Keep only this city.
    #[arg(long)]
    pub city: Option<i64>,

    /// Keep only this caliber.
    #[arg(long)]
    pub caliber: Option<i64>,

    /// Keep the city column in the output.
    #[arg(long)]
    pub keep_city: bool,

    /// Append MAX/MIN/AVG columns (weather sources).
    #[arg(long)]
    pub stats: bool,

    #[arg(long, value_name = "CSV")]
    pub output: Option<PathBuf>,

    /// Marker written for missing values.
    #[arg(long, default_value = "null")]
    pub missing: String,
}

/// Calendar files.
#[derive(Debug, Args, Clone)]
pub struct CalendarArgs {
    /// Holiday CSV with a `Date` column.
    #[arg(long, value_name = "CSV", env = HOLIDAYS_ENV)]
    pub holidays: Option<PathBuf>,

    /// Adjusted-workday CSV with a `Date` column.
    #[arg(long, value_name = "CSV", env = ADJUSTED_WORKDAYS_ENV)]
    pub adjusted_workdays: Option<PathBuf>,
}

/// Report rendering options shared by `evaluate` and `demo`.
#[derive(Debug, Args, Clone)]
pub struct OutputArgs {
    /// Hour bands for peak/valley scoring, as START-END (repeatable).
    #[arg(long = "band", value_name = "START-END")]
    pub bands: Vec<HourBand>,

    /// Keep holidays in the per-label, monthly, band and weekday scores.
    #[arg(long)]
    pub keep_holidays: bool,

    /// How to treat zero actual values.
    #[arg(long, value_enum, default_value_t = ZeroActualPolicy::Exclude)]
    pub zero_actual: ZeroActualPolicy,

    /// Show the N least and most accurate labels.
    #[arg(long, default_value_t = 5)]
    pub top: usize,

    /// Disable the terminal plot.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,

    /// Write the text report to a file.
    #[arg(long, value_name = "TXT")]
    pub export_report: Option<PathBuf>,

    /// Write the report as JSON.
    #[arg(long, value_name = "JSON")]
    pub export_json: Option<PathBuf>,
}

impl OutputArgs {
    /// Bands from the command line, or the default five.
    pub fn bands(&self) -> Vec<HourBand> {
        if self.bands.is_empty() {
            HourBand::DEFAULTS.to_vec()
        } else {
            self.bands.clone()
        }
    }
}

#[derive(Debug, Args)]
pub struct EvalArgs {
    /// Actual load, wide CSV.
    #[arg(long, value_name = "CSV")]
    pub actual: PathBuf,

    /// Forecast load, wide CSV.
    #[arg(long, value_name = "CSV")]
    pub forecast: PathBuf,

    #[command(flatten)]
    pub wide: WideInputArgs,

    #[command(flatten)]
    pub calendar: CalendarArgs,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Debug, Args)]
pub struct PlotArgs {
    /// Actual load, wide CSV.
    #[arg(long, value_name = "CSV")]
    pub actual: PathBuf,

    /// Forecast load, wide CSV.
    #[arg(long, value_name = "CSV")]
    pub forecast: Option<PathBuf>,

    #[command(flatten)]
    pub wide: WideInputArgs,

    /// First day to plot.
    #[arg(long)]
    pub from: Option<NaiveDate>,

    /// Last day to plot.
    #[arg(long)]
    pub to: Option<NaiveDate>,

    #[arg(long, default_value_t = 100)]
    pub width: usize,

    #[arg(long, default_value_t = 20)]
    pub height: usize,
}

#[derive(Debug, Args)]
pub struct ReportArgs {
    /// Report JSON written by `evaluate --export-json`.
    #[arg(long, value_name = "JSON")]
    pub json: PathBuf,

    #[arg(long, default_value_t = 5)]
    pub top: usize,
}

#[derive(Debug, Args)]
pub struct EfileArgs {
    /// Output E file.
    #[arg(long, value_name = "PATH")]
    pub output: PathBuf,

    /// First forecast day of the batch run.
    #[arg(long)]
    pub begin: NaiveDate,

    /// Last forecast day of the batch run.
    #[arg(long)]
    pub end: NaiveDate,

    #[command(flatten)]
    pub calendar: CalendarArgs,

    /// Append a CSV as a block, as LABEL=PATH (repeatable).
    #[arg(long = "insert", value_name = "LABEL=CSV")]
    pub inserts: Vec<String>,

    /// Append a wide CSV as a grid block, as LABEL=PATH (repeatable).
    #[arg(long = "insert-wide", value_name = "LABEL=CSV")]
    pub wide_inserts: Vec<String>,

    #[command(flatten)]
    pub wide: WideInputArgs,

    /// `Grid=` value of the title line.
    #[arg(long)]
    pub grid: Option<String>,

    /// `Type=` value of the title line.
    #[arg(long = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Args)]
pub struct DemoArgs {
    /// Number of days to generate.
    #[arg(long, default_value_t = 28)]
    pub days: usize,

    /// First generated day.
    #[arg(long, default_value = "2024-01-01")]
    pub start: NaiveDate,

    #[arg(long, value_enum, default_value_t = Frequency::P96)]
    pub frequency: Frequency,

    /// Random seed for sample generation.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Write the generated actual table to CSV.
    #[arg(long, value_name = "CSV")]
    pub write_actual: Option<PathBuf>,

    /// Write the generated forecast table to CSV.
    #[arg(long, value_name = "CSV")]
    pub write_forecast: Option<PathBuf>,

    #[command(flatten)]
    pub calendar: CalendarArgs,

    #[command(flatten)]
    pub output: OutputArgs,
}

/// Split a `LABEL=PATH` argument.
pub fn parse_labeled_path(raw: &str) -> Result<(String, PathBuf), String> {
    let (label, path) = raw
        .split_once('=')
        .ok_or_else(|| format!("Invalid block '{raw}'. Expected LABEL=PATH."))?;
    let label = label.trim();
    if label.is_empty() || path.trim().is_empty() {
        return Err(format!("Invalid block '{raw}'. Expected LABEL=PATH."));
    }
    Ok((label.to_string(), PathBuf::from(path.trim())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn evaluate_parses_bands_and_defaults() {
        let cli = Cli::try_parse_from([
            "loadgrid",
            "evaluate",
            "--actual",
            "a.csv",
            "--forecast",
            "f.csv",
            "--band",
            "8-12",
            "--band",
            "17-19",
            "--date-encoding",
            "compact",
        ])
        .unwrap();
        let Command::Evaluate(args) = cli.command else {
            panic!("expected evaluate");
        };
        assert_eq!(args.output.bands().len(), 2);
        assert_eq!(args.wide.date_encoding, DateEncoding::Compact);
        assert_eq!(args.wide.date_column, "DATE");
        assert_eq!(args.output.zero_actual, ZeroActualPolicy::Exclude);
    }

    #[test]
    fn frequency_values_are_point_counts() {
        let cli = Cli::try_parse_from(["loadgrid", "to-long", "--input", "w.csv", "--frequency", "48"]).unwrap();
        let Command::ToLong(args) = cli.command else {
            panic!("expected to-long");
        };
        assert_eq!(args.frequency, Frequency::P48);
        assert!(Cli::try_parse_from(["loadgrid", "to-long", "--input", "w.csv", "--frequency", "50"]).is_err());
    }

    #[test]
    fn to_long_output_feeds_to_wide() {
        let cli = Cli::try_parse_from(["loadgrid", "to-long", "--input", "w.csv"]).unwrap();
        let Command::ToLong(long) = cli.command else {
            panic!("expected to-long");
        };
        let cli = Cli::try_parse_from(["loadgrid", "to-wide", "--input", "l.csv"]).unwrap();
        let Command::ToWide(wide) = cli.command else {
            panic!("expected to-wide");
        };
        assert_eq!(wide.time_column, long.wide.date_column);
        assert_eq!(wide.value_column, long.value_column);
    }

    #[test]
    fn labeled_paths() {
        assert_eq!(
            parse_labeled_path("HistoryLoad=data/load.csv").unwrap(),
            ("HistoryLoad".to_string(), PathBuf::from("data/load.csv"))
        );
        assert!(parse_labeled_path("HistoryLoad").is_err());
        assert!(parse_labeled_path("=x.csv").is_err());
    }
}
