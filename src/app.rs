//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and sets up logging
//! - parses CLI arguments
//! - loads and installs the holiday calendar
//! - dispatches to the reshape, evaluation, plot and E-file commands
//! - writes optional exports

use std::fs;
use std::io::Write;
use std::path::Path;

use chrono::{Local, NaiveDate};
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::calendar::HolidayCalendar;
use crate::cli::{
    parse_labeled_path, CalendarArgs, Command, DemoArgs, EfileArgs, EvalArgs, NormalizeArgs, OutputArgs, PlotArgs,
    ReportArgs, ToLongArgs, ToWideArgs,
};
use crate::domain::{EvalConfig, Table};
use crate::error::{AppError, EXIT_INPUT};
use crate::io::efile::{BatchWindow, EFileBlock, EFileDocument, EFileHeader};
use crate::io::export::{write_table, write_table_csv};
use crate::io::ingest::{load_calendar, read_table, IngestOptions};
use crate::io::report::{read_report_json, write_report_json, ReportFile};
use crate::transform::{long_to_wide, normalize_source, read_wide, wide_to_long, with_daily_stats, SourceOptions};

pub mod pipeline;

/// Entry point for the `loadgrid` binary.
pub fn run() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_logging();

    let cli = crate::cli::Cli::parse();

    match cli.command {
        Command::ToLong(args) => handle_to_long(args),
        Command::ToWide(args) => handle_to_wide(args),
        Command::Normalize(args) => handle_normalize(args),
        Command::Evaluate(args) => handle_evaluate(args),
        Command::Plot(args) => handle_plot(args),
        Command::Report(args) => handle_report(args),
        Command::Efile(args) => handle_efile(args),
        Command::Demo(args) => handle_demo(args),
    }
}

/// Log to stderr, filtered by `RUST_LOG` (default `warn`).
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    // A second init (e.g. from tests) is harmless.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn handle_to_long(args: ToLongArgs) -> Result<(), AppError> {
    let input = read_table(
        &args.input,
        IngestOptions {
            first_column_index: args.wide.index,
        },
    )?;
    let long = wide_to_long(
        &input.table,
        &args.wide.date_column,
        &args.value_column,
        args.frequency,
        args.wide.date_encoding,
    )?;
    info!(
        rows = long.len(),
        days = long.day_count(),
        first = ?long.first_day(),
        last = ?long.last_day(),
        "to-long"
    );
    emit_table(args.output.as_deref(), &long.to_table(), &args.missing)
}

fn handle_to_wide(args: ToWideArgs) -> Result<(), AppError> {
    let input = read_table(
        &args.input,
        IngestOptions {
            first_column_index: args.index,
        },
    )?;
    let wide = long_to_wide(&input.table, &args.time_column, &args.value_column, args.frequency)?;
    info!(days = wide.len(), "to-wide");
    let table = if args.stats {
        with_daily_stats(&wide)
    } else {
        wide.to_table()
    };
    emit_table(args.output.as_deref(), &table, &args.missing)
}

fn handle_normalize(args: NormalizeArgs) -> Result<(), AppError> {
    let input = read_table(&args.input, IngestOptions::default())?;
    let opts = SourceOptions {
        date_column: args.date_column.clone(),
        city_column: args.city_column,
        date_encoding: args.date_encoding,
        city_id: args.city,
        caliber_id: args.caliber,
        keep_city_column: args.keep_city,
    };
    let table = normalize_source(&input.table, &opts)?;
    let table = if args.stats {
        let wide = read_wide(&table, &args.date_column, args.date_encoding)?;
        with_daily_stats(&wide)
    } else {
        table
    };
    emit_table(args.output.as_deref(), &table, &args.missing)
}

fn handle_evaluate(args: EvalArgs) -> Result<(), AppError> {
    let config = eval_config_from_args(&args);
    let calendar = install_calendar(&args.calendar)?;
    let run = pipeline::run_evaluate(&config, args.wide.index, calendar)?;
    present(&config, &run, &args.actual.display().to_string(), &args.forecast.display().to_string())
}

fn handle_demo(args: DemoArgs) -> Result<(), AppError> {
    let pair = crate::data::generate_pair(args.days, args.start, args.frequency, args.seed)?;
    if let Some(path) = &args.write_actual {
        write_table_csv(path, &pair.actual.to_table(), "")?;
    }
    if let Some(path) = &args.write_forecast {
        write_table_csv(path, &pair.forecast.to_table(), "")?;
    }

    let config = EvalConfig {
        actual_path: "demo:actual".into(),
        forecast_path: "demo:forecast".into(),
        date_column: "DATE".to_string(),
        date_encoding: Default::default(),
        holidays_path: args.calendar.holidays.clone(),
        adjusted_workdays_path: args.calendar.adjusted_workdays.clone(),
        ..output_config(&args.output)
    };
    let calendar = install_calendar(&args.calendar)?;
    let run = pipeline::evaluate_tables(&config, pair.actual, pair.forecast, calendar)?;
    present(&config, &run, "demo:actual", "demo:forecast")
}

/// Print the report (and plot), then write the requested exports.
fn present(config: &EvalConfig, run: &pipeline::EvalOutput, actual: &str, forecast: &str) -> Result<(), AppError> {
    let text = crate::report::format_accuracy_report(&run.report);
    println!("{text}");
    println!("{}", crate::report::format_rankings(&run.rankings));

    if config.plot {
        let plot = crate::plot::render_ascii_plot(
            &run.actual.to_long("actual"),
            Some(&run.forecast.to_long("forecast")),
            config.plot_width,
            config.plot_height,
        );
        println!("{plot}");
    }

    if let Some(path) = &config.export_report {
        fs::write(path, &text)
            .map_err(|e| AppError::new(EXIT_INPUT, format!("Failed to write report '{}': {e}", path.display())))?;
    }
    if let Some(path) = &config.export_json {
        let file = ReportFile {
            tool: "loadgrid".to_string(),
            actual: actual.to_string(),
            forecast: forecast.to_string(),
            report: run.report.clone(),
        };
        write_report_json(path, &file)?;
    }

    Ok(())
}

fn handle_plot(args: PlotArgs) -> Result<(), AppError> {
    let opts = IngestOptions {
        first_column_index: args.wide.index,
    };
    let in_range = |d: NaiveDate| args.from.is_none_or(|from| d >= from) && args.to.is_none_or(|to| d <= to);

    let actual = read_table(&args.actual, opts)?;
    let actual = read_wide(&actual.table, &args.wide.date_column, args.wide.date_encoding)?.filter_dates(in_range);

    let forecast = match &args.forecast {
        Some(path) => {
            let table = read_table(path, opts)?;
            Some(read_wide(&table.table, &args.wide.date_column, args.wide.date_encoding)?.filter_dates(in_range))
        }
        None => None,
    };

    let plot = crate::plot::render_ascii_plot(
        &actual.to_long("actual"),
        forecast.map(|f| f.to_long("forecast")).as_ref(),
        args.width,
        args.height,
    );
    println!("{plot}");
    Ok(())
}

fn handle_report(args: ReportArgs) -> Result<(), AppError> {
    let file = read_report_json(&args.json)?;
    println!("Actual: {} | forecast: {}", file.actual, file.forecast);
    println!("{}", crate::report::format_accuracy_report(&file.report));
    let rankings = crate::report::rank_records(&file.report.time_of_day, args.top);
    println!("{}", crate::report::format_rankings(&rankings));
    Ok(())
}

fn handle_efile(args: EfileArgs) -> Result<(), AppError> {
    if args.end < args.begin {
        return Err(AppError::new(EXIT_INPUT, "--end must not be before --begin."));
    }
    let calendar = install_calendar(&args.calendar)?;

    let mut header = EFileHeader::new(Local::now().naive_local());
    if let Some(grid) = &args.grid {
        header.grid = grid.clone();
    }
    if let Some(kind) = &args.kind {
        header.kind = kind.clone();
    }
    let window = BatchWindow {
        begin: args.begin,
        end: args.end,
    };
    let mut doc = EFileDocument::with_defaults(header, window, calendar);

    for raw in &args.inserts {
        let (label, path) = parse_labeled_path(raw).map_err(|e| AppError::new(EXIT_INPUT, e))?;
        let table = read_table(&path, IngestOptions::default())?;
        doc.insert(EFileBlock::from_table(label, &table.table))?;
    }
    for raw in &args.wide_inserts {
        let (label, path) = parse_labeled_path(raw).map_err(|e| AppError::new(EXIT_INPUT, e))?;
        let table = read_table(
            &path,
            IngestOptions {
                first_column_index: args.wide.index,
            },
        )?;
        let wide = read_wide(&table.table, &args.wide.date_column, args.wide.date_encoding)?;
        doc.insert(EFileBlock::from_wide(label, &wide))?;
    }

    doc.write(&args.output)?;
    info!(path = %args.output.display(), "E file written");
    Ok(())
}

/// Load the calendar files and install them process-wide.
fn install_calendar(args: &CalendarArgs) -> Result<&'static HolidayCalendar, AppError> {
    let calendar = load_calendar(args.holidays.as_deref(), args.adjusted_workdays.as_deref())?;
    if calendar.install().is_err() {
        debug!("holiday calendar already installed; keeping the first one");
    }
    Ok(HolidayCalendar::global())
}

fn emit_table(path: Option<&Path>, table: &Table, missing: &str) -> Result<(), AppError> {
    match path {
        Some(path) => write_table_csv(path, table, missing),
        None => {
            let stdout = std::io::stdout();
            let mut lock = stdout.lock();
            write_table(&mut lock, table, missing)
                .map_err(|e| AppError::new(EXIT_INPUT, format!("Failed to write CSV to stdout: {e}")))?;
            lock.flush()
                .map_err(|e| AppError::new(EXIT_INPUT, format!("Failed to flush stdout: {e}")))
        }
    }
}

pub fn eval_config_from_args(args: &EvalArgs) -> EvalConfig {
    EvalConfig {
        actual_path: args.actual.clone(),
        forecast_path: args.forecast.clone(),
        date_column: args.wide.date_column.clone(),
        date_encoding: args.wide.date_encoding,
        holidays_path: args.calendar.holidays.clone(),
        adjusted_workdays_path: args.calendar.adjusted_workdays.clone(),
        ..output_config(&args.output)
    }
}

/// Config fields that come from the shared output options; input fields are placeholders.
fn output_config(out: &OutputArgs) -> EvalConfig {
    EvalConfig {
        actual_path: Default::default(),
        forecast_path: Default::default(),
        date_column: String::new(),
        date_encoding: Default::default(),
        holidays_path: None,
        adjusted_workdays_path: None,
        exclude_holidays: !out.keep_holidays,
        bands: out.bands(),
        zero_actual: out.zero_actual,
        top_n: out.top,
        plot: !out.no_plot,
        plot_width: out.width,
        plot_height: out.height,
        export_report: out.export_report.clone(),
        export_json: out.export_json.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;

    #[test]
    fn eval_config_maps_flags() {
        let cli = Cli::try_parse_from([
            "loadgrid",
            "evaluate",
            "--actual",
            "a.csv",
            "--forecast",
            "f.csv",
            "--keep-holidays",
            "--no-plot",
            "--zero-actual",
            "reject",
            "--top",
            "2",
        ])
        .unwrap();
        let Command::Evaluate(args) = cli.command else {
            panic!("expected evaluate");
        };
        let config = eval_config_from_args(&args);
        assert_eq!(config.actual_path, Path::new("a.csv"));
        assert!(!config.exclude_holidays);
        assert!(!config.plot);
        assert_eq!(config.top_n, 2);
        assert_eq!(config.bands.len(), 5);
        assert_eq!(config.zero_actual, crate::domain::ZeroActualPolicy::Reject);
    }
}
