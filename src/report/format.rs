//! Formatted terminal output for accuracy reports.
//!
//! All report text is built here so output changes stay in one place.

use crate::domain::{AccuracyRecord, AccuracyReport, PartitionKey, ZeroActualPolicy};
use crate::report::Rankings;

const WEEKDAY_NAMES: [&str; 7] = ["Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday", "Sunday"];

/// Display name of ISO weekday `day` (1 = Monday ... 7 = Sunday).
pub fn weekday_name(day: u32) -> &'static str {
    day.checked_sub(1)
        .and_then(|i| WEEKDAY_NAMES.get(i as usize))
        .copied()
        .unwrap_or("?")
}

/// Format the full accuracy report.
pub fn format_accuracy_report(report: &AccuracyReport) -> String {
    let mut out = String::new();

    out.push_str("=== loadgrid - forecast accuracy ===\n");
    let span = match (report.first_day, report.last_day) {
        (Some(a), Some(b)) => format!("{a} .. {b}"),
        _ => "(no paired days)".to_string(),
    };
    out.push_str(&format!("Span: {span} | {} points/day\n", report.frequency.points()));
    out.push_str(&format!(
        "Holidays excluded: {} | zero actuals: {}\n",
        if report.exclude_holidays { "yes" } else { "no" },
        match report.zero_actual {
            ZeroActualPolicy::Exclude => "excluded",
            ZeroActualPolicy::Reject => "rejected",
        }
    ));

    let split = &report.holiday_split;
    out.push_str(&format!(
        "\nHoliday mean accuracy: {} (days={}) | other days: {} (days={})\n",
        fmt_score(split.holiday.score),
        split.holiday.samples,
        fmt_score(split.regular.score),
        split.regular.samples
    ));

    out.push_str("\nAccuracy by time of day:\n");
    out.push_str(&format_records(&report.time_of_day, "label", "pairs"));

    out.push_str("\nAccuracy by month:\n");
    out.push_str(&format_records(&report.monthly, "month", "days"));

    out.push_str("\nPeak/valley accuracy by hour band:\n");
    out.push_str(&format!(
        "{:<8} {:>10} {:>6} {:>10} {:>6}\n",
        "band", "peak", "pairs", "valley", "pairs"
    ));
    out.push_str(&format!("{:-<8} {:-<10} {:-<6} {:-<10} {:-<6}\n", "", "", "", "", ""));
    for b in &report.peak_valley {
        out.push_str(&format!(
            "{:<8} {:>10} {:>6} {:>10} {:>6}\n",
            format!("[{})", b.band.to_string().replace('-', ", ")),
            fmt_score(b.peak.score),
            b.peak.samples,
            fmt_score(b.valley.score),
            b.valley.samples
        ));
    }

    out.push_str("\nAccuracy by weekday:\n");
    out.push_str(&format_records(&report.weekday, "weekday", "days"));

    out
}

/// Format the worst/best label tables.
pub fn format_rankings(rankings: &Rankings) -> String {
    let mut out = String::new();

    out.push_str("Least accurate:\n");
    out.push_str(&format_records(&rankings.worst, "key", "n"));
    out.push('\n');

    out.push_str("Most accurate:\n");
    out.push_str(&format_records(&rankings.best, "key", "n"));

    out
}

fn format_records(records: &[AccuracyRecord], key_header: &str, count_header: &str) -> String {
    let mut out = String::new();
    out.push_str(&format!("{key_header:<10} {:>10} {count_header:>6}\n", "accuracy"));
    out.push_str(&format!("{:-<10} {:-<10} {:-<6}\n", "", "", ""));
    for r in records {
        out.push_str(&format!(
            "{:<10} {:>10} {:>6}\n",
            key_label(&r.key),
            fmt_score(r.score),
            r.samples
        ));
    }
    out
}

fn key_label(key: &PartitionKey) -> String {
    match key {
        PartitionKey::Weekday { day } => weekday_name(*day).to_string(),
        other => other.to_string(),
    }
}

fn fmt_score(score: Option<f64>) -> String {
    match score {
        Some(v) => format!("{v:.5}"),
        None => "-".to_string(),
    }
}
