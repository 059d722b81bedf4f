//! Reporting utilities: label rankings and formatted terminal output.

pub mod format;

pub use format::*;

use crate::domain::AccuracyRecord;

/// Best and worst scoring records (top-N each side).
#[derive(Debug, Clone)]
pub struct Rankings {
    pub worst: Vec<AccuracyRecord>,
    pub best: Vec<AccuracyRecord>,
}

/// Rank scored records; records without a score are left out.
pub fn rank_records(records: &[AccuracyRecord], top_n: usize) -> Rankings {
    let mut scored: Vec<AccuracyRecord> = records.iter().filter(|r| r.score.is_some()).cloned().collect();
    scored.sort_by(|a, b| a.score.partial_cmp(&b.score).unwrap_or(std::cmp::Ordering::Equal));

    let worst = scored.iter().take(top_n).cloned().collect();
    let best = scored.iter().rev().take(top_n).cloned().collect();

    Rankings { worst, best }
}
