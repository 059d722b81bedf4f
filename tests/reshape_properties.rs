use chrono::{Duration, NaiveDate};
use proptest::prelude::*;

use loadgrid::accuracy::AccuracyEvaluator;
use loadgrid::calendar::HolidayCalendar;
use loadgrid::domain::{DateEncoding, Frequency, WideRow, WideTable};
use loadgrid::transform::{long_to_wide, wide_to_long};

const MAX_DAYS: usize = 4;

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 2, 26).unwrap()
}

fn wide(native: Frequency, days: usize, pool: &[f64]) -> WideTable {
    let points = native.points();
    let rows = (0..days)
        .map(|d| WideRow {
            date: start() + Duration::days(d as i64),
            values: pool[d * points..(d + 1) * points].iter().map(|v| Some(*v)).collect(),
        })
        .collect();
    WideTable::new("DATE", native, rows).unwrap()
}

/// (native, target) with target no finer than native.
fn frequency_pair() -> impl Strategy<Value = (Frequency, Frequency)> {
    (0usize..3, 0usize..3).prop_map(|(a, b)| {
        let (native, target) = if a <= b { (a, b) } else { (b, a) };
        (Frequency::ALL[native], Frequency::ALL[target])
    })
}

fn load_values() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(1.0f64..10_000.0, MAX_DAYS * 96)
}

proptest! {
    #[test]
    fn long_length_is_days_times_target_points(
        (native, target) in frequency_pair(),
        days in 1usize..=MAX_DAYS,
        pool in load_values(),
    ) {
        let table = wide(native, days, &pool).to_table();
        let long = wide_to_long(&table, "DATE", "LOAD", target, DateEncoding::Calendar).unwrap();
        prop_assert_eq!(long.len(), days * target.points());
        prop_assert_eq!(long.day_count(), days);
    }

    #[test]
    fn downsampling_keeps_every_stride_th_value(
        (native, target) in frequency_pair(),
        days in 1usize..=MAX_DAYS,
        pool in load_values(),
    ) {
        let source = wide(native, days, &pool);
        let long = wide_to_long(&source.to_table(), "DATE", "LOAD", target, DateEncoding::Calendar).unwrap();
        let stride = native.points() / target.points();

        for (i, v) in long.values().iter().enumerate() {
            let day = i / target.points();
            let slot = i % target.points();
            prop_assert_eq!(*v, source.rows()[day].values[slot * stride]);
        }
    }

    #[test]
    fn wide_long_wide_is_identity_at_native_frequency(
        (native, _) in frequency_pair(),
        days in 1usize..=MAX_DAYS,
        pool in load_values(),
    ) {
        let source = wide(native, days, &pool);
        let long = wide_to_long(&source.to_table(), "DATE", "LOAD", native, DateEncoding::Calendar).unwrap();
        let back = long_to_wide(&long.to_table(), "DATE", "LOAD", native).unwrap();
        prop_assert_eq!(back.rows(), source.rows());
    }

    #[test]
    fn scores_never_exceed_one(
        days in 1usize..=MAX_DAYS,
        actual in load_values(),
        forecast in load_values(),
    ) {
        let calendar = HolidayCalendar::default();
        let evaluator = AccuracyEvaluator::new(&calendar);
        let a = wide(Frequency::P96, days, &actual);
        let f = wide(Frequency::P96, days, &forecast);

        let records = evaluator.by_time_of_day(&a, &f, false).unwrap();
        prop_assert_eq!(records.len(), 96);
        for r in records {
            let score = r.score.unwrap();
            prop_assert!(score <= 1.0);
            prop_assert_eq!(r.samples, days);
        }
    }

    #[test]
    fn identical_tables_score_one(
        days in 1usize..=MAX_DAYS,
        pool in load_values(),
    ) {
        let calendar = HolidayCalendar::default();
        let evaluator = AccuracyEvaluator::new(&calendar);
        let a = wide(Frequency::P48, days, &pool);

        for r in evaluator.by_time_of_day(&a, &a, false).unwrap() {
            prop_assert_eq!(r.score, Some(1.0));
        }
        for r in evaluator.by_month(&a, &a, false).unwrap() {
            prop_assert_eq!(r.score, Some(1.0));
        }
    }
}
