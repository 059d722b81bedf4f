//! Partitioned accuracy of a forecast against actuals.
//!
//! Every operation takes the actual and forecast tables as [`WideTable`]s of
//! the same frequency and pairs them day by day (inner join on date). Daily
//! scores score each joined day on its own; partition scores average them,
//! skipping days without a score.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate, Timelike};
use tracing::debug;

use crate::accuracy::metric::{accuracy_score, mean_score, Score};
use crate::calendar::HolidayCalendar;
use crate::domain::{
    AccuracyRecord, AccuracyReport, BandAccuracy, Extremum, HolidaySplit, HourBand, PartitionKey, WideTable,
    ZeroActualPolicy,
};
use crate::error::CoreError;

/// One joined day: date, actual values, forecast values.
type DayPair<'t> = (NaiveDate, &'t [Option<f64>], &'t [Option<f64>]);

#[derive(Debug, Clone, Copy)]
pub struct AccuracyEvaluator<'c> {
    holidays: &'c HolidayCalendar,
    zero_actual: ZeroActualPolicy,
}

impl<'c> AccuracyEvaluator<'c> {
    pub fn new(holidays: &'c HolidayCalendar) -> Self {
        Self {
            holidays,
            zero_actual: ZeroActualPolicy::default(),
        }
    }

    pub fn with_zero_actual(mut self, policy: ZeroActualPolicy) -> Self {
        self.zero_actual = policy;
        self
    }

    /// One record per grid label, pairing that label's values across days.
    pub fn by_time_of_day(
        &self,
        actual: &WideTable,
        forecast: &WideTable,
        exclude_holidays: bool,
    ) -> Result<Vec<AccuracyRecord>, CoreError> {
        let days = self.join(actual, forecast, exclude_holidays)?;
        actual
            .labels()
            .iter()
            .enumerate()
            .map(|(slot, label)| {
                let score = accuracy_score(days.iter().map(|(_, a, f)| (a[slot], f[slot])), self.zero_actual)?;
                Ok(record(PartitionKey::Label { label: label.clone() }, score))
            })
            .collect()
    }

    /// Mean daily accuracy on holidays and on all other days.
    ///
    /// Each partition is flattened to long form and scored one calendar day
    /// at a time; days between partition members are `None` runs and drop
    /// out of the mean.
    pub fn by_holiday_partition(&self, actual: &WideTable, forecast: &WideTable) -> Result<HolidaySplit, CoreError> {
        let (holiday, regular): (Vec<NaiveDate>, Vec<NaiveDate>) = self
            .join(actual, forecast, false)?
            .into_iter()
            .map(|(date, _, _)| date)
            .partition(|date| self.holidays.is_holiday(*date));

        Ok(HolidaySplit {
            holiday: record(
                PartitionKey::Holiday { holiday: true },
                self.long_daily_mean(actual, forecast, &holiday)?,
            ),
            regular: record(
                PartitionKey::Holiday { holiday: false },
                self.long_daily_mean(actual, forecast, &regular)?,
            ),
        })
    }

    /// Mean daily accuracy per calendar month, in month order.
    pub fn by_month(
        &self,
        actual: &WideTable,
        forecast: &WideTable,
        exclude_holidays: bool,
    ) -> Result<Vec<AccuracyRecord>, CoreError> {
        let daily = self.daily_scores(&self.join(actual, forecast, exclude_holidays)?)?;
        let mut months: BTreeMap<(i32, u32), Vec<Option<f64>>> = BTreeMap::new();
        for (date, score) in daily {
            months.entry((date.year(), date.month())).or_default().push(score.value);
        }
        Ok(months
            .into_iter()
            .map(|((year, month), scores)| record(PartitionKey::Month { year, month }, mean_score(scores)))
            .collect())
    }

    /// Accuracy at the daily extrema of the actual series inside each band.
    ///
    /// For each day, the maximum and minimum of the actual values whose hour
    /// lies in `[start, end)` are located; every instant in the band holding
    /// that value (ties included) is paired with the forecast at the same
    /// instant. Peak and valley pairs are scored separately.
    pub fn by_peak_valley_band(
        &self,
        actual: &WideTable,
        forecast: &WideTable,
        bands: &[HourBand],
        exclude_holidays: bool,
    ) -> Result<Vec<BandAccuracy>, CoreError> {
        let days = self.join(actual, forecast, exclude_holidays)?;
        let frequency = actual.frequency();

        bands
            .iter()
            .map(|&band| {
                let slots: Vec<usize> = (0..frequency.points())
                    .filter(|&slot| band.contains(frequency.slot_time(slot).hour()))
                    .collect();

                let mut peaks = Vec::new();
                let mut valleys = Vec::new();
                for (_, a, f) in &days {
                    let in_band: Vec<(usize, f64)> =
                        slots.iter().filter_map(|&s| a[s].map(|v| (s, v))).collect();
                    let Some(max) = in_band.iter().map(|&(_, v)| v).reduce(f64::max) else {
                        continue;
                    };
                    let min = in_band.iter().map(|&(_, v)| v).fold(max, f64::min);
                    peaks.extend(in_band.iter().filter(|&&(_, v)| v == max).map(|&(s, v)| (Some(v), f[s])));
                    valleys.extend(in_band.iter().filter(|&&(_, v)| v == min).map(|&(s, v)| (Some(v), f[s])));
                }

                let peak = accuracy_score(peaks, self.zero_actual)?;
                let valley = accuracy_score(valleys, self.zero_actual)?;
                Ok(BandAccuracy {
                    band,
                    peak: record(
                        PartitionKey::Band {
                            band,
                            extremum: Extremum::Peak,
                        },
                        peak,
                    ),
                    valley: record(
                        PartitionKey::Band {
                            band,
                            extremum: Extremum::Valley,
                        },
                        valley,
                    ),
                })
            })
            .collect()
    }

    /// Mean daily accuracy per ISO weekday; always seven records, Monday first.
    pub fn by_weekday(
        &self,
        actual: &WideTable,
        forecast: &WideTable,
        exclude_holidays: bool,
    ) -> Result<Vec<AccuracyRecord>, CoreError> {
        let daily = self.daily_scores(&self.join(actual, forecast, exclude_holidays)?)?;
        let mut weekdays: [Vec<Option<f64>>; 7] = Default::default();
        for (date, score) in daily {
            weekdays[date.weekday().num_days_from_monday() as usize].push(score.value);
        }
        Ok(weekdays
            .into_iter()
            .zip(1u32..)
            .map(|(scores, day)| record(PartitionKey::Weekday { day }, mean_score(scores)))
            .collect())
    }

    /// Run every breakdown. The holiday split never excludes holidays.
    pub fn full_report(
        &self,
        actual: &WideTable,
        forecast: &WideTable,
        bands: &[HourBand],
        exclude_holidays: bool,
    ) -> Result<AccuracyReport, CoreError> {
        let joined = self.join(actual, forecast, exclude_holidays)?;
        let first_day = joined.first().map(|(d, _, _)| *d);
        let last_day = joined.last().map(|(d, _, _)| *d);

        let report = AccuracyReport {
            frequency: actual.frequency(),
            first_day,
            last_day,
            exclude_holidays,
            zero_actual: self.zero_actual,
            holiday_split: self.by_holiday_partition(actual, forecast)?,
            time_of_day: self.by_time_of_day(actual, forecast, exclude_holidays)?,
            monthly: self.by_month(actual, forecast, exclude_holidays)?,
            peak_valley: self.by_peak_valley_band(actual, forecast, bands, exclude_holidays)?,
            weekday: self.by_weekday(actual, forecast, exclude_holidays)?,
        };
        debug!(days = joined.len(), "accuracy report computed");
        Ok(report)
    }

    /// Inner join on date, optionally without holidays.
    fn join<'t>(
        &self,
        actual: &'t WideTable,
        forecast: &'t WideTable,
        exclude_holidays: bool,
    ) -> Result<Vec<DayPair<'t>>, CoreError> {
        if actual.frequency() != forecast.frequency() {
            return Err(CoreError::ShapeMismatch {
                context: "forecast points per day".to_string(),
                expected: vec![actual.frequency().points()],
                actual: forecast.frequency().points(),
            });
        }

        let mut excluded = 0usize;
        let days: Vec<DayPair<'t>> = actual
            .rows()
            .iter()
            .filter_map(|a| forecast.get(a.date).map(|f| (a.date, a.values.as_slice(), f.values.as_slice())))
            .filter(|(date, _, _)| {
                let drop = exclude_holidays && self.holidays.is_holiday(*date);
                excluded += usize::from(drop);
                !drop
            })
            .collect();

        debug!(
            actual_days = actual.len(),
            forecast_days = forecast.len(),
            joined = days.len(),
            excluded_holidays = excluded,
            "paired actual and forecast days"
        );
        Ok(days)
    }

    /// Mean of the daily scores over `dates` (sorted, present in both tables).
    fn long_daily_mean(
        &self,
        actual: &WideTable,
        forecast: &WideTable,
        dates: &[NaiveDate],
    ) -> Result<Score, CoreError> {
        let keep = |date: NaiveDate| dates.binary_search(&date).is_ok();
        let actual = actual.filter_dates(keep).to_long("actual");
        let forecast = forecast.filter_dates(keep).to_long("forecast");

        // Same dates on both sides, so the day runs line up.
        let points = actual.frequency().points();
        let daily = actual
            .values()
            .chunks(points)
            .zip(forecast.values().chunks(points))
            .map(|(a, f)| {
                accuracy_score(a.iter().copied().zip(f.iter().copied()), self.zero_actual).map(|s| s.value)
            })
            .collect::<Result<Vec<_>, CoreError>>()?;
        Ok(mean_score(daily))
    }

    fn daily_scores(&self, days: &[DayPair<'_>]) -> Result<Vec<(NaiveDate, Score)>, CoreError> {
        days.iter()
            .map(|(date, a, f)| {
                let score = accuracy_score(a.iter().copied().zip(f.iter().copied()), self.zero_actual)?;
                Ok((*date, score))
            })
            .collect()
    }
}

fn record(key: PartitionKey, score: Score) -> AccuracyRecord {
    AccuracyRecord {
        key,
        score: score.value,
        samples: score.samples,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Frequency, WideRow};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn table(freq: Frequency, days: &[(NaiveDate, Vec<Option<f64>>)]) -> WideTable {
        let rows = days
            .iter()
            .map(|(date, values)| WideRow {
                date: *date,
                values: values.clone(),
            })
            .collect();
        WideTable::new("DATE", freq, rows).unwrap()
    }

    fn flat(freq: Frequency, dates: &[NaiveDate], value: f64) -> WideTable {
        let days: Vec<_> = dates.iter().map(|d| (*d, vec![Some(value); freq.points()])).collect();
        table(freq, &days)
    }

    /// 2024-01-01 is a Monday.
    fn week() -> Vec<NaiveDate> {
        (1..=7).map(|day| d(2024, 1, day)).collect()
    }

    #[test]
    fn identical_tables_score_one_everywhere() {
        let cal = HolidayCalendar::default();
        let eval = AccuracyEvaluator::new(&cal);
        let actual = flat(Frequency::P96, &week(), 100.0);

        let tod = eval.by_time_of_day(&actual, &actual, false).unwrap();
        assert_eq!(tod.len(), 96);
        assert!(tod.iter().all(|r| r.score == Some(1.0) && r.samples == 7));
        assert_eq!(
            tod[1].key,
            PartitionKey::Label {
                label: "T0015".to_string()
            }
        );

        let months = eval.by_month(&actual, &actual, false).unwrap();
        assert_eq!(months.len(), 1);
        assert_eq!(months[0].score, Some(1.0));
    }

    #[test]
    fn time_of_day_scores_never_exceed_one() {
        let cal = HolidayCalendar::default();
        let eval = AccuracyEvaluator::new(&cal);
        let actual = flat(Frequency::P48, &week(), 100.0);
        let forecast = flat(Frequency::P48, &week(), 93.0);
        let tod = eval.by_time_of_day(&actual, &forecast, false).unwrap();
        assert_eq!(tod.len(), 48);
        for r in &tod {
            let s = r.score.unwrap();
            assert!(s <= 1.0);
            assert!((s - 0.93).abs() < 1e-9);
        }
    }

    #[test]
    fn frequencies_must_match() {
        let cal = HolidayCalendar::default();
        let eval = AccuracyEvaluator::new(&cal);
        let a = flat(Frequency::P96, &week(), 1.0);
        let f = flat(Frequency::P24, &week(), 1.0);
        let err = eval.by_weekday(&a, &f, false).unwrap_err();
        assert!(matches!(err, CoreError::ShapeMismatch { actual: 24, .. }));
    }

    #[test]
    fn weekday_seven_is_sunday() {
        let cal = HolidayCalendar::default();
        let eval = AccuracyEvaluator::new(&cal);
        let actual = flat(Frequency::P24, &week(), 100.0);
        let mut days: Vec<_> = week().into_iter().map(|d| (d, vec![Some(100.0); 24])).collect();
        // Sunday 2024-01-07 forecast off by 20%.
        days[6].1 = vec![Some(80.0); 24];
        let forecast = table(Frequency::P24, &days);

        let by_day = eval.by_weekday(&actual, &forecast, false).unwrap();
        assert_eq!(by_day.len(), 7);
        assert_eq!(by_day[6].key, PartitionKey::Weekday { day: 7 });
        assert!((by_day[6].score.unwrap() - 0.8).abs() < 1e-9);
        assert!(by_day[..6].iter().all(|r| r.score == Some(1.0)));
    }

    #[test]
    fn weekday_uniform_week_scores_one() {
        let cal = HolidayCalendar::default();
        let eval = AccuracyEvaluator::new(&cal);
        let actual = flat(Frequency::P96, &week(), 250.0);

        let records = eval.by_weekday(&actual, &actual, false).unwrap();
        assert_eq!(records.len(), 7);
        for (record, day) in records.iter().zip(1u32..=7) {
            assert_eq!(record.key, PartitionKey::Weekday { day });
            assert_eq!(record.score, Some(1.0));
            assert_eq!(record.samples, 1);
        }
    }

    #[test]
    fn weekdays_without_data_have_no_score() {
        let cal = HolidayCalendar::default();
        let eval = AccuracyEvaluator::new(&cal);
        let actual = flat(Frequency::P24, &[d(2024, 1, 1)], 5.0);
        let by_day = eval.by_weekday(&actual, &actual, false).unwrap();
        assert_eq!(by_day.len(), 7);
        assert_eq!(by_day[0].score, Some(1.0));
        assert!(by_day[1..].iter().all(|r| r.score.is_none() && r.samples == 0));
    }

    #[test]
    fn holiday_split_and_exclusion() {
        let cal = HolidayCalendar::from_dates([d(2024, 1, 1)]);
        let eval = AccuracyEvaluator::new(&cal);
        let actual = flat(Frequency::P24, &week(), 100.0);
        let mut days: Vec<_> = week().into_iter().map(|d| (d, vec![Some(100.0); 24])).collect();
        days[0].1 = vec![Some(50.0); 24];
        let forecast = table(Frequency::P24, &days);

        let split = eval.by_holiday_partition(&actual, &forecast).unwrap();
        assert_eq!(split.holiday.score, Some(0.5));
        assert_eq!(split.holiday.samples, 1);
        assert_eq!(split.regular.score, Some(1.0));
        assert_eq!(split.regular.samples, 6);

        let with = eval.by_month(&actual, &forecast, false).unwrap();
        let without = eval.by_month(&actual, &forecast, true).unwrap();
        assert!(with[0].score.unwrap() < 1.0);
        assert_eq!(without[0].score, Some(1.0));
        assert_eq!(without[0].samples, 6);
    }

    #[test]
    fn holiday_split_skips_days_between_members() {
        // Holidays on the 1st and 5th; the long form of that partition
        // carries empty runs for the 2nd to the 4th.
        let cal = HolidayCalendar::from_dates([d(2024, 1, 1), d(2024, 1, 5)]);
        let eval = AccuracyEvaluator::new(&cal);
        let actual = flat(Frequency::P48, &week(), 100.0);
        let mut days: Vec<_> = week().into_iter().map(|d| (d, vec![Some(100.0); 48])).collect();
        days[0].1 = vec![Some(90.0); 48];
        days[4].1 = vec![Some(70.0); 48];
        let forecast = table(Frequency::P48, &days);

        let split = eval.by_holiday_partition(&actual, &forecast).unwrap();
        assert_eq!(split.holiday.samples, 2);
        assert!((split.holiday.score.unwrap() - 0.8).abs() < 1e-9);
        assert_eq!(split.regular.samples, 5);
        assert_eq!(split.regular.score, Some(1.0));
    }

    #[test]
    fn months_are_grouped_by_year_and_month() {
        let cal = HolidayCalendar::default();
        let eval = AccuracyEvaluator::new(&cal);
        let dates = [d(2023, 12, 31), d(2024, 1, 1), d(2024, 2, 1)];
        let actual = flat(Frequency::P24, &dates, 10.0);
        let months = eval.by_month(&actual, &actual, false).unwrap();
        let keys: Vec<String> = months.iter().map(|r| r.key.to_string()).collect();
        assert_eq!(keys, vec!["2023-12", "2024-01", "2024-02"]);
    }

    #[test]
    fn peak_is_paired_at_the_actual_maximum() {
        let cal = HolidayCalendar::default();
        let eval = AccuracyEvaluator::new(&cal);
        let freq = Frequency::P96;

        // Actual peaks at 10:00 (slot 40) inside [8, 12); forecast is 90 there, 100 elsewhere.
        let mut a = vec![Some(100.0); 96];
        a[40] = Some(200.0);
        a[33] = Some(50.0);
        // Higher value outside the band must not be picked.
        a[80] = Some(500.0);
        let mut f = vec![Some(100.0); 96];
        f[40] = Some(180.0);
        f[33] = Some(60.0);

        let date = d(2024, 3, 4);
        let actual = table(freq, &[(date, a)]);
        let forecast = table(freq, &[(date, f)]);

        let bands = [HourBand::new(8, 12).unwrap()];
        let out = eval.by_peak_valley_band(&actual, &forecast, &bands, false).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].peak.samples, 1);
        assert!((out[0].peak.score.unwrap() - 0.9).abs() < 1e-9);
        assert_eq!(out[0].valley.samples, 1);
        assert!((out[0].valley.score.unwrap() - 0.8).abs() < 1e-9);
    }

    #[test]
    fn tied_extrema_pair_every_instant() {
        let cal = HolidayCalendar::default();
        let eval = AccuracyEvaluator::new(&cal);
        let date = d(2024, 3, 4);
        let actual = table(Frequency::P24, &[(date, vec![Some(10.0); 24])]);
        let forecast = table(Frequency::P24, &[(date, vec![Some(10.0); 24])]);

        let out = eval
            .by_peak_valley_band(&actual, &forecast, &HourBand::DEFAULTS, false)
            .unwrap();
        assert_eq!(out.len(), 5);
        // [1, 7) holds six hourly values, all tied.
        assert_eq!(out[0].peak.samples, 6);
        assert_eq!(out[0].valley.samples, 6);
        assert!(out.iter().all(|b| b.peak.score == Some(1.0)));
    }

    #[test]
    fn zero_actuals_can_be_rejected() {
        let cal = HolidayCalendar::default();
        let actual = flat(Frequency::P24, &[d(2024, 1, 1)], 0.0);
        let forecast = flat(Frequency::P24, &[d(2024, 1, 1)], 1.0);

        let lenient = AccuracyEvaluator::new(&cal);
        let tod = lenient.by_time_of_day(&actual, &forecast, false).unwrap();
        assert!(tod.iter().all(|r| r.score.is_none()));

        let strict = AccuracyEvaluator::new(&cal).with_zero_actual(ZeroActualPolicy::Reject);
        assert!(matches!(
            strict.by_time_of_day(&actual, &forecast, false),
            Err(CoreError::UndefinedMetric(_))
        ));
    }

    #[test]
    fn full_report_covers_the_joined_span() {
        let cal = HolidayCalendar::from_dates([d(2024, 1, 3)]);
        let eval = AccuracyEvaluator::new(&cal);
        let actual = flat(Frequency::P48, &week(), 100.0);
        let forecast = flat(Frequency::P48, &week()[1..], 95.0);

        let report = eval.full_report(&actual, &forecast, &HourBand::DEFAULTS, true).unwrap();
        assert_eq!(report.frequency, Frequency::P48);
        assert_eq!(report.first_day, Some(d(2024, 1, 2)));
        assert_eq!(report.last_day, Some(d(2024, 1, 7)));
        assert_eq!(report.time_of_day.len(), 48);
        assert_eq!(report.time_of_day[0].samples, 5);
        assert_eq!(report.holiday_split.holiday.samples, 1);
        assert_eq!(report.weekday.len(), 7);
        assert_eq!(report.peak_valley.len(), 5);
    }

    #[test]
    fn full_report_identical_tables_all_one() {
        let first = d(2024, 5, 1);
        let cal = HolidayCalendar::from_dates([first]);
        let eval = AccuracyEvaluator::new(&cal);
        let days: Vec<_> = [first, d(2024, 5, 2)]
            .into_iter()
            .map(|date| {
                let values = (0..96).map(|slot| Some(80.0 + (slot % 12) as f64)).collect();
                (date, values)
            })
            .collect();
        let actual = table(Frequency::P96, &days);

        let report = eval.full_report(&actual, &actual, &HourBand::DEFAULTS, false).unwrap();
        let one = |r: &AccuracyRecord| r.score == Some(1.0);

        assert_eq!(report.time_of_day.len(), 96);
        assert!(report.time_of_day.iter().all(one));
        assert!(one(&report.holiday_split.holiday));
        assert!(one(&report.holiday_split.regular));
        assert_eq!(report.monthly.len(), 1);
        assert!(report.monthly.iter().all(one));
        assert_eq!(report.peak_valley.len(), HourBand::DEFAULTS.len());
        assert!(report.peak_valley.iter().all(|b| one(&b.peak) && one(&b.valley)));
        assert_eq!(report.weekday.len(), 7);
        // 2024-05-01 is a Wednesday.
        assert!(one(&report.weekday[2]) && one(&report.weekday[3]));
        assert!(report.weekday.iter().filter(|r| r.score.is_some()).all(one));
    }
}
