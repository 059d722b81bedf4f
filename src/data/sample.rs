//! Synthetic actual/forecast load pairs.
//!
//! Used by `loadgrid demo` and by tests that need realistic-looking data.
//! The daily shape has a night valley, a late-morning peak and an evening
//! peak; weekends run lower. The forecast is the actual with multiplicative
//! Gaussian noise, so its accuracy lands a few percent below 1.0.

use std::f64::consts::PI;

use chrono::{Datelike, NaiveDate, Weekday};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::{Frequency, WideRow, WideTable};
use crate::error::{AppError, EXIT_INPUT};

/// Base load level (MW).
const BASE_LOAD: f64 = 1000.0;
/// Relative day-to-day noise on the actual series.
const ACTUAL_NOISE: f64 = 0.02;
/// Relative forecast error.
const FORECAST_NOISE: f64 = 0.03;
const WEEKEND_FACTOR: f64 = 0.88;

#[derive(Debug, Clone)]
pub struct SamplePair {
    pub actual: WideTable,
    pub forecast: WideTable,
}

/// Generate `days` days of actual and forecast load starting at `start`.
pub fn generate_pair(days: usize, start: NaiveDate, frequency: Frequency, seed: u64) -> Result<SamplePair, AppError> {
    if days == 0 {
        return Err(AppError::new(EXIT_INPUT, "Sample day count must be > 0."));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let actual_noise = Normal::new(0.0, ACTUAL_NOISE)
        .map_err(|e| AppError::new(EXIT_INPUT, format!("Noise distribution error: {e}")))?;
    let forecast_noise = Normal::new(0.0, FORECAST_NOISE)
        .map_err(|e| AppError::new(EXIT_INPUT, format!("Noise distribution error: {e}")))?;

    let mut actual = Vec::with_capacity(days);
    let mut forecast = Vec::with_capacity(days);

    for date in start.iter_days().take(days) {
        // Day-level level shift shared by every point of the day.
        let level = BASE_LOAD * day_factor(date) * (1.0 + actual_noise.sample(&mut rng));

        let mut a = Vec::with_capacity(frequency.points());
        let mut f = Vec::with_capacity(frequency.points());
        for slot in 0..frequency.points() {
            let hour = slot as f64 * f64::from(frequency.step_minutes()) / 60.0;
            let value = level * intraday_shape(hour) * (1.0 + 0.25 * actual_noise.sample(&mut rng));
            a.push(Some(value));
            f.push(Some(value * (1.0 + forecast_noise.sample(&mut rng))));
        }
        actual.push(WideRow { date, values: a });
        forecast.push(WideRow { date, values: f });
    }

    Ok(SamplePair {
        actual: WideTable::new("DATE", frequency, actual)?,
        forecast: WideTable::new("DATE", frequency, forecast)?,
    })
}

fn day_factor(date: NaiveDate) -> f64 {
    let weekend = matches!(date.weekday(), Weekday::Sat | Weekday::Sun);
    // Summer and winter run higher than spring/autumn.
    let seasonal = 1.0 + 0.1 * (4.0 * PI * f64::from(date.ordinal()) / 365.0).cos();
    seasonal * if weekend { WEEKEND_FACTOR } else { 1.0 }
}

/// Relative load at `hour` (0..24): valley near 04:00, peaks near 11:00 and 19:00.
fn intraday_shape(hour: f64) -> f64 {
    let bump = |center: f64, width: f64| (-((hour - center) / width).powi(2)).exp();
    0.7 + 0.35 * bump(11.0, 2.5) + 0.4 * bump(19.0, 2.0) - 0.1 * bump(4.0, 2.0)
}
