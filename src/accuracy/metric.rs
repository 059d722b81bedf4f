//! Accuracy score.
//!
//! `score = 1 - sqrt(mean(((forecast - actual) / actual)^2))`
//!
//! 1.0 is a perfect forecast; the score is unbounded below.

use crate::domain::ZeroActualPolicy;
use crate::error::CoreError;

/// A score with the number of inputs behind it.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Score {
    /// `None` when no input qualified.
    pub value: Option<f64>,
    pub samples: usize,
}

/// Score `(actual, forecast)` pairs.
///
/// Pairs with a missing side are skipped. Pairs with a zero actual are
/// skipped or rejected depending on `policy`.
pub fn accuracy_score(
    pairs: impl IntoIterator<Item = (Option<f64>, Option<f64>)>,
    policy: ZeroActualPolicy,
) -> Result<Score, CoreError> {
    let mut sum_sq = 0.0;
    let mut samples = 0usize;

    for (actual, forecast) in pairs {
        let (Some(actual), Some(forecast)) = (actual, forecast) else {
            continue;
        };
        if !actual.is_finite() || !forecast.is_finite() {
            continue;
        }
        if actual == 0.0 {
            match policy {
                ZeroActualPolicy::Exclude => continue,
                ZeroActualPolicy::Reject => {
                    return Err(CoreError::UndefinedMetric(format!(
                        "actual value is zero (forecast {forecast})"
                    )));
                }
            }
        }
        let rel = (forecast - actual) / actual;
        sum_sq += rel * rel;
        samples += 1;
    }

    let value = (samples > 0).then(|| 1.0 - (sum_sq / samples as f64).sqrt());
    Ok(Score {
        value: value.filter(|v| v.is_finite()),
        samples,
    })
}

/// Mean of the scores that are present; `samples` counts them.
pub fn mean_score(scores: impl IntoIterator<Item = Option<f64>>) -> Score {
    let (sum, n) = scores
        .into_iter()
        .flatten()
        .filter(|v| v.is_finite())
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    Score {
        value: (n > 0).then(|| sum / n as f64),
        samples: n,
    }
}
