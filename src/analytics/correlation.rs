//! Cross-metric correlation
//!
//! Pearson correlation between daily-aggregated metrics, joined on the
//! calendar dates present in both series. The streams share no keys
//! beyond the date, so the join is the whole relationship.

use crate::analytics::aggregate::mean;
use crate::store::cache::AnalysisDataset;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

/// Minimum overlapping dates for a meaningful coefficient
pub const MIN_OVERLAP_DAYS: usize = 3;

/// Pearson correlation coefficient via the sum-based formula
///
/// `None` when the denominator is exactly zero (a constant series):
/// the coefficient is undefined, and NaN must not leak to callers.
pub fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    debug_assert_eq!(x.len(), y.len());
    let n = x.len() as f64;

    let sum_x: f64 = x.iter().sum();
    let sum_y: f64 = y.iter().sum();
    let sum_xy: f64 = x.iter().zip(y).map(|(a, b)| a * b).sum();
    let sum_x2: f64 = x.iter().map(|a| a * a).sum();
    let sum_y2: f64 = y.iter().map(|b| b * b).sum();

    let numerator = n * sum_xy - sum_x * sum_y;
    let denominator = ((n * sum_x2 - sum_x * sum_x) * (n * sum_y2 - sum_y * sum_y)).sqrt();

    if denominator == 0.0 {
        None
    } else {
        Some(numerator / denominator)
    }
}

/// Human-readable strength of |r|
pub fn strength_label(r: f64) -> &'static str {
    let abs_r = r.abs();
    if abs_r >= 0.7 {
        "strong"
    } else if abs_r >= 0.4 {
        "moderate"
    } else if abs_r >= 0.2 {
        "weak"
    } else {
        "very weak or none"
    }
}

/// Correlation between one pair of daily series
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PairCorrelation {
    /// Fewer than 3 dates carry values in both series
    InsufficientOverlappingData {
        overlapping_days: usize,
        required: usize,
    },
    /// One series has no variance; the coefficient is undefined
    Undefined {
        overlapping_days: usize,
        coefficient: Option<f64>,
    },
    Computed {
        coefficient: f64,
        strength: &'static str,
        direction: &'static str,
        overlapping_days: usize,
    },
}

/// Correlate two per-day aggregates over their shared dates
pub fn correlate_daily(
    a: &BTreeMap<NaiveDate, f64>,
    b: &BTreeMap<NaiveDate, f64>,
) -> PairCorrelation {
    let mut xs = Vec::new();
    let mut ys = Vec::new();
    for (date, &x) in a {
        if let Some(&y) = b.get(date) {
            xs.push(x);
            ys.push(y);
        }
    }

    if xs.len() < MIN_OVERLAP_DAYS {
        return PairCorrelation::InsufficientOverlappingData {
            overlapping_days: xs.len(),
            required: MIN_OVERLAP_DAYS,
        };
    }

    match pearson(&xs, &ys) {
        None => PairCorrelation::Undefined {
            overlapping_days: xs.len(),
            coefficient: None,
        },
        Some(r) => PairCorrelation::Computed {
            coefficient: (r * 100.0).round() / 100.0,
            strength: strength_label(r),
            direction: if r >= 0.0 { "positive" } else { "negative" },
            overlapping_days: xs.len(),
        },
    }
}

/// The fixed metric pairings, each gated by its own overlap requirement
#[derive(Debug, Clone, Serialize)]
pub struct CorrelationSummary {
    /// Daily total exercise minutes vs daily mean glucose
    pub exercise_vs_glucose: PairCorrelation,
    /// Daily sleep duration vs daily mean glucose
    pub sleep_duration_vs_glucose: PairCorrelation,
    /// Daily sleep efficiency vs daily mean glucose
    pub sleep_efficiency_vs_glucose: PairCorrelation,
    /// Daily sleep duration vs daily total exercise minutes
    pub sleep_vs_exercise: PairCorrelation,
}

/// Compute all fixed pairings over one analysis dataset
pub fn daily_correlations(dataset: &AnalysisDataset) -> CorrelationSummary {
    let glucose_daily = daily_mean(
        dataset
            .glucose
            .iter()
            .map(|s| (s.date, s.glucose_mg_dl)),
    );
    let exercise_daily = daily_sum(
        dataset
            .exercise
            .iter()
            .map(|s| (s.date, s.duration_minutes)),
    );
    let sleep_duration_daily = daily_mean(
        dataset
            .sleep
            .iter()
            .map(|s| (s.date, s.duration_minutes)),
    );
    let sleep_efficiency_daily = daily_mean(
        dataset
            .sleep
            .iter()
            .filter_map(|s| s.efficiency_pct.map(|e| (s.date, e))),
    );

    CorrelationSummary {
        exercise_vs_glucose: correlate_daily(&exercise_daily, &glucose_daily),
        sleep_duration_vs_glucose: correlate_daily(&sleep_duration_daily, &glucose_daily),
        sleep_efficiency_vs_glucose: correlate_daily(&sleep_efficiency_daily, &glucose_daily),
        sleep_vs_exercise: correlate_daily(&sleep_duration_daily, &exercise_daily),
    }
}

/// Per-date mean of a (date, value) stream
fn daily_mean(pairs: impl Iterator<Item = (NaiveDate, f64)>) -> BTreeMap<NaiveDate, f64> {
    let mut grouped: BTreeMap<NaiveDate, Vec<f64>> = BTreeMap::new();
    for (date, value) in pairs {
        grouped.entry(date).or_default().push(value);
    }
    grouped
        .into_iter()
        .map(|(date, values)| (date, mean(&values)))
        .collect()
}

/// Per-date sum of a (date, value) stream
fn daily_sum(pairs: impl Iterator<Item = (NaiveDate, f64)>) -> BTreeMap<NaiveDate, f64> {
    let mut grouped: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for (date, value) in pairs {
        *grouped.entry(date).or_default() += value;
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    fn daily(points: &[(u32, f64)]) -> BTreeMap<NaiveDate, f64> {
        points.iter().map(|&(d, v)| (day(d), v)).collect()
    }

    #[test]
    fn test_pearson_perfect_positive() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let y = [2.0, 4.0, 6.0, 8.0, 10.0];
        let r = pearson(&x, &y).unwrap();
        assert!((r - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_pearson_perfect_negative() {
        let x = [1.0, 2.0, 3.0, 4.0];
        let y = [8.0, 6.0, 4.0, 2.0];
        let r = pearson(&x, &y).unwrap();
        assert!((r + 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_pearson_is_symmetric() {
        let x = [3.0, 7.0, 5.0, 9.0, 4.0];
        let y = [110.0, 95.0, 120.0, 90.0, 130.0];
        assert_eq!(pearson(&x, &y), pearson(&y, &x));
    }

    #[test]
    fn test_pearson_self_correlation_is_one() {
        let x = [3.0, 7.0, 5.0, 9.0];
        let r = pearson(&x, &x).unwrap();
        assert!((r - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_pearson_constant_series_is_undefined() {
        let x = [5.0, 5.0, 5.0];
        let y = [1.0, 2.0, 3.0];
        assert_eq!(pearson(&x, &y), None);
        assert_eq!(pearson(&y, &x), None);
    }

    #[test]
    fn test_strength_labels() {
        assert_eq!(strength_label(0.85), "strong");
        assert_eq!(strength_label(-0.7), "strong");
        assert_eq!(strength_label(0.5), "moderate");
        assert_eq!(strength_label(-0.4), "moderate");
        assert_eq!(strength_label(0.25), "weak");
        assert_eq!(strength_label(0.1), "very weak or none");
    }

    #[test]
    fn test_two_overlapping_days_is_insufficient() {
        let a = daily(&[(10, 30.0), (11, 45.0), (12, 60.0)]);
        let b = daily(&[(11, 120.0), (12, 115.0), (13, 100.0)]);

        // Only days 11 and 12 are shared
        assert_eq!(
            correlate_daily(&a, &b),
            PairCorrelation::InsufficientOverlappingData {
                overlapping_days: 2,
                required: 3
            }
        );
    }

    #[test]
    fn test_inner_join_on_dates() {
        let a = daily(&[(10, 1.0), (11, 2.0), (12, 3.0), (13, 4.0), (20, 99.0)]);
        let b = daily(&[(10, 2.0), (11, 4.0), (12, 6.0), (13, 8.0), (25, -1.0)]);

        match correlate_daily(&a, &b) {
            PairCorrelation::Computed {
                coefficient,
                strength,
                direction,
                overlapping_days,
            } => {
                assert_eq!(coefficient, 1.0);
                assert_eq!(strength, "strong");
                assert_eq!(direction, "positive");
                assert_eq!(overlapping_days, 4);
            }
            other => panic!("expected computed correlation, got {other:?}"),
        }
    }

    #[test]
    fn test_constant_series_yields_null_coefficient() {
        let a = daily(&[(10, 420.0), (11, 420.0), (12, 420.0)]);
        let b = daily(&[(10, 100.0), (11, 120.0), (12, 140.0)]);

        let result = correlate_daily(&a, &b);
        assert_eq!(
            result,
            PairCorrelation::Undefined {
                overlapping_days: 3,
                coefficient: None
            }
        );

        let json = serde_json::to_value(&result).unwrap();
        assert!(json["coefficient"].is_null());
    }

    #[test]
    fn test_negative_direction() {
        let a = daily(&[(10, 60.0), (11, 30.0), (12, 0.0), (13, 45.0)]);
        let b = daily(&[(10, 100.0), (11, 130.0), (12, 160.0), (13, 115.0)]);

        match correlate_daily(&a, &b) {
            PairCorrelation::Computed { direction, coefficient, .. } => {
                assert_eq!(direction, "negative");
                assert!(coefficient < 0.0);
            }
            other => panic!("expected computed correlation, got {other:?}"),
        }
    }
}
