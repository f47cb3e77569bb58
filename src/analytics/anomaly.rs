//! Glucose anomaly and hypoglycemia detection
//!
//! Z-score outlier flagging over a reading window, and a dedicated
//! hypoglycemic-event detector with trend-before and recovery-after
//! analysis. Undersized windows report an explicit insufficient-data
//! result instead of a degenerate statistic.

use crate::analytics::aggregate::{mean, population_std_dev, round1};
use crate::store::queries::StoredGlucose;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Default z-score multiple for outlier bounds
pub const DEFAULT_THRESHOLD_FACTOR: f64 = 2.5;
/// Default hypoglycemia threshold
pub const DEFAULT_HYPO_THRESHOLD_MG_DL: f64 = 70.0;
/// Outlier detection needs this many readings to be meaningful
pub const MIN_READINGS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    AboveRange,
    BelowRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Moderate,
    Severe,
}

/// One reading outside the z-score bounds
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Anomaly {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    pub direction: Direction,
    pub severity: Severity,
    /// Normalized deviation (value - mean) / std_dev
    pub deviation_factor: f64,
}

/// Outlier detection result
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutlierReport {
    InsufficientData {
        readings: usize,
        required: usize,
    },
    Evaluated {
        readings: usize,
        mean: f64,
        std_dev: f64,
        threshold_factor: f64,
        upper_bound: f64,
        lower_bound: f64,
        anomalies: Vec<Anomaly>,
    },
}

/// Flag every reading beyond mean +/- k * std_dev
///
/// Severity is severe past 3 standard deviations in the same direction.
pub fn detect_outliers(samples: &[StoredGlucose], threshold_factor: f64) -> OutlierReport {
    if samples.len() < MIN_READINGS {
        return OutlierReport::InsufficientData {
            readings: samples.len(),
            required: MIN_READINGS,
        };
    }

    let values: Vec<f64> = samples.iter().map(|s| s.glucose_mg_dl).collect();
    let mu = mean(&values);
    let sigma = population_std_dev(&values);
    let upper = mu + threshold_factor * sigma;
    let lower = mu - threshold_factor * sigma;

    let mut anomalies = Vec::new();
    // sigma == 0 means every value equals the mean; no reading can sit
    // beyond the bounds and the loop below never divides by it.
    for sample in samples {
        let value = sample.glucose_mg_dl;
        let direction = if value > upper {
            Direction::AboveRange
        } else if value < lower {
            Direction::BelowRange
        } else {
            continue;
        };

        let deviation = (value - mu).abs();
        anomalies.push(Anomaly {
            timestamp: sample.timestamp,
            value,
            direction,
            severity: if deviation > 3.0 * sigma {
                Severity::Severe
            } else {
                Severity::Moderate
            },
            deviation_factor: ((value - mu) / sigma * 100.0).round() / 100.0,
        });
    }

    OutlierReport::Evaluated {
        readings: samples.len(),
        mean: round1(mu),
        std_dev: round1(sigma),
        threshold_factor,
        upper_bound: round1(upper),
        lower_bound: round1(lower),
        anomalies,
    }
}

/// Immediate glucose trend leading into a hypo reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    FallingRapidly,
    Falling,
    Rising,
    Stable,
    /// Fewer than 2 readings precede the event
    Unknown,
}

/// First reading at or above threshold after the hypo event
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recovery {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    /// Minutes elapsed between the hypo reading and recovery
    pub duration_minutes: i64,
}

/// Hypoglycemic event analysis
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum HypoReport {
    /// No reading fell below the threshold in the window
    NoEventFound {
        threshold_mg_dl: f64,
        readings_checked: usize,
    },
    EventFound {
        timestamp: DateTime<Utc>,
        value: f64,
        threshold_mg_dl: f64,
        trend_before: Trend,
        /// Absent when glucose never came back up within the window
        recovery: Option<Recovery>,
    },
}

/// Find the most recent reading below `threshold` and analyze it
///
/// `samples` must be in chronological order (the analysis dataset
/// guarantees this). Recovery is the first subsequent reading at or
/// above the threshold; the trend classifies the last consecutive
/// difference over up to 3 prior readings.
pub fn find_last_hypo_event(samples: &[StoredGlucose], threshold: f64) -> HypoReport {
    let hypo_idx = samples
        .iter()
        .rposition(|s| s.glucose_mg_dl < threshold);

    let idx = match hypo_idx {
        Some(idx) => idx,
        None => {
            return HypoReport::NoEventFound {
                threshold_mg_dl: threshold,
                readings_checked: samples.len(),
            };
        }
    };
    let event = &samples[idx];

    let recovery = samples[idx + 1..]
        .iter()
        .find(|s| s.glucose_mg_dl >= threshold)
        .map(|s| Recovery {
            timestamp: s.timestamp,
            value: s.glucose_mg_dl,
            duration_minutes: (s.timestamp - event.timestamp).num_minutes(),
        });

    HypoReport::EventFound {
        timestamp: event.timestamp,
        value: event.glucose_mg_dl,
        threshold_mg_dl: threshold,
        trend_before: trend_before(&samples[..idx]),
        recovery,
    }
}

/// Classify the trend over the up-to-3 readings before the event
fn trend_before(prior: &[StoredGlucose]) -> Trend {
    let tail_start = prior.len().saturating_sub(3);
    let tail = &prior[tail_start..];
    if tail.len() < 2 {
        return Trend::Unknown;
    }

    let last = tail[tail.len() - 1].glucose_mg_dl;
    let prev = tail[tail.len() - 2].glucose_mg_dl;
    let delta = last - prev;

    if delta < -10.0 {
        Trend::FallingRapidly
    } else if delta < -5.0 {
        Trend::Falling
    } else if delta > 5.0 {
        Trend::Rising
    } else {
        Trend::Stable
    }
}
