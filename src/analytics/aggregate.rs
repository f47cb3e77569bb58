//! Grouped statistics over sample sets
//!
//! Pure functions shared by the pattern, anomaly, and correlation
//! analyses: a value series is bucketed by a grouping key (hour-of-day,
//! weekday, calendar date) and each non-empty group is summarized.
//! Values are rounded to one decimal place for presentation; groups
//! with no samples are omitted, never emitted as zeros.

use chrono::{DateTime, NaiveDate, Timelike, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::store::samples::weekday_name;

/// Round to one decimal place (presentation precision)
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Arithmetic mean; 0.0 for an empty slice (callers gate on emptiness)
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation; 0.0 with fewer than 2 points
pub fn population_std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mu = mean(values);
    let variance =
        values.iter().map(|v| (v - mu) * (v - mu)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Summary of one group of values
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GroupStats {
    pub mean: f64,
    pub std_dev: f64,
    pub count: usize,
    pub min: f64,
    pub max: f64,
}

impl GroupStats {
    /// Summarize a non-empty group; `None` for an empty one
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }

        let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

        Some(Self {
            mean: round1(mean(values)),
            std_dev: round1(population_std_dev(values)),
            count: values.len(),
            min: round1(min),
            max: round1(max),
        })
    }
}

/// Bucket (key, value) pairs and summarize each non-empty bucket
pub fn grouped_stats<K, I>(pairs: I) -> BTreeMap<K, GroupStats>
where
    K: Ord,
    I: IntoIterator<Item = (K, f64)>,
{
    let mut groups: BTreeMap<K, Vec<f64>> = BTreeMap::new();
    for (key, value) in pairs {
        groups.entry(key).or_default().push(value);
    }

    groups
        .into_iter()
        .filter_map(|(key, values)| GroupStats::from_values(&values).map(|s| (key, s)))
        .collect()
}

/// Group by hour-of-day 0-23
pub fn stats_by_hour<I>(pairs: I) -> BTreeMap<u32, GroupStats>
where
    I: IntoIterator<Item = (DateTime<Utc>, f64)>,
{
    grouped_stats(pairs.into_iter().map(|(ts, v)| (ts.hour(), v)))
}

/// Group by weekday name
pub fn stats_by_weekday<I>(pairs: I) -> BTreeMap<String, GroupStats>
where
    I: IntoIterator<Item = (NaiveDate, f64)>,
{
    grouped_stats(
        pairs
            .into_iter()
            .map(|(date, v)| (weekday_name(date).to_string(), v)),
    )
}

/// Group by calendar date
pub fn stats_by_date<I>(pairs: I) -> BTreeMap<NaiveDate, GroupStats>
where
    I: IntoIterator<Item = (NaiveDate, f64)>,
{
    grouped_stats(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_mean_and_std() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_eq!(mean(&values), 5.0);
        // Classic population-deviation example
        assert!((population_std_dev(&values) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_spread_is_zero() {
        assert_eq!(population_std_dev(&[]), 0.0);
        assert_eq!(population_std_dev(&[42.0]), 0.0);
    }

    #[test]
    fn test_group_stats_rounding() {
        let stats = GroupStats::from_values(&[1.0, 2.0]).unwrap();
        assert_eq!(stats.mean, 1.5);
        assert_eq!(stats.std_dev, 0.5);
        assert_eq!(stats.count, 2);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 2.0);

        assert!(GroupStats::from_values(&[]).is_none());
    }

    #[test]
    fn test_empty_groups_are_omitted() {
        let hourly = stats_by_hour([
            (Utc.with_ymd_and_hms(2025, 3, 14, 8, 0, 0).unwrap(), 100.0),
            (Utc.with_ymd_and_hms(2025, 3, 14, 8, 30, 0).unwrap(), 110.0),
            (Utc.with_ymd_and_hms(2025, 3, 14, 14, 0, 0).unwrap(), 140.0),
        ]);

        assert_eq!(hourly.len(), 2);
        assert_eq!(hourly[&8].count, 2);
        assert_eq!(hourly[&8].mean, 105.0);
        assert_eq!(hourly[&14].count, 1);
        assert!(!hourly.contains_key(&9));
    }

    #[test]
    fn test_stats_by_weekday() {
        let fri = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
        let sat = NaiveDate::from_ymd_opt(2025, 3, 15).unwrap();
        let by_day = stats_by_weekday([(fri, 100.0), (fri, 120.0), (sat, 90.0)]);

        assert_eq!(by_day["Friday"].mean, 110.0);
        assert_eq!(by_day["Saturday"].count, 1);
        assert!(!by_day.contains_key("Sunday"));
    }
}
