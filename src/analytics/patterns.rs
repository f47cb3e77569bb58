//! Temporal pattern discovery
//!
//! Hourly/weekly summaries per stream, high/low reading hours,
//! time-in-range bucketing, and dawn-phenomenon detection.

use crate::analytics::aggregate::{
    mean, round1, stats_by_hour, stats_by_weekday, GroupStats,
};
use crate::store::queries::{StoredExercise, StoredGlucose, StoredSleep};
use chrono::Timelike;
use serde::Serialize;
use std::collections::BTreeMap;

/// Upper bound of the clinical target range
pub const HIGH_GLUCOSE_MG_DL: f64 = 180.0;
/// Lower bound of the clinical target range
pub const LOW_GLUCOSE_MG_DL: f64 = 70.0;
/// Late-morning mean must exceed early-morning mean by this much
pub const DAWN_RISE_THRESHOLD_MG_DL: f64 = 15.0;

const DAWN_EARLY_HOURS: [u32; 3] = [4, 5, 6];
const DAWN_LATE_HOURS: [u32; 3] = [6, 7, 8];
const DAWN_MIN_REPRESENTED_HOURS: usize = 3;
const TOP_HOURS: usize = 5;

/// How often readings beyond a bound landed in one hour-of-day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HourCount {
    pub hour: u32,
    pub count: usize,
}

/// Glucose pattern summary over a window
#[derive(Debug, Clone, Serialize)]
pub struct GlucosePatterns {
    pub total_readings: usize,
    /// Per-hour-of-day statistics, empty hours omitted
    pub hourly: BTreeMap<u32, GroupStats>,
    pub by_weekday: BTreeMap<String, GroupStats>,
    /// Top-5 hours by count of readings above 180 mg/dL
    pub high_hours: Vec<HourCount>,
    /// Top-5 hours by count of readings below 70 mg/dL
    pub low_hours: Vec<HourCount>,
    /// Per-hour percentage of readings inside [70, 180]
    pub time_in_range_by_hour: BTreeMap<u32, f64>,
    pub dawn_phenomenon: DawnPhenomenon,
}

/// Early-morning vs late-morning glucose rise
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DawnPhenomenon {
    /// Fewer than 3 of hours 4-8 are represented in the window
    InsufficientData { hours_represented: usize },
    Evaluated {
        early_morning_mean: f64,
        late_morning_mean: f64,
        /// late mean minus early mean, reported whether or not flagged
        rise_mg_dl: f64,
        detected: bool,
    },
}

/// Compute the glucose pattern summary
pub fn glucose_patterns(samples: &[StoredGlucose]) -> GlucosePatterns {
    let timed = || samples.iter().map(|s| (s.timestamp, s.glucose_mg_dl));
    let dated = || samples.iter().map(|s| (s.date, s.glucose_mg_dl));

    GlucosePatterns {
        total_readings: samples.len(),
        hourly: stats_by_hour(timed()),
        by_weekday: stats_by_weekday(dated()),
        high_hours: top_hours(samples, |v| v > HIGH_GLUCOSE_MG_DL),
        low_hours: top_hours(samples, |v| v < LOW_GLUCOSE_MG_DL),
        time_in_range_by_hour: in_range_by_hour(samples),
        dawn_phenomenon: dawn_phenomenon(samples),
    }
}

/// Top hours-of-day by how many readings satisfy the predicate
fn top_hours(samples: &[StoredGlucose], beyond: impl Fn(f64) -> bool) -> Vec<HourCount> {
    let mut counts: BTreeMap<u32, usize> = BTreeMap::new();
    for sample in samples.iter().filter(|s| beyond(s.glucose_mg_dl)) {
        *counts.entry(sample.timestamp.hour()).or_default() += 1;
    }

    let mut hours: Vec<HourCount> = counts
        .into_iter()
        .map(|(hour, count)| HourCount { hour, count })
        .collect();
    // Most frequent first; ties resolve to the earlier hour
    hours.sort_by(|a, b| b.count.cmp(&a.count).then(a.hour.cmp(&b.hour)));
    hours.truncate(TOP_HOURS);
    hours
}

/// Percentage of each hour's readings inside the target range
fn in_range_by_hour(samples: &[StoredGlucose]) -> BTreeMap<u32, f64> {
    let mut totals: BTreeMap<u32, (usize, usize)> = BTreeMap::new();
    for sample in samples {
        let entry = totals.entry(sample.timestamp.hour()).or_default();
        entry.0 += 1;
        if (LOW_GLUCOSE_MG_DL..=HIGH_GLUCOSE_MG_DL).contains(&sample.glucose_mg_dl) {
            entry.1 += 1;
        }
    }

    totals
        .into_iter()
        .map(|(hour, (total, in_range))| {
            (hour, round1(in_range as f64 / total as f64 * 100.0))
        })
        .collect()
}

/// Compare hours {4,5,6} against {6,7,8}
pub fn dawn_phenomenon(samples: &[StoredGlucose]) -> DawnPhenomenon {
    let in_hours = |hours: &[u32]| -> Vec<f64> {
        samples
            .iter()
            .filter(|s| hours.contains(&s.timestamp.hour()))
            .map(|s| s.glucose_mg_dl)
            .collect()
    };

    let represented: std::collections::BTreeSet<u32> = samples
        .iter()
        .map(|s| s.timestamp.hour())
        .filter(|h| (4..=8).contains(h))
        .collect();

    if represented.len() < DAWN_MIN_REPRESENTED_HOURS {
        return DawnPhenomenon::InsufficientData {
            hours_represented: represented.len(),
        };
    }

    let early = in_hours(&DAWN_EARLY_HOURS);
    let late = in_hours(&DAWN_LATE_HOURS);
    if early.is_empty() || late.is_empty() {
        return DawnPhenomenon::InsufficientData {
            hours_represented: represented.len(),
        };
    }

    let early_mean = mean(&early);
    let late_mean = mean(&late);
    let rise = late_mean - early_mean;

    DawnPhenomenon::Evaluated {
        early_morning_mean: round1(early_mean),
        late_morning_mean: round1(late_mean),
        rise_mg_dl: round1(rise),
        detected: rise > DAWN_RISE_THRESHOLD_MG_DL,
    }
}

/// Mean/min/max triple for duration-like series
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SummarySpread {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

impl SummarySpread {
    fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        Some(Self {
            mean: round1(mean(values)),
            min: round1(values.iter().cloned().fold(f64::INFINITY, f64::min)),
            max: round1(values.iter().cloned().fold(f64::NEG_INFINITY, f64::max)),
        })
    }
}

/// Sleep pattern summary over a window
#[derive(Debug, Clone, Serialize)]
pub struct SleepPatterns {
    pub total_sessions: usize,
    pub duration_minutes: SummarySpread,
    /// Omitted when the exporter never reported efficiency
    pub efficiency_pct: Option<SummarySpread>,
    /// Mode of the bedtime hour-of-day histogram
    pub most_frequent_bedtime_hour: Option<u32>,
    pub most_frequent_wake_hour: Option<u32>,
    /// Mean duration per weekday
    pub weekday_duration_minutes: BTreeMap<String, f64>,
}

/// Compute the sleep pattern summary; `None` when the window has no sessions
pub fn sleep_patterns(sessions: &[StoredSleep]) -> Option<SleepPatterns> {
    if sessions.is_empty() {
        return None;
    }

    let durations: Vec<f64> = sessions.iter().map(|s| s.duration_minutes).collect();
    let efficiencies: Vec<f64> = sessions.iter().filter_map(|s| s.efficiency_pct).collect();

    let weekday_duration_minutes = stats_by_weekday(
        sessions
            .iter()
            .map(|s| (s.date, s.duration_minutes)),
    )
    .into_iter()
    .map(|(day, stats)| (day, stats.mean))
    .collect();

    Some(SleepPatterns {
        total_sessions: sessions.len(),
        duration_minutes: SummarySpread::from_values(&durations)?,
        efficiency_pct: SummarySpread::from_values(&efficiencies),
        most_frequent_bedtime_hour: hour_mode(sessions.iter().map(|s| s.bedtime.hour())),
        most_frequent_wake_hour: hour_mode(sessions.iter().map(|s| s.wake_time.hour())),
        weekday_duration_minutes,
    })
}

/// Exercise pattern summary over a window
#[derive(Debug, Clone, Serialize)]
pub struct ExercisePatterns {
    pub total_sessions: usize,
    pub most_frequent_hour: Option<u32>,
    pub mean_duration_minutes: f64,
    pub total_duration_minutes: f64,
    /// total_sessions / (distinct active days / 7), never divides by zero
    pub sessions_per_week: f64,
}

/// Compute the exercise pattern summary; `None` when the window has no sessions
pub fn exercise_patterns(sessions: &[StoredExercise]) -> Option<ExercisePatterns> {
    if sessions.is_empty() {
        return None;
    }

    let durations: Vec<f64> = sessions.iter().map(|s| s.duration_minutes).collect();
    let active_days: std::collections::BTreeSet<_> =
        sessions.iter().map(|s| s.date).collect();
    let active_days = active_days.len().max(1);

    Some(ExercisePatterns {
        total_sessions: sessions.len(),
        most_frequent_hour: hour_mode(sessions.iter().map(|s| s.timestamp.hour())),
        mean_duration_minutes: round1(mean(&durations)),
        total_duration_minutes: round1(durations.iter().sum()),
        sessions_per_week: round1(sessions.len() as f64 / (active_days as f64 / 7.0)),
    })
}

/// Mode of an hour-of-day histogram; ties resolve to the earlier hour
fn hour_mode(hours: impl Iterator<Item = u32>) -> Option<u32> {
    let mut counts: BTreeMap<u32, usize> = BTreeMap::new();
    for hour in hours {
        *counts.entry(hour).or_default() += 1;
    }
    counts
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0)))
        .map(|(hour, _)| hour)
}

/// Percentage of readings in each clinical glucose band
///
/// Bands: <54, [54,70), [70,180], (180,250], >250. Percentages are
/// formatted strings and sum to 100% of non-missing readings; an empty
/// series reports every band at 0%.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeInRange {
    pub total_readings: usize,
    pub urgent_low: String,
    pub low: String,
    pub in_range: String,
    pub high: String,
    pub very_high: String,
}

pub fn time_in_range(values: &[f64]) -> TimeInRange {
    let mut bands = [0usize; 5];
    for &value in values {
        let idx = if value < 54.0 {
            0
        } else if value < 70.0 {
            1
        } else if value <= 180.0 {
            2
        } else if value <= 250.0 {
            3
        } else {
            4
        };
        bands[idx] += 1;
    }

    let pct = |count: usize| -> String {
        if values.is_empty() {
            "0.0%".to_string()
        } else {
            format!("{:.1}%", count as f64 / values.len() as f64 * 100.0)
        }
    };

    TimeInRange {
        total_readings: values.len(),
        urgent_low: pct(bands[0]),
        low: pct(bands[1]),
        in_range: pct(bands[2]),
        high: pct(bands[3]),
        very_high: pct(bands[4]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn glucose_at(day: u32, hour: u32, minute: u32, value: f64) -> StoredGlucose {
        let timestamp = Utc.with_ymd_and_hms(2025, 3, day, hour, minute, 0).unwrap();
        StoredGlucose {
            id: 0,
            timestamp,
            date: timestamp.date_naive(),
            glucose_mg_dl: value,
            unit: "mg/dL".to_string(),
            source: None,
            created_at: String::new(),
        }
    }

    fn sleep_at(bed: DateTime<Utc>, hours: i64, efficiency: Option<f64>) -> StoredSleep {
        let wake = bed + chrono::Duration::hours(hours);
        StoredSleep {
            id: 0,
            date: bed.date_naive(),
            bedtime: bed,
            wake_time: wake,
            duration_minutes: (hours * 60) as f64,
            deep_minutes: None,
            light_minutes: None,
            rem_minutes: None,
            efficiency_pct: efficiency,
            hr_min: None,
            hr_avg: None,
            hr_max: None,
            source: None,
            created_at: String::new(),
        }
    }

    fn exercise_at(day: u32, hour: u32, minutes: f64) -> StoredExercise {
        let timestamp = Utc.with_ymd_and_hms(2025, 3, day, hour, 0, 0).unwrap();
        StoredExercise {
            id: 0,
            timestamp,
            date: timestamp.date_naive(),
            activity_type: "running".to_string(),
            duration_minutes: minutes,
            distance: None,
            energy_kcal: None,
            hr_min: None,
            hr_avg: None,
            hr_max: None,
            source: None,
            created_at: String::new(),
        }
    }

    #[test]
    fn test_high_and_low_hours() {
        let samples = vec![
            glucose_at(10, 14, 0, 210.0),
            glucose_at(11, 14, 0, 195.0),
            glucose_at(12, 9, 0, 190.0),
            glucose_at(12, 3, 0, 62.0),
            glucose_at(13, 10, 0, 120.0),
        ];

        let patterns = glucose_patterns(&samples);
        assert_eq!(
            patterns.high_hours,
            vec![
                HourCount { hour: 14, count: 2 },
                HourCount { hour: 9, count: 1 }
            ]
        );
        assert_eq!(patterns.low_hours, vec![HourCount { hour: 3, count: 1 }]);
    }

    #[test]
    fn test_in_range_percentage_by_hour() {
        let samples = vec![
            glucose_at(10, 8, 0, 120.0),
            glucose_at(10, 8, 15, 200.0),
            glucose_at(11, 8, 0, 130.0),
            glucose_at(11, 8, 30, 150.0),
        ];

        let patterns = glucose_patterns(&samples);
        assert_eq!(patterns.time_in_range_by_hour[&8], 75.0);
    }

    #[test]
    fn test_dawn_phenomenon_detected() {
        // Early hours around 100, late hours around 120: rise of 20
        let samples = vec![
            glucose_at(10, 4, 0, 98.0),
            glucose_at(10, 5, 0, 102.0),
            glucose_at(10, 7, 0, 118.0),
            glucose_at(10, 8, 0, 122.0),
        ];

        match dawn_phenomenon(&samples) {
            DawnPhenomenon::Evaluated {
                early_morning_mean,
                late_morning_mean,
                rise_mg_dl,
                detected,
            } => {
                assert_eq!(early_morning_mean, 100.0);
                assert_eq!(late_morning_mean, 120.0);
                assert_eq!(rise_mg_dl, 20.0);
                assert!(detected);
            }
            other => panic!("expected evaluation, got {other:?}"),
        }
    }

    #[test]
    fn test_dawn_phenomenon_rise_reported_when_not_flagged() {
        let samples = vec![
            glucose_at(10, 4, 0, 100.0),
            glucose_at(10, 6, 0, 104.0),
            glucose_at(10, 8, 0, 108.0),
        ];

        match dawn_phenomenon(&samples) {
            DawnPhenomenon::Evaluated { rise_mg_dl, detected, .. } => {
                // rise = mean(104,108) - mean(100,104) = 4
                assert_eq!(rise_mg_dl, 4.0);
                assert!(!detected);
            }
            other => panic!("expected evaluation, got {other:?}"),
        }
    }

    #[test]
    fn test_dawn_phenomenon_needs_three_hours() {
        let samples = vec![glucose_at(10, 4, 0, 100.0), glucose_at(10, 7, 0, 130.0)];
        assert_eq!(
            dawn_phenomenon(&samples),
            DawnPhenomenon::InsufficientData {
                hours_represented: 2
            }
        );
    }

    #[test]
    fn test_sleep_patterns() {
        let sessions = vec![
            sleep_at(Utc.with_ymd_and_hms(2025, 3, 10, 23, 0, 0).unwrap(), 8, Some(90.0)),
            sleep_at(Utc.with_ymd_and_hms(2025, 3, 11, 23, 0, 0).unwrap(), 7, Some(88.0)),
            sleep_at(Utc.with_ymd_and_hms(2025, 3, 13, 0, 30, 0).unwrap(), 6, None),
        ];

        let patterns = sleep_patterns(&sessions).unwrap();
        assert_eq!(patterns.total_sessions, 3);
        assert_eq!(patterns.duration_minutes.mean, 420.0);
        assert_eq!(patterns.duration_minutes.min, 360.0);
        assert_eq!(patterns.duration_minutes.max, 480.0);
        assert_eq!(patterns.most_frequent_bedtime_hour, Some(23));
        assert_eq!(patterns.efficiency_pct.unwrap().mean, 89.0);
        // 2025-03-10 is a Monday
        assert_eq!(patterns.weekday_duration_minutes["Monday"], 480.0);
    }

    #[test]
    fn test_sleep_patterns_empty() {
        assert!(sleep_patterns(&[]).is_none());
    }

    #[test]
    fn test_exercise_sessions_per_week() {
        // 4 sessions over 2 distinct days: 4 / (2/7) = 14 per week
        let sessions = vec![
            exercise_at(10, 7, 30.0),
            exercise_at(10, 18, 20.0),
            exercise_at(12, 7, 40.0),
            exercise_at(12, 19, 30.0),
        ];

        let patterns = exercise_patterns(&sessions).unwrap();
        assert_eq!(patterns.sessions_per_week, 14.0);
        assert_eq!(patterns.most_frequent_hour, Some(7));
        assert_eq!(patterns.total_duration_minutes, 120.0);
        assert_eq!(patterns.mean_duration_minutes, 30.0);
    }

    #[test]
    fn test_exercise_single_day_guard() {
        let sessions = vec![exercise_at(10, 7, 30.0)];
        let patterns = exercise_patterns(&sessions).unwrap();
        // 1 session / (1 day / 7) = 7 per week, no division blowup
        assert_eq!(patterns.sessions_per_week, 7.0);
    }

    #[test]
    fn test_time_in_range_buckets() {
        let values = [50.0, 60.0, 100.0, 180.0, 200.0, 260.0];
        let tir = time_in_range(&values);
        assert_eq!(tir.urgent_low, "16.7%");
        assert_eq!(tir.low, "16.7%");
        assert_eq!(tir.in_range, "33.3%");
        assert_eq!(tir.high, "16.7%");
        assert_eq!(tir.very_high, "16.7%");
        assert_eq!(tir.total_readings, 6);
    }

    #[test]
    fn test_time_in_range_boundaries() {
        // 54 is low (not urgent), 70 and 180 are in range, 250 is high
        let tir = time_in_range(&[54.0, 70.0, 180.0, 250.0]);
        assert_eq!(tir.urgent_low, "0.0%");
        assert_eq!(tir.low, "25.0%");
        assert_eq!(tir.in_range, "50.0%");
        assert_eq!(tir.high, "25.0%");
        assert_eq!(tir.very_high, "0.0%");
    }

    #[test]
    fn test_time_in_range_empty() {
        let tir = time_in_range(&[]);
        assert_eq!(tir.total_readings, 0);
        assert_eq!(tir.in_range, "0.0%");
        assert_eq!(tir.very_high, "0.0%");
    }

    #[test]
    fn test_time_in_range_sums_to_100() {
        let values = [40.0, 65.0, 100.0, 120.0, 190.0, 300.0, 85.0];
        let tir = time_in_range(&values);
        let sum: f64 = [
            &tir.urgent_low,
            &tir.low,
            &tir.in_range,
            &tir.high,
            &tir.very_high,
        ]
        .iter()
        .map(|s| s.trim_end_matches('%').parse::<f64>().unwrap())
        .sum();
        assert!((sum - 100.0).abs() < 0.5);
    }
}
