//! Core sample types for the glucolog store
//!
//! This module defines the three persisted entity types:
//! - `GlucoseSample`: one glucose reading at an instant
//! - `SleepSession`: one sleep period with bedtime and wake time
//! - `ExerciseSession`: one workout/activity session
//!
//! Each is an immutable fact once written: the store only ever
//! inserts-or-ignores, never updates.

use chrono::{DateTime, Datelike, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// Default glucose unit when the exporter omits one
pub const DEFAULT_GLUCOSE_UNIT: &str = "mg/dL";

/// A single glucose reading
///
/// Natural key: (timestamp) - at most one reading per instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlucoseSample {
    /// Instant the reading was taken
    pub timestamp: DateTime<Utc>,
    /// Glucose concentration in mg/dL, always > 0
    pub glucose_mg_dl: f64,
    /// Unit label, defaults to mg/dL
    pub unit: String,
    /// Originating device/app label
    #[serde(default)]
    pub source: Option<String>,
}

impl GlucoseSample {
    pub fn new(timestamp: DateTime<Utc>, glucose_mg_dl: f64) -> Self {
        Self {
            timestamp,
            glucose_mg_dl,
            unit: DEFAULT_GLUCOSE_UNIT.to_string(),
            source: None,
        }
    }

    /// Builder: set the source label
    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Builder: set the unit label
    pub fn unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    /// Calendar date of the reading (UTC)
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }

    /// Hour-of-day 0-23 (UTC)
    pub fn hour(&self) -> u32 {
        self.timestamp.hour()
    }
}

/// Min/avg/max heart rate observed during a session
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeartRateStats {
    pub min_bpm: f64,
    pub avg_bpm: f64,
    pub max_bpm: f64,
}

/// One sleep period
///
/// Natural key: (bedtime). The calendar date and duration are derived
/// from bedtime and wake time, never stored independently of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SleepSession {
    /// When the session began
    pub bedtime: DateTime<Utc>,
    /// When the session ended, always >= bedtime
    pub wake_time: DateTime<Utc>,
    /// Minutes of deep sleep, when the exporter breaks stages out
    #[serde(default)]
    pub deep_minutes: Option<f64>,
    /// Minutes of light/core sleep
    #[serde(default)]
    pub light_minutes: Option<f64>,
    /// Minutes of REM sleep
    #[serde(default)]
    pub rem_minutes: Option<f64>,
    /// Sleep efficiency percentage (time asleep / time in bed)
    #[serde(default)]
    pub efficiency_pct: Option<f64>,
    /// Heart rate observed during the session
    #[serde(default)]
    pub heart_rate: Option<HeartRateStats>,
    #[serde(default)]
    pub source: Option<String>,
}

impl SleepSession {
    pub fn new(bedtime: DateTime<Utc>, wake_time: DateTime<Utc>) -> Self {
        Self {
            bedtime,
            wake_time,
            deep_minutes: None,
            light_minutes: None,
            rem_minutes: None,
            efficiency_pct: None,
            heart_rate: None,
            source: None,
        }
    }

    /// Derived duration: wake_time - bedtime, in minutes
    pub fn duration_minutes(&self) -> f64 {
        (self.wake_time - self.bedtime).num_seconds() as f64 / 60.0
    }

    /// Calendar date the session belongs to (the bedtime's date, UTC)
    pub fn date(&self) -> NaiveDate {
        self.bedtime.date_naive()
    }

    /// The session is well-formed iff it does not end before it starts
    pub fn is_valid(&self) -> bool {
        self.wake_time >= self.bedtime
    }
}

/// One exercise/workout session
///
/// Natural key: (activity_type, timestamp).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseSession {
    /// When the session started
    pub timestamp: DateTime<Utc>,
    /// Activity label from the exporter (e.g. "running", "cycling")
    pub activity_type: String,
    pub duration_minutes: f64,
    #[serde(default)]
    pub distance: Option<f64>,
    #[serde(default)]
    pub energy_kcal: Option<f64>,
    #[serde(default)]
    pub heart_rate: Option<HeartRateStats>,
    #[serde(default)]
    pub source: Option<String>,
}

impl ExerciseSession {
    pub fn new(
        timestamp: DateTime<Utc>,
        activity_type: impl Into<String>,
        duration_minutes: f64,
    ) -> Self {
        Self {
            timestamp,
            activity_type: activity_type.into(),
            duration_minutes,
            distance: None,
            energy_kcal: None,
            heart_rate: None,
            source: None,
        }
    }

    /// Calendar date of the session (UTC)
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }

    /// Hour-of-day 0-23 (UTC)
    pub fn hour(&self) -> u32 {
        self.timestamp.hour()
    }
}

/// Full weekday name for day-of-week grouping keys
pub fn weekday_name(date: NaiveDate) -> &'static str {
    match date.weekday() {
        chrono::Weekday::Mon => "Monday",
        chrono::Weekday::Tue => "Tuesday",
        chrono::Weekday::Wed => "Wednesday",
        chrono::Weekday::Thu => "Thursday",
        chrono::Weekday::Fri => "Friday",
        chrono::Weekday::Sat => "Saturday",
        chrono::Weekday::Sun => "Sunday",
    }
}
