//! Sample classification and routing
//!
//! One raw export item becomes a typed candidate for exactly one of the
//! three streams, or is rejected with a reason. The exporter has no
//! fixed schema, so field names are resolved through ordered candidate
//! tables (first match wins) rather than scattered conditionals; the
//! tables double as the unit-test surface for the routing rules.

use crate::ingest::timestamp::{self, TimestampError};
use crate::store::samples::{ExerciseSession, GlucoseSample, HeartRateStats, SleepSession};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::fmt;

// Field-name priority tables, highest priority first.
pub const VALUE_FIELDS: &[&str] = &["qty", "value", "amount"];
pub const NAME_FIELDS: &[&str] = &["name", "type", "metric"];
pub const UNIT_FIELDS: &[&str] = &["units", "unit"];
pub const DATE_FIELDS: &[&str] = &["date", "timestamp", "startDate"];
pub const SOURCE_FIELDS: &[&str] = &["source", "sourceName"];
pub const START_FIELDS: &[&str] = &["startDate", "start"];
pub const END_FIELDS: &[&str] = &["endDate", "end"];
pub const ACTIVITY_FIELDS: &[&str] = &["workoutActivityType", "activityType"];
pub const DURATION_FIELDS: &[&str] = &["duration"];
pub const DISTANCE_FIELDS: &[&str] = &["totalDistance", "distance"];
pub const ENERGY_FIELDS: &[&str] = &["totalEnergyBurned", "energy", "calories"];
pub const DEEP_FIELDS: &[&str] = &["deep", "deepSleep"];
pub const LIGHT_FIELDS: &[&str] = &["core", "light"];
pub const REM_FIELDS: &[&str] = &["rem"];
pub const EFFICIENCY_FIELDS: &[&str] = &["efficiency", "sleepEfficiency"];
pub const HR_MIN_FIELDS: &[&str] = &["minHeartRate", "heartRateMin"];
pub const HR_AVG_FIELDS: &[&str] = &["avgHeartRate", "heartRateAvg"];
pub const HR_MAX_FIELDS: &[&str] = &["maxHeartRate", "heartRateMax"];

/// Metric-name keywords routing to the glucose stream
pub const GLUCOSE_KEYWORDS: &[&str] = &["glucose", "blood", "bg"];
/// Metric-name keywords routing to the exercise stream
pub const EXERCISE_KEYWORDS: &[&str] = &["workout", "exercise", "activity", "fitness"];

/// Exercise sessions with no duration field and no end instant are
/// recorded with the exporter's nominal session length.
const DEFAULT_EXERCISE_MINUTES: f64 = 30.0;

/// Batch-level context influencing classification
#[derive(Debug, Clone, Copy)]
pub struct BatchContext {
    /// The batch was flagged as a high-frequency glucose export, so
    /// unnamed numeric items default to the glucose stream
    pub high_frequency_glucose: bool,
    /// "Now" for timestamp fallbacks, fixed per batch
    pub now: DateTime<Utc>,
}

/// Why an item was dropped instead of routed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// The item is not a JSON object
    NotAnObject,
    /// A sleep/exercise time window was present but unparseable or inverted
    MalformedWindow(String),
    /// The required numeric value could not be coerced
    NonNumericValue,
    /// The value violates the positive-glucose invariant
    NonPositiveValue,
    /// No rule matched the item
    Unclassified,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::NotAnObject => write!(f, "item is not an object"),
            RejectReason::MalformedWindow(detail) => {
                write!(f, "malformed time window: {detail}")
            }
            RejectReason::NonNumericValue => write!(f, "value is not numeric"),
            RejectReason::NonPositiveValue => write!(f, "glucose value must be positive"),
            RejectReason::Unclassified => write!(f, "no stream rule matched"),
        }
    }
}

/// A routed candidate, or a reject
#[derive(Debug, Clone, PartialEq)]
pub enum Classified {
    Glucose(GlucoseSample),
    Sleep(SleepSession),
    Exercise(ExerciseSession),
    Rejected(RejectReason),
}

/// Classification result plus data-quality flags
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub outcome: Classified,
    /// The item's timestamp did not parse and "now" was substituted
    pub timestamp_fallback: bool,
}

impl Classification {
    fn rejected(reason: RejectReason) -> Self {
        Self {
            outcome: Classified::Rejected(reason),
            timestamp_fallback: false,
        }
    }
}

/// Route one raw item to a stream
///
/// Rules are evaluated in order, first match wins:
/// 1. start + end instants      -> sleep
/// 2. activity field or keyword -> exercise
/// 3. glucose keyword, or a high-frequency glucose batch -> glucose
/// 4. otherwise rejected
pub fn classify(item: &Value, ctx: &BatchContext) -> Classification {
    let obj = match item.as_object() {
        Some(obj) => obj,
        None => return Classification::rejected(RejectReason::NotAnObject),
    };

    let name = first_str(obj, NAME_FIELDS).unwrap_or("unknown").to_lowercase();
    let source = first_str(obj, SOURCE_FIELDS).map(str::to_string);

    if first_str(obj, START_FIELDS).is_some() && first_str(obj, END_FIELDS).is_some() {
        return classify_sleep(obj, source);
    }

    let is_exercise =
        first_str(obj, ACTIVITY_FIELDS).is_some() || matches_keyword(&name, EXERCISE_KEYWORDS);
    if is_exercise {
        return classify_exercise(obj, &name, source, ctx);
    }

    let is_glucose = matches_keyword(&name, GLUCOSE_KEYWORDS) || ctx.high_frequency_glucose;
    if is_glucose {
        return classify_glucose(obj, source, ctx);
    }

    Classification::rejected(RejectReason::Unclassified)
}

fn classify_sleep(obj: &Map<String, Value>, source: Option<String>) -> Classification {
    let start_raw = first_str(obj, START_FIELDS).unwrap_or_default();
    let end_raw = first_str(obj, END_FIELDS).unwrap_or_default();

    let window = timestamp::normalize(start_raw)
        .and_then(|bedtime| timestamp::normalize(end_raw).map(|wake| (bedtime, wake)));
    let (bedtime, wake_time) = match window {
        Ok(window) => window,
        Err(TimestampError(raw)) => {
            return Classification::rejected(RejectReason::MalformedWindow(raw));
        }
    };

    let mut session = SleepSession::new(bedtime, wake_time);
    if !session.is_valid() {
        return Classification::rejected(RejectReason::MalformedWindow(
            "wake time precedes bedtime".to_string(),
        ));
    }

    session.deep_minutes = first_numeric(obj, DEEP_FIELDS);
    session.light_minutes = first_numeric(obj, LIGHT_FIELDS);
    session.rem_minutes = first_numeric(obj, REM_FIELDS);
    session.efficiency_pct = first_numeric(obj, EFFICIENCY_FIELDS);
    session.heart_rate = heart_rate_stats(obj);
    session.source = source;

    Classification {
        outcome: Classified::Sleep(session),
        timestamp_fallback: false,
    }
}

fn classify_exercise(
    obj: &Map<String, Value>,
    name: &str,
    source: Option<String>,
    ctx: &BatchContext,
) -> Classification {
    let (start, timestamp_fallback) = item_timestamp(obj, ctx);

    let activity = first_str(obj, ACTIVITY_FIELDS).unwrap_or(name).to_string();

    let end = first_str(obj, END_FIELDS).and_then(|raw| timestamp::normalize(raw).ok());
    let duration_minutes = first_numeric(obj, DURATION_FIELDS)
        .or_else(|| end.map(|end| (end - start).num_seconds() as f64 / 60.0))
        .unwrap_or(DEFAULT_EXERCISE_MINUTES);

    let mut session = ExerciseSession::new(start, activity, duration_minutes);
    session.distance = first_numeric(obj, DISTANCE_FIELDS);
    session.energy_kcal = first_numeric(obj, ENERGY_FIELDS);
    session.heart_rate = heart_rate_stats(obj);
    session.source = source;

    Classification {
        outcome: Classified::Exercise(session),
        timestamp_fallback,
    }
}

fn classify_glucose(
    obj: &Map<String, Value>,
    source: Option<String>,
    ctx: &BatchContext,
) -> Classification {
    let value = match first_numeric(obj, VALUE_FIELDS) {
        Some(value) => value,
        None => return Classification::rejected(RejectReason::NonNumericValue),
    };
    if value <= 0.0 {
        return Classification::rejected(RejectReason::NonPositiveValue);
    }

    let (timestamp, timestamp_fallback) = item_timestamp(obj, ctx);

    let mut sample = GlucoseSample::new(timestamp, value);
    if let Some(unit) = first_str(obj, UNIT_FIELDS) {
        if !unit.is_empty() {
            sample.unit = unit.to_string();
        }
    }
    sample.source = source;

    Classification {
        outcome: Classified::Glucose(sample),
        timestamp_fallback,
    }
}

/// The item's own timestamp, or "now" with the fallback flag raised
fn item_timestamp(obj: &Map<String, Value>, ctx: &BatchContext) -> (DateTime<Utc>, bool) {
    match first_str(obj, DATE_FIELDS) {
        Some(raw) => match timestamp::normalize(raw) {
            Ok(instant) => (instant, false),
            Err(err) => {
                tracing::warn!(error = %err, "timestamp parse failed, substituting now");
                (ctx.now, true)
            }
        },
        None => (ctx.now, true),
    }
}

fn matches_keyword(name: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|kw| name.contains(kw))
}

/// First present string field from a priority table
fn first_str<'a>(obj: &'a Map<String, Value>, fields: &[&str]) -> Option<&'a str> {
    fields.iter().find_map(|field| obj.get(*field)?.as_str())
}

/// First coercible numeric field from a priority table
///
/// Accepts JSON numbers and numeric strings; anything else is skipped.
fn first_numeric(obj: &Map<String, Value>, fields: &[&str]) -> Option<f64> {
    fields
        .iter()
        .filter_map(|field| obj.get(*field))
        .find_map(coerce_f64)
}

fn coerce_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn heart_rate_stats(obj: &Map<String, Value>) -> Option<HeartRateStats> {
    Some(HeartRateStats {
        min_bpm: first_numeric(obj, HR_MIN_FIELDS)?,
        avg_bpm: first_numeric(obj, HR_AVG_FIELDS)?,
        max_bpm: first_numeric(obj, HR_MAX_FIELDS)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn ctx() -> BatchContext {
        BatchContext {
            high_frequency_glucose: false,
            now: Utc.with_ymd_and_hms(2025, 3, 14, 12, 0, 0).unwrap(),
        }
    }

    fn cgm_ctx() -> BatchContext {
        BatchContext {
            high_frequency_glucose: true,
            ..ctx()
        }
    }

    #[test]
    fn test_glucose_by_keyword() {
        let item = json!({
            "name": "blood_glucose",
            "qty": 104.0,
            "date": "2025-03-14T08:30:00Z",
            "units": "mg/dL",
            "source": "CGM Sensor"
        });

        let result = classify(&item, &ctx());
        assert!(!result.timestamp_fallback);
        match result.outcome {
            Classified::Glucose(sample) => {
                assert_eq!(sample.glucose_mg_dl, 104.0);
                assert_eq!(sample.unit, "mg/dL");
                assert_eq!(sample.source.as_deref(), Some("CGM Sensor"));
            }
            other => panic!("expected glucose, got {other:?}"),
        }
    }

    #[test]
    fn test_value_field_priority() {
        // "qty" outranks "value"
        let item = json!({"name": "bg", "qty": 101.0, "value": 999.0, "date": "2025-03-14 08:00:00"});
        match classify(&item, &ctx()).outcome {
            Classified::Glucose(sample) => assert_eq!(sample.glucose_mg_dl, 101.0),
            other => panic!("expected glucose, got {other:?}"),
        }
    }

    #[test]
    fn test_string_value_coerced() {
        let item = json!({"name": "glucose", "qty": "98.5", "date": "2025-03-14 08:00:00"});
        match classify(&item, &ctx()).outcome {
            Classified::Glucose(sample) => assert_eq!(sample.glucose_mg_dl, 98.5),
            other => panic!("expected glucose, got {other:?}"),
        }
    }

    #[test]
    fn test_non_numeric_value_rejected() {
        let item = json!({"name": "glucose", "qty": "high", "date": "2025-03-14 08:00:00"});
        assert_eq!(
            classify(&item, &ctx()).outcome,
            Classified::Rejected(RejectReason::NonNumericValue)
        );
    }

    #[test]
    fn test_high_frequency_batch_defaults_to_glucose() {
        let item = json!({"qty": 104.0, "date": "2025-03-14 08:00:00"});

        assert_eq!(
            classify(&item, &ctx()).outcome,
            Classified::Rejected(RejectReason::Unclassified)
        );
        assert!(matches!(
            classify(&item, &cgm_ctx()).outcome,
            Classified::Glucose(_)
        ));
    }

    #[test]
    fn test_sleep_outranks_exercise_keywords() {
        // start+end wins even when the name mentions an exercise keyword
        let item = json!({
            "name": "sleep_workout_tracker",
            "startDate": "2025-03-13T23:00:00Z",
            "endDate": "2025-03-14T06:30:00Z"
        });

        match classify(&item, &ctx()).outcome {
            Classified::Sleep(session) => assert_eq!(session.duration_minutes(), 450.0),
            other => panic!("expected sleep, got {other:?}"),
        }
    }

    #[test]
    fn test_sleep_stage_breakdown() {
        let item = json!({
            "startDate": "2025-03-13T23:00:00Z",
            "endDate": "2025-03-14T07:00:00Z",
            "deep": 95.0,
            "core": 230.0,
            "rem": 110.0,
            "efficiency": 91.5,
            "minHeartRate": 47.0,
            "avgHeartRate": 54.0,
            "maxHeartRate": 78.0
        });

        match classify(&item, &ctx()).outcome {
            Classified::Sleep(session) => {
                assert_eq!(session.deep_minutes, Some(95.0));
                assert_eq!(session.light_minutes, Some(230.0));
                assert_eq!(session.rem_minutes, Some(110.0));
                assert_eq!(session.efficiency_pct, Some(91.5));
                assert_eq!(session.heart_rate.unwrap().avg_bpm, 54.0);
            }
            other => panic!("expected sleep, got {other:?}"),
        }
    }

    #[test]
    fn test_inverted_sleep_window_rejected() {
        let item = json!({
            "startDate": "2025-03-14T06:30:00Z",
            "endDate": "2025-03-13T23:00:00Z"
        });
        assert!(matches!(
            classify(&item, &ctx()).outcome,
            Classified::Rejected(RejectReason::MalformedWindow(_))
        ));
    }

    #[test]
    fn test_exercise_by_activity_field() {
        let item = json!({
            "name": "morning session",
            "workoutActivityType": "running",
            "date": "2025-03-14T17:00:00Z",
            "duration": 42.0,
            "totalDistance": 7.2,
            "totalEnergyBurned": 410.0
        });

        match classify(&item, &ctx()).outcome {
            Classified::Exercise(session) => {
                assert_eq!(session.activity_type, "running");
                assert_eq!(session.duration_minutes, 42.0);
                assert_eq!(session.distance, Some(7.2));
                assert_eq!(session.energy_kcal, Some(410.0));
            }
            other => panic!("expected exercise, got {other:?}"),
        }
    }

    #[test]
    fn test_exercise_duration_defaults() {
        // No duration and no end: nominal session length
        let item = json!({"name": "workout", "date": "2025-03-14T17:00:00Z"});
        match classify(&item, &ctx()).outcome {
            Classified::Exercise(session) => assert_eq!(session.duration_minutes, 30.0),
            other => panic!("expected exercise, got {other:?}"),
        }
    }

    #[test]
    fn test_timestamp_fallback_flagged() {
        let item = json!({"name": "glucose", "qty": 104.0, "date": "not a date"});
        let result = classify(&item, &ctx());
        assert!(result.timestamp_fallback);
        match result.outcome {
            Classified::Glucose(sample) => assert_eq!(sample.timestamp, ctx().now),
            other => panic!("expected glucose, got {other:?}"),
        }
    }

    #[test]
    fn test_non_object_rejected() {
        assert_eq!(
            classify(&json!(42), &ctx()).outcome,
            Classified::Rejected(RejectReason::NotAnObject)
        );
    }
}
