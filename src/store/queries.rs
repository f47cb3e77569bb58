//! Windowed read queries over the sample tables
//!
//! All reads are calendar-date windowed (end inclusive) with an optional
//! row limit, returning rows most-recent-first the way the export
//! automation's own dashboards consume them. Analytics load through
//! [`crate::store::cache::AnalysisDataset`], which re-sorts ascending.

use crate::store::error::{StoreError, StoreResult};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, Row};
use serde::Serialize;

/// Inclusive calendar-date window for queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> StoreResult<Self> {
        if start > end {
            return Err(StoreError::InvalidWindow);
        }
        Ok(Self { start, end })
    }

    /// Human-readable echo for query responses
    pub fn label(&self) -> String {
        format!("{} to {}", self.start, self.end)
    }

    fn bounds(&self) -> (String, String) {
        (
            self.start.format("%Y-%m-%d").to_string(),
            self.end.format("%Y-%m-%d").to_string(),
        )
    }
}

/// Row limit for queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    Count(u32),
    Unlimited,
}

impl Limit {
    /// SQLite treats a negative LIMIT as "no limit"
    fn to_sql(self) -> i64 {
        match self {
            Limit::Count(n) => i64::from(n),
            Limit::Unlimited => -1,
        }
    }
}

impl Default for Limit {
    fn default() -> Self {
        Limit::Count(1000)
    }
}

impl Serialize for Limit {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Limit::Count(n) => serializer.serialize_u32(*n),
            Limit::Unlimited => serializer.serialize_str("unlimited"),
        }
    }
}

// Timestamps below were written by the dedup writer and are always in
// chrono's representable range; the fallbacks are unreachable.
fn dt_from_ms(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or(DateTime::<Utc>::MIN_UTC)
}

fn date_from_text(text: &str) -> NaiveDate {
    NaiveDate::parse_from_str(text, "%Y-%m-%d").unwrap_or(NaiveDate::MIN)
}

/// A stored glucose reading, as returned to query and analysis callers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredGlucose {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub date: NaiveDate,
    pub glucose_mg_dl: f64,
    pub unit: String,
    pub source: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredSleep {
    pub id: i64,
    pub date: NaiveDate,
    pub bedtime: DateTime<Utc>,
    pub wake_time: DateTime<Utc>,
    pub duration_minutes: f64,
    pub deep_minutes: Option<f64>,
    pub light_minutes: Option<f64>,
    pub rem_minutes: Option<f64>,
    pub efficiency_pct: Option<f64>,
    pub hr_min: Option<f64>,
    pub hr_avg: Option<f64>,
    pub hr_max: Option<f64>,
    pub source: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredExercise {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub date: NaiveDate,
    pub activity_type: String,
    pub duration_minutes: f64,
    pub distance: Option<f64>,
    pub energy_kcal: Option<f64>,
    pub hr_min: Option<f64>,
    pub hr_avg: Option<f64>,
    pub hr_max: Option<f64>,
    pub source: Option<String>,
    pub created_at: String,
}

fn glucose_row(row: &Row<'_>) -> rusqlite::Result<StoredGlucose> {
    Ok(StoredGlucose {
        id: row.get(0)?,
        timestamp: dt_from_ms(row.get(1)?),
        date: date_from_text(&row.get::<_, String>(2)?),
        glucose_mg_dl: row.get(3)?,
        unit: row.get(4)?,
        source: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn sleep_row(row: &Row<'_>) -> rusqlite::Result<StoredSleep> {
    Ok(StoredSleep {
        id: row.get(0)?,
        date: date_from_text(&row.get::<_, String>(1)?),
        bedtime: dt_from_ms(row.get(2)?),
        wake_time: dt_from_ms(row.get(3)?),
        duration_minutes: row.get(4)?,
        deep_minutes: row.get(5)?,
        light_minutes: row.get(6)?,
        rem_minutes: row.get(7)?,
        efficiency_pct: row.get(8)?,
        hr_min: row.get(9)?,
        hr_avg: row.get(10)?,
        hr_max: row.get(11)?,
        source: row.get(12)?,
        created_at: row.get(13)?,
    })
}

fn exercise_row(row: &Row<'_>) -> rusqlite::Result<StoredExercise> {
    Ok(StoredExercise {
        id: row.get(0)?,
        timestamp: dt_from_ms(row.get(1)?),
        date: date_from_text(&row.get::<_, String>(2)?),
        activity_type: row.get(3)?,
        duration_minutes: row.get(4)?,
        distance: row.get(5)?,
        energy_kcal: row.get(6)?,
        hr_min: row.get(7)?,
        hr_avg: row.get(8)?,
        hr_max: row.get(9)?,
        source: row.get(10)?,
        created_at: row.get(11)?,
    })
}

const GLUCOSE_COLS: &str =
    "id, timestamp_ms, date, glucose_mg_dl, unit, source, created_at";
const SLEEP_COLS: &str = "id, date, bedtime_ms, wake_ms, duration_minutes, \
     deep_minutes, light_minutes, rem_minutes, efficiency_pct, \
     hr_min, hr_avg, hr_max, source, created_at";
const EXERCISE_COLS: &str = "id, timestamp_ms, date, activity_type, duration_minutes, \
     distance, energy_kcal, hr_min, hr_avg, hr_max, source, created_at";

fn windowed<T>(
    conn: &Connection,
    table: &str,
    cols: &str,
    order_col: &str,
    window: Option<&DateWindow>,
    limit: Limit,
    map: fn(&Row<'_>) -> rusqlite::Result<T>,
) -> StoreResult<Vec<T>> {
    let rows = match window {
        Some(w) => {
            let (start, end) = w.bounds();
            let sql = format!(
                "SELECT {cols} FROM {table}
                 WHERE date >= ?1 AND date <= ?2
                 ORDER BY {order_col} DESC LIMIT ?3"
            );
            let mut stmt = conn.prepare(&sql)?;
            let mapped = stmt.query_map(params![start, end, limit.to_sql()], map)?;
            mapped.collect::<Result<Vec<_>, _>>()?
        }
        None => {
            let sql =
                format!("SELECT {cols} FROM {table} ORDER BY {order_col} DESC LIMIT ?1");
            let mut stmt = conn.prepare(&sql)?;
            let mapped = stmt.query_map(params![limit.to_sql()], map)?;
            mapped.collect::<Result<Vec<_>, _>>()?
        }
    };
    Ok(rows)
}

/// Glucose readings in the window, most recent first
pub fn glucose_in_window(
    conn: &Connection,
    window: Option<&DateWindow>,
    limit: Limit,
) -> StoreResult<Vec<StoredGlucose>> {
    windowed(conn, "glucose", GLUCOSE_COLS, "timestamp_ms", window, limit, glucose_row)
}

/// Sleep sessions in the window, most recent bedtime first
pub fn sleep_in_window(
    conn: &Connection,
    window: Option<&DateWindow>,
    limit: Limit,
) -> StoreResult<Vec<StoredSleep>> {
    windowed(conn, "sleep", SLEEP_COLS, "bedtime_ms", window, limit, sleep_row)
}

/// Exercise sessions in the window, most recent first
pub fn exercise_in_window(
    conn: &Connection,
    window: Option<&DateWindow>,
    limit: Limit,
) -> StoreResult<Vec<StoredExercise>> {
    windowed(conn, "exercise", EXERCISE_COLS, "timestamp_ms", window, limit, exercise_row)
}

/// A recent reading with its age, for the live status surface
#[derive(Debug, Clone, Serialize)]
pub struct RecentReading {
    pub timestamp: DateTime<Utc>,
    pub glucose_mg_dl: f64,
    pub source: Option<String>,
    pub minutes_ago: f64,
}

/// Most recent glucose readings within `minutes_back` of `now`, capped at 100
pub fn recent_glucose(
    conn: &Connection,
    minutes_back: i64,
    now: DateTime<Utc>,
) -> StoreResult<Vec<RecentReading>> {
    let cutoff_ms = (now - chrono::Duration::minutes(minutes_back)).timestamp_millis();

    let mut stmt = conn.prepare(
        "SELECT timestamp_ms, glucose_mg_dl, source FROM glucose
         WHERE timestamp_ms >= ?1
         ORDER BY timestamp_ms DESC LIMIT 100",
    )?;
    let rows = stmt
        .query_map(params![cutoff_ms], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, f64>(1)?,
                row.get::<_, Option<String>>(2)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(rows
        .into_iter()
        .map(|(ms, value, source)| {
            let timestamp = dt_from_ms(ms);
            RecentReading {
                timestamp,
                glucose_mg_dl: value,
                source,
                minutes_ago: ((now - timestamp).num_seconds() as f64 / 60.0 * 10.0).round()
                    / 10.0,
            }
        })
        .collect())
}

/// Summary statistics over a trailing window of glucose readings
///
/// Completeness assumes the exporter's 5-minute cadence (12/hour).
#[derive(Debug, Clone, Serialize)]
pub struct GlucoseWindowStats {
    pub total_readings: usize,
    pub expected_readings: usize,
    pub data_completeness_pct: f64,
    pub average_glucose: f64,
    pub min_glucose: f64,
    pub max_glucose: f64,
    pub glucose_range: f64,
    pub first_reading: DateTime<Utc>,
    pub last_reading: DateTime<Utc>,
    pub time_range_hours: i64,
}

/// Stats over the last `hours_back` hours; `None` when the window is empty
pub fn glucose_window_stats(
    conn: &Connection,
    hours_back: i64,
    now: DateTime<Utc>,
) -> StoreResult<Option<GlucoseWindowStats>> {
    let cutoff_ms = (now - chrono::Duration::hours(hours_back)).timestamp_millis();

    let row = conn.query_row(
        "SELECT COUNT(*), AVG(glucose_mg_dl), MIN(glucose_mg_dl), MAX(glucose_mg_dl),
                MIN(timestamp_ms), MAX(timestamp_ms)
         FROM glucose WHERE timestamp_ms >= ?1",
        params![cutoff_ms],
        |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, Option<f64>>(1)?,
                row.get::<_, Option<f64>>(2)?,
                row.get::<_, Option<f64>>(3)?,
                row.get::<_, Option<i64>>(4)?,
                row.get::<_, Option<i64>>(5)?,
            ))
        },
    )?;

    let (count, avg, min, max, first_ms, last_ms) = row;
    if count == 0 {
        return Ok(None);
    }

    let round1 = |v: f64| (v * 10.0).round() / 10.0;
    let (avg, min, max) = (
        avg.unwrap_or_default(),
        min.unwrap_or_default(),
        max.unwrap_or_default(),
    );
    let expected = (hours_back * 12).max(0) as usize;
    let completeness = if expected > 0 {
        count as f64 / expected as f64 * 100.0
    } else {
        0.0
    };

    Ok(Some(GlucoseWindowStats {
        total_readings: count as usize,
        expected_readings: expected,
        data_completeness_pct: round1(completeness),
        average_glucose: round1(avg),
        min_glucose: round1(min),
        max_glucose: round1(max),
        glucose_range: round1(max - min),
        first_reading: dt_from_ms(first_ms.unwrap_or_default()),
        last_reading: dt_from_ms(last_ms.unwrap_or_default()),
        time_range_hours: hours_back,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::samples::GlucoseSample;
    use crate::store::schema::Store;
    use crate::store::writer::{DedupWriter, WriteMeta};
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn seeded_store() -> (Store, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path().join("samples.db")).unwrap();
        let conn = store.connect().unwrap();
        let mut writer = DedupWriter::new(&conn, WriteMeta::default());

        for (day, hour, value) in [(10, 8, 95.0), (11, 9, 110.0), (12, 10, 150.0)] {
            let ts = Utc.with_ymd_and_hms(2025, 3, day, hour, 0, 0).unwrap();
            writer.write_glucose(&GlucoseSample::new(ts, value)).unwrap();
        }
        (store, dir)
    }

    #[test]
    fn test_window_is_end_inclusive() {
        let (store, _dir) = seeded_store();
        let conn = store.connect().unwrap();

        let window = DateWindow::new(
            NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            NaiveDate::from_ymd_opt(2025, 3, 11).unwrap(),
        )
        .unwrap();

        let rows = glucose_in_window(&conn, Some(&window), Limit::default()).unwrap();
        assert_eq!(rows.len(), 2);
        // Most recent first
        assert_eq!(rows[0].glucose_mg_dl, 110.0);
        assert_eq!(rows[1].glucose_mg_dl, 95.0);
    }

    #[test]
    fn test_inverted_window_rejected() {
        let result = DateWindow::new(
            NaiveDate::from_ymd_opt(2025, 3, 11).unwrap(),
            NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
        );
        assert!(matches!(result, Err(StoreError::InvalidWindow)));
    }

    #[test]
    fn test_limit_and_unlimited() {
        let (store, _dir) = seeded_store();
        let conn = store.connect().unwrap();

        let rows = glucose_in_window(&conn, None, Limit::Count(2)).unwrap();
        assert_eq!(rows.len(), 2);

        let rows = glucose_in_window(&conn, None, Limit::Unlimited).unwrap();
        assert_eq!(rows.len(), 3);
    }

    #[test]
    fn test_limit_serialization() {
        assert_eq!(serde_json::to_string(&Limit::Count(50)).unwrap(), "50");
        assert_eq!(
            serde_json::to_string(&Limit::Unlimited).unwrap(),
            "\"unlimited\""
        );
    }

    #[test]
    fn test_recent_glucose_minutes_ago() {
        let (store, _dir) = seeded_store();
        let conn = store.connect().unwrap();

        let now = Utc.with_ymd_and_hms(2025, 3, 12, 10, 30, 0).unwrap();
        let readings = recent_glucose(&conn, 60, now).unwrap();
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].glucose_mg_dl, 150.0);
        assert_eq!(readings[0].minutes_ago, 30.0);
    }

    #[test]
    fn test_window_stats() {
        let (store, _dir) = seeded_store();
        let conn = store.connect().unwrap();

        let now = Utc.with_ymd_and_hms(2025, 3, 12, 12, 0, 0).unwrap();
        let stats = glucose_window_stats(&conn, 72, now).unwrap().unwrap();
        assert_eq!(stats.total_readings, 3);
        assert_eq!(stats.expected_readings, 72 * 12);
        assert_eq!(stats.min_glucose, 95.0);
        assert_eq!(stats.max_glucose, 150.0);
        assert_eq!(stats.glucose_range, 55.0);

        // Empty window
        let empty = glucose_window_stats(&conn, 1, now).unwrap();
        assert!(empty.is_none());
    }
}
