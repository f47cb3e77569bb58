//! Deduplicating store writer
//!
//! Persists classified samples inside a batch transaction using
//! `INSERT OR IGNORE` against each table's unique natural-key index:
//! a duplicate delivery changes zero rows and is reported as a no-op,
//! never as an error. Any other database error propagates and aborts
//! the enclosing transaction.

use crate::store::error::{StoreError, StoreResult};
use crate::store::samples::{ExerciseSession, GlucoseSample, SleepSession};
use rusqlite::{params, Connection};
use serde::Serialize;

/// What happened to one write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// A new row was created
    Inserted,
    /// A row with the same natural key already existed; nothing was written
    Duplicate,
}

/// Per-stream insert counters accumulated over one batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StreamCounts {
    pub glucose: usize,
    pub sleep: usize,
    pub exercise: usize,
    /// Redeliveries that hit an existing natural key
    pub duplicates: usize,
}

/// Batch-scoped metadata stamped onto every row
#[derive(Debug, Clone, Copy, Default)]
pub struct WriteMeta<'a> {
    pub session_id: Option<&'a str>,
    pub automation_type: Option<&'a str>,
}

/// Writes classified samples into an open transaction, deduplicating on
/// each stream's natural key and counting what was actually inserted.
pub struct DedupWriter<'conn, 'meta> {
    conn: &'conn Connection,
    meta: WriteMeta<'meta>,
    counts: StreamCounts,
}

impl<'conn, 'meta> DedupWriter<'conn, 'meta> {
    /// Wrap a connection or transaction (a `Transaction` derefs to
    /// `Connection`, so callers pass `&tx` during batch ingestion)
    pub fn new(conn: &'conn Connection, meta: WriteMeta<'meta>) -> Self {
        Self {
            conn,
            meta,
            counts: StreamCounts::default(),
        }
    }

    /// Counters accumulated so far
    pub fn counts(&self) -> StreamCounts {
        self.counts
    }

    pub fn write_glucose(&mut self, sample: &GlucoseSample) -> StoreResult<WriteOutcome> {
        if !(sample.glucose_mg_dl > 0.0) {
            return Err(StoreError::InvalidSample(
                "glucose value must be positive".to_string(),
            ));
        }

        let changed = self.conn.execute(
            "INSERT OR IGNORE INTO glucose
                (timestamp_ms, date, glucose_mg_dl, unit, source, session_id, automation_type)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                sample.timestamp.timestamp_millis(),
                sample.date().format("%Y-%m-%d").to_string(),
                sample.glucose_mg_dl,
                sample.unit,
                sample.source,
                self.meta.session_id,
                self.meta.automation_type,
            ],
        )?;

        Ok(self.record(changed, |c| &mut c.glucose))
    }

    pub fn write_sleep(&mut self, session: &SleepSession) -> StoreResult<WriteOutcome> {
        if !session.is_valid() {
            return Err(StoreError::InvalidSample(
                "sleep session ends before it starts".to_string(),
            ));
        }

        let hr = session.heart_rate;
        let changed = self.conn.execute(
            "INSERT OR IGNORE INTO sleep
                (date, bedtime_ms, wake_ms, duration_minutes,
                 deep_minutes, light_minutes, rem_minutes, efficiency_pct,
                 hr_min, hr_avg, hr_max, source, session_id, automation_type)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                session.date().format("%Y-%m-%d").to_string(),
                session.bedtime.timestamp_millis(),
                session.wake_time.timestamp_millis(),
                session.duration_minutes(),
                session.deep_minutes,
                session.light_minutes,
                session.rem_minutes,
                session.efficiency_pct,
                hr.map(|h| h.min_bpm),
                hr.map(|h| h.avg_bpm),
                hr.map(|h| h.max_bpm),
                session.source,
                self.meta.session_id,
                self.meta.automation_type,
            ],
        )?;

        Ok(self.record(changed, |c| &mut c.sleep))
    }

    pub fn write_exercise(&mut self, session: &ExerciseSession) -> StoreResult<WriteOutcome> {
        let hr = session.heart_rate;
        let changed = self.conn.execute(
            "INSERT OR IGNORE INTO exercise
                (timestamp_ms, date, activity_type, duration_minutes,
                 distance, energy_kcal, hr_min, hr_avg, hr_max,
                 source, session_id, automation_type)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                session.timestamp.timestamp_millis(),
                session.date().format("%Y-%m-%d").to_string(),
                session.activity_type,
                session.duration_minutes,
                session.distance,
                session.energy_kcal,
                hr.map(|h| h.min_bpm),
                hr.map(|h| h.avg_bpm),
                hr.map(|h| h.max_bpm),
                session.source,
                self.meta.session_id,
                self.meta.automation_type,
            ],
        )?;

        Ok(self.record(changed, |c| &mut c.exercise))
    }

    fn record(
        &mut self,
        rows_changed: usize,
        counter: impl FnOnce(&mut StreamCounts) -> &mut usize,
    ) -> WriteOutcome {
        if rows_changed == 0 {
            self.counts.duplicates += 1;
            WriteOutcome::Duplicate
        } else {
            *counter(&mut self.counts) += 1;
            WriteOutcome::Inserted
        }
    }
}
