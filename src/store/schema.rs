//! Store handle and SQLite schema
//!
//! The store owns nothing but the database path: every ingestion or read
//! call opens its own connection via [`Store::connect`], so concurrent
//! calls never share mutable state. Deduplication is enforced by the
//! unique indexes declared here, not by application-level checks.

use crate::store::error::{StoreError, StoreResult};
use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};

/// Handle to the sample database
///
/// Cheap to clone; carries only the path. Connections are per-call.
#[derive(Debug, Clone)]
pub struct Store {
    path: PathBuf,
}

impl Store {
    /// Create or open the store at the given path, initializing the schema
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let store = Self { path };
        let conn = store.connect()?;
        init_schema(&conn)?;
        Ok(store)
    }

    /// Open a fresh connection for one unit of work
    ///
    /// WAL journaling lets readers run concurrently with a committing
    /// writer; the busy timeout covers writers racing on the same key.
    pub fn connect(&self) -> StoreResult<Connection> {
        let conn = Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA busy_timeout = 5000;
            PRAGMA temp_store = MEMORY;
            ",
        )?;

        Ok(conn)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Create the three sample tables and their natural-key indexes
fn init_schema(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS glucose (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            timestamp_ms    INTEGER NOT NULL,
            date            TEXT NOT NULL,
            glucose_mg_dl   REAL NOT NULL CHECK (glucose_mg_dl > 0),
            unit            TEXT NOT NULL DEFAULT 'mg/dL',
            source          TEXT,
            session_id      TEXT,
            automation_type TEXT,
            created_at      TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
        );
        CREATE UNIQUE INDEX IF NOT EXISTS idx_glucose_natural_key
            ON glucose(timestamp_ms);
        CREATE INDEX IF NOT EXISTS idx_glucose_date ON glucose(date);

        CREATE TABLE IF NOT EXISTS sleep (
            id               INTEGER PRIMARY KEY AUTOINCREMENT,
            date             TEXT NOT NULL,
            bedtime_ms       INTEGER NOT NULL,
            wake_ms          INTEGER NOT NULL CHECK (wake_ms >= bedtime_ms),
            duration_minutes REAL NOT NULL,
            deep_minutes     REAL,
            light_minutes    REAL,
            rem_minutes      REAL,
            efficiency_pct   REAL,
            hr_min           REAL,
            hr_avg           REAL,
            hr_max           REAL,
            source           TEXT,
            session_id       TEXT,
            automation_type  TEXT,
            created_at       TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
        );
        CREATE UNIQUE INDEX IF NOT EXISTS idx_sleep_natural_key
            ON sleep(bedtime_ms);
        CREATE INDEX IF NOT EXISTS idx_sleep_date ON sleep(date);

        CREATE TABLE IF NOT EXISTS exercise (
            id               INTEGER PRIMARY KEY AUTOINCREMENT,
            timestamp_ms     INTEGER NOT NULL,
            date             TEXT NOT NULL,
            activity_type    TEXT NOT NULL,
            duration_minutes REAL NOT NULL,
            distance         REAL,
            energy_kcal      REAL,
            hr_min           REAL,
            hr_avg           REAL,
            hr_max           REAL,
            source           TEXT,
            session_id       TEXT,
            automation_type  TEXT,
            created_at       TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
        );
        CREATE UNIQUE INDEX IF NOT EXISTS idx_exercise_natural_key
            ON exercise(activity_type, timestamp_ms);
        CREATE INDEX IF NOT EXISTS idx_exercise_date ON exercise(date);
        ",
    )
    .map_err(StoreError::Database)?;

    Ok(())
}
