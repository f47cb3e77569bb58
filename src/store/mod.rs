//! Durable sample store
//!
//! SQLite-backed persistence for the three sample streams. The write
//! path deduplicates on natural keys ([`writer`]); the read path serves
//! calendar-windowed queries ([`queries`]) and a reloadable in-memory
//! dataset for analytics ([`cache`]).

pub mod cache;
pub mod error;
pub mod queries;
pub mod samples;
pub mod schema;
pub mod writer;

pub use cache::AnalysisDataset;
pub use error::{StoreError, StoreResult};
pub use queries::{
    glucose_in_window, glucose_window_stats, recent_glucose, sleep_in_window,
    exercise_in_window, DateWindow, GlucoseWindowStats, Limit, RecentReading, StoredExercise,
    StoredGlucose, StoredSleep,
};
pub use samples::{
    weekday_name, ExerciseSession, GlucoseSample, HeartRateStats, SleepSession,
    DEFAULT_GLUCOSE_UNIT,
};
pub use schema::Store;
pub use writer::{DedupWriter, StreamCounts, WriteMeta, WriteOutcome};
