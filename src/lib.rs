//! # Glucolog
//!
//! Physiological time-series ingestion and analytics: glucose, sleep,
//! and exercise samples pushed by an export automation are normalized,
//! stored durably with natural-key deduplication, and served back as
//! statistical analyses.
//!
//! ## Modules
//!
//! - [`ingest`]: timestamp normalization, sample classification, and the
//!   one-transaction batch pipeline
//! - [`store`]: SQLite-backed persistence with dedup on natural keys
//! - [`analytics`]: pattern discovery, anomaly/hypoglycemia detection,
//!   and cross-metric correlation
//! - [`api`]: Axum HTTP surface exposing ingestion and analysis
//! - [`config`]: TOML + environment configuration
//!
//! ## Data flow
//!
//! Writes go one way: raw batch -> classify -> dedup-write -> store.
//! Reads go the other: store -> window query -> aggregation ->
//! {patterns, anomalies, correlations}. The analyses depend only on the
//! aggregation engine and the store's read interface, never on the
//! ingestion path or each other.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use glucolog::ingest::{ingest_batch, BatchMeta};
//! use glucolog::store::Store;
//! use serde_json::json;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Store::open("glucolog_data/samples.db")?;
//!
//!     let batch = json!([
//!         {"name": "blood_glucose", "qty": 104.0, "date": "2025-03-14T08:00:00Z"}
//!     ]);
//!     let summary = ingest_batch(&store, batch, &BatchMeta::new("session-1", "cgm-frequent"))?;
//!     println!("stored {} glucose readings", summary.processed_glucose);
//!
//!     Ok(())
//! }
//! ```

pub mod analytics;
pub mod api;
pub mod config;
pub mod ingest;
pub mod store;

// Re-export top-level types for convenience
pub use analytics::{
    CorrelationSummary, DawnPhenomenon, ExercisePatterns, GlucosePatterns, GroupStats,
    HypoReport, OutlierReport, PairCorrelation, SleepPatterns, TimeInRange,
};

pub use api::{build_router, serve, ApiError, ApiResult, AppState};

pub use config::{ApiConfig, Config, ConfigError, LoggingConfig, StoreConfig};

pub use ingest::{BatchMeta, Classification, Classified, IngestSummary, RejectReason};

pub use store::{
    AnalysisDataset, DateWindow, ExerciseSession, GlucoseSample, Limit, SleepSession, Store,
    StoreError, StoreResult, StoredExercise, StoredGlucose, StoredSleep,
};
