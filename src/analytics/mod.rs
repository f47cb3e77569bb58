//! Statistical analyses over the stored history
//!
//! All analyses are pure functions over an in-memory
//! [`crate::store::AnalysisDataset`]: they depend on the aggregation
//! engine and the store's read interface, never on the ingestion path
//! or on each other.

pub mod aggregate;
pub mod anomaly;
pub mod correlation;
pub mod patterns;

pub use aggregate::{
    grouped_stats, mean, population_std_dev, round1, stats_by_date, stats_by_hour,
    stats_by_weekday, GroupStats,
};
pub use anomaly::{
    detect_outliers, find_last_hypo_event, Anomaly, Direction, HypoReport, OutlierReport,
    Recovery, Severity, Trend, DEFAULT_HYPO_THRESHOLD_MG_DL, DEFAULT_THRESHOLD_FACTOR,
    MIN_READINGS,
};
pub use correlation::{
    correlate_daily, daily_correlations, pearson, strength_label, CorrelationSummary,
    PairCorrelation, MIN_OVERLAP_DAYS,
};
pub use patterns::{
    dawn_phenomenon, exercise_patterns, glucose_patterns, sleep_patterns, time_in_range,
    DawnPhenomenon, ExercisePatterns, GlucosePatterns, HourCount, SleepPatterns, SummarySpread,
    TimeInRange, DAWN_RISE_THRESHOLD_MG_DL, HIGH_GLUCOSE_MG_DL, LOW_GLUCOSE_MG_DL,
};
