//! In-memory analysis dataset
//!
//! Analytic reads load the requested window once into an explicit,
//! request-scoped dataset and compute entirely in memory. The dataset is
//! never ambient/global state: callers construct it, pass it by
//! reference, and refresh it only through [`AnalysisDataset::reload`].

use crate::store::error::StoreResult;
use crate::store::queries::{
    exercise_in_window, glucose_in_window, sleep_in_window, DateWindow, Limit, StoredExercise,
    StoredGlucose, StoredSleep,
};
use rusqlite::Connection;

/// One window of samples loaded for analysis, sorted ascending in time
#[derive(Debug, Clone)]
pub struct AnalysisDataset {
    pub window: Option<DateWindow>,
    pub glucose: Vec<StoredGlucose>,
    pub sleep: Vec<StoredSleep>,
    pub exercise: Vec<StoredExercise>,
}

impl AnalysisDataset {
    /// Load every sample in the window across all three streams
    pub fn load(conn: &Connection, window: Option<DateWindow>) -> StoreResult<Self> {
        let mut dataset = Self {
            window,
            glucose: Vec::new(),
            sleep: Vec::new(),
            exercise: Vec::new(),
        };
        dataset.reload(conn)?;
        Ok(dataset)
    }

    /// Re-query the store, replacing the cached samples
    pub fn reload(&mut self, conn: &Connection) -> StoreResult<()> {
        let window = self.window.as_ref();

        self.glucose = glucose_in_window(conn, window, Limit::Unlimited)?;
        self.sleep = sleep_in_window(conn, window, Limit::Unlimited)?;
        self.exercise = exercise_in_window(conn, window, Limit::Unlimited)?;

        // Queries return newest-first; analytics scan chronologically
        self.glucose.sort_by_key(|s| s.timestamp);
        self.sleep.sort_by_key(|s| s.bedtime);
        self.exercise.sort_by_key(|s| s.timestamp);

        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.glucose.is_empty() && self.sleep.is_empty() && self.exercise.is_empty()
    }

    /// Glucose values in chronological order
    pub fn glucose_values(&self) -> Vec<f64> {
        self.glucose.iter().map(|s| s.glucose_mg_dl).collect()
    }
}
