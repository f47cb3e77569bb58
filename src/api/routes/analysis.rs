//! Analysis routes
//!
//! - GET /api/v1/analysis/patterns      - temporal pattern summaries
//! - GET /api/v1/analysis/anomalies     - z-score outlier detection
//! - GET /api/v1/analysis/hypoglycemia  - last hypo event + recovery
//! - GET /api/v1/analysis/correlations  - daily cross-metric Pearson r
//!
//! Each handler loads the requested window into an in-memory dataset on
//! a blocking worker and computes there; reads never block ingestion.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use crate::analytics::{
    daily_correlations, dawn_phenomenon, detect_outliers, exercise_patterns,
    find_last_hypo_event, glucose_patterns, sleep_patterns, time_in_range,
    CorrelationSummary, DawnPhenomenon, ExercisePatterns, GlucosePatterns, HypoReport,
    OutlierReport, SleepPatterns, TimeInRange, DEFAULT_HYPO_THRESHOLD_MG_DL,
    DEFAULT_THRESHOLD_FACTOR,
};
use crate::api::dto::{range_label, AnalysisQuery, MaybeAnalysis};
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::store::{AnalysisDataset, DateWindow};

/// Which pattern sub-analyses to run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PatternMode {
    Glucose,
    Sleep,
    Exercise,
    Dawn,
    TimeInRange,
    All,
}

impl PatternMode {
    fn parse(raw: Option<&str>) -> ApiResult<Self> {
        match raw.unwrap_or("all") {
            "glucose" => Ok(Self::Glucose),
            "sleep" => Ok(Self::Sleep),
            "exercise" => Ok(Self::Exercise),
            "dawn" => Ok(Self::Dawn),
            "time_in_range" => Ok(Self::TimeInRange),
            "all" => Ok(Self::All),
            other => Err(ApiError::Validation(format!(
                "unknown mode {other:?}; expected glucose, sleep, exercise, dawn, \
                 time_in_range, or all"
            ))),
        }
    }

    fn wants(self, mode: PatternMode) -> bool {
        self == PatternMode::All || self == mode
    }
}

/// Pattern detection response; only the requested sections are present
#[derive(Debug, Serialize)]
pub struct PatternReport {
    pub date_range: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub glucose: Option<GlucosePatterns>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sleep: Option<MaybeAnalysis<SleepPatterns>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exercise: Option<MaybeAnalysis<ExercisePatterns>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dawn_phenomenon: Option<DawnPhenomenon>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_in_range: Option<TimeInRange>,
}

/// GET /api/v1/analysis/patterns
pub async fn detect_patterns(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AnalysisQuery>,
) -> ApiResult<Json<PatternReport>> {
    let mode = PatternMode::parse(params.mode.as_deref())?;
    let window = params.window()?;
    let dataset = load_dataset(&state, window).await?;

    let report = PatternReport {
        date_range: range_label(dataset.window.as_ref()),
        glucose: mode
            .wants(PatternMode::Glucose)
            .then(|| glucose_patterns(&dataset.glucose)),
        sleep: mode.wants(PatternMode::Sleep).then(|| {
            MaybeAnalysis::from_option(
                sleep_patterns(&dataset.sleep),
                "no sleep sessions in the requested window",
            )
        }),
        exercise: mode.wants(PatternMode::Exercise).then(|| {
            MaybeAnalysis::from_option(
                exercise_patterns(&dataset.exercise),
                "no exercise sessions in the requested window",
            )
        }),
        dawn_phenomenon: mode
            .wants(PatternMode::Dawn)
            .then(|| dawn_phenomenon(&dataset.glucose)),
        time_in_range: mode
            .wants(PatternMode::TimeInRange)
            .then(|| time_in_range(&dataset.glucose_values())),
    };

    Ok(Json(report))
}

/// GET /api/v1/analysis/anomalies
pub async fn detect_anomalies(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AnalysisQuery>,
) -> ApiResult<Json<OutlierReport>> {
    let threshold = params.threshold_or(DEFAULT_THRESHOLD_FACTOR)?;
    let window = params.window()?;
    let dataset = load_dataset(&state, window).await?;

    Ok(Json(detect_outliers(&dataset.glucose, threshold)))
}

/// GET /api/v1/analysis/hypoglycemia
pub async fn find_hypoglycemia(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AnalysisQuery>,
) -> ApiResult<Json<HypoReport>> {
    let threshold = params.threshold_or(DEFAULT_HYPO_THRESHOLD_MG_DL)?;
    let window = params.window()?;
    let dataset = load_dataset(&state, window).await?;

    Ok(Json(find_last_hypo_event(&dataset.glucose, threshold)))
}

/// GET /api/v1/analysis/correlations
pub async fn find_correlations(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AnalysisQuery>,
) -> ApiResult<Json<CorrelationSummary>> {
    let window = params.window()?;
    let dataset = load_dataset(&state, window).await?;

    Ok(Json(daily_correlations(&dataset)))
}

/// Load one analysis dataset on a blocking worker
async fn load_dataset(
    state: &AppState,
    window: Option<DateWindow>,
) -> ApiResult<AnalysisDataset> {
    let store = state.store.clone();
    tokio::task::spawn_blocking(move || {
        let conn = store.connect()?;
        AnalysisDataset::load(&conn, window)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("analysis worker failed: {e}")))?
    .map_err(ApiError::from)
}
