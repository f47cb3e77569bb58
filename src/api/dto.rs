//! Data transfer objects
//!
//! Request and response types for the API endpoints, plus the shared
//! date-range/limit query parsing used by every read entry point.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::api::error::{ApiError, ApiResult};
use crate::ingest::IngestSummary;
use crate::store::{DateWindow, Limit};

// ============================================
// INGEST DTOs
// ============================================

/// Response for a processed ingestion batch
#[derive(Debug, Serialize)]
pub struct IngestResponse {
    /// "success"
    pub status: &'static str,
    #[serde(flatten)]
    pub summary: IngestSummary,
}

/// Error shape for a failed ingestion batch
#[derive(Debug, Serialize)]
pub struct IngestErrorResponse {
    /// "error"
    pub status: &'static str,
    pub message: String,
}

// ============================================
// QUERY DTOs
// ============================================

/// Common read-query parameters: optional date range plus a limit
#[derive(Debug, Default, Deserialize)]
pub struct RangeQuery {
    /// Start date, `YYYY-MM-DD`; requires `end_date`
    #[serde(default)]
    pub start_date: Option<String>,
    /// End date, `YYYY-MM-DD`, inclusive; requires `start_date`
    #[serde(default)]
    pub end_date: Option<String>,
    /// Positive row count or `"unlimited"`; defaults to 1000
    #[serde(default)]
    pub limit: Option<String>,
}

impl RangeQuery {
    /// Parse the date range: both-or-neither, `YYYY-MM-DD`, start <= end
    pub fn window(&self) -> ApiResult<Option<DateWindow>> {
        parse_window(self.start_date.as_deref(), self.end_date.as_deref())
    }

    /// Parse the limit: a positive integer or `"unlimited"`
    pub fn parse_limit(&self) -> ApiResult<Limit> {
        let raw = match &self.limit {
            None => return Ok(Limit::default()),
            Some(raw) => raw.trim(),
        };

        if raw.eq_ignore_ascii_case("unlimited") {
            return Ok(Limit::Unlimited);
        }

        match raw.parse::<u32>() {
            Ok(n) if n > 0 => Ok(Limit::Count(n)),
            _ => Err(ApiError::Validation(format!(
                "limit must be a positive integer or \"unlimited\", got {raw:?}"
            ))),
        }
    }
}

/// Parse a date range: both-or-neither, `YYYY-MM-DD`, start <= end
pub fn parse_window(start: Option<&str>, end: Option<&str>) -> ApiResult<Option<DateWindow>> {
    let (start, end) = match (start, end) {
        (None, None) => return Ok(None),
        (Some(start), Some(end)) => (start, end),
        _ => {
            return Err(ApiError::Validation(
                "start_date and end_date must be provided together".to_string(),
            ));
        }
    };

    let parse = |raw: &str, field: &str| {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
            ApiError::Validation(format!("invalid {field} {raw:?}, expected YYYY-MM-DD"))
        })
    };

    let window = DateWindow::new(parse(start, "start_date")?, parse(end, "end_date")?)
        .map_err(|_| ApiError::Validation("start_date must not be after end_date".to_string()))?;
    Ok(Some(window))
}

/// Echo string for responses
pub fn range_label(window: Option<&DateWindow>) -> String {
    window
        .map(DateWindow::label)
        .unwrap_or_else(|| "all dates".to_string())
}

/// Windowed table query response
#[derive(Debug, Serialize)]
pub struct TableResponse<T> {
    pub table_name: &'static str,
    pub total_records: usize,
    pub date_range: String,
    pub limit: Limit,
    pub data: Vec<T>,
}

// ============================================
// ANALYSIS DTOs
// ============================================

/// Parameters shared by the analysis entry points
///
/// All fields arrive as query-string text; numeric ones are parsed and
/// validated here so every handler reports the same error shapes.
#[derive(Debug, Default, Deserialize)]
pub struct AnalysisQuery {
    /// Pattern sub-analysis selector: glucose | sleep | exercise | dawn |
    /// time_in_range | all (default)
    #[serde(default)]
    pub mode: Option<String>,
    /// Detection threshold: z-score multiple for anomalies, mg/dL for
    /// hypoglycemia
    #[serde(default)]
    pub threshold: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
}

impl AnalysisQuery {
    pub fn window(&self) -> ApiResult<Option<DateWindow>> {
        parse_window(self.start_date.as_deref(), self.end_date.as_deref())
    }

    /// Parse the threshold as a positive number, or use the default
    pub fn threshold_or(&self, default: f64) -> ApiResult<f64> {
        let raw = match &self.threshold {
            None => return Ok(default),
            Some(raw) => raw.trim(),
        };

        match raw.parse::<f64>() {
            Ok(value) if value.is_finite() && value > 0.0 => Ok(value),
            _ => Err(ApiError::Validation(format!(
                "threshold must be a positive number, got {raw:?}"
            ))),
        }
    }
}

/// An analysis that may not have enough data to run
///
/// Serializes as either the analysis result itself or an explicit
/// insufficient-data object naming the shortfall.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum MaybeAnalysis<T> {
    Ready(T),
    Insufficient {
        status: &'static str,
        detail: String,
    },
}

impl<T> MaybeAnalysis<T> {
    pub fn from_option(value: Option<T>, shortfall: &str) -> Self {
        match value {
            Some(value) => MaybeAnalysis::Ready(value),
            None => MaybeAnalysis::Insufficient {
                status: "insufficient_data",
                detail: shortfall.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(start: Option<&str>, end: Option<&str>, limit: Option<&str>) -> RangeQuery {
        RangeQuery {
            start_date: start.map(String::from),
            end_date: end.map(String::from),
            limit: limit.map(String::from),
        }
    }

    #[test]
    fn test_window_both_or_neither() {
        assert!(query(None, None, None).window().unwrap().is_none());
        assert!(query(Some("2025-03-01"), Some("2025-03-14"), None)
            .window()
            .unwrap()
            .is_some());
        assert!(query(Some("2025-03-01"), None, None).window().is_err());
        assert!(query(None, Some("2025-03-14"), None).window().is_err());
    }

    #[test]
    fn test_window_format_validation() {
        assert!(query(Some("03/01/2025"), Some("2025-03-14"), None)
            .window()
            .is_err());
        assert!(query(Some("2025-03-14"), Some("2025-03-01"), None)
            .window()
            .is_err());
    }

    #[test]
    fn test_threshold_parsing() {
        let mut params = AnalysisQuery::default();
        assert_eq!(params.threshold_or(2.5).unwrap(), 2.5);

        params.threshold = Some("1.8".to_string());
        assert_eq!(params.threshold_or(2.5).unwrap(), 1.8);

        params.threshold = Some("0".to_string());
        assert!(params.threshold_or(2.5).is_err());

        params.threshold = Some("NaN".to_string());
        assert!(params.threshold_or(2.5).is_err());
    }

    #[test]
    fn test_limit_parsing() {
        assert_eq!(query(None, None, None).parse_limit().unwrap(), Limit::Count(1000));
        assert_eq!(
            query(None, None, Some("50")).parse_limit().unwrap(),
            Limit::Count(50)
        );
        assert_eq!(
            query(None, None, Some("unlimited")).parse_limit().unwrap(),
            Limit::Unlimited
        );
        assert!(query(None, None, Some("0")).parse_limit().is_err());
        assert!(query(None, None, Some("-5")).parse_limit().is_err());
        assert!(query(None, None, Some("many")).parse_limit().is_err());
    }

    #[test]
    fn test_maybe_analysis_serialization() {
        let ready: MaybeAnalysis<u32> = MaybeAnalysis::from_option(Some(7), "unused");
        assert_eq!(serde_json::to_value(&ready).unwrap(), serde_json::json!(7));

        let missing: MaybeAnalysis<u32> =
            MaybeAnalysis::from_option(None, "no sleep sessions in the requested window");
        let json = serde_json::to_value(&missing).unwrap();
        assert_eq!(json["status"], "insufficient_data");
        assert!(json["detail"].as_str().unwrap().contains("sleep"));
    }
}
