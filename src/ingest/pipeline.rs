//! Batch ingestion pipeline
//!
//! Drives one raw batch through envelope resolution, classification,
//! and the deduplicating writer, inside a single store transaction.
//! Per-item failures are counted and skipped; a store failure aborts
//! and rolls back the whole batch. One batch, one commit.

use crate::ingest::classify::{classify, BatchContext, Classified};
use crate::store::error::{StoreError, StoreResult};
use crate::store::schema::Store;
use crate::store::writer::{DedupWriter, StreamCounts, WriteMeta};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

/// Automation-type tag marking 5-minute CGM exports; items in such
/// batches default to the glucose stream even without a metric name.
pub const HIGH_FREQUENCY_AUTOMATION: &str = "cgm-frequent";

/// Out-of-band metadata accompanying a batch (from request headers)
#[derive(Debug, Clone)]
pub struct BatchMeta {
    pub session_id: String,
    pub automation_type: String,
}

impl BatchMeta {
    pub fn new(session_id: impl Into<String>, automation_type: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            automation_type: automation_type.into(),
        }
    }

    fn is_high_frequency(&self) -> bool {
        self.automation_type == HIGH_FREQUENCY_AUTOMATION
    }
}

/// What one ingestion call did
#[derive(Debug, Clone, Serialize)]
pub struct IngestSummary {
    pub processed_glucose: usize,
    pub processed_sleep: usize,
    pub processed_exercise: usize,
    /// Items dropped: unclassified, malformed, or non-coercible
    pub processed_other: usize,
    /// Redelivered items that hit an existing natural key (routine, not errors)
    pub duplicates: usize,
    /// Items whose timestamp failed to parse and were stamped with "now"
    pub timestamp_fallbacks: usize,
    pub session_id: String,
    pub automation_type: String,
    /// When the batch was processed
    pub timestamp: DateTime<Utc>,
}

/// Resolve the historical batch envelope shapes to a flat item list
///
/// Accepted: a bare array; `{"data": [...]}`; `{"data": {"metrics": [...]}}`;
/// `{"metrics": [...]}`. Anything else resolves to an empty batch.
pub fn resolve_envelope(body: Value) -> Vec<Value> {
    match body {
        Value::Array(items) => items,
        Value::Object(mut obj) => {
            if let Some(data) = obj.remove("data") {
                return match data {
                    Value::Array(items) => items,
                    Value::Object(mut inner) => match inner.remove("metrics") {
                        Some(Value::Array(items)) => items,
                        _ => Vec::new(),
                    },
                    _ => Vec::new(),
                };
            }
            match obj.remove("metrics") {
                Some(Value::Array(items)) => items,
                _ => Vec::new(),
            }
        }
        _ => Vec::new(),
    }
}

/// Ingest one raw batch as a single atomic unit of work
///
/// Opens its own connection, classifies and writes every item inside one
/// transaction, and commits once. Item-level problems never abort the
/// batch; store-level problems roll everything back.
pub fn ingest_batch(store: &Store, body: Value, meta: &BatchMeta) -> StoreResult<IngestSummary> {
    let now = Utc::now();
    let items = resolve_envelope(body);

    tracing::info!(
        session_id = %meta.session_id,
        automation_type = %meta.automation_type,
        items = items.len(),
        "processing ingestion batch"
    );

    let mut conn = store.connect()?;
    let tx = conn.transaction()?;

    let ctx = BatchContext {
        high_frequency_glucose: meta.is_high_frequency(),
        now,
    };
    let write_meta = WriteMeta {
        session_id: Some(&meta.session_id),
        automation_type: Some(&meta.automation_type),
    };

    let mut writer = DedupWriter::new(&tx, write_meta);
    let mut dropped = 0usize;
    let mut timestamp_fallbacks = 0usize;

    for item in &items {
        let classification = classify(item, &ctx);
        if classification.timestamp_fallback {
            timestamp_fallbacks += 1;
        }

        let write_result = match classification.outcome {
            Classified::Glucose(sample) => writer.write_glucose(&sample),
            Classified::Sleep(session) => writer.write_sleep(&session),
            Classified::Exercise(session) => writer.write_exercise(&session),
            Classified::Rejected(reason) => {
                tracing::debug!(%reason, "dropping unroutable item");
                dropped += 1;
                continue;
            }
        };

        match write_result {
            Ok(_) => {}
            // An invariant caught at write time is an item problem, not
            // a store problem: drop the item and keep going.
            Err(StoreError::InvalidSample(detail)) => {
                tracing::warn!(%detail, "dropping invalid sample");
                dropped += 1;
            }
            // Anything else is a real persistence failure; the
            // transaction drops here and rolls the batch back.
            Err(err) => return Err(err),
        }
    }

    let counts = writer.counts();
    tx.commit()?;

    let summary = summary_from(counts, dropped, timestamp_fallbacks, meta, now);
    tracing::info!(
        glucose = summary.processed_glucose,
        sleep = summary.processed_sleep,
        exercise = summary.processed_exercise,
        dropped = summary.processed_other,
        duplicates = summary.duplicates,
        "batch committed"
    );

    Ok(summary)
}

fn summary_from(
    counts: StreamCounts,
    dropped: usize,
    timestamp_fallbacks: usize,
    meta: &BatchMeta,
    now: DateTime<Utc>,
) -> IngestSummary {
    IngestSummary {
        processed_glucose: counts.glucose,
        processed_sleep: counts.sleep,
        processed_exercise: counts.exercise,
        processed_other: dropped,
        duplicates: counts.duplicates,
        timestamp_fallbacks,
        session_id: meta.session_id.clone(),
        automation_type: meta.automation_type.clone(),
        timestamp: now,
    }
}
