//! Ingestion path: raw export batches to typed, deduplicated rows
//!
//! - [`timestamp`]: heterogeneous date-time strings to UTC instants
//! - [`classify`]: raw items to typed stream candidates (rule-table driven)
//! - [`pipeline`]: envelope resolution and the one-transaction batch driver

pub mod classify;
pub mod pipeline;
pub mod timestamp;

pub use classify::{classify, BatchContext, Classification, Classified, RejectReason};
pub use pipeline::{
    ingest_batch, resolve_envelope, BatchMeta, IngestSummary, HIGH_FREQUENCY_AUTOMATION,
};
pub use timestamp::{normalize, TimestampError};
