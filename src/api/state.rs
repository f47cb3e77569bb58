//! Application state
//!
//! Shared state accessible by all API handlers. The store handle is a
//! path, not a connection: handlers clone it into blocking tasks and
//! open per-call connections there.

use crate::config::ApiConfig;
use crate::store::Store;
use std::time::Instant;

/// Shared application state for all handlers
#[derive(Clone)]
pub struct AppState {
    /// Sample store; connections are opened per call
    pub store: Store,
    /// API configuration
    pub config: ApiConfig,
    /// Server start time for uptime reporting
    pub start_time: Instant,
}

impl AppState {
    pub fn new(store: Store, config: ApiConfig) -> Self {
        Self {
            store,
            config,
            start_time: Instant::now(),
        }
    }
}
