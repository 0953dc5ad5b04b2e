//! Application state for the API server.

use std::sync::Arc;
use std::time::Instant;

use aisle_coordinator::Assistant;

/// Shared state: the process's single assistant session.
pub struct AppState {
    pub assistant: Arc<Assistant>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(assistant: Arc<Assistant>) -> Self {
        Self {
            assistant,
            start_time: Instant::now(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
