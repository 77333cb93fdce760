#![warn(clippy::unwrap_used)]

pub mod handlers;
pub mod server;

use pacer_engine::DecisionEngine;
use pacer_tracker::BudgetTracker;
use std::sync::Arc;
use std::time::Instant;

/// Shared state every handler reads from. Cheap to clone by design:
/// everything inside is already an `Arc`.
pub struct AppState {
    pub engine: DecisionEngine,
    pub tracker: Arc<BudgetTracker>,
    pub start_time: Instant,
}

pub use server::ApiServer;
