//! Resilient budget tracker: the in-memory fallback cache, the health
//! machine that decides whether to trust the counter store, and the
//! background recovery drain that reconciles the two after an outage.

mod health;
mod memory;
mod recovery;
mod tracker;

pub use health::spawn_health_prober;
pub use memory::MemoryBudget;
pub use recovery::spawn_recovery_task;
pub use tracker::BudgetTracker;
