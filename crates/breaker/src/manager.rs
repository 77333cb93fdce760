//! Owns a mapping of `campaign_id -> CircuitBreaker`, created on first
//! reference under a lock-free double-checked insert via `DashMap`.

use crate::breaker::{BreakerSnapshot, CircuitBreaker, CircuitBreakerConfig};
use dashmap::DashMap;
use pacer_core::types::BudgetStatus;
use std::sync::Arc;

pub struct BreakerManager {
    breakers: DashMap<String, Arc<CircuitBreaker>>,
    config: CircuitBreakerConfig,
}

impl BreakerManager {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            breakers: DashMap::new(),
            config,
        }
    }

    fn get_or_create(&self, campaign_id: &str) -> Arc<CircuitBreaker> {
        self.breakers
            .entry(campaign_id.to_string())
            .or_insert_with(|| Arc::new(CircuitBreaker::new(campaign_id, self.config.clone())))
            .clone()
    }

    pub fn allow(&self, campaign_id: &str, status: &BudgetStatus) -> bool {
        self.get_or_create(campaign_id).allow(status)
    }

    pub fn record_success(&self, campaign_id: &str) {
        self.get_or_create(campaign_id).record_success();
    }

    pub fn record_failure(&self, campaign_id: &str) {
        self.get_or_create(campaign_id).record_failure();
    }

    pub fn reset(&self, campaign_id: &str) {
        self.get_or_create(campaign_id).reset();
    }

    pub fn snapshot(&self, campaign_id: &str) -> Option<BreakerSnapshot> {
        self.breakers.get(campaign_id).map(|b| b.snapshot())
    }

    /// Read-only snapshot of every breaker referenced so far.
    pub fn snapshot_all(&self) -> Vec<(String, BreakerSnapshot)> {
        self.breakers
            .iter()
            .map(|e| (e.key().clone(), e.value().snapshot()))
            .collect()
    }
}
