//! Per-campaign circuit breaker. A three-state guard that vetoes bids
//! independently of the pacing algorithm when a hard safety condition
//! holds: spend above a threshold, or a burst of upstream failures.

use pacer_core::types::BudgetStatus;
use parking_lot::Mutex;
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    pub budget_threshold: f64,
    pub max_failures: u32,
    pub timeout: Duration,
    pub success_threshold: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            budget_threshold: 0.95,
            max_failures: 3,
            timeout: Duration::from_secs(300),
            success_threshold: 2,
        }
    }
}

#[derive(Debug)]
struct BreakerInner {
    state: BreakerState,
    failure_count: u32,
    success_count: u32,
    last_failure_time: Option<Instant>,
    last_state_change: Instant,
}

impl BreakerInner {
    fn fresh() -> Self {
        Self {
            state: BreakerState::Closed,
            failure_count: 0,
            success_count: 0,
            last_failure_time: None,
            last_state_change: Instant::now(),
        }
    }
}

/// Read-only view of a breaker's current state, for status endpoints.
#[derive(Debug, Clone)]
pub struct BreakerSnapshot {
    pub state: BreakerState,
    pub failure_count: u32,
    pub success_count: u32,
    pub since_last_state_change: Duration,
}

/// Per-campaign breaker. Created on first reference, retained for the
/// process lifetime. `allow` mutates state and must run under its own
/// write lock; it is never called concurrently with itself for the same
/// campaign because the manager hands out one `Arc` per campaign id.
pub struct CircuitBreaker {
    campaign_id: String,
    config: CircuitBreakerConfig,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    pub fn new(campaign_id: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            campaign_id: campaign_id.into(),
            config,
            inner: Mutex::new(BreakerInner::fresh()),
        }
    }

    fn trip(&self, inner: &mut BreakerInner, reason: &str) {
        inner.state = BreakerState::Open;
        inner.failure_count = 0;
        inner.success_count = 0;
        inner.last_state_change = Instant::now();
        warn!(
            campaign_id = %self.campaign_id,
            reason,
            "circuit breaker tripped open"
        );
        metrics::counter!("breaker.trips", "reason" => reason.to_string()).increment(1);
    }

    /// Evaluate whether a bid should be admitted, mutating state as a
    /// side effect (trip on budget/failure thresholds, half-open probe
    /// transitions on timeout expiry).
    pub fn allow(&self, status: &BudgetStatus) -> bool {
        let mut inner = self.inner.lock();

        if status.spent_fraction() >= self.config.budget_threshold {
            if inner.state != BreakerState::Open {
                self.trip(&mut inner, "budget");
            }
            return false;
        }

        if inner.state == BreakerState::Closed && inner.failure_count >= self.config.max_failures {
            self.trip(&mut inner, "failures");
            return false;
        }

        match inner.state {
            BreakerState::Closed => true,
            BreakerState::Open => {
                if inner.last_state_change.elapsed() > self.config.timeout {
                    inner.state = BreakerState::HalfOpen;
                    inner.failure_count = 0;
                    inner.success_count = 0;
                    inner.last_state_change = Instant::now();
                    info!(campaign_id = %self.campaign_id, "circuit breaker half-open probe");
                    true
                } else {
                    false
                }
            }
            BreakerState::HalfOpen => inner.success_count < self.config.success_threshold,
        }
    }

    pub fn record_success(&self) {
        let mut inner = self.inner.lock();
        inner.failure_count = 0;
        if inner.state == BreakerState::HalfOpen {
            inner.success_count += 1;
            if inner.success_count >= self.config.success_threshold {
                inner.state = BreakerState::Closed;
                inner.last_state_change = Instant::now();
                inner.success_count = 0;
                info!(campaign_id = %self.campaign_id, "circuit breaker closed after recovery");
            }
        }
    }

    pub fn record_failure(&self) {
        let mut inner = self.inner.lock();
        inner.failure_count += 1;
        inner.last_failure_time = Some(Instant::now());

        match inner.state {
            BreakerState::HalfOpen => self.trip(&mut inner, "half_open_probe_failed"),
            BreakerState::Closed if inner.failure_count >= self.config.max_failures => {
                self.trip(&mut inner, "failures")
            }
            _ => {}
        }
    }

    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        *inner = BreakerInner::fresh();
        info!(campaign_id = %self.campaign_id, "circuit breaker reset");
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let inner = self.inner.lock();
        BreakerSnapshot {
            state: inner.state,
            failure_count: inner.failure_count,
            success_count: inner.success_count,
            since_last_state_change: inner.last_state_change.elapsed(),
        }
    }
}
