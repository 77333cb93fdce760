//! End-to-end exercise of the decision engine against a fake counter
//! store, mirroring how a real request would move from campaign lookup
//! through the tracker, the breaker, and a pacing algorithm.

use async_trait::async_trait;
use pacer_breaker::{BreakerManager, CircuitBreakerConfig};
use pacer_campaigns::CampaignStore;
use pacer_core::types::{Campaign, CampaignStatus, DecisionReason, PacingMode};
use pacer_engine::DecisionEngine;
use pacer_store::client::{CounterStore, PipelineOp, PipelineResult, StoreError};
use pacer_tracker::BudgetTracker;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

#[derive(Default)]
struct FakeStore {
    values: Mutex<HashMap<String, i64>>,
    fail: AtomicBool,
}

#[async_trait]
impl CounterStore for FakeStore {
    async fn incr_by(&self, key: &str, delta: i64, _ttl_secs: u64) -> Result<i64, StoreError> {
        if self.fail.load(Ordering::Relaxed) {
            return Err(StoreError::Transport("down".into()));
        }
        let mut v = self.values.lock().await;
        let e = v.entry(key.to_string()).or_insert(0);
        *e += delta;
        Ok(*e)
    }

    async fn get(&self, key: &str) -> Result<Option<i64>, StoreError> {
        if self.fail.load(Ordering::Relaxed) {
            return Err(StoreError::Transport("down".into()));
        }
        Ok(self.values.lock().await.get(key).copied())
    }

    async fn set(&self, key: &str, value: i64, _ttl_secs: u64) -> Result<(), StoreError> {
        if self.fail.load(Ordering::Relaxed) {
            return Err(StoreError::Transport("down".into()));
        }
        self.values.lock().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn pipeline(&self, ops: Vec<PipelineOp>) -> Result<Vec<PipelineResult>, StoreError> {
        if self.fail.load(Ordering::Relaxed) {
            return Err(StoreError::Transport("down".into()));
        }
        let mut v = self.values.lock().await;
        let mut out = Vec::with_capacity(ops.len());
        for op in ops {
            match op {
                PipelineOp::IncrBy { key, delta, .. } => {
                    let e = v.entry(key).or_insert(0);
                    *e += delta;
                    out.push(PipelineResult::Incremented(*e));
                }
                PipelineOp::Get { key } => out.push(PipelineResult::Value(v.get(&key).copied())),
                PipelineOp::Set { key, value, .. } => {
                    v.insert(key, value);
                    out.push(PipelineResult::Set);
                }
            }
        }
        Ok(out)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        if self.fail.load(Ordering::Relaxed) {
            Err(StoreError::Transport("down".into()))
        } else {
            Ok(())
        }
    }
}

fn make_engine(store: Arc<FakeStore>) -> DecisionEngine {
    let campaigns = Arc::new(CampaignStore::new());
    campaigns.replace_all(vec![
        Campaign {
            id: "c1".to_string(),
            daily_budget: 24_000_000,
            pacing_mode: PacingMode::Even,
            status: CampaignStatus::Active,
        },
        Campaign {
            id: "zero-budget".to_string(),
            daily_budget: 0,
            pacing_mode: PacingMode::Even,
            status: CampaignStatus::Active,
        },
    ]);
    let tracker = BudgetTracker::new(store, chrono_tz::UTC, Duration::from_secs(0));
    let breakers = Arc::new(BreakerManager::new(CircuitBreakerConfig::default()));
    DecisionEngine::new(campaigns, tracker, breakers)
}

async fn settle() {
    tokio::task::yield_now().await;
    tokio::time::sleep(Duration::from_millis(20)).await;
}

#[tokio::test]
async fn unknown_campaign_is_refused_without_touching_the_store() {
    let store = Arc::new(FakeStore::default());
    let engine = make_engine(store);
    let decision = engine.decide("missing", 100).await;
    assert!(!decision.allow_bid);
    assert_eq!(decision.reason, DecisionReason::CampaignNotFound);
}

#[tokio::test]
async fn a_fresh_campaign_within_budget_clears_a_modest_bid() {
    let store = Arc::new(FakeStore::default());
    let engine = make_engine(store);
    let decision = engine.decide("c1", 1_000).await;
    assert!(decision.allow_bid);
    assert_eq!(decision.reason, DecisionReason::WithinBudget);
    assert_eq!(decision.max_bid_cents, 1_000);
}

#[tokio::test]
async fn spend_past_the_breaker_threshold_trips_the_circuit() {
    let store = Arc::new(FakeStore::default());
    let engine = make_engine(store);

    // 96% of the daily budget, comfortably past the 95% trip threshold.
    engine.report_spend("c1", 23_040_000);
    settle().await;

    let decision = engine.decide("c1", 1_000).await;
    assert!(!decision.allow_bid);
    assert_eq!(decision.reason, DecisionReason::CircuitBreaker);
}

#[tokio::test]
async fn zero_daily_budget_is_reported_as_budget_exhausted_not_circuit_breaker() {
    let store = Arc::new(FakeStore::default());
    let engine = make_engine(store);

    let decision = engine.decide("zero-budget", 1_000).await;
    assert!(!decision.allow_bid);
    assert_eq!(decision.reason, DecisionReason::BudgetExhausted);
}

#[tokio::test]
async fn a_degraded_store_still_produces_a_conservative_decision() {
    let store = Arc::new(FakeStore::default());
    let engine = make_engine(store.clone());

    engine.report_spend("c1", 1_000);
    settle().await;

    store.fail.store(true, Ordering::Relaxed);
    let decision = engine.decide("c1", 1_000).await;
    assert_eq!(decision.warning.as_deref(), Some("degraded"));
    assert!(decision.throttle_rate >= 0.5);
}

#[tokio::test]
async fn status_snapshot_reports_both_budget_and_breaker_state() {
    let store = Arc::new(FakeStore::default());
    let engine = make_engine(store);

    engine.report_spend("c1", 5_000);
    settle().await;

    let snapshot = engine.status_snapshot("c1").await.expect("campaign exists");
    assert_eq!(snapshot.status.daily_spent, 5_000);
    assert!(snapshot.breaker.is_some());
}
