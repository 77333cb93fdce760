//! Request/response DTOs and axum handlers for the four endpoints the
//! ad exchange actually calls: a decision, a spend report, a status
//! read, and a health check.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct PacingDecisionRequest {
    pub campaign_id: String,
    pub bid_cents: i64,
}

#[derive(Debug, Serialize)]
pub struct PacingDecisionResponse {
    pub allow_bid: bool,
    pub max_bid_cents: i64,
    pub throttle_rate: f64,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

pub async fn decide(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PacingDecisionRequest>,
) -> Json<PacingDecisionResponse> {
    let decision = state.engine.decide(&req.campaign_id, req.bid_cents).await;
    Json(PacingDecisionResponse {
        allow_bid: decision.allow_bid,
        max_bid_cents: decision.max_bid_cents,
        throttle_rate: decision.throttle_rate,
        reason: decision.reason.as_str().to_string(),
        warning: decision.warning,
    })
}

#[derive(Debug, Deserialize)]
pub struct SpendTrackRequest {
    pub campaign_id: String,
    pub spend_cents: i64,
    #[allow(dead_code)]
    pub impressions: i64,
}

#[derive(Debug, Serialize)]
pub struct SpendTrackResponse {
    pub status: &'static str,
}

pub async fn track_spend(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SpendTrackRequest>,
) -> Json<SpendTrackResponse> {
    state.engine.report_spend(&req.campaign_id, req.spend_cents);
    Json(SpendTrackResponse { status: "success" })
}

#[derive(Debug, Serialize)]
pub struct BudgetStatusResponse {
    pub campaign_id: String,
    pub daily_budget: i64,
    pub daily_spent: i64,
    pub hourly_budget: i64,
    pub hourly_spent: i64,
    pub current_hour: u8,
    pub remaining_hours: u8,
    pub throttle_rate: f64,
    pub circuit_breaker_on: bool,
    pub degraded_mode: bool,
    pub breaker_state: Option<&'static str>,
}

pub async fn budget_status(
    State(state): State<Arc<AppState>>,
    Path(campaign_id): Path<String>,
) -> Result<Json<BudgetStatusResponse>, StatusCode> {
    let Some(snapshot) = state.engine.status_snapshot(&campaign_id).await else {
        return Err(StatusCode::NOT_FOUND);
    };
    let status = snapshot.status;
    let breaker_state = snapshot.breaker.map(|b| match b.state {
        pacer_breaker::BreakerState::Closed => "closed",
        pacer_breaker::BreakerState::Open => "open",
        pacer_breaker::BreakerState::HalfOpen => "half_open",
    });

    Ok(Json(BudgetStatusResponse {
        campaign_id: status.campaign_id,
        daily_budget: status.daily_budget,
        daily_spent: status.daily_spent,
        hourly_budget: status.hourly_budget,
        hourly_spent: status.hourly_spent,
        current_hour: status.current_hour,
        remaining_hours: status.remaining_hours,
        throttle_rate: status.throttle_rate,
        circuit_breaker_on: status.circuit_breaker_on,
        degraded_mode: status.degraded_mode,
        breaker_state,
    }))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub tracker_healthy: bool,
    pub uptime_secs: u64,
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let tracker_healthy = state.tracker.is_healthy();
    Json(HealthResponse {
        status: if tracker_healthy { "ok" } else { "degraded" },
        tracker_healthy,
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}
