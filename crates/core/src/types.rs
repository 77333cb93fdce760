use serde::{Deserialize, Serialize};

/// Pacing strategy that shapes how a campaign's daily budget is spent
/// over the day.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PacingMode {
    Even,
    Asap,
    FrontLoaded,
    Adaptive,
}

/// Campaign lifecycle status. Only `Active` campaigns are decisioned.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CampaignStatus {
    Active,
    Paused,
    Archived,
}

/// Read-only campaign record as refreshed from the relational store.
/// `daily_budget` is in the smallest currency unit (cents).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Campaign {
    pub id: String,
    pub daily_budget: i64,
    pub pacing_mode: PacingMode,
    pub status: CampaignStatus,
}

impl Campaign {
    pub fn is_active(&self) -> bool {
        self.status == CampaignStatus::Active
    }

    /// `daily_budget / 24`, truncated. Intentionally normative per the
    /// source system: a campaign's hourly budget never rounds up.
    pub fn hourly_budget(&self) -> i64 {
        self.daily_budget / 24
    }
}

/// Derived, request-scoped snapshot of a campaign's spend state, filled
/// in by the tracker, the breaker, and the pacing algorithm in turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetStatus {
    pub campaign_id: String,
    pub daily_budget: i64,
    pub daily_spent: i64,
    pub hourly_budget: i64,
    pub hourly_spent: i64,
    pub current_hour: u8,
    pub remaining_hours: u8,
    pub pacing_mode: PacingMode,
    pub throttle_rate: f64,
    pub circuit_breaker_on: bool,
    pub degraded_mode: bool,
}

impl BudgetStatus {
    pub fn spent_fraction(&self) -> f64 {
        if self.daily_budget <= 0 {
            1.0
        } else {
            self.daily_spent as f64 / self.daily_budget as f64
        }
    }

    pub fn is_budget_exhausted(&self) -> bool {
        self.daily_spent >= self.daily_budget
    }
}

/// Reason code surfaced on every decision response. These are the only
/// user-visible strings the decision path produces.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DecisionReason {
    WithinBudget,
    Throttled,
    CircuitBreaker,
    BudgetExhausted,
    CampaignNotFound,
}

impl DecisionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WithinBudget => "within_budget",
            Self::Throttled => "throttled",
            Self::CircuitBreaker => "circuit_breaker",
            Self::BudgetExhausted => "budget_exhausted",
            Self::CampaignNotFound => "campaign_not_found",
        }
    }
}

/// Result of a single `/pacing/decision` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    pub allow_bid: bool,
    pub max_bid_cents: i64,
    pub throttle_rate: f64,
    pub reason: DecisionReason,
    pub warning: Option<String>,
}

pub const DEGRADED_WARNING: &str = "degraded";
