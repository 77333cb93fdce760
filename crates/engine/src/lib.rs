//! Decision engine: the single place that composes the campaign
//! directory, the budget tracker, the circuit breaker, and a pacing
//! algorithm into one bid decision. Everything below this crate is
//! pure or purely mechanical; this is where the policy lives.

mod status;

pub use status::StatusSnapshot;

use pacer_breaker::BreakerManager;
use pacer_campaigns::CampaignStore;
use pacer_core::types::{Decision, DecisionReason, DEGRADED_WARNING};
use pacer_store::keys::BucketClock;
use pacer_tracker::BudgetTracker;
use rand::Rng;
use std::sync::Arc;
use tracing::info;

/// Wires the campaign directory, tracker, breaker, and pacing
/// algorithms into the two operations the API surface exposes:
/// deciding whether to bid, and recording that a bid won and spent.
pub struct DecisionEngine {
    campaigns: Arc<CampaignStore>,
    tracker: Arc<BudgetTracker>,
    breakers: Arc<BreakerManager>,
}

impl DecisionEngine {
    pub fn new(
        campaigns: Arc<CampaignStore>,
        tracker: Arc<BudgetTracker>,
        breakers: Arc<BreakerManager>,
    ) -> Self {
        Self {
            campaigns,
            tracker,
            breakers,
        }
    }

    /// `target_bid_cents` is the price the caller would otherwise bid;
    /// the returned decision either clears it, lowers it to a ceiling,
    /// or refuses it outright with a reason.
    pub async fn decide(&self, campaign_id: &str, target_bid_cents: i64) -> Decision {
        let Some(campaign) = self.campaigns.get(campaign_id) else {
            return Decision {
                allow_bid: false,
                max_bid_cents: 0,
                throttle_rate: 1.0,
                reason: DecisionReason::CampaignNotFound,
                warning: None,
            };
        };

        if !campaign.is_active() {
            return Decision {
                allow_bid: false,
                max_bid_cents: 0,
                throttle_rate: 1.0,
                reason: DecisionReason::CampaignNotFound,
                warning: None,
            };
        }

        let clock = self.tracker.clock();
        let mut status = self
            .tracker
            .get_budget_status(campaign_id, campaign.daily_budget, campaign.pacing_mode, clock)
            .await;

        // Checked ahead of the breaker: `spent_fraction` saturates to 1.0
        // once the budget is gone (or was never positive), which would
        // otherwise always trip the breaker first and make
        // `BudgetExhausted` unreachable.
        if status.is_budget_exhausted() {
            return Decision {
                allow_bid: false,
                max_bid_cents: 0,
                throttle_rate: 1.0,
                reason: DecisionReason::BudgetExhausted,
                warning: degraded_warning(&status),
            };
        }

        let breaker_allows = self.breakers.allow(campaign_id, &status);
        status.circuit_breaker_on = !breaker_allows;

        if !breaker_allows {
            return Decision {
                allow_bid: false,
                max_bid_cents: 0,
                throttle_rate: 1.0,
                reason: DecisionReason::CircuitBreaker,
                warning: degraded_warning(&status),
            };
        }

        let draw: f64 = rand::thread_rng().gen();
        let outcome = pacer_pacing::evaluate(&status, draw);
        let throttle_rate = outcome.throttle_rate.max(status.throttle_rate);

        // In degraded mode the floor may exceed what the algorithm itself
        // computed; re-weigh an algorithm admit against the raised
        // throttle using the same draw rather than trusting the
        // algorithm's lower figure.
        let should_bid = if outcome.should_bid && status.degraded_mode {
            draw >= throttle_rate
        } else {
            outcome.should_bid
        };

        if !should_bid {
            return Decision {
                allow_bid: false,
                max_bid_cents: 0,
                throttle_rate,
                reason: DecisionReason::Throttled,
                warning: degraded_warning(&status),
            };
        }

        let remaining_cents = status.daily_budget - status.daily_spent;
        let max_bid_cents = pacer_pacing::max_bid(remaining_cents, target_bid_cents);

        Decision {
            allow_bid: max_bid_cents > 0,
            max_bid_cents,
            throttle_rate,
            reason: DecisionReason::WithinBudget,
            warning: degraded_warning(&status),
        }
    }

    /// Records a won bid's spend against a campaign and reports the
    /// outcome to the circuit breaker: the spend path only ever
    /// succeeds or is absorbed by the tracker's own degraded mode, so a
    /// call here always counts as a breaker success.
    pub fn report_spend(&self, campaign_id: &str, spend_cents: i64) {
        let clock = self.tracker.clock();
        self.tracker.track_spend(campaign_id, spend_cents, clock);
        self.breakers.record_success(campaign_id);
        info!(campaign_id, spend_cents, "spend recorded");
    }

    pub async fn status_snapshot(&self, campaign_id: &str) -> Option<StatusSnapshot> {
        let campaign = self.campaigns.get(campaign_id)?;
        let clock: BucketClock = self.tracker.clock();
        let status = self
            .tracker
            .get_budget_status(campaign_id, campaign.daily_budget, campaign.pacing_mode, clock)
            .await;
        let breaker = self.breakers.snapshot(campaign_id);
        Some(StatusSnapshot { status, breaker })
    }
}

fn degraded_warning(status: &pacer_core::types::BudgetStatus) -> Option<String> {
    if status.degraded_mode {
        Some(DEGRADED_WARNING.to_string())
    } else {
        None
    }
}
