//! Pacing algorithms: four pure functions over `BudgetStatus` that
//! produce a throttle rate in `[0,1]`, an admit/reject verdict, and a
//! per-bid price ceiling. All are pure given a status and a uniform
//! random draw; none hold state between calls.

use pacer_core::types::{BudgetStatus, PacingMode};

mod adaptive;
mod asap;
mod even;
mod front_loaded;

pub use adaptive::DEFAULT_HOURLY_MULTIPLIERS;

/// Outcome of running a pacing algorithm against a status.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PacingOutcome {
    pub throttle_rate: f64,
    pub should_bid: bool,
}

/// Run the algorithm selected by `status.pacing_mode`. `draw` is a
/// uniform random sample in `[0, 1)`, supplied by the caller so the
/// function itself stays pure and testable.
pub fn evaluate(status: &BudgetStatus, draw: f64) -> PacingOutcome {
    if status.circuit_breaker_on {
        return PacingOutcome {
            throttle_rate: 1.0,
            should_bid: false,
        };
    }

    let (throttle_rate, mut should_bid) = match status.pacing_mode {
        PacingMode::Even => even::evaluate(status, draw),
        PacingMode::Asap => asap::evaluate(status, draw),
        PacingMode::FrontLoaded => front_loaded::evaluate(status, draw),
        PacingMode::Adaptive => adaptive::evaluate(status, draw),
    };

    if status.is_budget_exhausted() {
        should_bid = false;
    }

    PacingOutcome {
        throttle_rate,
        should_bid,
    }
}

/// Per-bid price ceiling: never more than the requested target, and
/// never more than a tenth of what remains of the daily budget, so a
/// single auction cannot spend more than 10% of the remainder.
pub fn max_bid(remaining_cents: i64, target_cents: i64) -> i64 {
    if remaining_cents <= 0 {
        return 0;
    }
    target_cents.min(remaining_cents / 10)
}

fn clamp01(x: f64) -> f64 {
    x.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(pacing_mode: PacingMode) -> BudgetStatus {
        BudgetStatus {
            campaign_id: "c1".to_string(),
            daily_budget: 24_000_000,
            daily_spent: 0,
            hourly_budget: 1_000_000,
            hourly_spent: 0,
            current_hour: 0,
            remaining_hours: 24,
            pacing_mode,
            throttle_rate: 0.0,
            circuit_breaker_on: false,
            degraded_mode: false,
        }
    }

    #[test]
    fn breaker_forces_full_throttle_and_no_bid() {
        let mut s = status(PacingMode::Even);
        s.circuit_breaker_on = true;
        let out = evaluate(&s, 0.0);
        assert_eq!(out.throttle_rate, 1.0);
        assert!(!out.should_bid);
    }

    #[test]
    fn exhausted_budget_never_bids() {
        let mut s = status(PacingMode::Even);
        s.daily_spent = s.daily_budget;
        let out = evaluate(&s, 0.0);
        assert!(!out.should_bid);
    }

    #[test]
    fn max_bid_caps_to_ten_percent_of_remaining() {
        assert_eq!(max_bid(1_000_000, 2_000_000), 100_000);
        assert_eq!(max_bid(1_000_000, 50_000), 50_000);
        assert_eq!(max_bid(0, 100), 0);
        assert_eq!(max_bid(-5, 100), 0);
    }
}
