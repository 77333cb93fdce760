//! ADAPTIVE pacing: per-hour target shaped by a traffic-profile curve.
//! The multiplier table is a fixed default; learning per-campaign
//! curves from observed data is aspirational and out of scope here (see
//! the open questions in the design notes).

use pacer_core::types::BudgetStatus;

const REJECT_THRESHOLD: f64 = 0.9;
const THROTTLE_DAMPING: f64 = 0.5;

/// Default 24-hour traffic-profile multiplier, peaking mid-morning and
/// again in the early evening.
pub const DEFAULT_HOURLY_MULTIPLIERS: [f64; 24] = [
    0.3, 0.2, 0.2, 0.2, 0.3, 0.4, 0.6, 0.9, 1.3, 1.6, 1.4, 1.1, 1.0, 1.0, 1.1, 1.2, 1.3, 1.5, 1.8,
    1.6, 1.3, 1.0, 0.7, 0.5,
];

fn hourly_target(daily_budget: i64, hour: u8) -> f64 {
    let base = daily_budget as f64 / 24.0;
    base * DEFAULT_HOURLY_MULTIPLIERS[hour as usize % 24]
}

pub fn evaluate(status: &BudgetStatus, draw: f64) -> (f64, bool) {
    let target = hourly_target(status.daily_budget, status.current_hour);

    let throttle = if target <= 0.0 {
        1.0
    } else {
        let over = THROTTLE_DAMPING * (status.hourly_spent as f64 - target) / target;
        if over > 0.0 {
            over.min(1.0)
        } else {
            0.0
        }
    };

    let should_bid = if throttle > REJECT_THRESHOLD {
        false
    } else if throttle <= 0.0 {
        true
    } else {
        draw >= throttle
    };

    (throttle, should_bid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pacer_core::types::PacingMode;

    fn status(hour: u8, hourly_spent: i64) -> BudgetStatus {
        BudgetStatus {
            campaign_id: "ad".to_string(),
            daily_budget: 2_400_000,
            daily_spent: 0,
            hourly_budget: 100_000,
            hourly_spent,
            current_hour: hour,
            remaining_hours: 24 - hour,
            pacing_mode: PacingMode::Adaptive,
            throttle_rate: 0.0,
            circuit_breaker_on: false,
            degraded_mode: false,
        }
    }

    #[test]
    fn under_target_has_no_throttle() {
        let (throttle, should_bid) = evaluate(&status(9, 10_000), 0.0);
        assert_eq!(throttle, 0.0);
        assert!(should_bid);
    }

    #[test]
    fn far_over_target_is_rejected_outright() {
        // hour 1 multiplier is 0.2: target = 2_400_000/24 * 0.2 = 20_000
        let (throttle, should_bid) = evaluate(&status(1, 200_000), 0.0);
        assert!(throttle > REJECT_THRESHOLD);
        assert!(!should_bid);
    }

    #[test]
    fn damping_halves_the_raw_overage() {
        // hour 12 multiplier is 1.0: target = 100_000
        let (throttle, _) = evaluate(&status(12, 150_000), 0.0);
        assert!((throttle - 0.25).abs() < 1e-9);
    }
}
