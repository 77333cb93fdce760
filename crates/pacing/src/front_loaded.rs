//! FRONT_LOADED pacing: spends 70% of the daily budget across hours
//! 0-11 and the remaining 30% across hours 12-23.

use pacer_core::types::BudgetStatus;

const MORNING_SHARE: f64 = 0.7;
const AFTERNOON_SHARE: f64 = 0.3;
const HALF_DAY_HOURS: f64 = 12.0;
const REJECT_THRESHOLD: f64 = 0.8;

fn hourly_target(daily_budget: i64, hour: u8) -> f64 {
    let daily_budget = daily_budget as f64;
    if hour < 12 {
        MORNING_SHARE * daily_budget / HALF_DAY_HOURS
    } else {
        AFTERNOON_SHARE * daily_budget / HALF_DAY_HOURS
    }
}

pub fn evaluate(status: &BudgetStatus, draw: f64) -> (f64, bool) {
    let target = hourly_target(status.daily_budget, status.current_hour);

    let throttle = if target <= 0.0 {
        1.0
    } else {
        let over = (status.hourly_spent as f64 - target) / target;
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
            campaign_id: "fl".to_string(),
            daily_budget: 1_200_000,
            daily_spent: 0,
            hourly_budget: 50_000,
            hourly_spent,
            current_hour: hour,
            remaining_hours: 24 - hour,
            pacing_mode: PacingMode::FrontLoaded,
            throttle_rate: 0.0,
            circuit_breaker_on: false,
            degraded_mode: false,
        }
    }

    #[test]
    fn morning_under_target_has_no_throttle() {
        let (throttle, should_bid) = evaluate(&status(6, 60_000), 0.0);
        assert_eq!(throttle, 0.0);
        assert!(should_bid);
    }

    #[test]
    fn afternoon_over_target_is_rejected_outright() {
        let (throttle, should_bid) = evaluate(&status(15, 60_000), 0.0);
        assert_eq!(throttle, 1.0);
        assert!(!should_bid);
    }
}
