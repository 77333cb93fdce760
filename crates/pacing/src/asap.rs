//! ASAP pacing: spend as fast as possible, throttling only once the
//! daily budget is mostly consumed.

use pacer_core::types::BudgetStatus;

pub fn evaluate(status: &BudgetStatus, draw: f64) -> (f64, bool) {
    let fraction = status.spent_fraction();

    let throttle = if fraction < 0.80 {
        0.0
    } else if fraction < 0.90 {
        0.2
    } else if fraction < 0.95 {
        0.5
    } else {
        0.9
    };

    let should_bid = if throttle <= 0.0 { true } else { draw >= throttle };
    (throttle, should_bid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pacer_core::types::PacingMode;

    fn status(daily_spent: i64) -> BudgetStatus {
        BudgetStatus {
            campaign_id: "b".to_string(),
            daily_budget: 1_000_000,
            daily_spent,
            hourly_budget: 41_666,
            hourly_spent: 0,
            current_hour: 10,
            remaining_hours: 14,
            pacing_mode: PacingMode::Asap,
            throttle_rate: 0.0,
            circuit_breaker_on: false,
            degraded_mode: false,
        }
    }

    #[test]
    fn high_spend_throttles_at_point_nine() {
        let (throttle, _) = evaluate(&status(960_000), 0.0);
        assert_eq!(throttle, 0.9);
    }

    #[test]
    fn low_spend_never_throttles() {
        let (throttle, should_bid) = evaluate(&status(100_000), 0.99);
        assert_eq!(throttle, 0.0);
        assert!(should_bid);
    }

    #[test]
    fn step_boundaries_match_table() {
        assert_eq!(evaluate(&status(799_000), 0.0).0, 0.0);
        assert_eq!(evaluate(&status(800_000), 0.0).0, 0.2);
        assert_eq!(evaluate(&status(900_000), 0.0).0, 0.5);
        assert_eq!(evaluate(&status(950_000), 0.0).0, 0.9);
    }
}
