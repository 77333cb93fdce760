//! EVEN pacing: spread spend evenly across the 24 hours of the day.

use crate::clamp01;
use pacer_core::types::BudgetStatus;

pub fn evaluate(status: &BudgetStatus, draw: f64) -> (f64, bool) {
    let target = (status.daily_budget / 24) as f64;

    if target <= 0.0 {
        return (1.0, false);
    }
    if status.hourly_spent == 0 {
        return (0.0, true);
    }

    let throttle = clamp01((status.hourly_spent as f64 - target) / target);
    let should_bid = if throttle <= 0.0 {
        true
    } else {
        draw >= throttle
    };
    (throttle, should_bid)
}
