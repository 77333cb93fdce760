use pacer_breaker::BreakerSnapshot;
use pacer_core::types::BudgetStatus;

/// Combined view returned to `GET /budget/status/{id}`: the tracker's
/// budget snapshot alongside the breaker's own state, which the
/// tracker's `BudgetStatus` only ever summarizes as a single bool.
pub struct StatusSnapshot {
    pub status: BudgetStatus,
    pub breaker: Option<BreakerSnapshot>,
}
