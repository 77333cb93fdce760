//! Background health prober: periodically pings the counter store and
//! flips the tracker's health flag on success. A false-to-true
//! transition is logged; the recovery task picks up the queue on its
//! own next tick rather than being triggered directly from here, so the
//! prober never has to reach across into recovery internals.

use crate::tracker::BudgetTracker;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

pub fn spawn_health_prober(tracker: Arc<BudgetTracker>, period: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            match tracker.store().ping().await {
                Ok(()) => tracker.mark_healthy(),
                Err(e) => {
                    if tracker.is_healthy() {
                        warn!(error = %e, "health probe failed");
                    }
                    tracker.mark_unhealthy_from_probe();
                }
            }
        }
    })
}
