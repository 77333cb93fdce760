//! Background recovery drain: while the counter store is healthy and
//! the recovery queue is non-empty, writes each queued campaign's live
//! in-memory snapshot back as absolute values, then clears the queue.

use crate::tracker::BudgetTracker;
use pacer_store::client::PipelineOp;
use pacer_store::keys::{self, BucketClock};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Spawn the recovery task. Runs forever at `period`, cancellable only
/// by dropping the returned handle at process shutdown.
pub fn spawn_recovery_task(
    tracker: Arc<BudgetTracker>,
    period: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            if tracker.is_healthy() {
                drain_once(&tracker).await;
            }
        }
    })
}

async fn drain_once(tracker: &Arc<BudgetTracker>) {
    let pending = tracker.recovery_pending();
    if pending.is_empty() {
        return;
    }

    let mut drained = 0usize;
    for campaign_id in pending {
        let Some(snapshot) = tracker.cache_snapshot(&campaign_id) else {
            tracker.recovery_dequeue(&campaign_id);
            continue;
        };
        let snapshot_clock = clock_for(&snapshot);

        let ops = vec![
            PipelineOp::Set {
                key: keys::day_key(&campaign_id, snapshot_clock),
                value: snapshot.daily_spent,
                ttl_secs: keys::DAY_TTL_SECS,
            },
            PipelineOp::Set {
                key: keys::hour_key(&campaign_id, snapshot_clock),
                value: snapshot.hourly_spent,
                ttl_secs: keys::HOUR_TTL_SECS,
            },
            PipelineOp::IncrBy {
                key: keys::total_key(&campaign_id),
                delta: snapshot.unsynced_total,
                ttl_secs: keys::TOTAL_TTL_SECS,
            },
        ];

        match tracker.store().pipeline(ops).await {
            Ok(_) => {
                tracker.recovery_dequeue(&campaign_id);
                tracker.clear_unsynced(&campaign_id, snapshot.unsynced_total);
                drained += 1;
            }
            Err(e) => {
                warn!(campaign_id = %campaign_id, error = %e, "recovery drain failed, will retry next tick");
                tracker.recovery_requeue(&campaign_id);
            }
        }
    }

    if drained > 0 {
        info!(drained, "recovery drain completed");
        metrics::counter!("tracker.recovery_drained").increment(drained as u64);
    }
}

/// Build a bucket clock from the snapshot's own stored date/hour rather
/// than "now", so a snapshot taken near a bucket boundary still writes
/// to the key it actually accumulated under.
fn clock_for(snapshot: &crate::memory::MemoryBudget) -> BucketClock {
    BucketClock {
        date: snapshot.current_date(),
        hour: snapshot.current_hour(),
    }
}
