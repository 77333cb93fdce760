//! Periodic background refresh of the campaign directory from the
//! relational source, mirroring the interval-driven background tasks
//! the tracker crate uses for health probing and recovery draining.

use crate::source::CampaignSource;
use crate::store::CampaignStore;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

pub fn spawn_refresh_task(
    source: Arc<dyn CampaignSource>,
    store: Arc<CampaignStore>,
    period: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            match source.fetch_active_campaigns().await {
                Ok(campaigns) => {
                    let count = campaigns.len();
                    store.replace_all(campaigns);
                    info!(count, "campaign directory refreshed");
                }
                Err(e) => {
                    error!(error = %e, "campaign directory refresh failed, keeping stale snapshot");
                }
            }
        }
    })
}
