//! In-memory campaign directory. Authoritative between refreshes: a
//! lookup always answers from the last successfully fetched snapshot,
//! never blocks on the relational store, and never partially updates
//! (a refresh either replaces every entry or changes nothing).

use dashmap::DashMap;
use pacer_core::types::Campaign;

/// Snapshot of campaign configuration, refreshed wholesale by
/// `spawn_refresh_task`. Lookups never touch Postgres directly.
pub struct CampaignStore {
    campaigns: DashMap<String, Campaign>,
}

impl CampaignStore {
    pub fn new() -> Self {
        Self {
            campaigns: DashMap::new(),
        }
    }

    pub fn get(&self, campaign_id: &str) -> Option<Campaign> {
        self.campaigns.get(campaign_id).map(|entry| entry.clone())
    }

    pub fn len(&self) -> usize {
        self.campaigns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.campaigns.is_empty()
    }

    /// Replaces the whole snapshot. Campaigns missing from `fresh` (e.g.
    /// archived since the last refresh) are dropped, matching the
    /// source query's `WHERE status = 'ACTIVE'` filter.
    pub fn replace_all(&self, fresh: Vec<Campaign>) {
        let incoming: DashMap<String, Campaign> = fresh
            .into_iter()
            .map(|campaign| (campaign.id.clone(), campaign))
            .collect();

        self.campaigns.retain(|id, _| incoming.contains_key(id));
        for (id, campaign) in incoming {
            self.campaigns.insert(id, campaign);
        }
    }
}

impl Default for CampaignStore {
    fn default() -> Self {
        Self::new()
    }
}
