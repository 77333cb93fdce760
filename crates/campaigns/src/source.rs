//! Boundary to the relational store that owns campaign configuration
//! and the append-only spend log. The core only ever reads campaigns
//! through `CampaignSource` and only ever writes through `SpendSink`;
//! neither trait exposes CRUD beyond that, which belongs to the
//! external administration surface named out of scope in the system
//! overview.

use async_trait::async_trait;
use pacer_core::types::{Campaign, CampaignStatus, PacingMode};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;

/// Read-only source of `(campaign_id, daily_budget, pacing_mode,
/// status)` tuples, refreshed periodically by `spawn_refresh_task`.
#[async_trait]
pub trait CampaignSource: Send + Sync {
    async fn fetch_active_campaigns(&self) -> anyhow::Result<Vec<Campaign>>;
}

/// Write-only sink for the append-only spend history. The core never
/// reads this log back; a failed write is logged and dropped, matching
/// "fire-and-forget from the core's perspective" in the external
/// interfaces section.
#[async_trait]
pub trait SpendSink: Send + Sync {
    async fn record_spend(
        &self,
        campaign_id: &str,
        spend_cents: i64,
        impressions: i64,
    ) -> anyhow::Result<()>;
}

#[derive(sqlx::FromRow)]
struct CampaignRow {
    id: String,
    daily_budget_cents: i64,
    pacing_mode: String,
    status: String,
}

fn parse_pacing_mode(raw: &str) -> Option<PacingMode> {
    match raw {
        "EVEN" => Some(PacingMode::Even),
        "ASAP" => Some(PacingMode::Asap),
        "FRONT_LOADED" => Some(PacingMode::FrontLoaded),
        "ADAPTIVE" => Some(PacingMode::Adaptive),
        _ => None,
    }
}

fn parse_status(raw: &str) -> CampaignStatus {
    match raw {
        "ACTIVE" => CampaignStatus::Active,
        "PAUSED" => CampaignStatus::Paused,
        _ => CampaignStatus::Archived,
    }
}

/// Postgres-backed implementation. Campaign administration (creating,
/// editing, pausing a campaign) happens entirely outside the core; this
/// adapter only ever issues the one read query it needs.
pub struct PostgresCampaignSource {
    pool: PgPool,
}

impl PostgresCampaignSource {
    pub async fn connect(url: &str, connect_timeout: Duration) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(connect_timeout)
            .connect(url)
            .await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl CampaignSource for PostgresCampaignSource {
    async fn fetch_active_campaigns(&self) -> anyhow::Result<Vec<Campaign>> {
        let rows = sqlx::query_as::<_, CampaignRow>(
            "SELECT id, daily_budget_cents, pacing_mode, status FROM campaigns WHERE status = 'ACTIVE'",
        )
        .fetch_all(&self.pool)
        .await?;

        let campaigns = rows
            .into_iter()
            .filter_map(|row| {
                let pacing_mode = parse_pacing_mode(&row.pacing_mode)?;
                Some(Campaign {
                    id: row.id,
                    daily_budget: row.daily_budget_cents,
                    pacing_mode,
                    status: parse_status(&row.status),
                })
            })
            .collect();

        Ok(campaigns)
    }
}

/// Append-only writer for the `spend_log` table.
pub struct PostgresSpendSink {
    pool: PgPool,
}

impl PostgresSpendSink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SpendSink for PostgresSpendSink {
    async fn record_spend(
        &self,
        campaign_id: &str,
        spend_cents: i64,
        impressions: i64,
    ) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO spend_log (campaign_id, spend_cents, impressions, recorded_at) \
             VALUES ($1, $2, $3, now())",
        )
        .bind(campaign_id)
        .bind(spend_cents)
        .bind(impressions)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_pacing_mode_is_rejected() {
        assert!(parse_pacing_mode("UNKNOWN").is_none());
        assert_eq!(parse_pacing_mode("EVEN"), Some(PacingMode::Even));
    }

    #[test]
    fn unknown_status_falls_back_to_archived() {
        assert_eq!(parse_status("DELETED"), CampaignStatus::Archived);
        assert_eq!(parse_status("ACTIVE"), CampaignStatus::Active);
    }
}
