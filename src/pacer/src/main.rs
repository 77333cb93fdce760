//! Campaign Pacer — real-time ad-exchange budget pacing core.
//!
//! Main entry point: loads configuration, connects the counter store
//! and the relational campaign source, wires the tracker/breaker/engine,
//! spawns the background tasks, and serves the pacing HTTP surface.

use clap::Parser;
use pacer_api::ApiServer;
use pacer_breaker::{BreakerManager, CircuitBreakerConfig};
use pacer_campaigns::{spawn_refresh_task, CampaignSource, CampaignStore, PostgresCampaignSource};
use pacer_core::config::AppConfig;
use pacer_engine::DecisionEngine;
use pacer_store::RedisCounterStore;
use pacer_tracker::BudgetTracker;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "pacer")]
#[command(about = "Real-time ad-exchange budget pacing core")]
#[command(version)]
struct Cli {
    /// Node identifier (overrides config)
    #[arg(long, env = "CAMPAIGN_PACER__NODE_ID")]
    node_id: Option<String>,

    /// HTTP port (overrides config)
    #[arg(long, env = "CAMPAIGN_PACER__API__HTTP_PORT")]
    http_port: Option<u16>,

    /// Metrics port (overrides config)
    #[arg(long, env = "CAMPAIGN_PACER__METRICS__PORT")]
    metrics_port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "campaign_pacer=info,tower_http=info".into()),
        )
        .json()
        .init();

    let cli = Cli::parse();

    info!("Campaign Pacer starting up");

    let mut config = AppConfig::load().unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        AppConfig::default()
    });

    if let Some(node_id) = cli.node_id {
        config.node_id = node_id;
    }
    if let Some(port) = cli.http_port {
        config.api.http_port = port;
    }
    if let Some(port) = cli.metrics_port {
        config.metrics.port = port;
    }

    info!(
        node_id = %config.node_id,
        http_port = config.api.http_port,
        "Configuration loaded"
    );

    let tz: chrono_tz::Tz = config.pacer.timezone.parse().unwrap_or_else(|_| {
        warn!(timezone = %config.pacer.timezone, "unrecognized timezone, falling back to UTC");
        chrono_tz::UTC
    });

    // Counter store: a failed connect here is logged but not fatal — the
    // tracker starts in degraded mode and the health prober picks it up
    // the moment Redis becomes reachable.
    let counter_store = match connect_with_retry("Redis", || RedisCounterStore::new(&config.redis)).await {
        Ok(store) => Arc::new(store) as Arc<dyn pacer_store::CounterStore>,
        Err(e) => {
            error!(error = %e, "counter store unreachable at startup, serving degraded from boot");
            Arc::new(UnreachableStore) as Arc<dyn pacer_store::CounterStore>
        }
    };

    // Relational store: per the external interfaces, a fatal init
    // failure here is the one nonzero-exit-code condition.
    let campaign_source: Arc<dyn CampaignSource> = Arc::new(
        connect_with_retry("Postgres", || {
            PostgresCampaignSource::connect(&config.postgres.url, Duration::from_secs(5))
        })
        .await?,
    );

    let campaigns = Arc::new(CampaignStore::new());
    match campaign_source.fetch_active_campaigns().await {
        Ok(fetched) => {
            let count = fetched.len();
            campaigns.replace_all(fetched);
            info!(count, "initial campaign directory loaded");
        }
        Err(e) => {
            warn!(error = %e, "initial campaign fetch failed, starting with an empty directory");
        }
    }

    let tracker = BudgetTracker::new(
        counter_store,
        tz,
        Duration::from_secs(config.pacer.read_cache_ttl_secs),
    );

    let breaker_config = CircuitBreakerConfig {
        budget_threshold: config.pacer.budget_threshold,
        max_failures: config.pacer.max_failures,
        timeout: Duration::from_secs(config.pacer.breaker_timeout_secs),
        success_threshold: config.pacer.success_threshold,
    };
    let breakers = Arc::new(BreakerManager::new(breaker_config));

    let engine = DecisionEngine::new(campaigns.clone(), tracker.clone(), breakers);

    // Background tasks: health prober, recovery drain, campaign refresh.
    let _health_task = pacer_tracker::spawn_health_prober(
        tracker.clone(),
        Duration::from_secs(config.pacer.health_probe_interval_secs),
    );
    let _recovery_task = pacer_tracker::spawn_recovery_task(
        tracker.clone(),
        Duration::from_secs(config.pacer.recovery_interval_secs),
    );
    let _refresh_task = spawn_refresh_task(
        campaign_source,
        campaigns,
        Duration::from_secs(config.postgres.refresh_interval_secs),
    );

    let api_server = ApiServer::new(
        engine,
        tracker,
        config.api.host.clone(),
        config.api.http_port,
        config.metrics.port,
    );

    if let Err(e) = api_server.start_metrics().await {
        error!(error = %e, "Failed to start metrics exporter");
    }

    info!("Campaign Pacer is ready to serve traffic");

    let shutdown = async {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            let mut sigterm =
                tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                    .expect("failed to register SIGTERM handler");
            tokio::select! {
                _ = ctrl_c => info!("Received SIGINT, shutting down"),
                _ = sigterm.recv() => info!("Received SIGTERM, shutting down"),
            }
        }

        #[cfg(not(unix))]
        {
            ctrl_c.await.ok();
            info!("Received SIGINT, shutting down");
        }
    };

    tokio::select! {
        result = api_server.start_http() => {
            result?;
        }
        _ = shutdown => {}
    }

    info!("Campaign Pacer shut down cleanly");
    Ok(())
}

/// Connect to an external dependency with exponential backoff (3 attempts).
async fn connect_with_retry<T, F, Fut>(service_name: &str, connect_fn: F) -> anyhow::Result<T>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = anyhow::Result<T>>,
{
    let delays = [
        Duration::from_secs(0),
        Duration::from_secs(2),
        Duration::from_secs(4),
    ];
    let mut last_err = None;
    for (attempt, delay) in delays.iter().enumerate() {
        if attempt > 0 {
            warn!(service = service_name, attempt, "Retrying connection after {}s", delay.as_secs());
            tokio::time::sleep(*delay).await;
        }
        match connect_fn().await {
            Ok(conn) => {
                info!(service = service_name, "Connected successfully");
                return Ok(conn);
            }
            Err(e) => {
                error!(service = service_name, attempt, error = %e, "Connection failed");
                last_err = Some(e);
            }
        }
    }
    Err(last_err.unwrap_or_else(|| anyhow::anyhow!("{} connection failed", service_name)))
}

/// Stand-in counter store used only when Redis could not be reached at
/// startup, so the process still comes up and serves everything from
/// the tracker's degraded path until the health prober reconnects.
struct UnreachableStore;

#[async_trait::async_trait]
impl pacer_store::CounterStore for UnreachableStore {
    async fn incr_by(&self, _key: &str, _delta: i64, _ttl_secs: u64) -> Result<i64, pacer_store::StoreError> {
        Err(pacer_store::StoreError::Transport("counter store not connected".into()))
    }
    async fn get(&self, _key: &str) -> Result<Option<i64>, pacer_store::StoreError> {
        Err(pacer_store::StoreError::Transport("counter store not connected".into()))
    }
    async fn set(&self, _key: &str, _value: i64, _ttl_secs: u64) -> Result<(), pacer_store::StoreError> {
        Err(pacer_store::StoreError::Transport("counter store not connected".into()))
    }
    async fn pipeline(
        &self,
        _ops: Vec<pacer_store::PipelineOp>,
    ) -> Result<Vec<pacer_store::PipelineResult>, pacer_store::StoreError> {
        Err(pacer_store::StoreError::Transport("counter store not connected".into()))
    }
    async fn ping(&self) -> Result<(), pacer_store::StoreError> {
        Err(pacer_store::StoreError::Transport("counter store not connected".into()))
    }
}
