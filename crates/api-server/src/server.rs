//! API server — mounts the pacing HTTP surface and a separate
//! Prometheus exporter, the same two-listener layout the rest of this
//! codebase's service entry points use.

use crate::handlers;
use crate::AppState;
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

pub struct ApiServer {
    state: Arc<AppState>,
    host: String,
    http_port: u16,
    metrics_port: u16,
}

impl ApiServer {
    pub fn new(
        engine: pacer_engine::DecisionEngine,
        tracker: Arc<pacer_tracker::BudgetTracker>,
        host: String,
        http_port: u16,
        metrics_port: u16,
    ) -> Self {
        Self {
            state: Arc::new(AppState {
                engine,
                tracker,
                start_time: Instant::now(),
            }),
            host,
            http_port,
            metrics_port,
        }
    }

    fn router(&self) -> Router {
        Router::new()
            .route("/pacing/decision", post(handlers::decide))
            .route("/spend/track", post(handlers::track_spend))
            .route("/budget/status/:campaign_id", get(handlers::budget_status))
            .route("/health", get(handlers::health))
            .with_state(self.state.clone())
            .layer(CompressionLayer::new())
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
    }

    pub async fn start_http(&self) -> anyhow::Result<()> {
        let addr = SocketAddr::new(self.host.parse()?, self.http_port);
        info!(addr = %addr, "starting pacing HTTP server");
        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, self.router()).await?;
        Ok(())
    }

    pub async fn start_metrics(&self) -> anyhow::Result<()> {
        let addr = SocketAddr::new(self.host.parse()?, self.metrics_port);
        let handle = metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(addr)
            .install_recorder()?;

        info!(port = self.metrics_port, "metrics exporter started");
        std::mem::forget(handle);
        Ok(())
    }
}
