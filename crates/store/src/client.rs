//! Counter-store adapter: thin wrapper over Redis providing atomic
//! integer increment, get, set-with-expiry, and pipelined batches.
//! Assumed low-latency (sub-millisecond) when healthy; every operation
//! takes an explicit deadline and never silently retries except for the
//! bounded retry allowed on idempotent reads.

use async_trait::async_trait;
use pacer_core::config::RedisConfig;
use redis::{AsyncCommands, Value};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("counter store transport error: {0}")]
    Transport(String),
    #[error("counter store operation timed out")]
    Timeout,
}

impl From<redis::RedisError> for StoreError {
    fn from(e: redis::RedisError) -> Self {
        StoreError::Transport(e.to_string())
    }
}

/// A single operation in a pipelined batch.
#[derive(Debug, Clone)]
pub enum PipelineOp {
    IncrBy { key: String, delta: i64, ttl_secs: u64 },
    Get { key: String },
    Set { key: String, value: i64, ttl_secs: u64 },
}

/// The result of one pipelined operation, in request order.
#[derive(Debug, Clone)]
pub enum PipelineResult {
    Incremented(i64),
    Value(Option<i64>),
    Set,
}

/// Contract every counter-store backend must satisfy. All operations are
/// bounded by a deadline internal to the implementation; none retry
/// silently beyond what is documented here.
#[async_trait]
pub trait CounterStore: Send + Sync {
    async fn incr_by(&self, key: &str, delta: i64, ttl_secs: u64) -> Result<i64, StoreError>;
    async fn get(&self, key: &str) -> Result<Option<i64>, StoreError>;
    async fn set(&self, key: &str, value: i64, ttl_secs: u64) -> Result<(), StoreError>;
    async fn pipeline(&self, ops: Vec<PipelineOp>) -> Result<Vec<PipelineResult>, StoreError>;
    /// Returns within `probe_timeout_ms`; used by the tracker's health prober.
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Redis-backed implementation. Uses a multiplexed connection manager so
/// a single handle can be cloned cheaply and shared across tasks without
/// a connection pool.
pub struct RedisCounterStore {
    manager: redis::aio::ConnectionManager,
    op_timeout: Duration,
    probe_timeout: Duration,
}

impl RedisCounterStore {
    pub async fn new(config: &RedisConfig) -> anyhow::Result<Self> {
        let url = config
            .urls
            .first()
            .cloned()
            .unwrap_or_else(|| "redis://localhost:6379".to_string());

        info!(url = %url, "Connecting to counter store");

        let client = redis::Client::open(url.as_str())?;
        let manager = tokio::time::timeout(
            Duration::from_millis(config.connect_timeout_ms),
            client.get_connection_manager(),
        )
        .await
        .map_err(|_| anyhow::anyhow!("counter store connect timed out"))??;

        info!("Counter store connection established");

        Ok(Self {
            manager,
            op_timeout: Duration::from_millis(config.op_timeout_ms),
            probe_timeout: Duration::from_millis(config.probe_timeout_ms),
        })
    }

    async fn with_deadline<F, T>(&self, fut: F) -> Result<T, StoreError>
    where
        F: std::future::Future<Output = Result<T, redis::RedisError>>,
    {
        match tokio::time::timeout(self.op_timeout, fut).await {
            Ok(Ok(v)) => Ok(v),
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(StoreError::Timeout),
        }
    }
}

fn value_to_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Int(i) => Some(*i),
        Value::Data(bytes) => std::str::from_utf8(bytes).ok()?.parse().ok(),
        Value::Nil => None,
        _ => None,
    }
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn incr_by(&self, key: &str, delta: i64, ttl_secs: u64) -> Result<i64, StoreError> {
        let mut conn = self.manager.clone();
        let key = key.to_string();
        self.with_deadline(async move {
            let (value,): (i64,) = redis::pipe()
                .atomic()
                .incr(&key, delta)
                .expire(&key, ttl_secs as i64)
                .ignore()
                .query_async(&mut conn)
                .await?;
            Ok(value)
        })
        .await
    }

    async fn get(&self, key: &str) -> Result<Option<i64>, StoreError> {
        let mut last_err = None;
        for attempt in 0..=2 {
            let mut conn = self.manager.clone();
            let key = key.to_string();
            match self
                .with_deadline(async move { conn.get::<_, Option<i64>>(&key).await })
                .await
            {
                Ok(v) => return Ok(v),
                Err(e) => {
                    if attempt < 2 {
                        warn!(attempt, error = %e, "counter store get failed, retrying");
                    }
                    last_err = Some(e);
                }
            }
        }
        Err(last_err.expect("loop always runs at least once"))
    }

    async fn set(&self, key: &str, value: i64, ttl_secs: u64) -> Result<(), StoreError> {
        let mut conn = self.manager.clone();
        let key = key.to_string();
        self.with_deadline(async move { conn.set_ex::<_, _, ()>(&key, value, ttl_secs).await })
            .await
    }

    /// Executes all ops as a single atomic pipeline. `Set` entries are
    /// fully ignored in the raw response (they carry no read); `IncrBy`
    /// and `Get` each contribute exactly one value, in order.
    async fn pipeline(&self, ops: Vec<PipelineOp>) -> Result<Vec<PipelineResult>, StoreError> {
        if ops.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.manager.clone();
        let ops_for_build = ops.clone();
        let raw: Vec<Value> = self
            .with_deadline(async move {
                let mut pipe = redis::pipe();
                pipe.atomic();
                for op in &ops_for_build {
                    match op {
                        PipelineOp::IncrBy { key, delta, ttl_secs } => {
                            pipe.incr(key, *delta);
                            pipe.expire(key, *ttl_secs as i64).ignore();
                        }
                        PipelineOp::Get { key } => {
                            pipe.get(key);
                        }
                        PipelineOp::Set { key, value, ttl_secs } => {
                            pipe.set_ex(key, *value, *ttl_secs).ignore();
                        }
                    }
                }
                pipe.query_async(&mut conn).await
            })
            .await?;

        let mut results = Vec::with_capacity(ops.len());
        let mut idx = 0;
        for op in &ops {
            match op {
                PipelineOp::IncrBy { .. } => {
                    results.push(PipelineResult::Incremented(
                        value_to_i64(&raw[idx]).unwrap_or(0),
                    ));
                    idx += 1;
                }
                PipelineOp::Get { .. } => {
                    results.push(PipelineResult::Value(value_to_i64(&raw[idx])));
                    idx += 1;
                }
                PipelineOp::Set { .. } => {
                    results.push(PipelineResult::Set);
                }
            }
        }
        Ok(results)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.manager.clone();
        match tokio::time::timeout(self.probe_timeout, async move {
            redis::cmd("PING").query_async::<_, String>(&mut conn).await
        })
        .await
        {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(StoreError::Timeout),
        }
    }
}
