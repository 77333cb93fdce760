#![warn(clippy::unwrap_used)]

pub mod client;
pub mod keys;

pub use client::{CounterStore, PipelineOp, PipelineResult, RedisCounterStore, StoreError};
pub use keys::{day_key, hour_key, total_key, BucketClock, DAY_TTL_SECS, HOUR_TTL_SECS, TOTAL_TTL_SECS};
