//! Campaign directory: the relational source/sink boundary, the
//! in-memory snapshot the decision engine reads from, and the
//! background task that keeps the snapshot warm.

pub mod refresh;
pub mod source;
pub mod store;

pub use refresh::spawn_refresh_task;
pub use source::{CampaignSource, PostgresCampaignSource, PostgresSpendSink, SpendSink};
pub use store::CampaignStore;
