//! Counter-store key schema. TTLs slightly exceed the bucket width so a
//! counter is guaranteed readable throughout its bucket even if it was
//! last touched at the very start of that bucket.

use chrono::{DateTime, Timelike, Utc};
use chrono_tz::Tz;

pub const DAY_TTL_SECS: u64 = 25 * 3600;
pub const HOUR_TTL_SECS: u64 = 2 * 3600;
pub const TOTAL_TTL_SECS: u64 = 30 * 24 * 3600;

/// A campaign's current position in the configured timezone's calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketClock {
    pub date: chrono::NaiveDate,
    pub hour: u8,
}

impl BucketClock {
    /// Read wall-clock time once and derive the day/hour buckets. Callers
    /// must reuse the same `BucketClock` within a single request to avoid
    /// bucket-boundary races.
    pub fn now(tz: Tz) -> Self {
        Self::at(Utc::now(), tz)
    }

    pub fn at(instant: DateTime<Utc>, tz: Tz) -> Self {
        let local = instant.with_timezone(&tz);
        Self {
            date: local.date_naive(),
            hour: local.hour() as u8,
        }
    }
}

pub fn day_key(campaign_id: &str, clock: BucketClock) -> String {
    format!("budget:day:{campaign_id}:{}", clock.date.format("%Y-%m-%d"))
}

pub fn hour_key(campaign_id: &str, clock: BucketClock) -> String {
    format!(
        "budget:hour:{campaign_id}:{}-{:02}",
        clock.date.format("%Y-%m-%d"),
        clock.hour
    )
}

pub fn total_key(campaign_id: &str) -> String {
    format!("budget:total:{campaign_id}")
}
