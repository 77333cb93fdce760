//! The process-local fallback cache: one `MemoryBudget` per campaign,
//! created lazily on first write, owned exclusively by the tracker.

use chrono::{DateTime, NaiveDate, Utc};
use pacer_store::keys::BucketClock;

/// Per-campaign in-memory spend counters. A lower bound on true spend at
/// all times: it only ever reflects writes this process has itself
/// applied, never writes from other replicas.
#[derive(Debug, Clone)]
pub struct MemoryBudget {
    pub daily_spent: i64,
    pub hourly_spent: i64,
    date: NaiveDate,
    hour: u8,
    pub last_update: DateTime<Utc>,
    /// Spend applied to this campaign that has not yet been confirmed
    /// written to the `budget:total:*` counter-store key. Accumulates
    /// across failed write-throughs; zeroed by a successful recovery drain.
    pub unsynced_total: i64,
}

impl MemoryBudget {
    pub fn fresh(clock: BucketClock) -> Self {
        Self {
            daily_spent: 0,
            hourly_spent: 0,
            date: clock.date,
            hour: clock.hour,
            last_update: Utc::now(),
            unsynced_total: 0,
        }
    }

    pub fn current_hour(&self) -> u8 {
        self.hour
    }

    pub fn current_date(&self) -> NaiveDate {
        self.date
    }

    /// Resets the hourly (and, on a day change, daily) counter to zero
    /// before any read or write proceeds, so a rollover is observed on
    /// the first access inside the new bucket rather than lazily.
    pub fn roll_to(&mut self, clock: BucketClock) {
        if clock.date != self.date {
            self.date = clock.date;
            self.daily_spent = 0;
            self.hour = clock.hour;
            self.hourly_spent = 0;
        } else if clock.hour != self.hour {
            self.hour = clock.hour;
            self.hourly_spent = 0;
        }
    }

    /// Apply a positive spend delta, rolling the bucket first if the
    /// clock has moved past the stored hour or day.
    pub fn apply_spend(&mut self, amount: i64, clock: BucketClock) {
        self.roll_to(clock);
        self.daily_spent += amount;
        self.hourly_spent += amount;
        self.unsynced_total += amount;
        self.last_update = Utc::now();
    }

    /// Reset as if this campaign had never spent today; used by
    /// `ResetDailyBudget` to invalidate a cache entry in place.
    pub fn reset_to(&mut self, clock: BucketClock) {
        *self = Self::fresh(clock);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn clock(hour: u8) -> BucketClock {
        let tz = chrono_tz::UTC;
        let instant = Utc.with_ymd_and_hms(2026, 7, 28, hour as u32, 0, 0).unwrap();
        BucketClock::at(instant, tz)
    }

    #[test]
    fn hour_rollover_zeroes_hourly_but_not_daily() {
        let mut m = MemoryBudget::fresh(clock(9));
        m.apply_spend(40_000, clock(9));
        assert_eq!(m.hourly_spent, 40_000);

        m.roll_to(clock(10));
        assert_eq!(m.hourly_spent, 0);
        assert_eq!(m.daily_spent, 40_000);

        m.apply_spend(5_000, clock(10));
        assert_eq!(m.hourly_spent, 5_000);
        assert_eq!(m.daily_spent, 45_000);
    }

    #[test]
    fn day_rollover_zeroes_both_counters() {
        let mut m = MemoryBudget::fresh(clock(23));
        m.apply_spend(100, clock(23));

        let tomorrow = BucketClock::at(
            Utc.with_ymd_and_hms(2026, 7, 29, 0, 0, 0).unwrap(),
            chrono_tz::UTC,
        );
        m.roll_to(tomorrow);
        assert_eq!(m.daily_spent, 0);
        assert_eq!(m.hourly_spent, 0);
    }
}
