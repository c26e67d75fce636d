//! Rate limiting utilities

use chrono::{DateTime, Duration as ChronoDuration, Local, NaiveDateTime, Timelike};
use std::collections::BTreeMap;

/// Counts unblock attempts per calendar hour.
///
/// Buckets are keyed by local date and hour. Buckets for earlier hours are
/// dropped the next time the ledger is consulted, so at most one bucket is
/// live at any time.
#[derive(Debug)]
pub struct HourlyAttemptLedger {
    /// Maximum attempts permitted within one calendar hour
    max_per_hour: u32,
    buckets: BTreeMap<NaiveDateTime, u32>,
}

impl HourlyAttemptLedger {
    pub fn new(max_per_hour: u32) -> Self {
        Self {
            max_per_hour,
            buckets: BTreeMap::new(),
        }
    }

    pub fn max_per_hour(&self) -> u32 {
        self.max_per_hour
    }

    /// Record an attempt at `now` if the hour still has room.
    ///
    /// Returns `true` if the attempt was recorded, `false` if the limit for
    /// the current hour is already reached. A denied attempt does not count.
    pub fn try_consume(&mut self, now: &DateTime<Local>) -> bool {
        let bucket = hour_bucket(now);
        self.purge_before(bucket);

        let count = self.buckets.entry(bucket).or_insert(0);
        if *count >= self.max_per_hour {
            return false;
        }
        *count += 1;
        true
    }

    /// Attempts already recorded in the hour containing `now`
    pub fn used(&self, now: &DateTime<Local>) -> u32 {
        self.buckets.get(&hour_bucket(now)).copied().unwrap_or(0)
    }

    pub fn remaining(&self, now: &DateTime<Local>) -> u32 {
        self.max_per_hour.saturating_sub(self.used(now))
    }

    /// Start of the next calendar hour, when a new bucket opens
    pub fn next_reset(&self, now: &DateTime<Local>) -> NaiveDateTime {
        hour_bucket(now) + ChronoDuration::hours(1)
    }

    /// Number of buckets currently held (for diagnostics and tests)
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    fn purge_before(&mut self, bucket: NaiveDateTime) {
        self.buckets.retain(|key, _| *key >= bucket);
    }
}

/// Truncate a local timestamp to the start of its hour
fn hour_bucket(now: &DateTime<Local>) -> NaiveDateTime {
    let naive = now.naive_local();
    naive
        .date()
        .and_hms_opt(naive.hour(), 0, 0)
        .unwrap_or(naive)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 3, 12, h, m, s).unwrap()
    }

    #[test]
    fn allows_up_to_max_within_hour() {
        let mut ledger = HourlyAttemptLedger::new(2);

        assert!(ledger.try_consume(&at(10, 5, 0)));
        assert!(ledger.try_consume(&at(10, 20, 0)));
        assert!(!ledger.try_consume(&at(10, 59, 59)));

        // Denied attempts are not counted
        assert_eq!(ledger.used(&at(10, 30, 0)), 2);
        assert_eq!(ledger.remaining(&at(10, 30, 0)), 0);
    }

    #[test]
    fn new_hour_resets_and_purges() {
        let mut ledger = HourlyAttemptLedger::new(2);
        assert!(ledger.try_consume(&at(10, 5, 0)));
        assert!(ledger.try_consume(&at(10, 6, 0)));
        assert!(!ledger.try_consume(&at(10, 7, 0)));

        assert!(ledger.try_consume(&at(11, 0, 0)));
        assert_eq!(ledger.bucket_count(), 1);
        assert_eq!(ledger.used(&at(11, 30, 0)), 1);
    }

    #[test]
    fn same_hour_on_another_day_is_a_different_bucket() {
        let mut ledger = HourlyAttemptLedger::new(1);
        assert!(ledger.try_consume(&at(10, 0, 0)));

        let next_day = Local.with_ymd_and_hms(2025, 3, 13, 10, 0, 0).unwrap();
        assert!(ledger.try_consume(&next_day));
    }

    #[test]
    fn zero_limit_never_permits() {
        let mut ledger = HourlyAttemptLedger::new(0);
        assert!(!ledger.try_consume(&at(9, 0, 0)));
        assert_eq!(ledger.remaining(&at(9, 0, 0)), 0);
    }

    #[test]
    fn next_reset_is_top_of_next_hour() {
        let ledger = HourlyAttemptLedger::new(2);
        let reset = ledger.next_reset(&at(10, 42, 13));
        assert_eq!(reset, at(11, 0, 0).naive_local());
    }
}
