//! Dataset freshness detection.
//!
//! The listing upstream republishes the whole auction snapshot on its own
//! schedule and only exposes a self-reported `lastUpdated` wall-clock
//! timestamp, not a monotonic version. The detector tracks the absolute
//! difference between that timestamp's UTC time-of-day and the current UTC
//! time-of-day: while a snapshot ages, the difference grows; when it
//! shrinks, a newer snapshot has appeared. The comparison wraps at
//! midnight UTC, so a publish straddling midnight can be misread for one
//! poll.

use std::sync::Arc;

use chrono::{DateTime, Timelike, Utc};
use tracing::{debug, warn};

use crate::sources::AuctionListingSource;

/// Tracks the last observed time-of-day difference across polls.
pub struct FreshnessDetector {
    listing: Arc<dyn AuctionListingSource>,
    prev_diff_secs: i64,
}

impl FreshnessDetector {
    pub fn new(listing: Arc<dyn AuctionListingSource>) -> Self {
        Self {
            listing,
            prev_diff_secs: 0,
        }
    }

    /// Feed one observed difference; reports whether it shrank relative to
    /// the previous observation. The first observation never reports an
    /// update (the stored value starts at zero).
    pub fn observe_diff(&mut self, diff_secs: i64) -> bool {
        let updated = diff_secs < self.prev_diff_secs;
        self.prev_diff_secs = diff_secs;
        updated
    }

    fn time_of_day_diff(reported: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
        let reported_secs = reported.num_seconds_from_midnight() as i64;
        let now_secs = now.num_seconds_from_midnight() as i64;
        (reported_secs - now_secs).abs()
    }

    /// Fetch the upstream's current `lastUpdated` value and report whether
    /// the dataset rolled over since the previous check.
    ///
    /// Network-bound. On fetch failure the stored difference is left
    /// untouched and "not updated" is reported.
    pub async fn check_updated(&mut self) -> bool {
        match self.listing.fetch_last_updated().await {
            Ok(reported) => {
                let diff = Self::time_of_day_diff(reported, Utc::now());
                let updated = self.observe_diff(diff);
                debug!(diff_secs = diff, updated, "Freshness check");
                updated
            }
            Err(e) => {
                warn!(error = %e, "Last-update fetch failed, treating as not updated");
                false
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::MockAuctionListingSource;
    use anyhow::anyhow;
    use chrono::Duration;

    fn detector_with(listing: MockAuctionListingSource) -> FreshnessDetector {
        FreshnessDetector::new(Arc::new(listing))
    }

    /// A timestamp whose time-of-day sits `diff` seconds from now's,
    /// shifted in whichever direction avoids the midnight wrap.
    fn stamp_with_diff(diff: i64) -> DateTime<Utc> {
        let now = Utc::now();
        if now.num_seconds_from_midnight() as i64 >= diff {
            now - Duration::seconds(diff)
        } else {
            now + Duration::seconds(diff)
        }
    }

    #[test]
    fn shrinking_difference_means_updated() {
        let mut detector = detector_with(MockAuctionListingSource::new());
        let observed: Vec<bool> = [50, 40, 30, 45]
            .into_iter()
            .map(|d| detector.observe_diff(d))
            .collect();
        assert_eq!(observed, vec![false, true, true, false]);
    }

    #[test]
    fn first_observation_never_reports_an_update() {
        let mut detector = detector_with(MockAuctionListingSource::new());
        assert!(!detector.observe_diff(3600));
    }

    #[test]
    fn time_of_day_diff_is_absolute() {
        let earlier = "2026-02-01T10:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let later = "2026-02-01T10:01:30Z".parse::<DateTime<Utc>>().unwrap();
        assert_eq!(FreshnessDetector::time_of_day_diff(earlier, later), 90);
        assert_eq!(FreshnessDetector::time_of_day_diff(later, earlier), 90);
    }

    #[test]
    fn time_of_day_diff_ignores_the_date() {
        let yesterday = "2026-01-31T10:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let today = "2026-02-01T10:00:20Z".parse::<DateTime<Utc>>().unwrap();
        assert_eq!(FreshnessDetector::time_of_day_diff(yesterday, today), 20);
    }

    #[tokio::test]
    async fn check_updated_detects_a_fresh_publish() {
        let mut listing = MockAuctionListingSource::new();
        let mut diffs = vec![100i64, 10].into_iter();
        listing
            .expect_fetch_last_updated()
            .times(2)
            .returning(move || {
                let diff = diffs.next().unwrap();
                Ok(stamp_with_diff(diff))
            });

        let mut detector = detector_with(listing);
        assert!(!detector.check_updated().await); // first observation
        assert!(detector.check_updated().await); // difference shrank
    }

    #[tokio::test]
    async fn fetch_failure_reports_not_updated_and_keeps_state() {
        let mut listing = MockAuctionListingSource::new();
        let mut calls = 0u32;
        listing
            .expect_fetch_last_updated()
            .times(3)
            .returning(move || {
                calls += 1;
                match calls {
                    1 => Ok(stamp_with_diff(100)),
                    2 => Err(anyhow!("upstream unavailable")),
                    _ => Ok(stamp_with_diff(50)),
                }
            });

        let mut detector = detector_with(listing);
        assert!(!detector.check_updated().await);
        assert!(!detector.check_updated().await); // failure → no update
        // Had the failure clobbered the stored difference, 50 would not
        // read as a shrink here.
        assert!(detector.check_updated().await);
    }
}
