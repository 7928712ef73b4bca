//! Mock collaborators for integration testing.
//!
//! Deterministic, in-memory implementations of the listing source, the
//! price source, and the notifier — markets, freshness behavior, and
//! latency are fully controllable from test code.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Timelike, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use skyflipper::notify::Notifier;
use skyflipper::sources::{AuctionListingSource, HistoryWindow, ItemQuery, PriceSource};
use skyflipper::types::{
    Auction, AuctionPage, BinListing, FlipAlert, ItemMetadata, PriceSample, Tier,
};

/// Build a BIN auction fixture.
pub fn bin_auction(uuid: &str, name: &str, tier: Tier, starting_bid: i64) -> Auction {
    Auction {
        uuid: uuid.to_string(),
        item_name: name.to_string(),
        tier,
        starting_bid,
        bin: true,
        bids: Vec::new(),
        claimed: false,
        item: ItemMetadata {
            numeric_id: 1,
            count: 1,
            upgrade_level: 0,
            attribute_id: name.to_uppercase().replace(' ', "_"),
        },
    }
}

/// A timestamp whose UTC time-of-day sits `diff` seconds from now's,
/// shifted in whichever direction avoids the midnight wrap.
pub fn stamp_with_diff(diff: i64) -> DateTime<Utc> {
    let now = Utc::now();
    if now.num_seconds_from_midnight() as i64 >= diff {
        now - chrono::Duration::seconds(diff)
    } else {
        now + chrono::Duration::seconds(diff)
    }
}

// ---------------------------------------------------------------------------
// Listing source
// ---------------------------------------------------------------------------

/// Scripted auction listing. Pages always return the same auctions; the
/// freshness fetch walks a script of time-of-day differences, repeating the
/// last entry once the script runs dry.
pub struct MockListing {
    auctions: Vec<Auction>,
    diffs: Vec<i64>,
    fail_pages: bool,
    pub last_updated_calls: AtomicUsize,
}

impl MockListing {
    pub fn new(auctions: Vec<Auction>, diffs: Vec<i64>) -> Self {
        Self {
            auctions,
            diffs,
            fail_pages: false,
            last_updated_calls: AtomicUsize::new(0),
        }
    }

    /// A listing whose page fetches always fail.
    pub fn failing(diffs: Vec<i64>) -> Self {
        Self {
            auctions: Vec::new(),
            diffs,
            fail_pages: true,
            last_updated_calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl AuctionListingSource for MockListing {
    async fn fetch_page(&self, _page: u32) -> Result<AuctionPage> {
        if self.fail_pages {
            return Err(anyhow!("listing unavailable"));
        }
        Ok(AuctionPage {
            auctions: self.auctions.clone(),
            last_updated: Utc::now(),
            total_pages: 1,
        })
    }

    async fn fetch_last_updated(&self) -> Result<DateTime<Utc>> {
        let call = self.last_updated_calls.fetch_add(1, Ordering::SeqCst);
        let diff = self
            .diffs
            .get(call)
            .or(self.diffs.last())
            .copied()
            .ok_or_else(|| anyhow!("no scripted freshness values"))?;
        Ok(stamp_with_diff(diff))
    }
}

// ---------------------------------------------------------------------------
// Price source
// ---------------------------------------------------------------------------

/// Fixed price data with an optional per-call latency, so tests can hold a
/// batch mid-drain under a paused clock.
pub struct MockPrices {
    bin_prices: Vec<i64>,
    volumes: Vec<i64>,
    delay: Duration,
    pub bin_calls: AtomicUsize,
}

impl MockPrices {
    pub fn new(bin_prices: Vec<i64>, volumes: Vec<i64>) -> Self {
        Self {
            bin_prices,
            volumes,
            delay: Duration::ZERO,
            bin_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl PriceSource for MockPrices {
    async fn fetch_lowest_active_bin(
        &self,
        _item_key: &str,
        _query: &ItemQuery,
    ) -> Result<Vec<BinListing>> {
        self.bin_calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(self
            .bin_prices
            .iter()
            .map(|price| BinListing {
                uuid: String::new(),
                starting_bid: *price,
                item_name: String::new(),
                tag: String::new(),
            })
            .collect())
    }

    async fn fetch_history(
        &self,
        _item_key: &str,
        _window: HistoryWindow,
        _query: &ItemQuery,
    ) -> Result<Vec<PriceSample>> {
        Ok(self
            .volumes
            .iter()
            .map(|volume| PriceSample {
                min: dec!(1),
                max: dec!(2),
                avg: dec!(1.5),
                volume: Decimal::from(*volume),
                time: "2026-02-01T00:00:00Z".to_string(),
            })
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Notifier
// ---------------------------------------------------------------------------

/// Notifier that collects every alert.
#[derive(Default)]
pub struct CollectingNotifier {
    alerts: Mutex<Vec<FlipAlert>>,
}

impl CollectingNotifier {
    pub fn count(&self) -> usize {
        self.alerts.lock().unwrap().len()
    }

    pub fn alerts(&self) -> Vec<FlipAlert> {
        self.alerts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for CollectingNotifier {
    async fn notify(&self, alert: &FlipAlert) -> Result<()> {
        self.alerts.lock().unwrap().push(alert.clone());
        Ok(())
    }
}
