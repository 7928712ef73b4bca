//! Per-auction flip evaluation.
//!
//! One auction in, at most one alert out. The pipeline compares the asking
//! price against the two cheapest active BIN listings for the same item
//! configuration, sanity-checks market liquidity over a week of history,
//! applies price-magnitude-tiered profit floors, and hands qualifying
//! auctions to the notification sink.
//!
//! Everything here runs inside a worker-pool task; the shared
//! [`CancelToken`] is consulted once at entry (cancellation is advisory,
//! never preemptive).

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::engine::cancel::CancelToken;
use crate::notify::{format_coins, Notifier};
use crate::sources::{HistoryWindow, ItemQuery, PriceSource};
use crate::stats;
use crate::types::{Auction, BinListing, FlipAlert, Tier};

// ---------------------------------------------------------------------------
// Configuration (defaults — overridden by config.toml at runtime)
// ---------------------------------------------------------------------------

/// Decision thresholds. All coin amounts.
#[derive(Debug, Clone)]
pub struct EvaluatorConfig {
    /// Both profit figures must exceed this for any auction.
    pub base_profit_floor: i64,
    /// Floor for auctions priced above `mid_bid_cutoff`.
    pub mid_profit_floor: i64,
    /// Floor for auctions priced above `high_bid_cutoff`.
    pub high_profit_floor: i64,
    pub mid_bid_cutoff: i64,
    pub high_bid_cutoff: i64,
    /// Weekly traded-volume floor for plain (non-pet, zero-star) items.
    pub min_weekly_volume: Decimal,
    /// Per-sample traded-volume floor for plain items.
    pub min_mean_volume: Decimal,
    /// Backoff before the single lowest-BIN refetch.
    pub retry_backoff: Duration,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            base_profit_floor: 2_000_000,
            mid_profit_floor: 4_000_000,
            high_profit_floor: 10_000_000,
            mid_bid_cutoff: 20_000_000,
            high_bid_cutoff: 50_000_000,
            min_weekly_volume: dec!(500),
            min_mean_volume: dec!(5),
            retry_backoff: Duration::from_secs(10),
        }
    }
}

// ---------------------------------------------------------------------------
// Pet handling
// ---------------------------------------------------------------------------

static PET_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[Lvl (\d+)\] .+").expect("pet name pattern"));

/// Extract the level from a leveled-pet display name ("[Lvl 100] Baby Yeti").
pub fn detect_pet_level(item_name: &str) -> Option<u32> {
    PET_NAME
        .captures(item_name)
        .and_then(|caps| caps[1].parse().ok())
}

/// Canonical price-data key for a pet: the raw attribute tag joined with an
/// UPPER_SNAKE rendering of the display name after the level bracket.
/// "[Lvl 100] Baby Yeti" with tag "PET" becomes "PET_BABY_YETI".
pub fn canonical_pet_key(attribute_id: &str, item_name: &str) -> String {
    let after_bracket = item_name
        .rsplit_once(']')
        .map(|(_, rest)| rest)
        .unwrap_or(item_name);

    let formatted: Vec<String> = after_bracket
        .split_whitespace()
        .map(|word| word.to_uppercase())
        .collect();

    format!("{}_{}", attribute_id, formatted.join("_"))
}

// ---------------------------------------------------------------------------
// Evaluator
// ---------------------------------------------------------------------------

/// Decides, for a single auction, whether it is a profitable flip.
pub struct FlipEvaluator {
    prices: Arc<dyn PriceSource>,
    notifier: Arc<dyn Notifier>,
    config: EvaluatorConfig,
}

impl FlipEvaluator {
    pub fn new(
        prices: Arc<dyn PriceSource>,
        notifier: Arc<dyn Notifier>,
        config: EvaluatorConfig,
    ) -> Self {
        Self {
            prices,
            notifier,
            config,
        }
    }

    /// Evaluate one auction. Returns the alert when one was emitted.
    ///
    /// Every data problem (fetch failure, thin samples) resolves to
    /// `Ok(None)` — "no flip" — never to an error that would take a worker
    /// down with it.
    pub async fn evaluate(
        &self,
        auction: &Auction,
        cancel: &CancelToken,
    ) -> Result<Option<FlipAlert>> {
        if auction.claimed || cancel.is_cancelled() {
            return Ok(None);
        }

        let pet_level = detect_pet_level(&auction.item_name);
        // Upgrade-star extraction from the display name is not implemented;
        // the filter pins stars to zero.
        let stars = 0u32;
        let query = ItemQuery {
            rarity: auction.tier,
            stars,
            pet_level,
        };

        let item_key = match pet_level {
            Some(_) => canonical_pet_key(&auction.item.attribute_id, &auction.item_name),
            None => auction.item.attribute_id.clone(),
        };

        let listings = self.lowest_bin_with_retry(&item_key, &query).await;
        if listings.len() < 2 {
            debug!(%auction, item_key, samples = listings.len(), "Too few active listings");
            return Ok(None);
        }

        let profit_last = listings[0].starting_bid - auction.starting_bid;
        let profit_second = listings[1].starting_bid - auction.starting_bid;
        if profit_last <= self.config.base_profit_floor
            || profit_second <= self.config.base_profit_floor
        {
            return Ok(None);
        }

        let history = match self
            .prices
            .fetch_history(&item_key, HistoryWindow::Week, &query)
            .await
        {
            Ok(history) => history,
            Err(e) => {
                warn!(item_key, error = %e, "History fetch failed");
                Vec::new()
            }
        };
        if history.is_empty() {
            return Ok(None);
        }

        let weekly_volume = stats::total_volume(&history);
        let volume_per_sample = stats::mean_volume(&history);

        // Plain items need a liquid market; leveled pets and starred items
        // trade thinly by nature and skip the floor.
        if stars == 0
            && pet_level.is_none()
            && (weekly_volume < self.config.min_weekly_volume
                || volume_per_sample < self.config.min_mean_volume)
        {
            debug!(
                %auction,
                weekly_volume = %weekly_volume,
                volume_per_sample = %volume_per_sample,
                "Liquidity floor not met"
            );
            return Ok(None);
        }

        // Contested auctions are not flippable at the asking price.
        if !auction.bids.is_empty() {
            return Ok(None);
        }

        // Expensive auctions must clear every floor up to their magnitude.
        if auction.starting_bid > self.config.high_bid_cutoff
            && (profit_last <= self.config.high_profit_floor
                || profit_second <= self.config.high_profit_floor)
        {
            return Ok(None);
        }
        if auction.starting_bid > self.config.mid_bid_cutoff
            && (profit_last <= self.config.mid_profit_floor
                || profit_second <= self.config.mid_profit_floor)
        {
            return Ok(None);
        }

        // The bottom two tiers churn too fast to be worth alerting on.
        if matches!(auction.tier, Tier::Common | Tier::Uncommon) {
            return Ok(None);
        }

        let alert = FlipAlert {
            id: Uuid::new_v4(),
            auction_uuid: auction.uuid.clone(),
            item_name: auction.item_name.clone(),
            tier: auction.tier,
            starting_bid: auction.starting_bid,
            profit: profit_last,
            profit_second,
            profit_display: format_coins(profit_last),
        };

        if let Err(e) = self.notifier.notify(&alert).await {
            warn!(alert_id = %alert.id, error = %e, "Notification sink failed");
        }

        Ok(Some(alert))
    }

    /// Fetch the lowest active BIN listings; when fewer than two come back,
    /// wait out the backoff and refetch exactly once.
    async fn lowest_bin_with_retry(&self, item_key: &str, query: &ItemQuery) -> Vec<BinListing> {
        let listings = self.fetch_lowest(item_key, query).await;
        if listings.len() >= 2 {
            return listings;
        }
        tokio::time::sleep(self.config.retry_backoff).await;
        self.fetch_lowest(item_key, query).await
    }

    async fn fetch_lowest(&self, item_key: &str, query: &ItemQuery) -> Vec<BinListing> {
        match self.prices.fetch_lowest_active_bin(item_key, query).await {
            Ok(listings) => listings,
            Err(e) => {
                warn!(item_key, error = %e, "Active BIN fetch failed");
                Vec::new()
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
