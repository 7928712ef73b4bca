//! Data-source integrations.
//!
//! Defines the collaborator traits the engine runs against and provides
//! the HTTP implementations:
//! - Hypixel auction listing — paginated auction snapshot + last-update time
//! - Coflnet price data — lowest active BIN listings and windowed history
//!
//! Every method is fallible and network-bound; callers treat errors as
//! "no data this cycle" rather than fatal conditions.

pub mod coflnet;
pub mod hypixel;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::types::{AuctionPage, BinListing, PriceSample, Tier};

pub use coflnet::CoflnetClient;
pub use hypixel::HypixelClient;

// ---------------------------------------------------------------------------
// Query filter
// ---------------------------------------------------------------------------

/// Filter parameters the price endpoints accept, rendered in the upstream's
/// `?query[Key]=value` form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemQuery {
    pub rarity: Tier,
    /// Upgrade-star count. Star extraction from the display name is not
    /// implemented; the filter pins this to 0.
    pub stars: u32,
    /// Present only for leveled pets.
    pub pet_level: Option<u32>,
}

impl ItemQuery {
    pub fn new(rarity: Tier) -> Self {
        Self {
            rarity,
            stars: 0,
            pet_level: None,
        }
    }

    pub fn with_pet_level(rarity: Tier, level: u32) -> Self {
        Self {
            rarity,
            stars: 0,
            pet_level: Some(level),
        }
    }

    /// Render the full query-string suffix, leading `?` included.
    pub fn filter_string(&self) -> String {
        let mut out = format!(
            "?query[Rarity]={}&query[Stars]={}",
            urlencoding::encode(self.rarity.as_str()),
            self.stars
        );
        if let Some(level) = self.pet_level {
            out.push_str(&format!("&query[PetLevel]={level}"));
        }
        out
    }
}

/// Aggregation window for price-history queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryWindow {
    Day,
    Week,
    Month,
}

impl HistoryWindow {
    pub fn path_segment(&self) -> &'static str {
        match self {
            HistoryWindow::Day => "day",
            HistoryWindow::Week => "week",
            HistoryWindow::Month => "month",
        }
    }
}

// ---------------------------------------------------------------------------
// Collaborator traits
// ---------------------------------------------------------------------------

/// The paginated auction listing upstream.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuctionListingSource: Send + Sync {
    /// Fetch one page of the auction listing.
    async fn fetch_page(&self, page: u32) -> Result<AuctionPage>;

    /// Fetch only the upstream's self-reported last-update instant.
    async fn fetch_last_updated(&self) -> Result<DateTime<Utc>>;
}

/// Historical and active price data for item configurations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Currently-active BIN listings for an item, cheapest first.
    async fn fetch_lowest_active_bin(
        &self,
        item_key: &str,
        query: &ItemQuery,
    ) -> Result<Vec<BinListing>>;

    /// Aggregated price history for an item over the given window.
    async fn fetch_history(
        &self,
        item_key: &str,
        window: HistoryWindow,
        query: &ItemQuery,
    ) -> Result<Vec<PriceSample>>;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
