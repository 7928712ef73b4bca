//! Shared types for the SKYFLIPPER scanner.
//!
//! These types form the data model used across all modules: the auction
//! snapshot fetched from the listing API, the price samples coming back from
//! the market-data API, and the alert payload handed to the notifier.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Rarity tier
// ---------------------------------------------------------------------------

/// Item rarity ladder. Used both for filtering and as a query parameter to
/// the price-data API, which expects the SCREAMING_SNAKE_CASE names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Tier {
    Common,
    Uncommon,
    Rare,
    Epic,
    Legendary,
    Mythic,
    Divine,
    Special,
    VerySpecial,
    /// Upstream occasionally introduces new tiers; never fail parsing on one.
    #[serde(other)]
    Unknown,
}

impl Tier {
    /// Wire name as the price API expects it.
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Common => "COMMON",
            Tier::Uncommon => "UNCOMMON",
            Tier::Rare => "RARE",
            Tier::Epic => "EPIC",
            Tier::Legendary => "LEGENDARY",
            Tier::Mythic => "MYTHIC",
            Tier::Divine => "DIVINE",
            Tier::Special => "SPECIAL",
            Tier::VerySpecial => "VERY_SPECIAL",
            Tier::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Auction
// ---------------------------------------------------------------------------

/// A bid already placed on an auction. Only the amount matters to the
/// decision logic; the bidder id is kept for log context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuctionBid {
    #[serde(default)]
    pub bidder: String,
    pub amount: i64,
}

/// Item attributes decoded from the auction's opaque binary payload.
///
/// A failed decode yields the sentinel defaults below; downstream logic
/// tolerates them (an `"Unknown"` attribute id simply finds no price data).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemMetadata {
    pub numeric_id: i32,
    pub count: i32,
    pub upgrade_level: i32,
    pub attribute_id: String,
}

impl Default for ItemMetadata {
    fn default() -> Self {
        Self {
            numeric_id: -1,
            count: -1,
            upgrade_level: -1,
            attribute_id: "Unknown".to_string(),
        }
    }
}

/// One auction-house listing, immutable once fetched.
///
/// Created by the page fetch, read by exactly one evaluation task, then
/// discarded — nothing here is retained across polling cycles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Auction {
    pub uuid: String,
    pub item_name: String,
    pub tier: Tier,
    /// Asking price in coins. For BIN listings this is the purchase price.
    pub starting_bid: i64,
    /// Buy-it-now listing (fixed price, no open bidding).
    pub bin: bool,
    pub bids: Vec<AuctionBid>,
    pub claimed: bool,
    /// Decoded item attributes.
    pub item: ItemMetadata,
}

impl fmt::Display for Auction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] {} coins ({})",
            self.item_name, self.tier, self.starting_bid, self.uuid
        )
    }
}

impl Auction {
    /// Helper to build a test auction with sensible defaults.
    #[cfg(test)]
    pub fn sample() -> Self {
        Auction {
            uuid: "3a7b9c0d1e2f43aab8cc0d9e8f7a6b5c".to_string(),
            item_name: "Aspect of the Void".to_string(),
            tier: Tier::Epic,
            starting_bid: 1_000_000,
            bin: true,
            bids: Vec::new(),
            claimed: false,
            item: ItemMetadata {
                numeric_id: 277,
                count: 1,
                upgrade_level: 0,
                attribute_id: "ASPECT_OF_THE_VOID".to_string(),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Price data
// ---------------------------------------------------------------------------

/// One point of historical market data for an item configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceSample {
    pub min: Decimal,
    pub max: Decimal,
    pub avg: Decimal,
    /// Number of items traded in the sample's window.
    pub volume: Decimal,
    /// Upstream timestamp string, kept verbatim.
    pub time: String,
}

/// A currently-active BIN listing returned by the lowest-price endpoint,
/// ordered cheapest-first by the upstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinListing {
    #[serde(default)]
    pub uuid: String,
    pub starting_bid: i64,
    #[serde(default)]
    pub item_name: String,
    #[serde(default)]
    pub tag: String,
}

// ---------------------------------------------------------------------------
// Flip alert
// ---------------------------------------------------------------------------

/// A detected flip opportunity, handed to the notification sink.
#[derive(Debug, Clone)]
pub struct FlipAlert {
    pub id: Uuid,
    pub auction_uuid: String,
    pub item_name: String,
    pub tier: Tier,
    pub starting_bid: i64,
    /// Profit against the cheapest active BIN listing.
    pub profit: i64,
    /// Profit against the second-cheapest active BIN listing.
    pub profit_second: i64,
    /// Human-readable profit magnitude ("3.0m", "450.0k", ...).
    pub profit_display: String,
}

impl fmt::Display for FlipAlert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] at {} coins, profit {} ({})",
            self.item_name, self.tier, self.starting_bid, self.profit, self.profit_display
        )
    }
}

// ---------------------------------------------------------------------------
// Cycle report
// ---------------------------------------------------------------------------

/// Summary of one fetch → dispatch → drain → await-freshness cycle.
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub page: u32,
    /// Auctions the listing returned (after the BIN filter).
    pub fetched: usize,
    /// Evaluation tasks actually submitted (capped per page).
    pub dispatched: usize,
    /// Task handles awaited to completion before the cycle ended.
    pub completed: usize,
    /// Flip alerts emitted during the drain.
    pub flips: usize,
    /// The batch was abandoned mid-drain because fresh data appeared.
    pub interrupted: bool,
}

impl fmt::Display for CycleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "page {}: fetched={} dispatched={} completed={} flips={}{}",
            self.page,
            self.fetched,
            self.dispatched,
            self.completed,
            self.flips,
            if self.interrupted { " (interrupted)" } else { "" },
        )
    }
}

/// The page's reported last-update instant alongside its auctions.
#[derive(Debug, Clone)]
pub struct AuctionPage {
    pub auctions: Vec<Auction>,
    pub last_updated: DateTime<Utc>,
    pub total_pages: u32,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
