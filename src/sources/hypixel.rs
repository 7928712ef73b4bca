//! Hypixel SkyBlock auction listing integration.
//!
//! Serves the paginated auction snapshot and the dataset's self-reported
//! `lastUpdated` instant. Only BIN listings survive conversion — open
//! bidding auctions are not flippable at a fixed price and are dropped at
//! the parse boundary. Each kept listing has its binary item payload run
//! through the metadata decoder.
//!
//! Base URL: https://api.hypixel.net/v2
//! Auth: optional API key appended as `&key=`; public reads work without.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::AuctionListingSource;
use crate::decoder::ItemMetadataDecoder;
use crate::types::{Auction, AuctionBid, AuctionPage, Tier};

// ---------------------------------------------------------------------------
// API response types (Hypixel JSON → Rust)
// ---------------------------------------------------------------------------

/// Top-level shape of `/skyblock/auctions`. Only the fields we need.
#[derive(Debug, Deserialize)]
struct ListingResponse {
    #[serde(default)]
    success: bool,
    #[serde(rename = "totalPages", default)]
    total_pages: u32,
    /// Epoch milliseconds of the snapshot publish.
    #[serde(rename = "lastUpdated", with = "chrono::serde::ts_milliseconds")]
    last_updated: DateTime<Utc>,
    #[serde(default)]
    auctions: Vec<RawAuction>,
}

#[derive(Debug, Deserialize)]
struct RawAuction {
    uuid: String,
    item_name: String,
    tier: Tier,
    starting_bid: i64,
    #[serde(default)]
    bin: bool,
    #[serde(default)]
    bids: Vec<RawBid>,
    #[serde(default)]
    claimed: bool,
    /// Base64 of the gzip'd item tag tree.
    #[serde(default)]
    item_bytes: String,
}

#[derive(Debug, Deserialize)]
struct RawBid {
    #[serde(default)]
    bidder: String,
    amount: i64,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Auction listing client.
pub struct HypixelClient {
    http: Client,
    base_url: String,
    /// Optional API key; the listing endpoints are public without one.
    api_key: Option<String>,
    decoder: Arc<dyn ItemMetadataDecoder>,
}

impl HypixelClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        decoder: Arc<dyn ItemMetadataDecoder>,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to build listing HTTP client")?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            api_key,
            decoder,
        })
    }

    fn listing_url(&self, page: u32) -> String {
        let mut url = format!(
            "{}/skyblock/auctions?page={page}",
            self.base_url.trim_end_matches('/')
        );
        if let Some(key) = &self.api_key {
            url.push_str("&key=");
            url.push_str(key);
        }
        url
    }

    /// Convert one raw listing, dropping non-BIN auctions.
    fn convert(&self, raw: RawAuction) -> Option<Auction> {
        if !raw.bin {
            return None;
        }
        let item = self.decoder.decode(&raw.item_bytes);
        Some(Auction {
            uuid: raw.uuid,
            item_name: raw.item_name,
            tier: raw.tier,
            starting_bid: raw.starting_bid,
            bin: raw.bin,
            bids: raw
                .bids
                .into_iter()
                .map(|b| AuctionBid {
                    bidder: b.bidder,
                    amount: b.amount,
                })
                .collect(),
            claimed: raw.claimed,
            item,
        })
    }

    async fn fetch_listing(&self, page: u32) -> Result<ListingResponse> {
        let url = self.listing_url(page);
        let resp: ListingResponse = self
            .http
            .get(&url)
            .send()
            .await
            .context("GET auction listing failed")?
            .error_for_status()
            .context("Auction listing returned non-200")?
            .json()
            .await
            .context("Failed to decode auction listing JSON")?;

        if !resp.success {
            anyhow::bail!("Auction listing reported success=false");
        }
        Ok(resp)
    }
}

#[async_trait]
impl AuctionListingSource for HypixelClient {
    async fn fetch_page(&self, page: u32) -> Result<AuctionPage> {
        let resp = self.fetch_listing(page).await?;
        let raw_count = resp.auctions.len();

        let auctions: Vec<Auction> = resp
            .auctions
            .into_iter()
            .filter_map(|raw| self.convert(raw))
            .collect();

        debug!(
            page,
            raw = raw_count,
            bin = auctions.len(),
            last_updated = %resp.last_updated,
            "Auction page fetched"
        );

        Ok(AuctionPage {
            auctions,
            last_updated: resp.last_updated,
            total_pages: resp.total_pages,
        })
    }

    async fn fetch_last_updated(&self) -> Result<DateTime<Utc>> {
        let resp = self.fetch_listing(0).await?;
        Ok(resp.last_updated)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
