//! Coflnet SkyBlock market-data integration.
//!
//! Serves the two reads the evaluator needs: the cheapest currently-active
//! BIN listings for an item configuration, and aggregated price history
//! over a time window. Both endpoints accept the `?query[...]` filter
//! string for rarity/stars/pet-level.
//!
//! Base URL: https://sky.coflnet.com
//! Auth: none required for reads.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::{HistoryWindow, ItemQuery, PriceSource};
use crate::types::{BinListing, PriceSample};

// ---------------------------------------------------------------------------
// API response types (Coflnet JSON → Rust)
// ---------------------------------------------------------------------------

/// One active listing as the `active/bin` endpoint returns it.
/// Only the fields we need.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawActiveListing {
    #[serde(default)]
    uuid: String,
    starting_bid: i64,
    #[serde(default)]
    item_name: String,
    #[serde(default)]
    tag: String,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Price-data client.
pub struct CoflnetClient {
    http: Client,
    base_url: String,
}

impl CoflnetClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to build price-data HTTP client")?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    fn lowest_bin_url(&self, item_key: &str, query: &ItemQuery) -> String {
        format!(
            "{}/api/auctions/tag/{}/active/bin{}",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(item_key),
            query.filter_string()
        )
    }

    fn history_url(&self, item_key: &str, window: HistoryWindow, query: &ItemQuery) -> String {
        format!(
            "{}/api/item/price/{}/history/{}{}",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(item_key),
            window.path_segment(),
            query.filter_string()
        )
    }
}

#[async_trait]
impl PriceSource for CoflnetClient {
    async fn fetch_lowest_active_bin(
        &self,
        item_key: &str,
        query: &ItemQuery,
    ) -> Result<Vec<BinListing>> {
        let url = self.lowest_bin_url(item_key, query);
        let raw: Vec<RawActiveListing> = self
            .http
            .get(&url)
            .send()
            .await
            .context("GET active BIN listings failed")?
            .error_for_status()
            .context("Active BIN endpoint returned non-200")?
            .json()
            .await
            .context("Failed to decode active BIN JSON")?;

        debug!(item_key, count = raw.len(), "Active BIN listings fetched");

        Ok(raw
            .into_iter()
            .map(|l| BinListing {
                uuid: l.uuid,
                starting_bid: l.starting_bid,
                item_name: l.item_name,
                tag: l.tag,
            })
            .collect())
    }

    async fn fetch_history(
        &self,
        item_key: &str,
        window: HistoryWindow,
        query: &ItemQuery,
    ) -> Result<Vec<PriceSample>> {
        let url = self.history_url(item_key, window, query);
        let samples: Vec<PriceSample> = self
            .http
            .get(&url)
            .send()
            .await
            .context("GET price history failed")?
            .error_for_status()
            .context("Price history endpoint returned non-200")?
            .json()
            .await
            .context("Failed to decode price history JSON")?;

        debug!(item_key, count = samples.len(), "Price history fetched");

        Ok(samples)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
