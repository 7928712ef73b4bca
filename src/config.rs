//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! The API key is referenced by env-var name in the config and resolved at
//! runtime via `std::env::var`. Every tuning constant of the scanner is a
//! config input; the defaults in `config.toml` match the thresholds the
//! scanner was tuned with.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::fs;
use std::time::Duration;

use crate::engine::evaluator::EvaluatorConfig;
use crate::engine::runner::EngineConfig;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub scanner: ScannerConfig,
    pub thresholds: ThresholdsConfig,
    pub sources: SourcesConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScannerConfig {
    pub name: String,
    /// Worker-pool size; 0 sizes to the machine's parallelism.
    #[serde(default)]
    pub workers: usize,
    /// Hard cap on evaluation tasks per page.
    pub page_cap: usize,
    /// Sleep between freshness polls once a batch has drained.
    pub freshness_poll_ms: u64,
    /// Minimum spacing of mid-drain freshness checks.
    pub drain_check_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ThresholdsConfig {
    pub base_profit_floor: i64,
    pub mid_profit_floor: i64,
    pub high_profit_floor: i64,
    pub mid_bid_cutoff: i64,
    pub high_bid_cutoff: i64,
    pub min_weekly_volume: u32,
    pub min_mean_volume: u32,
    pub retry_backoff_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourcesConfig {
    pub listing_base_url: String,
    pub price_base_url: String,
    /// Env-var name holding the optional listing API key.
    #[serde(default)]
    pub api_key_env: Option<String>,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        let config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {path}"))?;
        Ok(config)
    }

    /// Resolve the optional listing API key from the environment.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.sources
            .api_key_env
            .as_deref()
            .and_then(|env| std::env::var(env).ok())
            .filter(|key| !key.is_empty())
    }

    pub fn evaluator(&self) -> EvaluatorConfig {
        EvaluatorConfig {
            base_profit_floor: self.thresholds.base_profit_floor,
            mid_profit_floor: self.thresholds.mid_profit_floor,
            high_profit_floor: self.thresholds.high_profit_floor,
            mid_bid_cutoff: self.thresholds.mid_bid_cutoff,
            high_bid_cutoff: self.thresholds.high_bid_cutoff,
            min_weekly_volume: Decimal::from(self.thresholds.min_weekly_volume),
            min_mean_volume: Decimal::from(self.thresholds.min_mean_volume),
            retry_backoff: Duration::from_secs(self.thresholds.retry_backoff_secs),
        }
    }

    pub fn engine(&self) -> EngineConfig {
        EngineConfig {
            page_cap: self.scanner.page_cap,
            freshness_poll: Duration::from_millis(self.scanner.freshness_poll_ms),
            drain_check_interval: Duration::from_secs(self.scanner.drain_check_secs),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
