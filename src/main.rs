//! SKYFLIPPER — SkyBlock auction-house flip scanner.
//!
//! Entry point. Loads configuration, initialises structured logging, wires
//! the clients to the engine, and runs the fetch → evaluate → notify loop
//! with graceful shutdown.

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use skyflipper::config;
use skyflipper::decoder::NbtItemDecoder;
use skyflipper::engine::evaluator::FlipEvaluator;
use skyflipper::engine::pool::WorkerPool;
use skyflipper::engine::runner::FlipEngine;
use skyflipper::notify::{LogNotifier, Notifier};
use skyflipper::sources::{AuctionListingSource, CoflnetClient, HypixelClient, PriceSource};

const BANNER: &str = r#"
  ____  _  ____   _____ _     ___ ____  ____  _____ ____
 / ___|| |/ /\ \ / /  _| |   |_ _|  _ \|  _ \| ____|  _ \
 \___ \| ' /  \ V /| |_| |    | || |_) | |_) |  _| | |_) |
  ___) | . \   | | |  _| |___ | ||  __/|  __/| |___|  _ <
 |____/|_|\_\  |_| |_| |_____|___|_|   |_|   |_____|_| \_\

  SkyBlock Auction-House Flip Scanner
  v0.1.0
"#;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    // Load configuration from TOML
    let cfg = config::AppConfig::load("config.toml")?;

    // Initialise structured logging
    init_logging();

    // Print startup banner
    println!("{BANNER}");
    info!(
        scanner = %cfg.scanner.name,
        page_cap = cfg.scanner.page_cap,
        workers = cfg.scanner.workers,
        "SKYFLIPPER starting up"
    );

    // -- Initialise components -------------------------------------------

    let decoder = Arc::new(NbtItemDecoder::new());

    let listing: Arc<dyn AuctionListingSource> = Arc::new(HypixelClient::new(
        cfg.sources.listing_base_url.clone(),
        cfg.resolve_api_key(),
        decoder,
    )?);

    let prices: Arc<dyn PriceSource> =
        Arc::new(CoflnetClient::new(cfg.sources.price_base_url.clone())?);

    let notifier: Arc<dyn Notifier> = Arc::new(LogNotifier::new());

    let evaluator = Arc::new(FlipEvaluator::new(prices, notifier, cfg.evaluator()));

    let pool = if cfg.scanner.workers == 0 {
        WorkerPool::with_hardware_parallelism()
    } else {
        WorkerPool::new(cfg.scanner.workers)
    };

    let mut engine = FlipEngine::new(listing, evaluator, pool, cfg.engine());

    // -- Main loop -------------------------------------------------------

    info!("Entering main loop. Press Ctrl+C to stop.");

    tokio::select! {
        _ = engine.run() => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received.");
        }
    }

    // Let in-flight evaluations finish before exiting.
    engine.shutdown().await;
    info!("SKYFLIPPER shut down cleanly.");

    Ok(())
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("skyflipper=info"));

    let json_logging = std::env::var("SKYFLIPPER_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt().with_env_filter(env_filter).with_target(true).init();
    }
}
