//! The polling loop: fetch a page, evaluate it in parallel, wait for the
//! next snapshot.
//!
//! Each cycle fans one page of auctions out over the worker pool, drains
//! the batch, and then idles until the upstream publishes fresh data. When
//! freshness is detected while the batch is still draining, the cycle sets
//! the shared cancel token once, stops waiting on the remaining handles
//! (their tasks observe the token and bail at entry), and rolls straight
//! into the next cycle.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::engine::cancel::CancelToken;
use crate::engine::evaluator::FlipEvaluator;
use crate::engine::freshness::FreshnessDetector;
use crate::engine::pool::WorkerPool;
use crate::sources::AuctionListingSource;
use crate::types::CycleReport;

// ---------------------------------------------------------------------------
// Configuration (defaults — overridden by config.toml at runtime)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Hard cap on evaluation tasks per page.
    pub page_cap: usize,
    /// Sleep between freshness polls once a batch has drained.
    pub freshness_poll: Duration,
    /// Minimum spacing of mid-drain freshness checks.
    pub drain_check_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            page_cap: 80,
            freshness_poll: Duration::from_millis(500),
            drain_check_interval: Duration::from_secs(1),
        }
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Owns the polling cycle and everything page-scoped: the worker pool, the
/// shared cancel token, and the freshness state carried across polls.
pub struct FlipEngine {
    listing: Arc<dyn AuctionListingSource>,
    evaluator: Arc<FlipEvaluator>,
    pool: WorkerPool,
    freshness: FreshnessDetector,
    cancel: CancelToken,
    config: EngineConfig,
}

impl FlipEngine {
    pub fn new(
        listing: Arc<dyn AuctionListingSource>,
        evaluator: Arc<FlipEvaluator>,
        pool: WorkerPool,
        config: EngineConfig,
    ) -> Self {
        let freshness = FreshnessDetector::new(Arc::clone(&listing));
        Self {
            listing,
            evaluator,
            pool,
            freshness,
            cancel: CancelToken::new(),
            config,
        }
    }

    /// Run cycles until the surrounding task is cancelled. The listing's
    /// first page holds the freshest auctions; every cycle starts over
    /// from it.
    pub async fn run(&mut self) {
        loop {
            let report = self.run_cycle(0).await;
            info!(%report, "Cycle complete");
        }
    }

    /// One full fetch → dispatch → drain → await-freshness cycle.
    pub async fn run_cycle(&mut self, page: u32) -> CycleReport {
        let mut report = CycleReport {
            page,
            ..Default::default()
        };

        // Fetch. A failed page is an empty page, never a dead loop.
        let auctions = match self.listing.fetch_page(page).await {
            Ok(fetched) => fetched.auctions,
            Err(e) => {
                warn!(page, error = %e, "Page fetch failed, continuing with an empty page");
                Vec::new()
            }
        };
        report.fetched = auctions.len();

        // Dispatch. The token is cleared once per page, before any task
        // that will read it exists.
        self.cancel.reset();
        let flips = Arc::new(AtomicUsize::new(0));
        let mut handles = Vec::with_capacity(auctions.len().min(self.config.page_cap));
        for auction in auctions.into_iter().take(self.config.page_cap) {
            let evaluator = Arc::clone(&self.evaluator);
            let cancel = self.cancel.clone();
            let flips = Arc::clone(&flips);
            handles.push(self.pool.submit(async move {
                if evaluator.evaluate(&auction, &cancel).await?.is_some() {
                    flips.fetch_add(1, Ordering::Relaxed);
                }
                Ok(())
            }));
        }
        report.dispatched = handles.len();
        debug!(page, dispatched = report.dispatched, "Batch dispatched");

        // Drain in submission order. At most once per check interval,
        // peek at upstream freshness; a rollover mid-drain cancels the
        // rest of the batch (the unawaited tasks run out harmlessly in
        // the background).
        let mut last_check = Instant::now();
        for handle in handles {
            if let Err(e) = handle.wait().await {
                warn!(error = %e, "Evaluation task failed");
            }
            report.completed += 1;

            if self.cancel.is_cancelled() {
                report.interrupted = true;
                break;
            }
            if last_check.elapsed() >= self.config.drain_check_interval {
                last_check = Instant::now();
                if self.freshness.check_updated().await {
                    info!(
                        completed = report.completed,
                        dispatched = report.dispatched,
                        "Fresh data mid-drain, abandoning the rest of the batch"
                    );
                    self.cancel.cancel();
                    report.interrupted = true;
                    break;
                }
            }
        }

        // Idle until the next snapshot — unless the drain already saw it.
        if !report.interrupted {
            while !self.freshness.check_updated().await {
                tokio::time::sleep(self.config.freshness_poll).await;
            }
        }

        report.flips = flips.load(Ordering::Relaxed);
        report
    }

    /// Drain and join the worker pool. The engine is unusable afterwards.
    pub async fn shutdown(self) {
        self.pool.shutdown().await;
    }
}
