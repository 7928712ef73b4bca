//! Full-cycle tests: fetch → dispatch → drain → await-freshness against
//! scripted collaborators, under a paused clock.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use skyflipper::engine::evaluator::{EvaluatorConfig, FlipEvaluator};
use skyflipper::engine::pool::WorkerPool;
use skyflipper::engine::runner::{EngineConfig, FlipEngine};
use skyflipper::types::Tier;

use crate::mock_sources::{bin_auction, CollectingNotifier, MockListing, MockPrices};

fn engine_config() -> EngineConfig {
    EngineConfig {
        page_cap: 80,
        freshness_poll: Duration::from_millis(500),
        drain_check_interval: Duration::from_secs(1),
    }
}

fn build_engine(
    listing: Arc<MockListing>,
    prices: Arc<MockPrices>,
    notifier: Arc<CollectingNotifier>,
    workers: usize,
    config: EngineConfig,
) -> FlipEngine {
    let evaluator = Arc::new(FlipEvaluator::new(
        prices,
        notifier,
        EvaluatorConfig::default(),
    ));
    FlipEngine::new(listing, evaluator, WorkerPool::new(workers), config)
}

#[tokio::test(start_paused = true)]
async fn full_cycle_notifies_on_the_underpriced_auction() {
    let mut claimed = bin_auction("c1", "Old Relic", Tier::Epic, 1_000_000);
    claimed.claimed = true;

    let listing = Arc::new(MockListing::new(
        vec![
            bin_auction("a1", "Aspect of the Void", Tier::Epic, 1_000_000),
            bin_auction("a2", "Rusty Shovel", Tier::Common, 1_000_000),
            claimed,
        ],
        vec![100, 10],
    ));
    let prices = Arc::new(MockPrices::new(
        vec![4_000_000, 3_500_000],
        vec![100, 100, 100, 100, 100, 100],
    ));
    let notifier = Arc::new(CollectingNotifier::default());

    let mut engine = build_engine(
        Arc::clone(&listing),
        Arc::clone(&prices),
        Arc::clone(&notifier),
        2,
        engine_config(),
    );

    let report = engine.run_cycle(0).await;

    assert_eq!(report.fetched, 3);
    assert_eq!(report.dispatched, 3);
    assert_eq!(report.completed, 3);
    assert_eq!(report.flips, 1);
    assert!(!report.interrupted);

    let alerts = notifier.alerts();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].auction_uuid, "a1");
    assert_eq!(alerts[0].profit, 3_000_000);
    assert_eq!(alerts[0].profit_second, 2_500_000);

    // Await-freshness polled twice: one "not yet", one rollover.
    assert_eq!(listing.last_updated_calls.load(Ordering::SeqCst), 2);

    engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn staleness_mid_drain_interrupts_the_batch() {
    // The tail of the batch is claimed so its tasks touch nothing no matter
    // when the worker reaches them relative to the cancellation.
    let mut tail1 = bin_auction("a3", "Warped Blade", Tier::Epic, 1_000_000);
    tail1.claimed = true;
    let mut tail2 = bin_auction("a4", "Warped Blade", Tier::Epic, 1_000_000);
    tail2.claimed = true;

    let listing = Arc::new(MockListing::new(
        vec![
            bin_auction("a1", "Warped Blade", Tier::Epic, 1_000_000),
            bin_auction("a2", "Warped Blade", Tier::Epic, 1_000_000),
            tail1,
            tail2,
        ],
        vec![100, 10],
    ));
    // Two virtual seconds per evaluation keeps the drain slow enough for
    // the throttled mid-drain freshness checks to fire.
    let prices = Arc::new(
        MockPrices::new(
            vec![4_000_000, 3_500_000],
            vec![100, 100, 100, 100, 100, 100],
        )
        .with_delay(Duration::from_secs(2)),
    );
    let notifier = Arc::new(CollectingNotifier::default());

    // One worker serializes the batch.
    let mut engine = build_engine(
        Arc::clone(&listing),
        Arc::clone(&prices),
        Arc::clone(&notifier),
        1,
        engine_config(),
    );

    let report = engine.run_cycle(0).await;

    // The first mid-drain check (after task 1) sees no rollover, the
    // second (after task 2) does: the drain stops with two handles
    // unawaited.
    assert!(report.interrupted);
    assert_eq!(report.dispatched, 4);
    assert_eq!(report.completed, 2);
    assert_eq!(report.flips, 2);
    assert_eq!(notifier.count(), 2);

    // Interrupted cycles skip the await-freshness poll.
    assert_eq!(listing.last_updated_calls.load(Ordering::SeqCst), 2);

    // Shutdown drains the abandoned tail without further price traffic.
    engine.shutdown().await;
    assert_eq!(prices.bin_calls.load(Ordering::SeqCst), 2);
    assert_eq!(notifier.count(), 2);
}

#[tokio::test(start_paused = true)]
async fn failed_page_fetch_degrades_to_an_empty_cycle() {
    let listing = Arc::new(MockListing::failing(vec![100, 10]));
    let prices = Arc::new(MockPrices::new(vec![], vec![]));
    let notifier = Arc::new(CollectingNotifier::default());

    let mut engine = build_engine(
        Arc::clone(&listing),
        prices,
        Arc::clone(&notifier),
        2,
        engine_config(),
    );

    let report = engine.run_cycle(0).await;

    assert_eq!(report.fetched, 0);
    assert_eq!(report.dispatched, 0);
    assert_eq!(report.flips, 0);
    assert!(!report.interrupted);
    assert_eq!(notifier.count(), 0);

    // The cycle still waited out the next snapshot.
    assert_eq!(listing.last_updated_calls.load(Ordering::SeqCst), 2);

    engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn page_cap_limits_dispatch() {
    let mut auctions = Vec::new();
    for i in 0..5 {
        let mut auction = bin_auction(&format!("a{i}"), "Filler Item", Tier::Epic, 1_000_000);
        auction.claimed = true; // short-circuits without touching prices
        auctions.push(auction);
    }

    let listing = Arc::new(MockListing::new(auctions, vec![100, 10]));
    let prices = Arc::new(MockPrices::new(vec![], vec![]));
    let notifier = Arc::new(CollectingNotifier::default());

    let mut engine = build_engine(
        Arc::clone(&listing),
        Arc::clone(&prices),
        notifier,
        2,
        EngineConfig {
            page_cap: 3,
            ..engine_config()
        },
    );

    let report = engine.run_cycle(0).await;

    assert_eq!(report.fetched, 5);
    assert_eq!(report.dispatched, 3);
    assert_eq!(report.completed, 3);
    assert_eq!(prices.bin_calls.load(Ordering::SeqCst), 0);

    engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn freshness_state_carries_across_cycles() {
    let listing = Arc::new(MockListing::new(vec![], vec![100, 10, 5]));
    let prices = Arc::new(MockPrices::new(vec![], vec![]));
    let notifier = Arc::new(CollectingNotifier::default());

    let mut engine = build_engine(Arc::clone(&listing), prices, notifier, 2, engine_config());

    let first = engine.run_cycle(0).await;
    assert!(!first.interrupted);
    assert_eq!(listing.last_updated_calls.load(Ordering::SeqCst), 2);

    // The second cycle's first check compares against the difference the
    // first cycle stored, so the 10 → 5 shrink reads as a fresh publish
    // immediately.
    let second = engine.run_cycle(0).await;
    assert!(!second.interrupted);
    assert_eq!(listing.last_updated_calls.load(Ordering::SeqCst), 3);

    engine.shutdown().await;
}
