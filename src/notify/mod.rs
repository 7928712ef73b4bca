//! Flip notifications.
//!
//! The evaluator hands every qualifying auction to a [`Notifier`].
//! The shipped implementation emits a structured log line plus the
//! `/viewauction` command a player pastes into chat to open the listing.
//! Clipboard, audio, and simulated input stay out of this crate.

use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

use crate::types::FlipAlert;

/// Sink for flip alerts. Fire-and-forget: callers log a failure and move on.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, alert: &FlipAlert) -> Result<()>;
}

/// Compress a coin amount into the short form used in alerts:
/// millions get an "m" suffix, thousands a "k", both with one decimal.
pub fn format_coins(amount: i64) -> String {
    if amount >= 1_000_000 {
        format!("{:.1}m", amount as f64 / 1_000_000.0)
    } else if amount >= 1_000 {
        format!("{:.1}k", amount as f64 / 1_000.0)
    } else {
        amount.to_string()
    }
}

/// Notifier that announces flips through the log stream.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl LogNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, alert: &FlipAlert) -> Result<()> {
        info!(
            alert_id = %alert.id,
            item = %alert.item_name,
            tier = %alert.tier,
            price = alert.starting_bid,
            profit = alert.profit,
            profit_display = %alert.profit_display,
            command = %format!("/viewauction {}", alert.auction_uuid),
            "Flip found"
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
