//! Trimmed statistics over price samples.
//!
//! Pure helpers, no I/O. The evaluator uses the volume aggregates as its
//! liquidity figures; the trimmed mean is the outlier-resistant price
//! average used when comparing listing prices against recent sales.

use rust_decimal::Decimal;

use crate::types::PriceSample;

/// Total traded volume across all samples. Zero for an empty input.
pub fn total_volume(samples: &[PriceSample]) -> Decimal {
    samples.iter().map(|s| s.volume).sum()
}

/// Mean per-sample traded volume. Zero for an empty input.
pub fn mean_volume(samples: &[PriceSample]) -> Decimal {
    if samples.is_empty() {
        return Decimal::ZERO;
    }
    total_volume(samples) / Decimal::from(samples.len() as u64)
}

/// Trimmed mean of a set of bids: sort ascending, drop
/// `floor(trim_fraction * n)` elements from each end, average the rest.
///
/// `trim_fraction = 0.0` degenerates to the plain mean.
///
/// # Panics
///
/// Panics if the trim empties the slice (or the input is empty). Callers
/// own the fraction they pass; a fraction that leaves nothing to average
/// is a programming error, not a data condition.
pub fn trimmed_mean_bid(bids: &[i64], trim_fraction: f64) -> Decimal {
    let trim = (trim_fraction * bids.len() as f64).floor() as usize;
    let remaining = bids.len().saturating_sub(2 * trim);
    assert!(
        remaining > 0,
        "trim fraction {trim_fraction} leaves no bids to average (n = {})",
        bids.len()
    );

    let mut sorted = bids.to_vec();
    sorted.sort_unstable();

    let kept = &sorted[trim..bids.len() - trim];
    let sum: Decimal = kept.iter().map(|b| Decimal::from(*b)).sum();
    sum / Decimal::from(kept.len() as u64)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
