//! Pre-navigation jitter.
//!
//! The four extractions for a query start at the same instant; a small random
//! sleep before each navigation keeps them from hitting the marketplaces as a
//! synchronized burst.

use std::time::Duration;

use rand::Rng;

/// Uniformly random duration in `[min_ms, max_ms]`.
///
/// An inverted range is treated as `[max_ms, min_ms]`.
pub(crate) fn jitter_duration(min_ms: u64, max_ms: u64) -> Duration {
    let (lo, hi) = if min_ms <= max_ms {
        (min_ms, max_ms)
    } else {
        (max_ms, min_ms)
    };
    if lo == hi {
        return Duration::from_millis(lo);
    }
    Duration::from_millis(rand::rng().random_range(lo..=hi))
}

/// Sleeps for a random duration in `[min_ms, max_ms]`.
pub(crate) async fn random_delay(min_ms: u64, max_ms: u64) {
    let delay = jitter_duration(min_ms, max_ms);
    if delay.is_zero() {
        return;
    }
    tracing::trace!(delay_ms = delay.as_millis(), "pre-navigation jitter");
    tokio::time::sleep(delay).await;
}
