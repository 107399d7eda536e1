//! One extractor per marketplace.
//!
//! Each extractor owns its own selectors and heuristics; nothing here is
//! shared across sources except the helpers in [`crate::dom`] and
//! [`crate::parse`].

mod daraz;
mod olx;
mod priceoye;
mod telemart;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use kartowl_core::{AppConfig, Marketplace, Product};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};

use crate::browser::Session;
use crate::error::ScraperError;
use crate::throttle::random_delay;

pub use daraz::DarazExtractor;
pub use olx::OlxExtractor;
pub use priceoye::PriceOyeExtractor;
pub use telemart::TelemartExtractor;

/// Pulls normalized products for `query` out of one marketplace.
#[async_trait]
pub trait Extractor: Send + Sync {
    fn marketplace(&self) -> Marketplace;

    /// Runs one search against the marketplace using `session`.
    ///
    /// Soft failures (results never appeared, unreadable DOM, malformed
    /// cards) are logged and yield fewer or no products.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError`] when the search page itself could not be
    /// reached; callers record that as a failed source.
    async fn extract(&self, query: &str, session: &dyn Session)
        -> Result<Vec<Product>, ScraperError>;
}

/// Knobs shared by every extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScraperSettings {
    pub jitter_min_ms: u64,
    pub jitter_max_ms: u64,
}

impl Default for ScraperSettings {
    fn default() -> Self {
        Self {
            jitter_min_ms: 500,
            jitter_max_ms: 1500,
        }
    }
}

impl ScraperSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            jitter_min_ms: config.scraper_jitter_min_ms,
            jitter_max_ms: config.scraper_jitter_max_ms,
        }
    }

    async fn jitter(&self) {
        random_delay(self.jitter_min_ms, self.jitter_max_ms).await;
    }
}

/// Per-source waits. Each extractor carries its own `TIMINGS`; tests swap in
/// [`Timings::instant`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Timings {
    pub(crate) navigation: Duration,
    pub(crate) results: Duration,
    pub(crate) scroll_steps: u32,
    pub(crate) scroll_pause: Duration,
    pub(crate) settle: Duration,
}

impl Timings {
    #[cfg(test)]
    pub(crate) fn instant() -> Self {
        Self {
            navigation: Duration::from_secs(1),
            results: Duration::from_secs(1),
            scroll_steps: 0,
            scroll_pause: Duration::ZERO,
            settle: Duration::ZERO,
        }
    }
}

/// Scroll distance per lazy-load step.
const SCROLL_STEP_PX: u32 = 800;

/// All four extractors in [`Marketplace::ALL`] order.
#[must_use]
pub fn default_extractors(settings: &ScraperSettings) -> Vec<Arc<dyn Extractor>> {
    vec![
        Arc::new(DarazExtractor::new(*settings)),
        Arc::new(PriceOyeExtractor::new(*settings)),
        Arc::new(TelemartExtractor::new(*settings)),
        Arc::new(OlxExtractor::new(*settings)),
    ]
}

pub(crate) fn encode_query(query: &str) -> String {
    utf8_percent_encode(query, NON_ALPHANUMERIC).to_string()
}

/// Waits for the results signal. A timeout is a soft "no results".
async fn results_ready(
    session: &dyn Session,
    marketplace: Marketplace,
    selector: &str,
    timeout: Duration,
) -> bool {
    match session.wait_for_selector(selector, timeout).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(%marketplace, error = %e, "results never appeared; treating as empty");
            false
        }
    }
}

/// Scrolls in fixed steps so lazy images and prices load, then settles.
async fn scroll_to_load(session: &dyn Session, marketplace: Marketplace, timings: &Timings) {
    for _ in 0..timings.scroll_steps {
        if let Err(e) = session.scroll_by(SCROLL_STEP_PX).await {
            tracing::debug!(%marketplace, error = %e, "scroll rejected; continuing");
            break;
        }
        if !timings.scroll_pause.is_zero() {
            tokio::time::sleep(timings.scroll_pause).await;
        }
    }
    if !timings.settle.is_zero() {
        tokio::time::sleep(timings.settle).await;
    }
}

/// Reads the page DOM. A failed read is a soft "no results".
async fn page_html(session: &dyn Session, marketplace: Marketplace) -> Option<String> {
    match session.content().await {
        Ok(html) => Some(html),
        Err(e) => {
            tracing::warn!(%marketplace, error = %e, "could not read page content");
            None
        }
    }
}
