//! Stub sessions, extractors and repositories for exercising the search
//! pipeline and the HTTP routes without a browser or database.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use kartowl_core::{Marketplace, Product};
use kartowl_db::{DbError, HistoryEntry, HistoryRepository};
use kartowl_scraper::{Extractor, ScraperError, Session, SessionGuard, SessionSource};

pub(crate) fn make_product(marketplace: Marketplace, url: &str, price: i64) -> Product {
    Product::new(marketplace, format!("Item at {url}"), price, url)
        .with_original_price(Some(price + price / 10))
        .with_image(Some("https://img.example/item.jpg".to_string()))
}

/// A page that does nothing and counts closes.
pub(crate) struct StubSession {
    closes: Arc<AtomicUsize>,
}

#[async_trait]
impl Session for StubSession {
    async fn goto(&self, _url: &str, _timeout: Duration) -> Result<(), ScraperError> {
        Ok(())
    }

    async fn wait_for_selector(
        &self,
        _selector: &str,
        _timeout: Duration,
    ) -> Result<(), ScraperError> {
        Ok(())
    }

    async fn wait_for_network_idle(&self, _timeout: Duration) -> Result<(), ScraperError> {
        Ok(())
    }

    async fn scroll_by(&self, _pixels: u32) -> Result<(), ScraperError> {
        Ok(())
    }

    async fn submit_search(&self, _input: &str, _text: &str) -> Result<(), ScraperError> {
        Ok(())
    }

    async fn content(&self) -> Result<String, ScraperError> {
        Ok(String::new())
    }

    async fn close(&self) -> Result<(), ScraperError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Hands out [`StubSession`]s, or refuses every request when unavailable.
#[derive(Default)]
pub(crate) struct StubSessionSource {
    unavailable: bool,
    pub(crate) opened: AtomicUsize,
    pub(crate) closes: Arc<AtomicUsize>,
}

impl StubSessionSource {
    pub(crate) fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    pub(crate) fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub(crate) fn closed(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionSource for StubSessionSource {
    async fn new_session(&self) -> Result<SessionGuard, ScraperError> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        if self.unavailable {
            return Err(ScraperError::BrowserUnavailable(
                "launch failed".to_string(),
            ));
        }
        Ok(SessionGuard::new(Arc::new(StubSession {
            closes: Arc::clone(&self.closes),
        })))
    }
}

/// Returns `count` products per call, or fails with a navigation error.
pub(crate) struct StubExtractor {
    marketplace: Marketplace,
    outcome: Result<usize, String>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl StubExtractor {
    pub(crate) fn returning(marketplace: Marketplace, count: usize) -> Arc<Self> {
        Arc::new(Self {
            marketplace,
            outcome: Ok(count),
            delay: None,
            calls: AtomicUsize::new(0),
        })
    }

    /// Like [`returning`](Self::returning), but sleeps before answering.
    pub(crate) fn delayed(marketplace: Marketplace, count: usize, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            marketplace,
            outcome: Ok(count),
            delay: Some(delay),
            calls: AtomicUsize::new(0),
        })
    }

    pub(crate) fn failing(marketplace: Marketplace, reason: &str) -> Arc<Self> {
        Arc::new(Self {
            marketplace,
            outcome: Err(reason.to_string()),
            delay: None,
            calls: AtomicUsize::new(0),
        })
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Extractor for StubExtractor {
    fn marketplace(&self) -> Marketplace {
        self.marketplace
    }

    async fn extract(
        &self,
        query: &str,
        _session: &dyn Session,
    ) -> Result<Vec<Product>, ScraperError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.outcome {
            Ok(count) => Ok((0..*count)
                .map(|i| {
                    let url = format!(
                        "https://{}.example/{}/{i}",
                        self.marketplace,
                        query.replace(' ', "-")
                    );
                    let step = i64::try_from(i).unwrap_or(0);
                    make_product(self.marketplace, &url, 10_000 + 1_000 * step)
                })
                .collect()),
            Err(reason) => Err(ScraperError::Navigation {
                url: format!("https://{}.example/search", self.marketplace),
                reason: reason.clone(),
            }),
        }
    }
}

/// Storage that rejects everything.
pub(crate) struct FailingHistoryRepository;

#[async_trait]
impl HistoryRepository for FailingHistoryRepository {
    async fn insert_if_absent_for_day(
        &self,
        _entry: &HistoryEntry,
        _day: NaiveDate,
    ) -> Result<bool, DbError> {
        Err(DbError::InvalidRow("storage offline".to_string()))
    }

    async fn find_by_url(&self, _product_url: &str) -> Result<Vec<HistoryEntry>, DbError> {
        Err(DbError::InvalidRow("storage offline".to_string()))
    }

    async fn find_top_discounted(
        &self,
        _marketplace: Marketplace,
        _min_discount: i32,
        _limit: usize,
    ) -> Result<Vec<HistoryEntry>, DbError> {
        Err(DbError::InvalidRow("storage offline".to_string()))
    }

    async fn ping(&self) -> Result<(), DbError> {
        Err(DbError::InvalidRow("storage offline".to_string()))
    }

    fn backend(&self) -> &'static str {
        "failing"
    }
}
