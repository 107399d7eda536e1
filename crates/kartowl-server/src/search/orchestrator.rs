use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use kartowl_core::{merge, Marketplace, MarketplaceStatus, Product, SearchResult};
use kartowl_scraper::{Extractor, ScraperError, SessionSource};

use super::cache::{search_key, ResultCache};
use super::recorder::HistoryRecorder;

/// Fans one query out to every marketplace and merges what comes back.
///
/// Cloning is cheap; clones share the session source, extractors, cache and
/// recorder.
#[derive(Clone)]
pub struct SearchOrchestrator {
    sessions: Arc<dyn SessionSource>,
    extractors: Vec<Arc<dyn Extractor>>,
    cache: ResultCache<SearchResult>,
    recorder: HistoryRecorder,
}

impl SearchOrchestrator {
    #[must_use]
    pub fn new(
        sessions: Arc<dyn SessionSource>,
        extractors: Vec<Arc<dyn Extractor>>,
        cache: ResultCache<SearchResult>,
        recorder: HistoryRecorder,
    ) -> Self {
        Self {
            sessions,
            extractors,
            cache,
            recorder,
        }
    }

    /// Answers `query` from the cache or by scraping every marketplace.
    ///
    /// Never fails: a marketplace that cannot be searched shows up as a
    /// failed entry in `marketplace_status`. Only results where at least one
    /// marketplace succeeded are cached. Every returned product is queued
    /// for the price history without waiting for the writes.
    ///
    /// The scrape runs on its own task, so dropping the returned future
    /// still lets the results reach the cache and the history.
    pub async fn search(&self, query: &str) -> SearchResult {
        let key = search_key(query);
        if let Some(cached) = self.cache.get(&key).await {
            tracing::debug!(query, "serving search from cache");
            return cached;
        }

        let this = self.clone();
        let owned_query = query.to_owned();
        let task = tokio::spawn(async move { this.scrape_and_store(&owned_query, key).await });

        match task.await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(query, error = %e, "search task did not complete");
                let statuses = self
                    .extractors
                    .iter()
                    .map(|extractor| {
                        (
                            extractor.marketplace(),
                            MarketplaceStatus::failed("search task did not complete"),
                        )
                    })
                    .collect();
                SearchResult::from_parts(statuses, Vec::new())
            }
        }
    }

    async fn scrape_and_store(&self, query: &str, key: String) -> SearchResult {
        let started = Instant::now();
        let mut outcomes = join_all(
            self.extractors
                .iter()
                .map(|extractor| self.run_marketplace(extractor.as_ref(), query)),
        )
        .await;
        // The merge interleaves in marketplace order, not completion order.
        outcomes.sort_by_key(|(marketplace, _)| *marketplace);

        let mut statuses = BTreeMap::new();
        let mut per_source = Vec::with_capacity(outcomes.len());
        for (marketplace, outcome) in outcomes {
            match outcome {
                Ok(products) => {
                    statuses.insert(marketplace, MarketplaceStatus::succeeded(products.len()));
                    per_source.push(products);
                }
                Err(e) => {
                    statuses.insert(marketplace, MarketplaceStatus::failed(e.to_string()));
                    per_source.push(Vec::new());
                }
            }
        }

        let result = SearchResult::from_parts(statuses, merge(per_source));
        tracing::info!(
            query,
            count = result.count,
            success = result.success,
            elapsed_ms = started.elapsed().as_millis(),
            "search complete"
        );

        if result.success {
            self.cache.insert(key, result.clone()).await;
        } else {
            tracing::warn!(query, "every marketplace failed; result not cached");
        }

        let batch = self.recorder.record(&result.data);
        if !batch.is_empty() {
            tracing::debug!(count = batch.len(), "recording price observations");
        }

        result
    }

    /// One marketplace, one session. The session is closed before returning
    /// whatever the extraction produced.
    async fn run_marketplace(
        &self,
        extractor: &dyn Extractor,
        query: &str,
    ) -> (Marketplace, Result<Vec<Product>, ScraperError>) {
        let marketplace = extractor.marketplace();
        let started = Instant::now();

        let outcome = match self.sessions.new_session().await {
            Ok(guard) => {
                let outcome = extractor.extract(query, guard.session()).await;
                guard.close().await;
                outcome
            }
            Err(e) => Err(e),
        };

        match &outcome {
            Ok(products) => tracing::debug!(
                %marketplace,
                count = products.len(),
                elapsed_ms = started.elapsed().as_millis(),
                "marketplace search finished"
            ),
            Err(e) => tracing::warn!(
                %marketplace,
                error = %e,
                elapsed_ms = started.elapsed().as_millis(),
                "marketplace search failed"
            ),
        }

        (marketplace, outcome)
    }
}
