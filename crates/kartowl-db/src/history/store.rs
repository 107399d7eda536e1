use std::sync::Arc;

use chrono::{DateTime, Utc};
use kartowl_core::{canonicalize_product_url, Marketplace, Product};
use uuid::Uuid;

use super::memory::InMemoryHistoryRepository;
use super::trending::{self, MIN_DISCOUNT, PER_SOURCE_LIMIT};
use super::{HistoryEntry, HistoryRepository, PriceObservation};
use crate::DbError;

/// Result of [`HistoryStore::append`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    Inserted,
    /// The URL was already observed today; nothing was written.
    AlreadyRecordedToday,
}

/// Canonicalizes URLs and applies the history rules over a repository.
#[derive(Clone)]
pub struct HistoryStore {
    repo: Arc<dyn HistoryRepository>,
}

impl HistoryStore {
    #[must_use]
    pub fn new(repo: Arc<dyn HistoryRepository>) -> Self {
        Self { repo }
    }

    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryHistoryRepository::new()))
    }

    #[must_use]
    pub fn backend(&self) -> &'static str {
        self.repo.backend()
    }

    /// # Errors
    ///
    /// Returns [`DbError`] if the backend is unreachable.
    pub async fn ping(&self) -> Result<(), DbError> {
        self.repo.ping().await
    }

    /// Records `observation` unless its canonical URL was already recorded
    /// today (UTC).
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the write fails.
    pub async fn append(&self, observation: &PriceObservation) -> Result<AppendOutcome, DbError> {
        self.append_at(observation, Utc::now()).await
    }

    /// [`append`](Self::append) with an explicit clock.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the write fails.
    pub async fn append_at(
        &self,
        observation: &PriceObservation,
        now: DateTime<Utc>,
    ) -> Result<AppendOutcome, DbError> {
        let entry = HistoryEntry {
            id: Uuid::new_v4(),
            product_title: observation.title.clone(),
            marketplace: observation.marketplace,
            price: observation.price,
            original_price: observation.original_price,
            discount: observation.discount,
            product_url: canonicalize_product_url(&observation.product_url),
            image_url: observation.image_url.clone(),
            created_at: now,
        };

        if self
            .repo
            .insert_if_absent_for_day(&entry, now.date_naive())
            .await?
        {
            Ok(AppendOutcome::Inserted)
        } else {
            tracing::trace!(url = %entry.product_url, "already observed today");
            Ok(AppendOutcome::AlreadyRecordedToday)
        }
    }

    /// Observations for one product, oldest first. `raw_url` may carry
    /// tracking parameters or plain http.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the query fails.
    pub async fn get_history(&self, raw_url: &str) -> Result<Vec<HistoryEntry>, DbError> {
        self.repo
            .find_by_url(&canonicalize_product_url(raw_url))
            .await
    }

    /// Recently discounted products across every marketplace, shuffled.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if any per-marketplace query fails.
    pub async fn get_trending(&self) -> Result<Vec<Product>, DbError> {
        let mut candidates = Vec::new();
        for marketplace in Marketplace::ALL {
            let top = self
                .repo
                .find_top_discounted(marketplace, MIN_DISCOUNT, PER_SOURCE_LIMIT)
                .await?;
            tracing::debug!(%marketplace, count = top.len(), "trending candidates");
            candidates.extend(top);
        }
        Ok(trending::assemble(candidates, &mut rand::rng()))
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn make_observation(url: &str) -> PriceObservation {
        PriceObservation {
            title: "Redmi Note 13".to_string(),
            marketplace: Marketplace::Daraz,
            price: 45_999,
            original_price: Some(52_999),
            discount: Some(13),
            product_url: url.to_string(),
            image_url: None,
        }
    }

    #[tokio::test]
    async fn tracking_variants_collapse_on_the_same_day() {
        let store = HistoryStore::in_memory();
        let morning = Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap();
        let evening = Utc.with_ymd_and_hms(2026, 3, 1, 20, 0, 0).unwrap();

        let first = store
            .append_at(&make_observation("https://x/y?id=1&gclid=abc"), morning)
            .await
            .unwrap();
        let second = store
            .append_at(&make_observation("http://x/y?id=1"), evening)
            .await
            .unwrap();

        assert_eq!(first, AppendOutcome::Inserted);
        assert_eq!(second, AppendOutcome::AlreadyRecordedToday);

        let history = store.get_history("https://x/y?id=1").await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].product_url, "https://x/y?id=1");
    }

    #[tokio::test]
    async fn next_day_appends_again() {
        let store = HistoryStore::in_memory();
        let day_one = Utc.with_ymd_and_hms(2026, 3, 1, 23, 59, 0).unwrap();
        let day_two = Utc.with_ymd_and_hms(2026, 3, 2, 0, 1, 0).unwrap();
        let url = "https://www.daraz.pk/products/redmi-note-13-i1.html?spm=a2a0e";

        store.append_at(&make_observation(url), day_one).await.unwrap();
        store.append_at(&make_observation(url), day_two).await.unwrap();

        let history = store
            .get_history("https://www.daraz.pk/products/redmi-note-13-i1.html")
            .await
            .unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].created_at, day_one);
    }

    #[tokio::test]
    async fn trending_takes_at_most_five_per_marketplace() {
        let store = HistoryStore::in_memory();
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let counts = [
            (Marketplace::Daraz, 8),
            (Marketplace::PriceOye, 3),
            (Marketplace::Telemart, 0),
            (Marketplace::Olx, 6),
        ];
        for (marketplace, count) in counts {
            for i in 0..count {
                let observation = PriceObservation {
                    marketplace,
                    discount: Some(20),
                    ..make_observation(&format!("https://{marketplace}.example/item/{i}"))
                };
                store.append_at(&observation, now).await.unwrap();
            }
        }

        let trending = store.get_trending().await.unwrap();
        assert_eq!(trending.len(), 13);
        assert!(trending.iter().all(|p| p.in_stock));
    }

    #[tokio::test]
    async fn small_discounts_are_not_trending() {
        let store = HistoryStore::in_memory();
        let observation = PriceObservation {
            discount: Some(5),
            ..make_observation("https://x/y")
        };
        store.append(&observation).await.unwrap();
        assert!(store.get_trending().await.unwrap().is_empty());
        assert_eq!(store.backend(), "memory");
    }
}
