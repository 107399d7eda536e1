//! Price history: an append-only log of observed prices keyed by canonical
//! product URL, at most one observation per URL per calendar day.
//!
//! [`HistoryStore`] is the entry point. It canonicalizes URLs and applies the
//! trending and summary rules on top of a [`HistoryRepository`], which only
//! stores and fetches rows.

mod memory;
mod postgres;
mod store;
mod summary;
mod trending;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use kartowl_core::{Marketplace, Product};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::DbError;

pub use memory::InMemoryHistoryRepository;
pub use postgres::PgHistoryRepository;
pub use store::{AppendOutcome, HistoryStore};
pub use summary::{summarize, DealVerdict, PriceSummary};

/// One stored price observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: Uuid,
    pub product_title: String,
    pub marketplace: Marketplace,
    pub price: i64,
    pub original_price: Option<i64>,
    pub discount: Option<i32>,
    /// Canonical URL; the dedup key.
    pub product_url: String,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// What a search saw for one product, before canonicalization.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceObservation {
    pub title: String,
    pub marketplace: Marketplace,
    pub price: i64,
    pub original_price: Option<i64>,
    pub discount: Option<i32>,
    pub product_url: String,
    pub image_url: Option<String>,
}

impl From<&Product> for PriceObservation {
    fn from(product: &Product) -> Self {
        Self {
            title: product.title.clone(),
            marketplace: product.marketplace,
            price: product.current_price,
            original_price: product.original_price,
            discount: Some(i32::from(product.discount)),
            product_url: product.product_url.clone(),
            image_url: product.image.clone(),
        }
    }
}

/// Storage behind [`HistoryStore`].
///
/// Implementations store entries as given; URL canonicalization happens in
/// the store before any call reaches here.
#[async_trait]
pub trait HistoryRepository: Send + Sync {
    /// Inserts `entry` unless an entry with the same URL already exists for
    /// `day`. Returns `true` if a row was written.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the backend rejects the write.
    async fn insert_if_absent_for_day(
        &self,
        entry: &HistoryEntry,
        day: NaiveDate,
    ) -> Result<bool, DbError>;

    /// All entries for `product_url`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the backend query fails.
    async fn find_by_url(&self, product_url: &str) -> Result<Vec<HistoryEntry>, DbError>;

    /// Up to `limit` entries for `marketplace` with `discount > min_discount`,
    /// highest discount first, newest first among equals.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the backend query fails.
    async fn find_top_discounted(
        &self,
        marketplace: Marketplace,
        min_discount: i32,
        limit: usize,
    ) -> Result<Vec<HistoryEntry>, DbError>;

    /// Cheap liveness probe.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the backend is unreachable.
    async fn ping(&self) -> Result<(), DbError>;

    /// Short backend name reported by the health endpoint.
    fn backend(&self) -> &'static str;
}
