use async_trait::async_trait;
use chrono::NaiveDate;
use kartowl_core::Marketplace;
use tokio::sync::Mutex;

use super::{HistoryEntry, HistoryRepository};
use crate::DbError;

/// Process-local history, used when no database is configured.
///
/// Nothing survives a restart.
#[derive(Debug, Default)]
pub struct InMemoryHistoryRepository {
    rows: Mutex<Vec<(NaiveDate, HistoryEntry)>>,
}

impl InMemoryHistoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.rows.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.lock().await.is_empty()
    }
}

#[async_trait]
impl HistoryRepository for InMemoryHistoryRepository {
    async fn insert_if_absent_for_day(
        &self,
        entry: &HistoryEntry,
        day: NaiveDate,
    ) -> Result<bool, DbError> {
        let mut rows = self.rows.lock().await;
        let exists = rows
            .iter()
            .any(|(d, e)| *d == day && e.product_url == entry.product_url);
        if exists {
            return Ok(false);
        }
        rows.push((day, entry.clone()));
        Ok(true)
    }

    async fn find_by_url(&self, product_url: &str) -> Result<Vec<HistoryEntry>, DbError> {
        let rows = self.rows.lock().await;
        let mut found: Vec<HistoryEntry> = rows
            .iter()
            .filter(|(_, e)| e.product_url == product_url)
            .map(|(_, e)| e.clone())
            .collect();
        found.sort_by_key(|e| e.created_at);
        Ok(found)
    }

    async fn find_top_discounted(
        &self,
        marketplace: Marketplace,
        min_discount: i32,
        limit: usize,
    ) -> Result<Vec<HistoryEntry>, DbError> {
        let rows = self.rows.lock().await;
        let mut found: Vec<HistoryEntry> = rows
            .iter()
            .map(|(_, e)| e)
            .filter(|e| e.marketplace == marketplace)
            .filter(|e| e.discount.is_some_and(|d| d > min_discount))
            .cloned()
            .collect();
        found.sort_by(|a, b| {
            b.discount
                .cmp(&a.discount)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        found.truncate(limit);
        Ok(found)
    }

    async fn ping(&self) -> Result<(), DbError> {
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
