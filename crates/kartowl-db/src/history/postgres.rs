//! `product_history` table access.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use kartowl_core::Marketplace;
use sqlx::PgPool;
use uuid::Uuid;

use super::{HistoryEntry, HistoryRepository};
use crate::DbError;

/// A row from the `product_history` table.
#[derive(Debug, Clone, sqlx::FromRow)]
struct HistoryRow {
    id: Uuid,
    product_title: String,
    marketplace: String,
    price: i64,
    original_price: Option<i64>,
    discount: Option<i32>,
    product_url: String,
    image_url: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<HistoryRow> for HistoryEntry {
    type Error = DbError;

    fn try_from(row: HistoryRow) -> Result<Self, Self::Error> {
        let marketplace = row
            .marketplace
            .parse::<Marketplace>()
            .map_err(|e| DbError::InvalidRow(format!("product_history {}: {e}", row.id)))?;
        Ok(Self {
            id: row.id,
            product_title: row.product_title,
            marketplace,
            price: row.price,
            original_price: row.original_price,
            discount: row.discount,
            product_url: row.product_url,
            image_url: row.image_url,
            created_at: row.created_at,
        })
    }
}

/// Postgres-backed history. The `(product_url, observed_on)` unique key makes
/// concurrent duplicate appends collapse to one row.
#[derive(Debug, Clone)]
pub struct PgHistoryRepository {
    pool: PgPool,
}

impl PgHistoryRepository {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const SELECT_COLUMNS: &str = "SELECT id, product_title, marketplace, price, original_price, \
     discount, product_url, image_url, created_at FROM product_history";

#[async_trait]
impl HistoryRepository for PgHistoryRepository {
    async fn insert_if_absent_for_day(
        &self,
        entry: &HistoryEntry,
        day: NaiveDate,
    ) -> Result<bool, DbError> {
        let rows_affected = sqlx::query(
            "INSERT INTO product_history \
                 (id, product_title, marketplace, price, original_price, discount, \
                  product_url, image_url, created_at, observed_on) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             ON CONFLICT (product_url, observed_on) DO NOTHING",
        )
        .bind(entry.id)
        .bind(&entry.product_title)
        .bind(entry.marketplace.as_str())
        .bind(entry.price)
        .bind(entry.original_price)
        .bind(entry.discount)
        .bind(&entry.product_url)
        .bind(entry.image_url.as_deref())
        .bind(entry.created_at)
        .bind(day)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(rows_affected > 0)
    }

    async fn find_by_url(&self, product_url: &str) -> Result<Vec<HistoryEntry>, DbError> {
        let rows = sqlx::query_as::<_, HistoryRow>(&format!(
            "{SELECT_COLUMNS} WHERE product_url = $1 ORDER BY created_at ASC, id ASC"
        ))
        .bind(product_url)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(HistoryEntry::try_from).collect()
    }

    async fn find_top_discounted(
        &self,
        marketplace: Marketplace,
        min_discount: i32,
        limit: usize,
    ) -> Result<Vec<HistoryEntry>, DbError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = sqlx::query_as::<_, HistoryRow>(&format!(
            "{SELECT_COLUMNS} \
             WHERE marketplace = $1 AND discount > $2 \
             ORDER BY discount DESC, created_at DESC \
             LIMIT $3"
        ))
        .bind(marketplace.as_str())
        .bind(min_discount)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(HistoryEntry::try_from).collect()
    }

    async fn ping(&self) -> Result<(), DbError> {
        crate::ping(&self.pool).await?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }
}
