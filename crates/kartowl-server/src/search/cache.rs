use std::fmt;
use std::time::Duration;

use moka::future::Cache;

/// Key of the single cached trending list.
pub const TRENDING_KEY: &str = "trending";

/// Cache key for a search query; case and surrounding whitespace do not
/// matter.
#[must_use]
pub fn search_key(query: &str) -> String {
    format!("search:{}", query.trim().to_lowercase())
}

/// Time-boxed memo of computed responses.
///
/// Entries expire a fixed time after insertion regardless of how often they
/// are read. There is no invalidation and no single-flight: two concurrent
/// misses for the same key both compute and the later insert wins.
#[derive(Clone)]
pub struct ResultCache<V> {
    inner: Cache<String, V>,
}

impl<V> fmt::Debug for ResultCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultCache")
            .field("entries", &self.inner.entry_count())
            .finish_non_exhaustive()
    }
}

impl<V> ResultCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    #[must_use]
    pub fn new(ttl: Duration, max_entries: u64) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(max_entries)
                .time_to_live(ttl)
                .build(),
        }
    }

    pub async fn get(&self, key: &str) -> Option<V> {
        self.inner.get(key).await
    }

    pub async fn insert(&self, key: String, value: V) {
        self.inner.insert(key, value).await;
    }
}
