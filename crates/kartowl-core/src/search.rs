use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::products::{Marketplace, Product};

/// Outcome of one marketplace's extraction within a single search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketplaceStatus {
    pub success: bool,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MarketplaceStatus {
    #[must_use]
    pub fn succeeded(count: usize) -> Self {
        Self {
            success: true,
            count,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            count: 0,
            error: Some(error.into()),
        }
    }
}

/// Merged answer to one query, as returned to callers and held in the cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub success: bool,
    pub count: usize,
    pub marketplace_status: BTreeMap<Marketplace, MarketplaceStatus>,
    pub data: Vec<Product>,
}

impl SearchResult {
    /// Builds a result from per-source statuses and the merged product list.
    ///
    /// `success` is true when at least one source succeeded, so a partial
    /// answer stays distinguishable from a total outage.
    #[must_use]
    pub fn from_parts(
        marketplace_status: BTreeMap<Marketplace, MarketplaceStatus>,
        data: Vec<Product>,
    ) -> Self {
        Self {
            success: marketplace_status.values().any(|s| s.success),
            count: data.len(),
            marketplace_status,
            data,
        }
    }
}
