use axum::{extract::State, Json};
use kartowl_core::Product;
use serde::Serialize;

use super::AppState;
use crate::search::TRENDING_KEY;

#[derive(Debug, Serialize)]
pub(super) struct TrendingResponse {
    success: bool,
    count: usize,
    data: Vec<Product>,
}

impl From<Vec<Product>> for TrendingResponse {
    fn from(data: Vec<Product>) -> Self {
        Self {
            success: true,
            count: data.len(),
            data,
        }
    }
}

/// Storage failures degrade to an empty list and are not cached.
pub(super) async fn get_trending(State(state): State<AppState>) -> Json<TrendingResponse> {
    if let Some(cached) = state.trending_cache.get(TRENDING_KEY).await {
        return Json(cached.into());
    }

    match state.history.get_trending().await {
        Ok(deals) => {
            state
                .trending_cache
                .insert(TRENDING_KEY.to_string(), deals.clone())
                .await;
            Json(deals.into())
        }
        Err(e) => {
            tracing::error!(error = %e, "trending query failed");
            Json(TrendingResponse::from(Vec::new()))
        }
    }
}
