use axum::{
    extract::{Query, State},
    Extension, Json,
};
use kartowl_core::SearchResult;
use serde::Deserialize;

use super::{ApiError, AppState};
use crate::middleware::RequestId;
use crate::search::sanitize_query;

#[derive(Debug, Deserialize)]
pub(super) struct SearchParams {
    q: Option<String>,
}

pub(super) async fn search(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResult>, ApiError> {
    let query = sanitize_query(params.q.as_deref().unwrap_or_default())
        .map_err(|e| ApiError::new(req_id.0.clone(), "validation_error", e.to_string()))?;

    Ok(Json(state.orchestrator.search(&query).await))
}
