use axum::{
    extract::{Query, State},
    Extension, Json,
};
use kartowl_db::{summarize, HistoryEntry, PriceSummary};
use serde::{Deserialize, Serialize};

use super::{map_db_error, ApiError, AppState};
use crate::middleware::RequestId;

#[derive(Debug, Deserialize)]
pub(super) struct HistoryParams {
    url: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct HistoryResponse {
    success: bool,
    count: usize,
    data: Vec<HistoryEntry>,
    summary: Option<PriceSummary>,
}

pub(super) async fn get_history(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let Some(url) = params.url.as_deref().map(str::trim).filter(|u| !u.is_empty()) else {
        return Err(ApiError::new(
            req_id.0,
            "bad_request",
            "url query parameter is required",
        ));
    };

    let entries = state
        .history
        .get_history(url)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(HistoryResponse {
        success: true,
        count: entries.len(),
        summary: summarize(&entries),
        data: entries,
    }))
}
