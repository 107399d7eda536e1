mod history;
mod search;
mod trending;

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderName, HeaderValue, Method, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use kartowl_core::Product;
use kartowl_db::HistoryStore;
use kartowl_scraper::{BrowserSessionManager, BrowserStatus};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::middleware::{enforce_rate_limit, request_id, RateLimitState};
use crate::search::{ResultCache, SearchOrchestrator};

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<SearchOrchestrator>,
    pub history: HistoryStore,
    pub browser: Arc<BrowserSessionManager>,
    pub trending_cache: ResultCache<Vec<Product>>,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    browser: &'static str,
    history: &'static str,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn map_db_error(request_id: String, error: &kartowl_db::DbError) -> ApiError {
    tracing::error!(error = %error, "history query failed");
    ApiError::new(request_id, "internal_error", "history query failed")
}

fn build_cors(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static("x-request-id")])
        .expose_headers([HeaderName::from_static("x-request-id")])
}

fn data_router(rate_limit: RateLimitState) -> Router<AppState> {
    Router::new()
        .route("/api/search", get(search::search))
        .route("/api/history", get(history::get_history))
        .route("/api/trending", get(trending::get_trending))
        .layer(axum::middleware::from_fn_with_state(
            rate_limit,
            enforce_rate_limit,
        ))
}

pub fn build_app(state: AppState, cors_origins: &[String], rate_limit: RateLimitState) -> Router {
    let public_routes = Router::new().route("/api/health", get(health));

    Router::new()
        .merge(public_routes)
        .merge(data_router(rate_limit))
        .layer(
            ServiceBuilder::new()
                .layer(build_cors(cors_origins))
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

/// Always 200 so a missing browser shows up as `degraded` rather than down.
async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let browser = state.browser.status().await;
    let history = match state.history.ping().await {
        Ok(()) => state.history.backend(),
        Err(e) => {
            tracing::warn!(error = %e, "health check: history store unavailable");
            "unavailable"
        }
    };

    let healthy = browser == BrowserStatus::Ready && history != "unavailable";
    Json(HealthData {
        status: if healthy { "ok" } else { "degraded" },
        browser: browser.as_str(),
        history,
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use kartowl_core::Marketplace;
    use kartowl_db::{InMemoryHistoryRepository, PriceObservation};
    use kartowl_scraper::{BrowserSettings, Extractor};
    use tower::ServiceExt;

    use super::*;
    use crate::search::testing::{FailingHistoryRepository, StubExtractor, StubSessionSource};
    use crate::search::HistoryRecorder;

    // -------------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------------

    fn make_state(history: HistoryStore) -> AppState {
        let extractors: Vec<Arc<dyn Extractor>> = vec![
            StubExtractor::returning(Marketplace::Daraz, 3),
            StubExtractor::failing(Marketplace::PriceOye, "navigation timed out"),
            StubExtractor::returning(Marketplace::Telemart, 2),
            StubExtractor::returning(Marketplace::Olx, 1),
        ];
        let orchestrator = SearchOrchestrator::new(
            Arc::new(StubSessionSource::default()),
            extractors,
            ResultCache::new(Duration::from_secs(3_600), 100),
            HistoryRecorder::new(history.clone()),
        );
        AppState {
            orchestrator: Arc::new(orchestrator),
            history,
            browser: Arc::new(BrowserSessionManager::new(BrowserSettings::default())),
            trending_cache: ResultCache::new(Duration::from_secs(3_600), 1),
        }
    }

    fn make_app(history: HistoryStore) -> Router {
        build_app(
            make_state(history),
            &["http://localhost:5173".to_string()],
            RateLimitState::new(120, Duration::from_secs(60)),
        )
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .uri(uri)
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json = serde_json::from_slice(&body).expect("json parse");
        (status, json)
    }

    // -------------------------------------------------------------------------
    // Envelope
    // -------------------------------------------------------------------------

    #[test]
    fn api_error_validation_error_maps_to_bad_request() {
        let response = ApiError::new("req-1", "validation_error", "invalid input").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn api_error_unknown_code_maps_to_internal_error() {
        let response = ApiError::new("req-1", "internal_error", "boom").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    // -------------------------------------------------------------------------
    // Health
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn health_reports_degraded_without_browser() {
        let (status, json) = get_json(make_app(HistoryStore::in_memory()), "/api/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "degraded");
        assert_eq!(json["browser"], "uninitialized");
        assert_eq!(json["history"], "memory");
    }

    #[tokio::test]
    async fn health_reports_unreachable_history() {
        let history = HistoryStore::new(Arc::new(FailingHistoryRepository));
        let (status, json) = get_json(make_app(history), "/api/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["history"], "unavailable");
    }

    // -------------------------------------------------------------------------
    // Search
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn search_returns_merged_result_with_statuses() {
        let app = make_app(HistoryStore::in_memory());
        let (status, json) = get_json(app, "/api/search?q=galaxy%20a15").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(json["count"], 6);
        assert_eq!(json["data"].as_array().map(Vec::len), Some(6));
        assert_eq!(json["marketplaceStatus"]["priceoye"]["success"], false);
        assert_eq!(json["marketplaceStatus"]["daraz"]["count"], 3);
        assert!(json["data"][0]["currentPrice"].is_i64());
        assert!(json["data"][0]["productUrl"].is_string());
    }

    #[tokio::test]
    async fn search_rejects_short_query() {
        let app = make_app(HistoryStore::in_memory());
        let (status, json) = get_json(app, "/api/search?q=%3Cb%3E").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"], "validation_error");
        assert!(json["meta"]["request_id"].is_string());
    }

    #[tokio::test]
    async fn search_without_query_is_rejected() {
        let (status, json) = get_json(make_app(HistoryStore::in_memory()), "/api/search").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"], "validation_error");
    }

    // -------------------------------------------------------------------------
    // History
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn history_requires_url() {
        let (status, json) = get_json(make_app(HistoryStore::in_memory()), "/api/history").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"], "bad_request");
    }

    #[tokio::test]
    async fn history_returns_series_and_summary() {
        let history = HistoryStore::in_memory();
        history
            .append(&PriceObservation {
                title: "Galaxy A15".to_string(),
                marketplace: Marketplace::Daraz,
                price: 45_999,
                original_price: Some(49_999),
                discount: Some(8),
                product_url: "https://www.daraz.pk/products/galaxy-a15.html".to_string(),
                image_url: None,
            })
            .await
            .unwrap();

        let (status, json) = get_json(
            make_app(history),
            "/api/history?url=http%3A%2F%2Fwww.daraz.pk%2Fproducts%2Fgalaxy-a15.html%3Fspm%3Dx",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(json["count"], 1);
        assert_eq!(json["data"][0]["price"], 45_999);
        assert_eq!(json["summary"]["current"], 45_999);
        assert_eq!(json["summary"]["verdict"], "fair");
    }

    #[tokio::test]
    async fn history_for_unknown_url_is_empty() {
        let (status, json) = get_json(
            make_app(HistoryStore::in_memory()),
            "/api/history?url=https%3A%2F%2Fx%2Fnone",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["count"], 0);
        assert!(json["summary"].is_null());
    }

    #[tokio::test]
    async fn history_storage_failure_is_internal_error() {
        let history = HistoryStore::new(Arc::new(FailingHistoryRepository));
        let (status, json) = get_json(make_app(history), "/api/history?url=https%3A%2F%2Fx%2Fy")
            .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"]["code"], "internal_error");
    }

    // -------------------------------------------------------------------------
    // Trending
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn trending_lists_discounted_products() {
        let repo = Arc::new(InMemoryHistoryRepository::new());
        let history = HistoryStore::new(repo);
        history
            .append(&PriceObservation {
                title: "Redmi 13C".to_string(),
                marketplace: Marketplace::Olx,
                price: 27_000,
                original_price: Some(30_000),
                discount: Some(10),
                product_url: "https://www.olx.com.pk/item/redmi-13c-iid-1".to_string(),
                image_url: None,
            })
            .await
            .unwrap();

        let (status, json) = get_json(make_app(history), "/api/trending").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(json["count"], 1);
        assert_eq!(json["data"][0]["marketplace"], "olx");
        assert_eq!(json["data"][0]["inStock"], true);
    }

    #[tokio::test]
    async fn trending_storage_failure_yields_empty_list() {
        let history = HistoryStore::new(Arc::new(FailingHistoryRepository));
        let (status, json) = get_json(make_app(history), "/api/trending").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["count"], 0);
        assert_eq!(json["data"], serde_json::json!([]));
    }

    // -------------------------------------------------------------------------
    // Layers
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn data_routes_are_rate_limited_but_health_is_not() {
        let app = build_app(
            make_state(HistoryStore::in_memory()),
            &[],
            RateLimitState::new(1, Duration::from_secs(60)),
        );

        let (first, _) = get_json(app.clone(), "/api/trending").await;
        let (second, json) = get_json(app.clone(), "/api/trending").await;
        let (health, _) = get_json(app, "/api/health").await;

        assert_eq!(first, StatusCode::OK);
        assert_eq!(second, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(json["error"]["code"], "rate_limited");
        assert_eq!(health, StatusCode::OK);
    }

    #[tokio::test]
    async fn allowed_origin_gets_cors_headers() {
        let response = make_app(HistoryStore::in_memory())
            .oneshot(
                Request::builder()
                    .uri("/api/health")
                    .header(header::ORIGIN, "http://localhost:5173")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "http://localhost:5173"
        );
        assert!(response.headers().contains_key("x-request-id"));
    }
}
