mod metrics;
mod places;
mod scans;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use localrank_core::AppConfig;
use localrank_places::{PerformanceClient, PlacesClient, PlacesError};
use localrank_scanner::ScanSettings;
use serde::Serialize;
use tokio::sync::Mutex;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::{enforce_rate_limit, request_id, RateLimitState, RequestId};

#[derive(Clone)]
pub struct AppState {
    /// Lookups (search, rating); retries transient failures.
    pub places: Arc<PlacesClient>,
    /// Scan probes; never retries, the scanner owns failure handling.
    pub probe_places: Arc<PlacesClient>,
    pub performance: Arc<PerformanceClient>,
    pub scan_settings: ScanSettings,
    pub default_num_points: u32,
    pub default_radius_meters: f64,
    /// Held for the duration of a scan; the provider quota is shared.
    pub scan_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn from_app_config(config: &AppConfig) -> anyhow::Result<Self> {
        let probe_places = PlacesClient::with_base_url(
            &config.places_api_key,
            config.request_timeout_secs,
            &config.user_agent,
            &config.places_base_url,
        )?;
        Ok(Self {
            places: Arc::new(PlacesClient::from_app_config(config)?),
            probe_places: Arc::new(probe_places),
            performance: Arc::new(PerformanceClient::from_app_config(config)?),
            scan_settings: ScanSettings::from_app_config(config),
            default_num_points: config.default_num_points,
            default_radius_meters: config.default_radius_meters,
            scan_lock: Arc::new(Mutex::new(())),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
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
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl<T: Serialize> ApiResponse<T> {
    pub(super) fn new(request_id: String, data: T) -> Json<Self> {
        Json(Self {
            data,
            meta: ResponseMeta::new(request_id),
        })
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
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "forbidden" => StatusCode::FORBIDDEN,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "conflict" => StatusCode::CONFLICT,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            "upstream_error" => StatusCode::BAD_GATEWAY,
            "upstream_quota" => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

/// Maps a collaborator failure on a lookup route to an API error.
pub(super) fn map_places_error(request_id: String, error: &PlacesError) -> ApiError {
    match error {
        PlacesError::InvalidArgument(message) => {
            ApiError::new(request_id, "validation_error", message.clone())
        }
        PlacesError::QuotaExceeded { .. } => {
            tracing::warn!(error = %error, "provider quota exceeded");
            ApiError::new(request_id, "upstream_quota", "provider quota exceeded, try later")
        }
        PlacesError::Api { status, .. } if status == "NOT_FOUND" => {
            ApiError::new(request_id, "not_found", "place not found")
        }
        PlacesError::Api { status, .. } if status == "INVALID_REQUEST" => {
            ApiError::new(request_id, "validation_error", "provider rejected the request")
        }
        PlacesError::UnexpectedStatus { status: 401, .. } => {
            ApiError::new(request_id, "unauthorized", "access token rejected by provider")
        }
        PlacesError::UnexpectedStatus { status: 403, .. } => {
            ApiError::new(request_id, "forbidden", "access to this location was denied")
        }
        PlacesError::UnexpectedStatus { status: 404, .. } => {
            ApiError::new(request_id, "not_found", "location not found")
        }
        _ => {
            tracing::error!(error = %error, "provider call failed");
            ApiError::new(request_id, "upstream_error", "provider call failed")
        }
    }
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
        ])
}

fn limited_router(rate_limit: RateLimitState) -> Router<AppState> {
    Router::new()
        .route("/api/v1/places/search", post(places::search_places))
        .route(
            "/api/v1/places/{place_id}/rating",
            get(places::get_place_rating),
        )
        .route("/api/v1/scans/grid", post(scans::run_grid_scan))
        .route("/api/v1/scans/keywords", post(scans::run_keyword_check))
        .route(
            "/api/v1/locations/{location_id}/metrics",
            get(metrics::get_location_metrics),
        )
        .layer(axum::middleware::from_fn_with_state(
            rate_limit,
            enforce_rate_limit,
        ))
}

pub fn build_app(state: AppState, rate_limit: RateLimitState) -> Router {
    let public_routes = Router::new().route("/api/v1/health", get(health));

    Router::new()
        .merge(public_routes)
        .merge(limited_router(rate_limit))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(Extension(req_id): Extension<RequestId>) -> impl IntoResponse {
    ApiResponse::new(req_id.0, HealthData { status: "ok" })
}

pub fn default_rate_limit_state() -> RateLimitState {
    RateLimitState::new(120, Duration::from_secs(60))
}


#[cfg(test)]
mod tests {
    use super::test_support::{app_for, send, state_for};
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    #[test]
    fn api_error_validation_error_maps_to_bad_request() {
        let response = ApiError::new("req-1", "validation_error", "invalid input").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn api_error_conflict_maps_to_409() {
        let response = ApiError::new("req-1", "conflict", "busy").into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn quota_maps_to_service_unavailable() {
        let err = map_places_error(
            "req-1".to_owned(),
            &PlacesError::QuotaExceeded {
                status: "OVER_QUERY_LIMIT".to_owned(),
            },
        );
        assert_eq!(err.error.code, "upstream_quota");
        assert_eq!(err.into_response().status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn provider_401_maps_to_unauthorized() {
        let err = map_places_error(
            "req-1".to_owned(),
            &PlacesError::UnexpectedStatus {
                status: 401,
                endpoint: "/v1/locations/1".to_owned(),
            },
        );
        assert_eq!(err.error.code, "unauthorized");
    }

    #[tokio::test]
    async fn health_returns_ok_with_request_id() {
        let app = app_for(state_for("http://127.0.0.1:9", "http://127.0.0.1:9"));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/health")
                    .header("x-request-id", "req-abc")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get("x-request-id")
                .and_then(|v| v.to_str().ok()),
            Some("req-abc")
        );
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json parse");
        assert_eq!(json["data"]["status"], "ok");
        assert_eq!(json["meta"]["request_id"], "req-abc");
    }

    #[tokio::test]
    async fn rate_limit_rejects_after_budget() {
        let state = state_for("http://127.0.0.1:9", "http://127.0.0.1:9");
        let app = build_app(state, RateLimitState::new(1, Duration::from_secs(60)));

        let short_query = || {
            super::test_support::post_json(
                "/api/v1/places/search",
                &serde_json::json!({ "query": "ab" }),
            )
        };
        let (first, _) = send(app.clone(), short_query()).await;
        assert_eq!(first, StatusCode::OK);
        let (second, json) = send(app, short_query()).await;
        assert_eq!(second, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(json["error"]["code"], "rate_limited");
    }
}
