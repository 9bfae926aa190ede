//! Grid scan and keyword check handlers.
//!
//! Only one scan runs at a time per process; a second request while one is in
//! flight gets 409. If the client disconnects, axum drops the handler future,
//! which stops the scan before its next probe.

use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};
use localrank_core::{
    GeoPoint, KeywordCheckRequest, ProbeOutcome, RequestError, SampleRequest, ScanResult,
};
use localrank_scanner::{keyword_overlay, render, GridScanner, MarkerSet, ScanError};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tokio::sync::MutexGuard;

use crate::middleware::RequestId;

use super::{ApiError, ApiResponse, AppState};

/// Absent text fields deserialize as empty so request validation reports them.
#[derive(Debug, Deserialize)]
pub(super) struct GridScanBody {
    #[serde(default)]
    pub keyword: String,
    #[serde(default)]
    pub business_place_id: String,
    pub center: Option<GeoPoint>,
    pub num_points: Option<u32>,
    pub radius_meters: Option<f64>,
    pub business_name: Option<String>,
    /// Makes the sample points reproducible.
    pub seed: Option<u64>,
}

#[derive(Debug, Serialize)]
pub(super) struct GridScanResponse {
    pub scan: ScanResult,
    pub markers: MarkerSet,
}

#[derive(Debug, Deserialize)]
pub(super) struct KeywordCheckBody {
    #[serde(default)]
    pub business_place_id: String,
    pub address: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Business location; when given, the response includes a marker overlay.
    pub center: Option<GeoPoint>,
    pub business_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct KeywordPosition {
    pub keyword: String,
    pub outcome: ProbeOutcome,
    /// 1 to 20, or 21 when not found or not checked.
    pub position: u32,
}

#[derive(Debug, Serialize)]
pub(super) struct KeywordCheckResponse {
    pub business_place_id: String,
    pub keywords: Vec<KeywordPosition>,
    pub markers: Option<MarkerSet>,
}

fn validation_error(req_id: &str, error: &RequestError) -> ApiError {
    ApiError::new(req_id, "validation_error", error.to_string())
}

fn map_scan_error(req_id: &str, error: &ScanError) -> ApiError {
    match error {
        ScanError::InvalidRequest(e) => validation_error(req_id, e),
        ScanError::Cancelled => ApiError::new(req_id, "conflict", "scan was cancelled"),
    }
}

/// Malformed JSON gets the same 400 envelope as a failed validation.
fn json_body<T>(req_id: &str, body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    body.map(|Json(body)| body)
        .map_err(|e| ApiError::new(req_id, "validation_error", e.body_text()))
}

fn acquire_scan_slot<'a>(
    state: &'a AppState,
    req_id: &str,
) -> Result<MutexGuard<'a, ()>, ApiError> {
    state.scan_lock.try_lock().map_err(|_| {
        tracing::info!("scan rejected, another scan is running");
        ApiError::new(req_id, "conflict", "another scan is already running")
    })
}

pub(super) async fn run_grid_scan(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    body: Result<Json<GridScanBody>, JsonRejection>,
) -> Result<Json<ApiResponse<GridScanResponse>>, ApiError> {
    let body = json_body(&req_id.0, body)?;
    let center = body
        .center
        .ok_or_else(|| validation_error(&req_id.0, &RequestError::MissingCenter))?;
    let request = SampleRequest {
        keyword: body.keyword.trim().to_owned(),
        business_id: body.business_place_id.trim().to_owned(),
        center,
        num_points: body.num_points.unwrap_or(state.default_num_points),
        radius_meters: body.radius_meters.unwrap_or(state.default_radius_meters),
    };
    request
        .validate(state.scan_settings.max_points)
        .map_err(|e| validation_error(&req_id.0, &e))?;

    let _slot = acquire_scan_slot(&state, &req_id.0)?;
    let scanner = GridScanner::new(
        &state.probe_places,
        state.scan_settings.clone().with_seed(body.seed),
    );
    let scan = scanner
        .scan(&request)
        .await
        .map_err(|e| map_scan_error(&req_id.0, &e))?;

    let markers = render(&scan, center, body.business_name.as_deref());
    Ok(ApiResponse::new(req_id.0, GridScanResponse { scan, markers }))
}

pub(super) async fn run_keyword_check(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    body: Result<Json<KeywordCheckBody>, JsonRejection>,
) -> Result<Json<ApiResponse<KeywordCheckResponse>>, ApiError> {
    let body = json_body(&req_id.0, body)?;
    let request = KeywordCheckRequest {
        business_id: body.business_place_id.trim().to_owned(),
        address: body.address,
        keywords: body.keywords,
    };
    request
        .validate()
        .map_err(|e| validation_error(&req_id.0, &e))?;
    if let Some(center) = body.center.filter(|c| !c.is_valid()) {
        return Err(validation_error(
            &req_id.0,
            &RequestError::InvalidCenter {
                lat: center.lat,
                lng: center.lng,
            },
        ));
    }

    let _slot = acquire_scan_slot(&state, &req_id.0)?;
    let scanner = GridScanner::new(&state.probe_places, state.scan_settings.clone());
    let result = scanner
        .check_keywords(&request)
        .await
        .map_err(|e| map_scan_error(&req_id.0, &e))?;

    let markers = body.center.map(|center| {
        keyword_overlay(
            &mut StdRng::from_os_rng(),
            center,
            body.business_name.as_deref(),
            &result.ranks,
        )
    });
    let keywords = result
        .ranks
        .into_iter()
        .map(|rank| KeywordPosition {
            position: rank.position_or_sentinel(),
            keyword: rank.keyword,
            outcome: rank.outcome,
        })
        .collect();

    Ok(ApiResponse::new(
        req_id.0,
        KeywordCheckResponse {
            business_place_id: result.business_id,
            keywords,
            markers,
        },
    ))
}
