use axum::{
    extract::{Path, Query, State},
    http::{header::AUTHORIZATION, HeaderMap},
    Extension, Json,
};
use chrono::Utc;
use localrank_places::{DateRange, MetricTotals};
use serde::Deserialize;

use crate::middleware::{extract_bearer_token, RequestId};

use super::{map_places_error, ApiError, ApiResponse, AppState};

const DEFAULT_ROLLING_DAYS: i64 = 30;

#[derive(Debug, Deserialize, Default, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub(super) enum RangeMode {
    #[default]
    Rolling,
    Month,
}

#[derive(Debug, Deserialize)]
pub(super) struct MetricsQuery {
    #[serde(default)]
    pub mode: RangeMode,
    pub days: Option<i64>,
    pub offset: Option<u32>,
}

fn resolve_range(req_id: &str, query: &MetricsQuery) -> Result<DateRange, ApiError> {
    let today = Utc::now().date_naive();
    let range = match query.mode {
        RangeMode::Rolling => {
            let days = query.days.unwrap_or(DEFAULT_ROLLING_DAYS);
            let days = u32::try_from(days)
                .ok()
                .filter(|d| *d > 0)
                .ok_or_else(|| {
                    ApiError::new(req_id, "validation_error", "days must be a positive number")
                })?;
            DateRange::rolling(today, days)
        }
        RangeMode::Month => DateRange::calendar_month(today, query.offset.unwrap_or(0)),
    };
    range.map_err(|e| ApiError::new(req_id, "validation_error", e.to_string()))
}

/// Metric totals for one Business Profile location.
///
/// The caller's Google access token is forwarded as-is; this service never
/// stores it.
pub(super) async fn get_location_metrics(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(location_id): Path<String>,
    Query(query): Query<MetricsQuery>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<MetricTotals>>, ApiError> {
    let Some(token) = extract_bearer_token(headers.get(AUTHORIZATION)) else {
        return Err(ApiError::new(
            req_id.0,
            "unauthorized",
            "missing Google access token",
        ));
    };
    let range = resolve_range(&req_id.0, &query)?;

    let totals = state
        .performance
        .fetch_metric_totals(&location_id, range, token)
        .await
        .map_err(|e| map_places_error(req_id.0.clone(), &e))?;

    Ok(ApiResponse::new(req_id.0, totals))
}
