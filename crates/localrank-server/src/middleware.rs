use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{Request, State},
    http::{header::RETRY_AFTER, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Newtype wrapping a request ID string, stored as a request extension.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

#[derive(Debug, Clone)]
struct RateLimitWindow {
    started_at: Instant,
    count: usize,
}

/// Fixed-window limiter shared by every `/api/v1` route except health.
///
/// A grid scan is one request here but fans out into many provider calls;
/// the scan lock in `AppState` covers that side.
#[derive(Debug, Clone)]
pub struct RateLimitState {
    max_requests: usize,
    window: Duration,
    state: Arc<Mutex<RateLimitWindow>>,
}

impl RateLimitState {
    #[must_use]
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            state: Arc::new(Mutex::new(RateLimitWindow {
                started_at: Instant::now(),
                count: 0,
            })),
        }
    }
}

/// Same envelope shape as `ApiError`, built here because the limiter runs
/// before any handler.
#[derive(Debug, Serialize)]
struct RateLimitedBody<'a> {
    error: RateLimitedError,
    meta: RateLimitedMeta<'a>,
}

#[derive(Debug, Serialize)]
struct RateLimitedError {
    code: &'static str,
    message: &'static str,
}

#[derive(Debug, Serialize)]
struct RateLimitedMeta<'a> {
    request_id: &'a str,
    timestamp: DateTime<Utc>,
}

/// Axum middleware that extracts or generates a request ID.
///
/// If the incoming request has an `x-request-id` header, that value is used.
/// Otherwise a new `UUIDv4` is generated. The ID is:
/// - Inserted into request extensions as [`RequestId`]
/// - Set on the response as the `x-request-id` header
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    req.extensions_mut().insert(RequestId(id.clone()));

    let mut res = next.run(req).await;

    if let Ok(val) = HeaderValue::from_str(&id) {
        res.headers_mut().insert("x-request-id", val);
    }

    res
}

/// Middleware enforcing a fixed request-per-window limit.
///
/// Rejected requests get `429` with a `Retry-After` header holding the
/// seconds left in the current window.
pub async fn enforce_rate_limit(
    State(rate_limit): State<RateLimitState>,
    req: Request,
    next: Next,
) -> Response {
    let retry_after = {
        let mut window = rate_limit.state.lock().await;
        if window.started_at.elapsed() >= rate_limit.window {
            window.started_at = Instant::now();
            window.count = 0;
        }

        if window.count >= rate_limit.max_requests {
            Some(rate_limit.window.saturating_sub(window.started_at.elapsed()))
        } else {
            window.count += 1;
            None
        }
    };

    match retry_after {
        Some(wait) => {
            let request_id = req
                .extensions()
                .get::<RequestId>()
                .map(|id| id.0.as_str())
                .unwrap_or_default();
            tracing::warn!(
                max_requests = rate_limit.max_requests,
                request_id,
                retry_after_secs = whole_seconds(wait),
                "api rate limit hit"
            );
            rate_limited_response(request_id, wait)
        }
        None => next.run(req).await,
    }
}

/// Rounds up, never below one second.
fn whole_seconds(wait: Duration) -> u64 {
    (wait.as_secs() + u64::from(wait.subsec_nanos() > 0)).max(1)
}

fn rate_limited_response(request_id: &str, wait: Duration) -> Response {
    let body = RateLimitedBody {
        error: RateLimitedError {
            code: "rate_limited",
            message: "rate limit exceeded",
        },
        meta: RateLimitedMeta {
            request_id,
            timestamp: Utc::now(),
        },
    };
    let mut res = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
    res.headers_mut()
        .insert(RETRY_AFTER, HeaderValue::from(whole_seconds(wait)));
    res
}

/// Token from an `Authorization: Bearer <token>` header, if present and non-blank.
pub fn extract_bearer_token(value: Option<&HeaderValue>) -> Option<&str> {
    value
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}
