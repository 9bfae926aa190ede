//! Retry with exponential back-off and jitter for the Google API adapters.
//!
//! [`retry_with_backoff`] retries transient transport failures (timeouts,
//! connection errors, 5xx). Quota errors are never retried here: rank scans
//! handle them by slowing their own pacing, and lookups surface them to the
//! caller.

use std::future::Future;
use std::time::Duration;

use crate::error::PlacesError;

const MAX_DELAY_MS: u64 = 30_000;

/// Returns `true` for errors that are worth retrying after a back-off delay.
///
/// **Retriable:** timeouts, connect failures, HTTP 5xx.
///
/// **Not retriable:** [`PlacesError::QuotaExceeded`], [`PlacesError::Api`],
/// [`PlacesError::Deserialize`], 4xx statuses and argument errors.
pub(crate) fn is_retriable(err: &PlacesError) -> bool {
    match err {
        PlacesError::Http(e) => {
            e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
        }
        PlacesError::UnexpectedStatus { status, .. } => *status >= 500,
        PlacesError::QuotaExceeded { .. }
        | PlacesError::Api { .. }
        | PlacesError::Deserialize { .. }
        | PlacesError::InvalidBaseUrl { .. }
        | PlacesError::InvalidArgument(_) => false,
    }
}

/// Delay before retry number `attempt` (1-based), before jitter.
pub(crate) fn backoff_delay_ms(backoff_base_ms: u64, attempt: u32) -> u64 {
    backoff_base_ms
        .saturating_mul(1u64 << attempt.saturating_sub(1).min(10))
        .min(MAX_DELAY_MS)
}

/// Runs `operation` with up to `max_retries` additional attempts on transient errors.
///
/// | Retry | Sleep before it                   |
/// |-------|-----------------------------------|
/// | 1     | base × 2⁰ ± 25 % jitter           |
/// | 2     | base × 2¹ ± 25 % jitter           |
/// | 3     | base × 2² ± 25 % jitter           |
///
/// Delay is capped at 30 s. `max_retries = 0` runs the operation exactly once.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_ms: u64,
    mut operation: F,
) -> Result<T, PlacesError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, PlacesError>>,
{
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err) || attempt >= max_retries {
                    return Err(err);
                }
                attempt += 1;
                let capped = backoff_delay_ms(backoff_base_ms, attempt);
                #[allow(
                    clippy::cast_possible_truncation,
                    clippy::cast_sign_loss,
                    clippy::cast_precision_loss
                )]
                let delay_ms = (capped as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;
                tracing::warn!(
                    attempt,
                    max_retries,
                    delay_ms,
                    error = %err,
                    "Google API transient error, retrying after back-off"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use super::*;

    fn server_error() -> PlacesError {
        PlacesError::UnexpectedStatus {
            status: 503,
            endpoint: "/textsearch/json".to_owned(),
        }
    }

    #[test]
    fn quota_exceeded_is_not_retriable() {
        assert!(!is_retriable(&PlacesError::QuotaExceeded {
            status: "OVER_QUERY_LIMIT".to_owned()
        }));
    }

    #[test]
    fn client_errors_are_not_retriable() {
        assert!(!is_retriable(&PlacesError::UnexpectedStatus {
            status: 403,
            endpoint: "/details/json".to_owned(),
        }));
        assert!(!is_retriable(&PlacesError::Api {
            status: "REQUEST_DENIED".to_owned(),
            message: "bad key".to_owned(),
        }));
    }

    #[test]
    fn server_errors_are_retriable() {
        assert!(is_retriable(&server_error()));
    }

    #[test]
    fn backoff_doubles_and_caps() {
        assert_eq!(backoff_delay_ms(500, 1), 500);
        assert_eq!(backoff_delay_ms(500, 2), 1_000);
        assert_eq!(backoff_delay_ms(500, 3), 2_000);
        assert_eq!(backoff_delay_ms(500, 40), MAX_DELAY_MS);
    }

    #[tokio::test]
    async fn zero_retries_runs_once() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(0, 0, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<u32, _>(server_error())
            }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_then_succeeds() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(3, 0, || {
            let c = Arc::clone(&c);
            async move {
                let attempt = c.fetch_add(1, Ordering::SeqCst) + 1;
                if attempt < 3 {
                    Err(server_error())
                } else {
                    Ok(7u32)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn does_not_retry_quota_exceeded() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(3, 0, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<u32, _>(PlacesError::QuotaExceeded {
                    status: "HTTP 429".to_owned(),
                })
            }
        })
        .await;
        assert_eq!(
            calls.load(Ordering::SeqCst),
            1,
            "QuotaExceeded must not be retried"
        );
        assert!(matches!(result, Err(PlacesError::QuotaExceeded { .. })));
    }
}
