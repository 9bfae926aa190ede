use localrank_core::RequestError;
use thiserror::Error;

/// Scan-level failures. Individual probe failures are never reported here;
/// they are recorded on the observation for that point.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The request was rejected before any provider call.
    #[error("invalid scan request: {0}")]
    InvalidRequest(#[from] RequestError),

    /// The caller cancelled the scan. Partial observations are discarded.
    #[error("scan cancelled")]
    Cancelled,
}
