use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

/// A scan or keyword-check request rejected before any provider call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RequestError {
    #[error("target business place id is required")]
    MissingTarget,

    #[error("keyword is required")]
    MissingKeyword,

    #[error("center point is required")]
    MissingCenter,

    #[error("center ({lat}, {lng}) is not a valid coordinate")]
    InvalidCenter { lat: f64, lng: f64 },

    #[error("radius must be a positive number of meters, got {0}")]
    InvalidRadius(f64),

    #[error("point count must be between 1 and {max}, got {requested}")]
    InvalidPointCount { requested: u32, max: u32 },

    #[error("exactly {expected} keywords are required, got {got}")]
    KeywordCount { expected: usize, got: usize },

    #[error("keyword {index} is blank")]
    BlankKeyword { index: usize },
}
