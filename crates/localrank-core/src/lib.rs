//! Shared domain types and configuration for the local rank scanner.

mod app_config;
mod config;
mod error;
pub mod geo;
pub mod scan;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use error::{ConfigError, RequestError};
pub use geo::GeoPoint;
pub use scan::{
    AbortReason, FailureKind, KeywordCheckRequest, KeywordCheckResult, KeywordRank,
    ProbeOutcome, RankObservation, SampleRequest, ScanResult, KEYWORD_COUNT,
    NOT_FOUND_SENTINEL_RANK,
};
