//! HTTP adapters for the Google place search, place details and business
//! profile performance APIs.

pub mod client;
pub mod error;
pub mod performance;
mod retry;
pub mod types;

pub use client::PlacesClient;
pub use error::PlacesError;
pub use performance::{DateRange, MetricTotals, PerformanceClient, DAILY_METRICS};
pub use types::{LocationBias, PlaceRating, PlaceSummary};
