//! Public result types and the raw Places API wire shapes.

use localrank_core::GeoPoint;
use serde::{Deserialize, Serialize};

/// Bias a text search toward results near `point`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationBias {
    pub point: GeoPoint,
    pub radius_meters: f64,
}

/// One entry of a place search, in provider order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceSummary {
    pub place_id: String,
    pub name: String,
    pub address: String,
    pub location: Option<GeoPoint>,
    pub rating: Option<f64>,
    pub user_ratings_total: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceRating {
    pub name: String,
    pub rating: f64,
    pub total_reviews: u32,
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(crate) struct TextSearchResponse {
    pub status: String,
    #[serde(default)]
    pub results: Vec<RawPlace>,
    pub error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawPlace {
    pub place_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub formatted_address: String,
    pub geometry: Option<RawGeometry>,
    pub rating: Option<f64>,
    pub user_ratings_total: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawGeometry {
    pub location: RawLatLng,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawLatLng {
    pub lat: f64,
    pub lng: f64,
}

impl From<RawPlace> for PlaceSummary {
    fn from(raw: RawPlace) -> Self {
        Self {
            place_id: raw.place_id,
            name: raw.name,
            address: raw.formatted_address,
            location: raw
                .geometry
                .map(|g| GeoPoint::new(g.location.lat, g.location.lng)),
            rating: raw.rating,
            user_ratings_total: raw.user_ratings_total,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct DetailsResponse {
    pub status: String,
    pub result: Option<RawDetails>,
    pub error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawDetails {
    pub name: Option<String>,
    pub rating: Option<f64>,
    pub user_ratings_total: Option<u32>,
}
