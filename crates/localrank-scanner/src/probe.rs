//! One location-biased search, reduced to the target's position.

use localrank_core::GeoPoint;
use localrank_places::{LocationBias, PlaceSummary, PlacesClient, PlacesError};

/// 1-based position of `target_id` in `results`, or `None` when absent.
#[must_use]
pub fn rank_of(results: &[PlaceSummary], target_id: &str) -> Option<u32> {
    results
        .iter()
        .position(|place| place.place_id == target_id)
        .and_then(|index| u32::try_from(index + 1).ok())
}

/// Issues rank queries against the place search collaborator.
///
/// Holds a borrowed client; construct one per scan. Never retries: a failed
/// call is returned to the scanner, which owns the failure policy.
pub struct RankProbe<'a> {
    client: &'a PlacesClient,
}

impl<'a> RankProbe<'a> {
    #[must_use]
    pub fn new(client: &'a PlacesClient) -> Self {
        Self { client }
    }

    /// Searches `keyword` biased to `point` and reports where `target_id` landed.
    ///
    /// # Errors
    ///
    /// Any [`PlacesError`] from the search call.
    pub async fn probe_rank(
        &self,
        keyword: &str,
        point: GeoPoint,
        radius_meters: f64,
        target_id: &str,
    ) -> Result<Option<u32>, PlacesError> {
        let bias = LocationBias {
            point,
            radius_meters,
        };
        let results = self.client.search_places(keyword, Some(&bias)).await?;
        Ok(rank_of(&results, target_id))
    }

    /// Unbiased search for `query`; used by the keyword check.
    ///
    /// # Errors
    ///
    /// Any [`PlacesError`] from the search call.
    pub async fn probe_query(
        &self,
        query: &str,
        target_id: &str,
    ) -> Result<Option<u32>, PlacesError> {
        let results = self.client.search_places(query, None).await?;
        Ok(rank_of(&results, target_id))
    }
}
