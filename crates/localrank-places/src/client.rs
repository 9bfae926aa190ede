//! HTTP client for the Google Places text search and details endpoints.
//!
//! Every response is an envelope with a `status` field. `OK` and
//! `ZERO_RESULTS` are successes, `OVER_QUERY_LIMIT` becomes
//! [`PlacesError::QuotaExceeded`], anything else [`PlacesError::Api`].

use std::time::Duration;

use localrank_core::AppConfig;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;

use crate::error::PlacesError;
use crate::retry::retry_with_backoff;
use crate::types::{
    DetailsResponse, LocationBias, PlaceRating, PlaceSummary, TextSearchResponse,
};

const DEFAULT_BASE_URL: &str = "https://maps.googleapis.com/maps/api/place/";
const DEFAULT_USER_AGENT: &str = "localrank/0.1 (local-seo)";
const UNNAMED_BUSINESS: &str = "Unnamed business";

/// Client for the Places API.
///
/// Construct once per process and pass by reference to whatever needs to
/// search; it owns the connection pool.
pub struct PlacesClient {
    client: Client,
    api_key: String,
    base_url: Url,
    max_retries: u32,
    backoff_base_ms: u64,
}

impl PlacesClient {
    /// Creates a client pointed at the production Places API, without retries.
    ///
    /// # Errors
    ///
    /// Returns [`PlacesError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(api_key: &str, timeout_secs: u64) -> Result<Self, PlacesError> {
        Self::with_base_url(api_key, timeout_secs, DEFAULT_USER_AGENT, DEFAULT_BASE_URL)
    }

    /// Creates a client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`PlacesError::Http`] if the `reqwest::Client` cannot be built,
    /// or [`PlacesError::InvalidBaseUrl`] if `base_url` does not parse.
    pub fn with_base_url(
        api_key: &str,
        timeout_secs: u64,
        user_agent: &str,
        base_url: &str,
    ) -> Result<Self, PlacesError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;

        // Exactly one trailing slash so `join` appends instead of replacing
        // the last path segment.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| PlacesError::InvalidBaseUrl {
            base_url: base_url.to_owned(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            api_key: api_key.to_owned(),
            base_url,
            max_retries: 0,
            backoff_base_ms: 0,
        })
    }

    /// Builds a client from application config, including its retry policy.
    ///
    /// # Errors
    ///
    /// Same as [`PlacesClient::with_base_url`].
    pub fn from_app_config(config: &AppConfig) -> Result<Self, PlacesError> {
        Ok(Self::with_base_url(
            &config.places_api_key,
            config.request_timeout_secs,
            &config.user_agent,
            &config.places_base_url,
        )?
        .with_retries(config.max_retries, config.retry_backoff_base_ms))
    }

    /// Enables transport-level retries for transient failures.
    #[must_use]
    pub fn with_retries(mut self, max_retries: u32, backoff_base_ms: u64) -> Self {
        self.max_retries = max_retries;
        self.backoff_base_ms = backoff_base_ms;
        self
    }

    /// Runs a text search and returns results in provider order.
    ///
    /// With a `bias`, the provider is asked to favour results around that
    /// point; the returned order is then the local ranking seen from there.
    ///
    /// # Errors
    ///
    /// - [`PlacesError::QuotaExceeded`] on HTTP 429 or `OVER_QUERY_LIMIT`.
    /// - [`PlacesError::Api`] on any other non-`OK` provider status.
    /// - [`PlacesError::UnexpectedStatus`] on other non-2xx HTTP statuses.
    /// - [`PlacesError::Http`] on network failure or timeout.
    /// - [`PlacesError::Deserialize`] if the body does not match the envelope.
    pub async fn search_places(
        &self,
        query: &str,
        bias: Option<&LocationBias>,
    ) -> Result<Vec<PlaceSummary>, PlacesError> {
        let mut params = vec![("query", query.to_owned())];
        if let Some(bias) = bias {
            params.push(("location", bias.point.to_string()));
            params.push(("radius", format!("{:.0}", bias.radius_meters)));
        }
        let url = self.build_url("textsearch/json", &params)?;

        let response: TextSearchResponse = self
            .get_json(&url, &format!("textsearch(query={query})"))
            .await?;
        check_status(&response.status, response.error_message.as_deref())?;

        let places: Vec<PlaceSummary> = response
            .results
            .into_iter()
            .map(PlaceSummary::from)
            .collect();
        tracing::debug!(query, count = places.len(), biased = bias.is_some(), "place search");
        Ok(places)
    }

    /// Fetches the display name, star rating and review count of a place.
    ///
    /// Missing fields fall back to `"Unnamed business"`, `0.0` and `0`.
    ///
    /// # Errors
    ///
    /// [`PlacesError::InvalidArgument`] for a blank `place_id` (no request is
    /// made), otherwise the same errors as [`PlacesClient::search_places`].
    /// An `OK` envelope without a `result` is reported as [`PlacesError::Api`].
    pub async fn fetch_rating(&self, place_id: &str) -> Result<PlaceRating, PlacesError> {
        let place_id = place_id.trim();
        if place_id.is_empty() {
            return Err(PlacesError::InvalidArgument(
                "place id must not be empty".to_owned(),
            ));
        }
        let url = self.build_url(
            "details/json",
            &[
                ("place_id", place_id.to_owned()),
                ("fields", "name,rating,user_ratings_total".to_owned()),
            ],
        )?;

        let response: DetailsResponse = self
            .get_json(&url, &format!("details(place_id={place_id})"))
            .await?;
        check_status(&response.status, response.error_message.as_deref())?;

        let details = response.result.ok_or_else(|| PlacesError::Api {
            status: response.status.clone(),
            message: format!("no result for place {place_id}"),
        })?;

        Ok(PlaceRating {
            name: details
                .name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| UNNAMED_BUSINESS.to_owned()),
            rating: details.rating.unwrap_or(0.0),
            total_reviews: details.user_ratings_total.unwrap_or(0),
        })
    }

    fn build_url(&self, endpoint: &str, params: &[(&str, String)]) -> Result<Url, PlacesError> {
        let mut url = self
            .base_url
            .join(endpoint)
            .map_err(|e| PlacesError::InvalidBaseUrl {
                base_url: self.base_url.to_string(),
                reason: e.to_string(),
            })?;
        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in params {
                pairs.append_pair(key, value);
            }
            pairs.append_pair("key", &self.api_key);
        }
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &Url,
        context: &str,
    ) -> Result<T, PlacesError> {
        retry_with_backoff(self.max_retries, self.backoff_base_ms, move || async move {
            let response = self.client.get(url.clone()).send().await?;
            let status = response.status();

            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                return Err(PlacesError::QuotaExceeded {
                    status: "HTTP 429".to_owned(),
                });
            }
            if !status.is_success() {
                return Err(PlacesError::UnexpectedStatus {
                    status: status.as_u16(),
                    endpoint: url.path().to_owned(),
                });
            }

            let body = response.text().await?;
            serde_json::from_str::<T>(&body).map_err(|e| PlacesError::Deserialize {
                context: context.to_owned(),
                source: e,
            })
        })
        .await
    }
}

/// Maps a Places envelope status to success or a typed error.
pub(crate) fn check_status(status: &str, error_message: Option<&str>) -> Result<(), PlacesError> {
    match status {
        "OK" | "ZERO_RESULTS" => Ok(()),
        "OVER_QUERY_LIMIT" => Err(PlacesError::QuotaExceeded {
            status: status.to_owned(),
        }),
        other => Err(PlacesError::Api {
            status: other.to_owned(),
            message: error_message.unwrap_or_default().to_owned(),
        }),
    }
}
