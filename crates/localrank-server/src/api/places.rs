use axum::{
    extract::{Path, State},
    Extension, Json,
};
use localrank_places::{PlaceRating, PlaceSummary};
use serde::Deserialize;

use crate::middleware::RequestId;

use super::{map_places_error, ApiError, ApiResponse, AppState};

/// Shorter queries return nothing without calling the provider.
const MIN_QUERY_CHARS: usize = 3;

#[derive(Debug, Deserialize)]
pub(super) struct SearchPlacesRequest {
    pub query: String,
}

pub(super) async fn search_places(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<SearchPlacesRequest>,
) -> Result<Json<ApiResponse<Vec<PlaceSummary>>>, ApiError> {
    let query = body.query.trim();
    if query.chars().count() < MIN_QUERY_CHARS {
        return Ok(ApiResponse::new(req_id.0, Vec::new()));
    }

    let places = state
        .places
        .search_places(query, None)
        .await
        .map_err(|e| map_places_error(req_id.0.clone(), &e))?;

    Ok(ApiResponse::new(req_id.0, places))
}

pub(super) async fn get_place_rating(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(place_id): Path<String>,
) -> Result<Json<ApiResponse<PlaceRating>>, ApiError> {
    let rating = state
        .places
        .fetch_rating(&place_id)
        .await
        .map_err(|e| map_places_error(req_id.0.clone(), &e))?;

    Ok(ApiResponse::new(req_id.0, rating))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::super::test_support::{app_for, post_json, send, state_for};

    #[tokio::test]
    async fn short_query_returns_empty_without_provider_call() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let app = app_for(state_for(&server.uri(), &server.uri()));
        let (status, json) = send(
            app,
            post_json("/api/v1/places/search", &serde_json::json!({ "query": " pi " })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn search_passes_through_results() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/textsearch/json"))
            .and(query_param("query", "pizza warsaw"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "OK",
                "results": [
                    { "place_id": "biz123", "name": "Joe's Pizza", "formatted_address": "Nowy Swiat 1" }
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let app = app_for(state_for(&server.uri(), &server.uri()));
        let (status, json) = send(
            app,
            post_json(
                "/api/v1/places/search",
                &serde_json::json!({ "query": "pizza warsaw" }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"][0]["place_id"], "biz123");
        assert_eq!(json["data"][0]["address"], "Nowy Swiat 1");
    }

    #[tokio::test]
    async fn rating_not_found_maps_to_404() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/details/json"))
            .and(query_param("place_id", "gone"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "status": "NOT_FOUND" })),
            )
            .mount(&server)
            .await;

        let app = app_for(state_for(&server.uri(), &server.uri()));
        let request = Request::builder()
            .uri("/api/v1/places/gone/rating")
            .body(Body::empty())
            .expect("request");
        let (status, json) = send(app, request).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"]["code"], "not_found");
    }

    #[tokio::test]
    async fn rating_returns_details() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/details/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "OK",
                "result": { "name": "Joe's Pizza", "rating": 4.2, "user_ratings_total": 57 }
            })))
            .mount(&server)
            .await;

        let app = app_for(state_for(&server.uri(), &server.uri()));
        let request = Request::builder()
            .uri("/api/v1/places/biz123/rating")
            .body(Body::empty())
            .expect("request");
        let (status, json) = send(app, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["name"], "Joe's Pizza");
        assert_eq!(json["data"]["total_reviews"], 57);
    }
}
