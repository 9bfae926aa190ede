//! Integration tests for `PerformanceClient` using wiremock HTTP mocks.

use chrono::NaiveDate;
use localrank_places::{DateRange, PerformanceClient, PlacesError};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const METRICS_PATH: &str = "/v1/locations/555:fetchMultiDailyMetricsTimeSeries";

fn test_client(server: &MockServer) -> PerformanceClient {
    PerformanceClient::with_base_url(30, "localrank-test", &format!("{}/v1", server.uri()))
        .expect("client construction should not fail")
}

fn march() -> DateRange {
    DateRange {
        start: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
        end: NaiveDate::from_ymd_opt(2026, 3, 31).unwrap(),
    }
}

fn series(metric: &str, values: &[&str]) -> serde_json::Value {
    let dated: Vec<serde_json::Value> = values
        .iter()
        .enumerate()
        .map(|(i, v)| {
            serde_json::json!({
                "date": { "year": 2026, "month": 3, "day": i + 1 },
                "value": v
            })
        })
        .collect();
    serde_json::json!({ "dailyMetric": metric, "timeSeries": { "datedValues": dated } })
}

#[tokio::test]
async fn fetch_metric_totals_sums_each_metric() {
    let server = MockServer::start().await;

    let body = serde_json::json!({
        "multiDailyMetricTimeSeries": [{
            "dailyMetricTimeSeries": [
                series("WEBSITE_CLICKS", &["3", "4", "5"]),
                series("CALL_CLICKS", &["1", "0", "2"]),
                series("BUSINESS_IMPRESSIONS_MOBILE_MAPS", &["100", "250"])
            ]
        }]
    });

    Mock::given(method("GET"))
        .and(path(METRICS_PATH))
        .and(header("authorization", "Bearer user-token"))
        .and(query_param("dailyRange.start_date.year", "2026"))
        .and(query_param("dailyRange.start_date.month", "3"))
        .and(query_param("dailyRange.start_date.day", "1"))
        .and(query_param("dailyRange.end_date.day", "31"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server);
    let totals = client
        .fetch_metric_totals("555", march(), "user-token")
        .await
        .expect("metrics");

    assert_eq!(totals.range, march());
    assert_eq!(totals.totals.get("WEBSITE_CLICKS"), Some(&12));
    assert_eq!(totals.totals.get("CALL_CLICKS"), Some(&3));
    assert_eq!(totals.totals.get("BUSINESS_IMPRESSIONS_MOBILE_MAPS"), Some(&350));
}

#[tokio::test]
async fn prefixed_location_id_is_accepted() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(METRICS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server);
    let totals = client
        .fetch_metric_totals("locations/555", march(), "user-token")
        .await
        .expect("metrics");
    assert!(totals.totals.is_empty());
}

#[tokio::test]
async fn unauthorized_token_maps_to_unexpected_status() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let err = client
        .fetch_metric_totals("555", march(), "expired")
        .await
        .unwrap_err();
    assert!(
        matches!(err, PlacesError::UnexpectedStatus { status: 401, .. }),
        "got: {err:?}"
    );
}

#[tokio::test]
async fn blank_token_is_rejected_without_request() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = test_client(&server);
    let err = client
        .fetch_metric_totals("555", march(), " ")
        .await
        .unwrap_err();
    assert!(matches!(err, PlacesError::InvalidArgument(_)));
}
