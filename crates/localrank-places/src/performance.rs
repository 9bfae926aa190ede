//! Business Profile Performance API: daily metric totals over a date range.
//!
//! The caller supplies an OAuth access token; obtaining one is outside this
//! crate.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{Datelike, Days, Months, NaiveDate};
use localrank_core::AppConfig;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};

use crate::error::PlacesError;
use crate::retry::retry_with_backoff;

const DEFAULT_BASE_URL: &str = "https://businessprofileperformance.googleapis.com/v1/";

/// Metrics requested for every location, in request order.
pub const DAILY_METRICS: [&str; 7] = [
    "WEBSITE_CLICKS",
    "CALL_CLICKS",
    "BUSINESS_DIRECTION_REQUESTS",
    "BUSINESS_IMPRESSIONS_DESKTOP_SEARCH",
    "BUSINESS_IMPRESSIONS_MOBILE_SEARCH",
    "BUSINESS_IMPRESSIONS_DESKTOP_MAPS",
    "BUSINESS_IMPRESSIONS_MOBILE_MAPS",
];

/// Inclusive calendar date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// The last `days` days ending at `today` (inclusive).
    ///
    /// # Errors
    ///
    /// [`PlacesError::InvalidArgument`] when `days` is zero.
    pub fn rolling(today: NaiveDate, days: u32) -> Result<Self, PlacesError> {
        if days == 0 {
            return Err(PlacesError::InvalidArgument(
                "days must be at least 1".to_owned(),
            ));
        }
        let start = today
            .checked_sub_days(Days::new(u64::from(days - 1)))
            .ok_or_else(|| PlacesError::InvalidArgument(format!("{days} days is out of range")))?;
        Ok(Self { start, end: today })
    }

    /// The full calendar month `offset` months before the month of `today`.
    ///
    /// # Errors
    ///
    /// [`PlacesError::InvalidArgument`] if the month falls outside chrono's range.
    pub fn calendar_month(today: NaiveDate, offset: u32) -> Result<Self, PlacesError> {
        let out_of_range =
            || PlacesError::InvalidArgument(format!("month offset {offset} is out of range"));
        let start = today
            .with_day(1)
            .and_then(|first| first.checked_sub_months(Months::new(offset)))
            .ok_or_else(out_of_range)?;
        let end = start
            .checked_add_months(Months::new(1))
            .and_then(|next| next.pred_opt())
            .ok_or_else(out_of_range)?;
        Ok(Self { start, end })
    }
}

/// Summed daily values per metric name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricTotals {
    pub range: DateRange,
    pub totals: BTreeMap<String, i64>,
}

pub struct PerformanceClient {
    client: Client,
    base_url: Url,
    max_retries: u32,
    backoff_base_ms: u64,
}

impl PerformanceClient {
    /// # Errors
    ///
    /// Returns [`PlacesError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(timeout_secs: u64, user_agent: &str) -> Result<Self, PlacesError> {
        Self::with_base_url(timeout_secs, user_agent, DEFAULT_BASE_URL)
    }

    /// # Errors
    ///
    /// Returns [`PlacesError::Http`] if the `reqwest::Client` cannot be built,
    /// or [`PlacesError::InvalidBaseUrl`] if `base_url` does not parse.
    pub fn with_base_url(
        timeout_secs: u64,
        user_agent: &str,
        base_url: &str,
    ) -> Result<Self, PlacesError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| PlacesError::InvalidBaseUrl {
            base_url: base_url.to_owned(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            client,
            base_url,
            max_retries: 0,
            backoff_base_ms: 0,
        })
    }

    /// # Errors
    ///
    /// Same as [`PerformanceClient::with_base_url`].
    pub fn from_app_config(config: &AppConfig) -> Result<Self, PlacesError> {
        let mut client = Self::with_base_url(
            config.request_timeout_secs,
            &config.user_agent,
            &config.performance_base_url,
        )?;
        client.max_retries = config.max_retries;
        client.backoff_base_ms = config.retry_backoff_base_ms;
        Ok(client)
    }

    /// Fetches every metric in [`DAILY_METRICS`] for `location_id` and sums
    /// the daily values over `range`.
    ///
    /// `location_id` may be given bare (`"123"`) or prefixed (`"locations/123"`).
    /// Days without a value count as zero. A response with no series yields
    /// empty totals.
    ///
    /// # Errors
    ///
    /// - [`PlacesError::InvalidArgument`] for a blank location id or token.
    /// - [`PlacesError::QuotaExceeded`] on HTTP 429.
    /// - [`PlacesError::UnexpectedStatus`] on other non-2xx statuses (401/403
    ///   for a bad token).
    /// - [`PlacesError::Http`] / [`PlacesError::Deserialize`] as usual.
    pub async fn fetch_metric_totals(
        &self,
        location_id: &str,
        range: DateRange,
        access_token: &str,
    ) -> Result<MetricTotals, PlacesError> {
        let location_id = location_id.trim().trim_start_matches("locations/");
        if location_id.is_empty() || location_id.contains('/') {
            return Err(PlacesError::InvalidArgument(format!(
                "invalid location id '{location_id}'"
            )));
        }
        if access_token.trim().is_empty() {
            return Err(PlacesError::InvalidArgument(
                "access token must not be empty".to_owned(),
            ));
        }

        let url = self.metrics_url(location_id, range)?;
        let url = &url;
        let body = retry_with_backoff(self.max_retries, self.backoff_base_ms, move || async move {
            let response = self
                .client
                .get(url.clone())
                .bearer_auth(access_token)
                .send()
                .await?;
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
            Ok(response.text().await?)
        })
        .await?;

        let parsed: MultiDailyResponse =
            serde_json::from_str(&body).map_err(|e| PlacesError::Deserialize {
                context: format!("fetchMultiDailyMetricsTimeSeries(location={location_id})"),
                source: e,
            })?;

        let totals = sum_series(parsed);
        tracing::debug!(
            location_id,
            start = %range.start,
            end = %range.end,
            metrics = totals.len(),
            "fetched performance metrics"
        );
        Ok(MetricTotals { range, totals })
    }

    fn metrics_url(&self, location_id: &str, range: DateRange) -> Result<Url, PlacesError> {
        let mut url = self
            .base_url
            .join(&format!(
                "locations/{location_id}:fetchMultiDailyMetricsTimeSeries"
            ))
            .map_err(|e| PlacesError::InvalidArgument(format!("invalid location id: {e}")))?;
        {
            let mut pairs = url.query_pairs_mut();
            for metric in DAILY_METRICS {
                pairs.append_pair("dailyMetrics", metric);
            }
            for (prefix, date) in [
                ("dailyRange.start_date", range.start),
                ("dailyRange.end_date", range.end),
            ] {
                pairs.append_pair(&format!("{prefix}.year"), &date.year().to_string());
                pairs.append_pair(&format!("{prefix}.month"), &date.month().to_string());
                pairs.append_pair(&format!("{prefix}.day"), &date.day().to_string());
            }
        }
        Ok(url)
    }
}

fn sum_series(response: MultiDailyResponse) -> BTreeMap<String, i64> {
    let mut totals = BTreeMap::new();
    let Some(first) = response.multi_daily_metric_time_series.into_iter().next() else {
        return totals;
    };
    for series in first.daily_metric_time_series {
        let sum = series
            .time_series
            .dated_values
            .iter()
            .filter_map(|day| day.value.as_deref())
            .filter_map(|raw| match raw.parse::<i64>() {
                Ok(v) => Some(v),
                Err(_) => {
                    tracing::debug!(metric = %series.daily_metric, raw, "skipping non-integer value");
                    None
                }
            })
            .sum::<i64>();
        *totals.entry(series.daily_metric).or_insert(0) += sum;
    }
    totals
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MultiDailyResponse {
    #[serde(default)]
    multi_daily_metric_time_series: Vec<MultiDailySeries>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MultiDailySeries {
    #[serde(default)]
    daily_metric_time_series: Vec<DailyMetricSeries>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DailyMetricSeries {
    daily_metric: String,
    #[serde(default)]
    time_series: TimeSeries,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TimeSeries {
    #[serde(default)]
    dated_values: Vec<DatedValue>,
}

#[derive(Debug, Deserialize)]
struct DatedValue {
    value: Option<String>,
}
