//! Grid scan orchestration: sample points, probe each one in order, pace the
//! provider, and fold failures into the result instead of aborting.

use std::future::Future;
use std::time::Duration;

use localrank_core::{
    AbortReason, AppConfig, FailureKind, GeoPoint, KeywordCheckRequest, KeywordCheckResult,
    KeywordRank, ProbeOutcome, RankObservation, SampleRequest, ScanResult,
};
use localrank_places::{PlacesClient, PlacesError};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::error::ScanError;
use crate::probe::RankProbe;
use crate::sampler::generate_points;

/// Delay used as the first step of backoff when the base delay is zero.
const MIN_BACKOFF: Duration = Duration::from_millis(100);

/// Pacing and failure policy for one scanner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanSettings {
    /// Fixed pause between consecutive probes.
    pub probe_delay: Duration,
    /// A probe still pending after this long is recorded as a timeout.
    pub probe_timeout: Duration,
    /// Ceiling for the adaptive delay after quota errors.
    pub backoff_max_delay: Duration,
    /// Stop probing after this many failures in a row.
    pub max_consecutive_failures: u32,
    /// Largest `num_points` a request may ask for.
    pub max_points: u32,
    /// Seed for the point sampler; `None` draws from OS entropy.
    pub seed: Option<u64>,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            probe_delay: Duration::from_millis(100),
            probe_timeout: Duration::from_secs(10),
            backoff_max_delay: Duration::from_secs(5),
            max_consecutive_failures: 5,
            max_points: 200,
            seed: None,
        }
    }
}

impl ScanSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            probe_delay: Duration::from_millis(config.probe_delay_ms),
            probe_timeout: Duration::from_millis(config.probe_timeout_ms),
            backoff_max_delay: Duration::from_millis(config.backoff_max_delay_ms),
            max_consecutive_failures: config.max_consecutive_failures,
            max_points: config.max_num_points,
            seed: None,
        }
    }

    #[must_use]
    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }
}

/// Runs grid scans and keyword checks against one place search client.
///
/// Holds no state between scans. Probes are issued strictly one at a time.
pub struct GridScanner<'a> {
    probe: RankProbe<'a>,
    settings: ScanSettings,
}

impl<'a> GridScanner<'a> {
    #[must_use]
    pub fn new(client: &'a PlacesClient, settings: ScanSettings) -> Self {
        Self {
            probe: RankProbe::new(client),
            settings,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &ScanSettings {
        &self.settings
    }

    /// Scans `request` to completion.
    ///
    /// # Errors
    ///
    /// [`ScanError::InvalidRequest`] if the request fails validation; no
    /// provider call is made in that case.
    pub async fn scan(&self, request: &SampleRequest) -> Result<ScanResult, ScanError> {
        self.scan_until(request, std::future::pending()).await
    }

    /// Scans `request` until it finishes or `cancel` resolves, whichever is first.
    ///
    /// On cancellation the in-flight probe is dropped, no further probes are
    /// issued, and observations collected so far are discarded.
    ///
    /// # Errors
    ///
    /// [`ScanError::InvalidRequest`] before any probe, or
    /// [`ScanError::Cancelled`].
    pub async fn scan_until<C>(
        &self,
        request: &SampleRequest,
        cancel: C,
    ) -> Result<ScanResult, ScanError>
    where
        C: Future<Output = ()>,
    {
        request.validate(self.settings.max_points)?;

        tokio::select! {
            biased;
            () = cancel => {
                tracing::info!(keyword = %request.keyword, "grid scan cancelled");
                Err(ScanError::Cancelled)
            }
            result = self.run_grid(request) => Ok(result),
        }
    }

    async fn run_grid(&self, request: &SampleRequest) -> ScanResult {
        let mut rng = match self.settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let points = generate_points(
            &mut rng,
            request.center,
            request.radius_meters,
            request.num_points,
        );

        tracing::info!(
            keyword = %request.keyword,
            business_id = %request.business_id,
            points = points.len(),
            radius_meters = request.radius_meters,
            "grid scan started"
        );

        let mut pacing = Pacing::new(&self.settings);
        let mut observations = Vec::with_capacity(points.len());
        for (index, point) in points.into_iter().enumerate() {
            if pacing.aborted.is_some() {
                observations.push(RankObservation {
                    point,
                    outcome: ProbeOutcome::Skipped,
                });
                continue;
            }
            if index > 0 {
                pacing.wait().await;
            }

            let outcome = self
                .probe_point(
                    &request.keyword,
                    Some(point),
                    request.radius_meters,
                    &request.business_id,
                )
                .await;
            tracing::debug!(index, %point, ?outcome, "probe complete");
            pacing.record(&outcome, index);
            observations.push(RankObservation { point, outcome });
        }

        let result = ScanResult {
            request: request.clone(),
            observations,
            aborted: pacing.aborted,
        };
        tracing::info!(
            keyword = %request.keyword,
            ranked = result.ranked_count(),
            failed = result.failed_count(),
            best_rank = ?result.best_rank(),
            aborted = result.aborted.is_some(),
            "grid scan finished"
        );
        result
    }

    /// Ranks the business for each of the three keywords with one unbiased
    /// search per keyword.
    ///
    /// Pacing and the consecutive-failure policy are the same as for a grid.
    ///
    /// # Errors
    ///
    /// [`ScanError::InvalidRequest`] before any provider call.
    pub async fn check_keywords(
        &self,
        request: &KeywordCheckRequest,
    ) -> Result<KeywordCheckResult, ScanError> {
        request.validate()?;

        let mut pacing = Pacing::new(&self.settings);
        let mut ranks = Vec::with_capacity(request.keywords.len());
        for (index, keyword) in request.keywords.iter().enumerate() {
            let outcome = if pacing.aborted.is_some() {
                ProbeOutcome::Skipped
            } else {
                if index > 0 {
                    pacing.wait().await;
                }
                let query = request.query_for(keyword);
                let outcome = self
                    .probe_point(&query, None, 0.0, &request.business_id)
                    .await;
                pacing.record(&outcome, index);
                outcome
            };
            ranks.push(KeywordRank {
                keyword: keyword.trim().to_owned(),
                outcome,
            });
        }

        tracing::info!(
            business_id = %request.business_id,
            ranks = ?ranks.iter().map(KeywordRank::position_or_sentinel).collect::<Vec<_>>(),
            "keyword check finished"
        );
        Ok(KeywordCheckResult {
            business_id: request.business_id.clone(),
            ranks,
        })
    }

    /// One probe under the per-probe timeout. `point = None` searches unbiased.
    async fn probe_point(
        &self,
        query: &str,
        point: Option<GeoPoint>,
        radius_meters: f64,
        target_id: &str,
    ) -> ProbeOutcome {
        let call = async {
            match point {
                Some(point) => {
                    self.probe
                        .probe_rank(query, point, radius_meters, target_id)
                        .await
                }
                None => self.probe.probe_query(query, target_id).await,
            }
        };
        match tokio::time::timeout(self.settings.probe_timeout, call).await {
            Ok(Ok(rank)) => ProbeOutcome::from_rank(rank),
            Ok(Err(err)) => failed_outcome(&err),
            Err(_) => ProbeOutcome::Failed {
                kind: FailureKind::Timeout,
                message: format!(
                    "no response within {} ms",
                    self.settings.probe_timeout.as_millis()
                ),
            },
        }
    }
}

fn failed_outcome(err: &PlacesError) -> ProbeOutcome {
    let kind = if err.is_quota_exceeded() {
        FailureKind::QuotaExceeded
    } else if err.is_timeout() {
        FailureKind::Timeout
    } else {
        FailureKind::Provider
    };
    ProbeOutcome::Failed {
        kind,
        message: err.to_string(),
    }
}

/// Inter-probe delay after `outcome`.
///
/// Quota errors double the delay up to `max`; answered probes halve it back
/// toward `base`; other failures leave it unchanged.
#[must_use]
pub fn next_delay(
    current: Duration,
    base: Duration,
    max: Duration,
    outcome: &ProbeOutcome,
) -> Duration {
    match outcome {
        ProbeOutcome::Failed {
            kind: FailureKind::QuotaExceeded,
            ..
        } => {
            let doubled = if current.is_zero() {
                MIN_BACKOFF
            } else {
                current.saturating_mul(2)
            };
            doubled.min(max).max(base)
        }
        ProbeOutcome::Ranked { .. } | ProbeOutcome::NotFound => (current / 2).max(base),
        ProbeOutcome::Failed { .. } | ProbeOutcome::Skipped => current,
    }
}

/// Per-run pacing state shared by grid and keyword modes.
struct Pacing {
    base: Duration,
    max: Duration,
    current: Duration,
    max_consecutive_failures: u32,
    consecutive_failures: u32,
    aborted: Option<AbortReason>,
}

impl Pacing {
    fn new(settings: &ScanSettings) -> Self {
        Self {
            base: settings.probe_delay,
            max: settings.backoff_max_delay.max(settings.probe_delay),
            current: settings.probe_delay,
            max_consecutive_failures: settings.max_consecutive_failures.max(1),
            consecutive_failures: 0,
            aborted: None,
        }
    }

    async fn wait(&self) {
        if !self.current.is_zero() {
            tokio::time::sleep(self.current).await;
        }
    }

    fn record(&mut self, outcome: &ProbeOutcome, index: usize) {
        let previous = self.current;
        self.current = next_delay(self.current, self.base, self.max, outcome);

        if let ProbeOutcome::Failed { kind, message } = outcome {
            self.consecutive_failures += 1;
            tracing::warn!(index, ?kind, error = %message, "probe failed");
            if self.current > previous {
                tracing::warn!(
                    delay_ms = u64::try_from(self.current.as_millis()).unwrap_or(u64::MAX),
                    "provider quota hit, slowing probes"
                );
            }
            if self.consecutive_failures >= self.max_consecutive_failures {
                tracing::warn!(
                    consecutive_failures = self.consecutive_failures,
                    "too many consecutive probe failures, skipping remaining points"
                );
                self.aborted = Some(AbortReason::ConsecutiveFailures {
                    count: self.consecutive_failures,
                });
            }
        } else {
            self.consecutive_failures = 0;
        }
    }
}
