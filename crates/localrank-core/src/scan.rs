//! Scan requests, per-point observations and scan results.
//!
//! Absence of the target business is represented canonically as
//! [`ProbeOutcome::NotFound`] (rank `None`). The numeric sentinel
//! [`NOT_FOUND_SENTINEL_RANK`] only exists at display boundaries that need a
//! number, and [`ProbeOutcome::from_sentinel_position`] converts such numbers
//! back.

use serde::{Deserialize, Serialize};

use crate::error::RequestError;
use crate::geo::GeoPoint;

/// Position reported for "not in the result window" where a number is required.
pub const NOT_FOUND_SENTINEL_RANK: u32 = 21;

/// The keyword check always compares exactly this many keywords.
pub const KEYWORD_COUNT: usize = 3;

/// A grid scan request for one keyword around a center point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleRequest {
    pub keyword: String,
    /// Stable provider place id of the business being ranked.
    pub business_id: String,
    pub center: GeoPoint,
    pub num_points: u32,
    pub radius_meters: f64,
}

impl SampleRequest {
    /// Rejects malformed requests before any provider call is made.
    ///
    /// # Errors
    ///
    /// Returns the first [`RequestError`] found.
    pub fn validate(&self, max_points: u32) -> Result<(), RequestError> {
        if self.business_id.trim().is_empty() {
            return Err(RequestError::MissingTarget);
        }
        if self.keyword.trim().is_empty() {
            return Err(RequestError::MissingKeyword);
        }
        if !self.center.is_valid() {
            return Err(RequestError::InvalidCenter {
                lat: self.center.lat,
                lng: self.center.lng,
            });
        }
        if !self.radius_meters.is_finite() || self.radius_meters <= 0.0 {
            return Err(RequestError::InvalidRadius(self.radius_meters));
        }
        if self.num_points == 0 || self.num_points > max_points {
            return Err(RequestError::InvalidPointCount {
                requested: self.num_points,
                max: max_points,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Timeout,
    QuotaExceeded,
    Provider,
}

/// What a single probe learned about the target's position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProbeOutcome {
    /// 1-based position in the provider's ordered results.
    Ranked { rank: u32 },
    /// The provider answered but the target was not in the returned window.
    NotFound,
    /// The provider call failed; the point carries no ranking information.
    Failed { kind: FailureKind, message: String },
    /// Never probed because the scan stopped early.
    Skipped,
}

impl ProbeOutcome {
    #[must_use]
    pub fn from_rank(rank: Option<u32>) -> Self {
        match rank {
            Some(rank) => Self::Ranked { rank },
            None => Self::NotFound,
        }
    }

    /// Converts a sentinel-encoded position (`0` or `>= 21` meaning absent).
    #[must_use]
    pub fn from_sentinel_position(position: u32) -> Self {
        if position == 0 || position >= NOT_FOUND_SENTINEL_RANK {
            Self::NotFound
        } else {
            Self::Ranked { rank: position }
        }
    }

    #[must_use]
    pub fn rank(&self) -> Option<u32> {
        match self {
            Self::Ranked { rank } => Some(*rank),
            _ => None,
        }
    }

    /// `true` for outcomes that carry no ranking information.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. } | Self::Skipped)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankObservation {
    pub point: GeoPoint,
    pub outcome: ProbeOutcome,
}

impl RankObservation {
    #[must_use]
    pub fn rank(&self) -> Option<u32> {
        self.outcome.rank()
    }
}

/// Why a scan stopped probing before its last point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum AbortReason {
    ConsecutiveFailures { count: u32 },
}

/// A completed grid scan. `observations[i]` belongs to the i-th generated point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    pub request: SampleRequest,
    pub observations: Vec<RankObservation>,
    pub aborted: Option<AbortReason>,
}

impl ScanResult {
    #[must_use]
    pub fn ranked_count(&self) -> usize {
        self.observations
            .iter()
            .filter(|o| o.rank().is_some())
            .count()
    }

    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.observations
            .iter()
            .filter(|o| o.outcome.is_failure())
            .count()
    }

    /// Best (lowest) rank seen anywhere in the grid.
    #[must_use]
    pub fn best_rank(&self) -> Option<u32> {
        self.observations.iter().filter_map(RankObservation::rank).min()
    }
}

/// The three-keyword spot check: one unbiased search per keyword.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordCheckRequest {
    pub business_id: String,
    /// Appended to each keyword to narrow the search to the business's area.
    pub address: Option<String>,
    pub keywords: Vec<String>,
}

impl KeywordCheckRequest {
    /// # Errors
    ///
    /// Returns [`RequestError`] when the target is missing, the keyword count
    /// is not [`KEYWORD_COUNT`], or any keyword is blank.
    pub fn validate(&self) -> Result<(), RequestError> {
        if self.business_id.trim().is_empty() {
            return Err(RequestError::MissingTarget);
        }
        if self.keywords.len() != KEYWORD_COUNT {
            return Err(RequestError::KeywordCount {
                expected: KEYWORD_COUNT,
                got: self.keywords.len(),
            });
        }
        if let Some(index) = self.keywords.iter().position(|k| k.trim().is_empty()) {
            return Err(RequestError::BlankKeyword { index });
        }
        Ok(())
    }

    /// Provider query text for one keyword.
    #[must_use]
    pub fn query_for(&self, keyword: &str) -> String {
        match self.address.as_deref().map(str::trim) {
            Some(address) if !address.is_empty() => format!("{} {address}", keyword.trim()),
            _ => keyword.trim().to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordRank {
    pub keyword: String,
    pub outcome: ProbeOutcome,
}

impl KeywordRank {
    /// Rank for displays that need a number; absence and failure become 21.
    #[must_use]
    pub fn position_or_sentinel(&self) -> u32 {
        self.outcome.rank().unwrap_or(NOT_FOUND_SENTINEL_RANK)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordCheckResult {
    pub business_id: String,
    pub ranks: Vec<KeywordRank>,
}
