//! Rank buckets and map markers.
//!
//! Everything here is pure: a scan result goes in, a marker set comes out.
//! The map surface owns clearing the previous set before drawing a new one.

use localrank_core::{
    GeoPoint, KeywordRank, RankObservation, ScanResult, NOT_FOUND_SENTINEL_RANK,
};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::sampler::generate_points;

/// Pixel size of the round marker icon.
pub const MARKER_SIZE_PX: u32 = 34;

const ANCHOR_Z_INDEX: u32 = 100;
const MARKER_Z_INDEX: u32 = 10;

/// Markers per keyword in the keyword overlay.
const OVERLAY_POINTS_PER_KEYWORD: u32 = 10;
const OVERLAY_RADIUS_METERS: f64 = 2_500.0;
/// Per-keyword offset of the overlay disc, in degrees on both axes.
const OVERLAY_SHIFT_DEG: f64 = 0.002;

/// Characters `encodeURIComponent` leaves alone.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankBucket {
    /// Ranks 1 to 3.
    Top,
    /// Ranks 4 to 10.
    Good,
    /// Ranks 11 to 20.
    Fair,
    /// Beyond 20, absent, or unknown.
    Poor,
}

impl RankBucket {
    pub const ALL: [RankBucket; 4] = [Self::Top, Self::Good, Self::Fair, Self::Poor];

    #[must_use]
    pub fn fill(self) -> &'static str {
        match self {
            Self::Top => "#22c55e",
            Self::Good => "#fde047",
            Self::Fair => "#fb923c",
            Self::Poor => "#e5e7eb",
        }
    }

    #[must_use]
    pub fn stroke(self) -> &'static str {
        match self {
            Self::Top => "#15803d",
            Self::Good => "#ca8a04",
            Self::Fair => "#c2410c",
            Self::Poor => "#f50202",
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Top => "top",
            Self::Good => "good",
            Self::Fair => "fair",
            Self::Poor => "poor",
        }
    }
}

impl std::fmt::Display for RankBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bucket for a 1-based rank; `None` means not found.
#[must_use]
pub fn classify(rank: Option<u32>) -> RankBucket {
    match rank {
        Some(1..=3) => RankBucket::Top,
        Some(4..=10) => RankBucket::Good,
        Some(11..=20) => RankBucket::Fair,
        // Rank 0 never comes out of a probe; treat it like absence.
        _ => RankBucket::Poor,
    }
}

/// Short marker text: the rank, or `"20+"` beyond the inspected depth.
#[must_use]
pub fn label(rank: Option<u32>) -> String {
    match rank {
        Some(rank @ 1..=20) => rank.to_string(),
        _ => "20+".to_owned(),
    }
}

/// Maps a sentinel-encoded rank (0 or 21+ meaning absent) to the canonical form.
#[must_use]
pub fn normalize_rank(raw: u32) -> Option<u32> {
    if raw == 0 || raw >= NOT_FOUND_SENTINEL_RANK {
        None
    } else {
        Some(raw)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub position: GeoPoint,
    pub label: String,
    /// `None` for the business anchor.
    pub bucket: Option<RankBucket>,
    /// `data:` URL of the marker icon; `None` means the surface's default pin.
    pub icon_url: Option<String>,
    pub title: Option<String>,
    pub z_index: u32,
    /// The probe for this point failed or was skipped, so the bucket is a guess.
    pub failed: bool,
}

/// Everything a map surface needs to draw one scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerSet {
    /// Where the map should pan to.
    pub center: GeoPoint,
    pub anchor: Marker,
    /// One per observation, same order as the scan.
    pub markers: Vec<Marker>,
}

impl MarkerSet {
    /// Marker count per bucket, in [`RankBucket::ALL`] order.
    #[must_use]
    pub fn histogram(&self) -> [(RankBucket, usize); 4] {
        RankBucket::ALL.map(|bucket| {
            let count = self
                .markers
                .iter()
                .filter(|m| m.bucket == Some(bucket))
                .count();
            (bucket, count)
        })
    }
}

fn anchor_marker(anchor: GeoPoint, business_name: Option<&str>) -> Marker {
    Marker {
        position: anchor,
        label: String::new(),
        bucket: None,
        icon_url: None,
        title: business_name.map(str::to_owned),
        z_index: ANCHOR_Z_INDEX,
        failed: false,
    }
}

fn rank_marker(position: GeoPoint, rank: Option<u32>, failed: bool) -> Marker {
    let bucket = classify(rank);
    let text = if failed { "?".to_owned() } else { label(rank) };
    Marker {
        position,
        icon_url: Some(marker_icon_data_url(bucket, &text)),
        label: text,
        bucket: Some(bucket),
        title: None,
        z_index: MARKER_Z_INDEX,
        failed,
    }
}

fn observation_marker(observation: &RankObservation) -> Marker {
    rank_marker(
        observation.point,
        observation.rank(),
        observation.outcome.is_failure(),
    )
}

/// One marker per observation plus the business anchor, centered on the anchor.
///
/// Failed and skipped points render in the poor bucket with a `?` label.
#[must_use]
pub fn render(scan: &ScanResult, anchor: GeoPoint, business_name: Option<&str>) -> MarkerSet {
    MarkerSet {
        center: anchor,
        anchor: anchor_marker(anchor, business_name),
        markers: scan.observations.iter().map(observation_marker).collect(),
    }
}

/// Illustrative overlay for a keyword check: ten markers per keyword scattered
/// in a 2.5 km disc around the business, each disc nudged by 0.002° per
/// keyword index so the groups do not sit exactly on top of each other.
///
/// The scatter is decorative. Each keyword was probed once, so every marker of
/// a group carries that keyword's single rank.
pub fn keyword_overlay<R: Rng + ?Sized>(
    rng: &mut R,
    anchor: GeoPoint,
    business_name: Option<&str>,
    ranks: &[KeywordRank],
) -> MarkerSet {
    let mut markers = Vec::new();
    for (i, keyword_rank) in ranks.iter().enumerate() {
        #[allow(clippy::cast_precision_loss)]
        let shift = i as f64 * OVERLAY_SHIFT_DEG;
        let center = anchor.shifted(shift, shift);
        let rank = keyword_rank.outcome.rank();
        let failed = keyword_rank.outcome.is_failure();
        for point in generate_points(
            rng,
            center,
            OVERLAY_RADIUS_METERS,
            OVERLAY_POINTS_PER_KEYWORD,
        ) {
            let mut marker = rank_marker(point, rank, failed);
            marker.title = Some(keyword_rank.keyword.clone());
            markers.push(marker);
        }
    }
    MarkerSet {
        center: anchor,
        anchor: anchor_marker(anchor, business_name),
        markers,
    }
}

/// Round 34 px SVG icon in the bucket's colors with `text` centered.
#[must_use]
pub fn marker_svg(bucket: RankBucket, text: &str) -> String {
    let size = MARKER_SIZE_PX;
    let half = f64::from(size) / 2.0;
    let radius = half - 1.5;
    format!(
        concat!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{size}" height="{size}">"#,
            r#"<defs><filter id="shadow"><feDropShadow dx="0" dy="1.5" stdDeviation="2" flood-opacity="0.25"/></filter></defs>"#,
            r#"<circle cx="{half}" cy="{half}" r="{radius}" fill="{fill}" stroke="{stroke}" stroke-width="2" filter="url(#shadow)"/>"#,
            r##"<text x="50%" y="55%" text-anchor="middle" dominant-baseline="middle" fill="#111827" font-size="14" font-weight="700" font-family="Inter, Arial, sans-serif">{text}</text>"##,
            "</svg>"
        ),
        size = size,
        half = half,
        radius = radius,
        fill = bucket.fill(),
        stroke = bucket.stroke(),
        text = escape_xml(text),
    )
}

/// [`marker_svg`] as a percent-encoded `data:image/svg+xml` URL.
#[must_use]
pub fn marker_icon_data_url(bucket: RankBucket, text: &str) -> String {
    let svg = marker_svg(bucket, text);
    format!(
        "data:image/svg+xml;charset=UTF-8,{}",
        utf8_percent_encode(&svg, URI_COMPONENT)
    )
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            other => out.push(other),
        }
    }
    out
}
