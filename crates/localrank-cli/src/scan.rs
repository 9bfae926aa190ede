//! Grid scan and keyword check handlers.

use clap::Args;
use localrank_core::{
    AbortReason, AppConfig, GeoPoint, KeywordCheckRequest, ProbeOutcome, SampleRequest,
};
use localrank_places::PlacesClient;
use localrank_scanner::{classify, label, render, GridScanner, ScanError, ScanSettings};

#[derive(Debug, Args)]
pub(crate) struct ScanArgs {
    /// Place id of the business being ranked
    #[arg(long)]
    pub place_id: String,
    /// Search phrase to rank for
    #[arg(long)]
    pub keyword: String,
    #[arg(long, allow_negative_numbers = true)]
    pub lat: f64,
    #[arg(long, allow_negative_numbers = true)]
    pub lng: f64,
    /// Number of sample points (defaults to `LOCALRANK_DEFAULT_NUM_POINTS`)
    #[arg(long)]
    pub points: Option<u32>,
    /// Sampling radius in meters (defaults to `LOCALRANK_DEFAULT_RADIUS_METERS`)
    #[arg(long)]
    pub radius: Option<f64>,
    /// Seed for reproducible point placement
    #[arg(long)]
    pub seed: Option<u64>,
    /// Print the scan and its markers as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub(crate) struct KeywordsArgs {
    /// Place id of the business being ranked
    #[arg(long)]
    pub place_id: String,
    /// Appended to every keyword to narrow the search area
    #[arg(long)]
    pub address: Option<String>,
    /// Exactly three keywords
    #[arg(required = true, num_args = 1..)]
    pub keywords: Vec<String>,
}

/// Scan probes never retry; the scanner's pacing handles failures.
fn probe_client(config: &AppConfig) -> anyhow::Result<PlacesClient> {
    Ok(PlacesClient::with_base_url(
        &config.places_api_key,
        config.request_timeout_secs,
        &config.user_agent,
        &config.places_base_url,
    )?)
}

fn describe(outcome: &ProbeOutcome) -> String {
    match outcome {
        ProbeOutcome::Ranked { rank } => format!("rank {rank}"),
        ProbeOutcome::NotFound => "not in top 20".to_owned(),
        ProbeOutcome::Failed { message, .. } => format!("failed: {message}"),
        ProbeOutcome::Skipped => "skipped".to_owned(),
    }
}

/// Text shown in the bucket column; failed points get `?` like on the map.
fn outcome_label(outcome: &ProbeOutcome) -> String {
    if outcome.is_failure() {
        "?".to_owned()
    } else {
        label(outcome.rank())
    }
}

async fn ctrl_c() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %error, "ctrl-c handler unavailable; scan cannot be cancelled");
        std::future::pending::<()>().await;
    }
}

impl ScanArgs {
    pub(crate) fn to_request(&self, config: &AppConfig) -> SampleRequest {
        SampleRequest {
            keyword: self.keyword.clone(),
            business_id: self.place_id.clone(),
            center: GeoPoint::new(self.lat, self.lng),
            num_points: self.points.unwrap_or(config.default_num_points),
            radius_meters: self.radius.unwrap_or(config.default_radius_meters),
        }
    }
}

/// Run a grid scan, printing one line per point and a bucket histogram.
///
/// Ctrl-C stops the scan; nothing is printed for a cancelled scan.
///
/// # Errors
///
/// Returns an error for an invalid request, a cancelled scan, or when the
/// client cannot be built.
pub(crate) async fn run_scan(config: &AppConfig, args: ScanArgs) -> anyhow::Result<()> {
    let client = probe_client(config)?;
    let settings = ScanSettings::from_app_config(config).with_seed(args.seed);
    let scanner = GridScanner::new(&client, settings);
    let request = args.to_request(config);

    let scan = match scanner.scan_until(&request, ctrl_c()).await {
        Ok(scan) => scan,
        Err(ScanError::Cancelled) => {
            eprintln!("scan cancelled; partial results discarded");
            return Err(ScanError::Cancelled.into());
        }
        Err(error) => return Err(error.into()),
    };
    let markers = render(&scan, request.center, None);

    if args.json {
        let output = serde_json::json!({ "scan": scan, "markers": markers });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!(
        "'{}' for {} around {} ({} points, {:.0} m)",
        request.keyword,
        request.business_id,
        request.center,
        request.num_points,
        request.radius_meters
    );
    println!("{:<4}{:<26}{:<8}{:<6}RESULT", "#", "POINT", "BUCKET", "LABEL");
    for (index, observation) in scan.observations.iter().enumerate() {
        println!(
            "{:<4}{:<26}{:<8}{:<6}{}",
            index + 1,
            format!("{:.5},{:.5}", observation.point.lat, observation.point.lng),
            classify(observation.rank()).as_str(),
            outcome_label(&observation.outcome),
            describe(&observation.outcome)
        );
    }

    println!();
    for (bucket, count) in markers.histogram() {
        println!("{:<8}{count}", bucket.as_str());
    }
    match scan.best_rank() {
        Some(best) => println!("best rank: {best}"),
        None => println!("best rank: not found"),
    }
    if let Some(AbortReason::ConsecutiveFailures { count }) = scan.aborted {
        eprintln!("warning: scan stopped after {count} consecutive failures");
    }
    Ok(())
}

/// Print the position of the business for each of three keywords.
///
/// # Errors
///
/// Returns an error for a wrong keyword count or when the client cannot be built.
pub(crate) async fn run_keywords(config: &AppConfig, args: KeywordsArgs) -> anyhow::Result<()> {
    let client = probe_client(config)?;
    let scanner = GridScanner::new(&client, ScanSettings::from_app_config(config));
    let request = KeywordCheckRequest {
        business_id: args.place_id,
        address: args.address,
        keywords: args.keywords,
    };

    let result = scanner.check_keywords(&request).await?;

    println!("{:<32}{:<10}RESULT", "KEYWORD", "POSITION");
    for rank in &result.ranks {
        println!(
            "{:<32}{:<10}{}",
            rank.keyword,
            rank.position_or_sentinel(),
            describe(&rank.outcome)
        );
    }
    Ok(())
}
