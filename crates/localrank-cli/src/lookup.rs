//! Read-only lookups: place search, rating and performance metrics.

use chrono::Utc;
use clap::{Args, ValueEnum};
use localrank_core::AppConfig;
use localrank_places::{DateRange, PerformanceClient, PlacesClient};

const NAME_WIDTH: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum RangeMode {
    /// The last `--days` days ending today
    Rolling,
    /// A whole calendar month, `--offset` months back
    Month,
}

#[derive(Debug, Args)]
pub(crate) struct MetricsArgs {
    /// Business Profile location id (`locations/` prefix optional)
    #[arg(long)]
    pub location_id: String,
    #[arg(long, value_enum, default_value = "rolling")]
    pub mode: RangeMode,
    /// Window length for rolling mode
    #[arg(long, default_value = "30")]
    pub days: u32,
    /// Months back from the current month for month mode
    #[arg(long, default_value = "0")]
    pub offset: u32,
    /// OAuth access token with the business.manage scope
    #[arg(long, env = "GOOGLE_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: String,
}

impl MetricsArgs {
    pub(crate) fn date_range(&self, today: chrono::NaiveDate) -> anyhow::Result<DateRange> {
        let range = match self.mode {
            RangeMode::Rolling => DateRange::rolling(today, self.days)?,
            RangeMode::Month => DateRange::calendar_month(today, self.offset)?,
        };
        Ok(range)
    }
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() > width {
        format!("{}...", text.chars().take(width - 3).collect::<String>())
    } else {
        text.to_owned()
    }
}

/// Print matching places, one per line.
///
/// # Errors
///
/// Returns an error if the client cannot be built or the provider call fails.
pub(crate) async fn run_search(config: &AppConfig, query: &str) -> anyhow::Result<()> {
    let client = PlacesClient::from_app_config(config)?;
    let places = client.search_places(query, None).await?;

    if places.is_empty() {
        println!("no places found for '{query}'");
        return Ok(());
    }

    println!("{:<4}{:<30}{:<NAME_WIDTH$}  ADDRESS", "#", "PLACE ID", "NAME");
    for (index, place) in places.iter().enumerate() {
        println!(
            "{:<4}{:<30}{:<NAME_WIDTH$}  {}",
            index + 1,
            place.place_id,
            truncate(&place.name, NAME_WIDTH),
            place.address
        );
    }
    Ok(())
}

/// # Errors
///
/// Returns an error if the client cannot be built or the provider call fails.
pub(crate) async fn run_rating(config: &AppConfig, place_id: &str) -> anyhow::Result<()> {
    let client = PlacesClient::from_app_config(config)?;
    let rating = client.fetch_rating(place_id).await?;

    println!("{}", rating.name);
    println!("rating: {:.1} ({} reviews)", rating.rating, rating.total_reviews);
    Ok(())
}

/// Print summed metric totals for the requested date range.
///
/// # Errors
///
/// Returns an error for an invalid range, a rejected token, or a failed call.
pub(crate) async fn run_metrics(config: &AppConfig, args: MetricsArgs) -> anyhow::Result<()> {
    let range = args.date_range(Utc::now().date_naive())?;
    let client = PerformanceClient::from_app_config(config)?;
    let totals = client
        .fetch_metric_totals(&args.location_id, range, &args.access_token)
        .await?;

    println!(
        "location {} from {} to {}",
        args.location_id.trim(),
        totals.range.start,
        totals.range.end
    );
    let header = format!("{:<44}TOTAL", "METRIC");
    println!("{header}");
    for (metric, total) in &totals.totals {
        println!("{metric:<44}{total}");
    }
    Ok(())
}
