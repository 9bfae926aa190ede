mod lookup;
mod scan;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::lookup::{run_metrics, run_rating, run_search, MetricsArgs};
use crate::scan::{run_keywords, run_scan, KeywordsArgs, ScanArgs};

#[derive(Debug, Parser)]
#[command(name = "localrank-cli")]
#[command(about = "Local search rank scanner command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Search places by free text
    Search {
        /// Free-text query (e.g. "pizza Warsaw")
        query: String,
    },
    /// Show rating and review count for a place
    Rating {
        /// Provider place id
        place_id: String,
    },
    /// Run a grid scan around a center point
    Scan(ScanArgs),
    /// Spot-check three keywords without a location bias
    Keywords(KeywordsArgs),
    /// Sum Business Profile performance metrics for a location
    Metrics(MetricsArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = localrank_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Search { query } => run_search(&config, &query).await,
        Commands::Rating { place_id } => run_rating(&config, &place_id).await,
        Commands::Scan(args) => run_scan(&config, args).await,
        Commands::Keywords(args) => run_keywords(&config, args).await,
        Commands::Metrics(args) => run_metrics(&config, args).await,
    }
}

#[cfg(test)]
mod tests;
