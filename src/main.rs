//! CLI entry point for the SRT sales proxy.
//!
//! Provides subcommands for serving the paginating proxy over HTTP and for
//! fetching, aggregating and summarizing a date range from the terminal.

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde_json::json;
use srt_sales::{
    analyzers::{Selection, aggregate, project},
    cache::QueryCache,
    config::SrtConfig,
    fetch::BasicClient,
    output::{append_series, print_json},
    sales::{DateRange, FetchResult, SalesFetcher},
    server::{self, AppState},
};
use std::ffi::OsStr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "srt_sales")]
#[command(about = "Paginating proxy and aggregator for SRT station sales", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the sales proxy over HTTP
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value_t = 3000)]
        port: u16,

        /// How long fetched date ranges stay cached (0 = no caching, the default)
        #[arg(long, default_value_t = 0)]
        cache_ttl_secs: u64,

        /// Most date ranges held in the cache at once
        #[arg(long, default_value_t = 64)]
        cache_max_entries: usize,
    },
    /// Fetch a date range, aggregate it and optionally write the series to CSV
    Fetch {
        /// First run date (YYYY-MM-DD)
        #[arg(long)]
        start_date: NaiveDate,

        /// Last run date (YYYY-MM-DD)
        #[arg(long)]
        end_date: NaiveDate,

        /// CSV file to append the per-date totals to
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Fetch a date range and report totals for selected stations and routes
    Summary {
        /// First run date (YYYY-MM-DD)
        #[arg(long)]
        start_date: NaiveDate,

        /// Last run date (YYYY-MM-DD)
        #[arg(long)]
        end_date: NaiveDate,

        /// Station to include (repeatable; defaults to the first three seen)
        #[arg(short, long)]
        station: Vec<String>,

        /// Route to include (repeatable; defaults to the first three seen)
        #[arg(short, long)]
        route: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/srt_sales.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("srt_sales.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let config = SrtConfig::from_env()?;

    if config.api_key.is_none() {
        warn!("SRT_API_KEY is not set; sales requests will fail");
    }

    let client = BasicClient::with_timeout(config.request_timeout)?;
    let fetcher = SalesFetcher::new(client, config);

    match cli.command {
        Commands::Serve {
            port,
            cache_ttl_secs,
            cache_max_entries,
        } => {
            let cache = Arc::new(QueryCache::new(
                Duration::from_secs(cache_ttl_secs),
                cache_max_entries,
            ));
            if cache.is_enabled() {
                info!(
                    ttl_secs = cache_ttl_secs,
                    max_entries = cache_max_entries,
                    "Query cache enabled"
                );
            } else {
                info!("Query cache disabled; every request goes to the upstream");
            }

            let state = AppState::new(fetcher, cache);
            server::serve(state, port).await?;
        }
        Commands::Fetch {
            start_date,
            end_date,
            output,
        } => {
            let result = fetch_range(&fetcher, start_date, end_date).await?;
            let series = aggregate(&result.records);

            info!(
                records = result.total_count,
                pages = result.page_count,
                dates = series.buckets.len(),
                stations = series.stations.len(),
                routes = series.routes.len(),
                skipped = series.skipped_records,
                "Sales aggregated"
            );

            if let Some(path) = output {
                let rows = append_series(&path, &series)?;
                info!(path = %path, rows, "Series written to CSV");
            }
        }
        Commands::Summary {
            start_date,
            end_date,
            station,
            route,
        } => {
            let result = fetch_range(&fetcher, start_date, end_date).await?;
            let series = aggregate(&result.records);
            let selection = Selection::new(station, route).or_default_for(&series);
            let projection = project(&series, &selection);

            for (combination, quantity) in &projection.totals {
                info!(combination = %combination, quantity, "Combination total");
            }
            info!(
                total = projection.total,
                average = projection.average,
                "Selection summary"
            );

            print_json(&json!({
                "selection": selection,
                "availableStations": series.stations,
                "availableRoutes": series.routes,
                "total": projection.total,
                "average": projection.average,
            }))?;
        }
    }

    Ok(())
}

/// Validates the range and fetches every page for it.
#[tracing::instrument(skip(fetcher))]
async fn fetch_range(
    fetcher: &SalesFetcher<BasicClient>,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<FetchResult> {
    let range = DateRange::new(start_date, end_date)?;
    Ok(fetcher.fetch_sales(&range).await?)
}
