//! CLI entry point for the transit ridership tools.
//!
//! Provides subcommands for turning yearly turnstile dumps into daily
//! station entries, collecting the municipal bus-ridership spreadsheets into
//! SQLite, and reporting the collected bus ridership as a daily series.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};
use transit_ridership::config::{
    CollectorConfig, DEFAULT_LISTING_URLS, DayAxis, SeriesConfig, TurnstileConfig,
    ZeroVariancePolicy,
};
use transit_ridership::output::{self, RunSummary};
use transit_ridership::publish::upload_files;
use transit_ridership::ridership::collector::collect;
use transit_ridership::ridership::report::daily_report;
use transit_ridership::ridership::store::RidershipStore;
use transit_ridership::turnstile::pipeline::{discover_inputs, run};

#[derive(Parser)]
#[command(name = "transit_ridership")]
#[command(about = "Daily ridership series from transit usage dumps", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Options shared by the commands that publish their exports.
#[derive(clap::Args)]
struct PublishArgs {
    /// Optional: S3 bucket to upload the exported files to (e.g., "my-bucket")
    #[arg(long)]
    s3_bucket: Option<String>,

    /// Key prefix inside the bucket
    #[arg(long, default_value = "")]
    s3_prefix: String,

    /// Optional: Gzip compress files before uploading to S3
    #[arg(long, default_value_t = false)]
    gzip: bool,
}

/// Options shared by the commands that compute rolling year-over-year change.
#[derive(clap::Args)]
struct SeriesArgs {
    /// Day axis used for the rolling mean and the yearly lag
    #[arg(long, value_enum, default_value_t = DayAxis::Calendar)]
    day_axis: DayAxis,

    /// Rolling mean window, in days
    #[arg(long, default_value_t = 7)]
    window: usize,

    /// Lag of the percent change, in days
    #[arg(long, default_value_t = 365)]
    lag: usize,
}

impl From<SeriesArgs> for SeriesConfig {
    fn from(args: SeriesArgs) -> Self {
        Self {
            window: args.window,
            lag: args.lag,
            day_axis: args.day_axis,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate yearly turnstile usage CSVs into daily station entries
    Turnstile {
        /// Directory holding *Turnstile_Usage_Data__<year>.csv files
        #[arg(value_name = "INPUT_DIR")]
        input_dir: PathBuf,

        /// Directory to write the exported spreadsheets to
        #[arg(short, long, default_value = "output")]
        output_dir: PathBuf,

        /// Deltas with an absolute z-score at or above this are dropped
        #[arg(long, default_value_t = 3.0)]
        z_threshold: f64,

        /// Station-day totals at or above this are dropped
        #[arg(long, default_value_t = 5_000_000.0)]
        cap: f64,

        /// What to do with turnstiles whose deltas have no spread
        #[arg(long, value_enum, default_value_t = ZeroVariancePolicy::Reject)]
        zero_variance: ZeroVariancePolicy,

        #[command(flatten)]
        series: SeriesArgs,

        #[command(flatten)]
        publish: PublishArgs,
    },
    /// Download the bus-ridership spreadsheets into a SQLite database
    Collect {
        /// SQLite database file
        #[arg(short, long, default_value = "sptrans.db")]
        db: String,

        /// Number of listing pages fetched in parallel
        #[arg(short, long, default_value_t = 3)]
        workers: usize,

        /// Attempts per download before the sheet is skipped
        #[arg(short = 'a', long, default_value_t = 10)]
        attempts: usize,

        /// Listing page URLs (defaults to the three most recent years)
        #[arg(value_name = "URL")]
        urls: Vec<String>,

        /// Use every known listing page instead of the three most recent
        #[arg(long, default_value_t = false)]
        all_pages: bool,
    },
    /// Export the collected bus ridership as a daily series
    Report {
        /// SQLite database file
        #[arg(short, long, default_value = "sptrans.db")]
        db: String,

        /// Directory to write the exported spreadsheets to
        #[arg(short, long, default_value = "output")]
        output_dir: PathBuf,

        #[command(flatten)]
        series: SeriesArgs,

        #[command(flatten)]
        publish: PublishArgs,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/transit_ridership.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("transit_ridership.log"));

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

    match cli.command {
        Commands::Turnstile {
            input_dir,
            output_dir,
            z_threshold,
            cap,
            zero_variance,
            series,
            publish,
        } => {
            let config = TurnstileConfig {
                z_threshold,
                plausibility_cap: cap,
                zero_variance,
                series: series.into(),
            };
            turnstile(&input_dir, &output_dir, &config, &publish).await?;
        }
        Commands::Collect {
            db,
            workers,
            attempts,
            urls,
            all_pages,
        } => {
            let mut config = CollectorConfig {
                workers,
                max_attempts: attempts,
                db_path: db,
                ..Default::default()
            };
            if all_pages {
                config.listing_urls = DEFAULT_LISTING_URLS.iter().map(|u| u.to_string()).collect();
            }
            if !urls.is_empty() {
                config.listing_urls = urls;
            }
            collect(&config).await?;
        }
        Commands::Report {
            db,
            output_dir,
            series,
            publish,
        } => {
            report(&db, &output_dir, &series.into(), &publish).await?;
        }
    }

    Ok(())
}

/// Runs the turnstile pipeline over `input_dir` and exports the results.
#[tracing::instrument(skip_all, fields(input_dir = %input_dir.display()))]
async fn turnstile(
    input_dir: &Path,
    output_dir: &Path,
    config: &TurnstileConfig,
    publish: &PublishArgs,
) -> Result<()> {
    let paths = discover_inputs(input_dir)?;
    info!(files = paths.len(), "Turnstile files found");

    let result = run(&paths, config)?;

    let written = output::export_all(
        output_dir,
        &[
            (output::DAILY_STATIONS, "station", &result.stations),
            (output::DAILY_STATIONS_PCT, "station", &result.stations_yoy),
            (output::DAILY_TOTAL, "series", &result.total),
            (output::DAILY_TOTAL_PCT, "series", &result.total_yoy),
        ],
    )?;

    let mut summary = RunSummary::new("turnstile", &result.stations);
    summary.inputs = result
        .files_processed
        .iter()
        .map(|p| p.display().to_string())
        .collect();
    summary.skipped_inputs = result
        .files_skipped
        .iter()
        .map(|p| p.display().to_string())
        .collect();

    finish(output_dir, written, summary, publish).await
}

/// Exports the daily bus-ridership series stored in `db`.
#[tracing::instrument(skip_all, fields(db = %db, output_dir = %output_dir.display()))]
async fn report(
    db: &str,
    output_dir: &Path,
    config: &SeriesConfig,
    publish: &PublishArgs,
) -> Result<()> {
    let store = RidershipStore::open(db)?;
    let result = daily_report(&store, config)?;

    let written = output::export_all(
        output_dir,
        &[
            (output::SPTRANS_DAILY_TOTAL, "series", &result.daily),
            (output::SPTRANS_DAILY_TOTAL_PCT, "series", &result.yoy),
        ],
    )?;

    let mut summary = RunSummary::new("ridership", &result.daily);
    summary.inputs = vec![db.to_string()];

    finish(output_dir, written, summary, publish).await
}

/// Writes the run summary and uploads every output when a bucket is set.
async fn finish(
    output_dir: &Path,
    mut written: Vec<PathBuf>,
    mut summary: RunSummary,
    publish: &PublishArgs,
) -> Result<()> {
    let summary_path = output_dir.join(output::SUMMARY);
    summary.outputs = written.iter().map(|p| p.display().to_string()).collect();
    output::write_summary(&summary_path, &summary)?;
    written.push(summary_path);

    match &publish.s3_bucket {
        Some(bucket) => {
            info!(bucket = %bucket, gzip = publish.gzip, "S3 upload enabled");
            let paths: Vec<&Path> = written.iter().map(PathBuf::as_path).collect();
            upload_files(bucket, &publish.s3_prefix, &paths, publish.gzip).await?;
        }
        None => info!("S3 bucket not specified, skipping upload"),
    }

    Ok(())
}
