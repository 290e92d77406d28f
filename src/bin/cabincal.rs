//! cabincal command line interface
//!
//! カタログとXLSXワークブックのディレクトリから空き状況を問い合わせるCLI。
//!
//! ```text
//! cabincal --catalog catalog.toml --calendars ./calendars query --start 2025/09/01 --end 2025/09/30
//! cabincal --catalog catalog.toml --calendars ./calendars refresh --format json
//! ```

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use cabincal::{
    AvailabilityQuery, CabinError, Catalog, EndBound, EngineBuilder, OutputFormat, QueryMode, ReportFormatter,
    XlsxDirectoryProvider,
};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "cabincal")]
#[command(about = "Cabin availability from vessel booking spreadsheets")]
struct Cli {
    /// Vessel catalog (TOML)
    #[arg(long, default_value = "catalog.toml")]
    catalog: PathBuf,

    /// Directory holding `<document id>.xlsx` workbooks
    #[arg(long, default_value = "calendars")]
    calendars: PathBuf,

    /// Season year for date tokens without a year
    #[arg(long)]
    year: Option<i32>,

    /// Process vessels in parallel
    #[arg(long)]
    parallel: bool,

    /// Output format
    #[arg(long, value_enum, default_value = "markdown")]
    format: Format,

    #[arg(short, long, help = "Enable verbose output")]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List rooms free within a date range
    Query {
        /// Start date (YYYY/MM/DD)
        #[arg(long)]
        start: String,

        /// End date (YYYY/MM/DD)
        #[arg(long)]
        end: String,

        /// Restrict to these vessels
        #[arg(long = "vessel")]
        vessels: Vec<String>,

        /// Report rooms free for the whole range instead of each start date
        #[arg(long)]
        whole_range: bool,

        /// Include departures on the end date itself
        #[arg(long)]
        inclusive_end: bool,
    },

    /// Extract every vessel and report per-vessel outcomes
    Refresh,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Format {
    Markdown,
    Json,
}

impl From<Format> for OutputFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Markdown => OutputFormat::Markdown,
            Format::Json => OutputFormat::Json,
        }
    }
}

fn init_logger(verbose: bool) {
    let default = if verbose { "cabincal=debug" } else { "cabincal=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(io::stderr)
                .compact(),
        )
        .init();
}

fn run(cli: Cli) -> Result<(), CabinError> {
    let catalog = Catalog::from_file(&cli.catalog)?;
    let formatter = ReportFormatter::from_format(cli.format.into());

    let mut builder = EngineBuilder::new()
        .with_catalog(catalog)
        .with_provider(XlsxDirectoryProvider::new(&cli.calendars))
        .parallel(cli.parallel);
    if let Some(year) = cli.year {
        builder = builder.with_season_year(year);
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Command::Query {
            start,
            end,
            vessels,
            whole_range,
            inclusive_end,
        } => {
            // 日付の形式はエンジンに渡す前に検証する
            let mut query = AvailabilityQuery::parse(&start, &end)?;
            query.vessels = vessels;
            if whole_range {
                query.mode = QueryMode::WholeRange;
            }
            let bound = if inclusive_end { EndBound::Inclusive } else { EndBound::Exclusive };

            let engine = builder.with_end_bound(bound).build()?;
            let results = engine.query(&query);
            tracing::info!(results = results.len(), "query finished");
            formatter.render_results(&results, &mut out)
        }
        Command::Refresh => {
            let engine = builder.build()?;
            let reports = engine.refresh();
            formatter.render_reports(&reports, &mut out)
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logger(cli.verbose);
    tracing::debug!(?cli, "starting cabincal");

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "cabincal failed");
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}
