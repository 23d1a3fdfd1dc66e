use crate::analyzers::{validate_lookback, WeatherAnalyzer};
use crate::cli::args::{Cli, Commands};
use crate::config::Settings;
use crate::error::Result;
use crate::processors::{IntegrityChecker, StarTransformer};
use crate::readers::ForecastReader;
use crate::utils::progress::ProgressReporter;
use crate::writers::SqliteWriter;
use chrono::Utc;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{info, warn, Level};

pub async fn run(cli: Cli) -> Result<()> {
    init_logging(cli.verbose, cli.log_file.as_deref())?;

    let settings = Settings::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Run {
            database,
            allow_partial,
            sample,
        } => {
            let database = database.unwrap_or_else(|| settings.database_path.clone());
            println!("Running weather ETL...");
            println!("Locations: {}", settings.locations.len());
            println!("Store: {}", database.display());

            let reader = ForecastReader::new(&settings.fetch)?;
            let progress = ProgressReporter::new(
                settings.locations.len() as u64,
                "Fetching forecasts...",
                false,
            );

            let outcome = reader.fetch_all(&settings.locations, Some(&progress)).await;
            let failed = outcome.failed_locations();
            progress.finish_with_message(&format!(
                "Fetched {}/{} locations",
                settings.locations.len() - failed.len(),
                settings.locations.len()
            ));

            if !failed.is_empty() && allow_partial {
                warn!(?failed, "Continuing without failed locations");
            }
            let rows = outcome.into_rows(allow_partial)?;

            let transformer = StarTransformer::new();
            let schema = transformer.transform(&rows)?;
            println!("\n{}", schema.summary());
            if schema.is_empty() {
                warn!("No observations fetched, store will hold empty tables");
            }

            let checker = IntegrityChecker::new();
            println!("\n{}", checker.generate_summary(&checker.check(&schema)));

            let writer = SqliteWriter::new(&database);
            let summary = writer.load(&schema)?;
            println!("\n{}", summary.summary());

            if sample > 0 {
                let analyzer = WeatherAnalyzer::open(&summary.path)?;
                println!("\n{}", analyzer.sample_tables(sample)?);
            }

            println!("ETL complete!");
        }

        Commands::Average { hours, database } => {
            // Reject the window before touching the store
            validate_lookback(hours)?;

            let analyzer = open_store(database, &settings)?;
            let report = analyzer.average_temperature(hours, Utc::now())?;
            println!("{}", report.summary());
        }

        Commands::Windiest { database } => {
            let analyzer = open_store(database, &settings)?;
            let report = analyzer.windiest()?;
            println!("{}", report.summary());
        }

        Commands::Inspect { limit, database } => {
            let analyzer = open_store(database, &settings)?;
            println!("Store: {}\n", analyzer.path().display());
            println!("{}", analyzer.sample_tables(limit)?);
        }

        Commands::ClearCache => {
            let reader = ForecastReader::new(&settings.fetch)?;
            let removed = reader.cache().clear().await?;
            println!(
                "Removed {} cached responses from {}",
                removed,
                reader.cache().dir().display()
            );
        }
    }

    Ok(())
}

fn open_store(database: Option<PathBuf>, settings: &Settings) -> Result<WeatherAnalyzer> {
    let path = database.unwrap_or_else(|| settings.database_path.clone());
    info!(store = %path.display(), "Opening store read-only");
    WeatherAnalyzer::open(&path)
}

fn init_logging(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let builder = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false);

    // A subscriber may already be installed when embedded in another binary
    let installed = match log_file {
        Some(path) => builder
            .with_ansi(false)
            .with_writer(Mutex::new(File::create(path)?))
            .try_init(),
        None => builder.with_writer(std::io::stderr).try_init(),
    };
    if installed.is_err() {
        warn!("Tracing subscriber already installed");
    }
    Ok(())
}
