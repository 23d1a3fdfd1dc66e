use crate::utils::constants::DEFAULT_SAMPLE_ROWS;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "weather-star-etl")]
#[command(about = "Hourly weather ETL into a SQLite star schema")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Log file path")]
    pub log_file: Option<PathBuf>,

    #[arg(
        short,
        long,
        global = true,
        help = "Configuration file [default: weather-etl.toml if present]"
    )]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch forecasts, build the star schema and replace the store
    Run {
        #[arg(short, long, help = "SQLite store path (overrides configuration)")]
        database: Option<PathBuf>,

        #[arg(long, help = "Load the locations that succeeded when others fail")]
        allow_partial: bool,

        #[arg(
            short,
            long,
            default_value = "0",
            help = "Rows per table to print after loading (0 = none)"
        )]
        sample: usize,
    },

    /// Average temperature per location up to now + HOURS
    Average {
        #[arg(long, help = "Lookback window in hours (at most 168)")]
        hours: u32,

        #[arg(short, long, help = "SQLite store path (overrides configuration)")]
        database: Option<PathBuf>,
    },

    /// Peak wind speed per location and when it occurred
    Windiest {
        #[arg(short, long, help = "SQLite store path (overrides configuration)")]
        database: Option<PathBuf>,
    },

    /// Print the head of each table in the store
    Inspect {
        #[arg(short, long, default_value_t = DEFAULT_SAMPLE_ROWS)]
        limit: usize,

        #[arg(short, long, help = "SQLite store path (overrides configuration)")]
        database: Option<PathBuf>,
    },

    /// Delete cached forecast responses
    ClearCache,
}
