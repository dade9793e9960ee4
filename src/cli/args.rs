use crate::config::{KEY_ENV, SECRET_ENV};
use crate::types::date_window::AWHERE_DATE_FORMAT;
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "awhere")]
#[command(about = "Pull woreda weather from the aWhere API and export it")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,
}

/// How a pull talks to the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BatchType {
    /// One batch job and one CSV per woreda.
    Single,
    /// All woredas in one run, written to a single CSV.
    Batch,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Pull observations for every woreda in the location table
    Pull {
        #[arg(long, help = "Path to woreda_info.csv (WoredaLat, WoredaLon, GeoKey)")]
        woreda_latlon_path: PathBuf,

        #[arg(long, help = "Directory the weather CSVs are written to")]
        output_data_path: PathBuf,

        #[arg(long, value_parser = parse_date, help = "Start date YYYY-MM-DD")]
        start_date: NaiveDate,

        #[arg(
            long,
            value_parser = parse_date,
            help = "End date YYYY-MM-DD, clamped to yesterday"
        )]
        end_date: NaiveDate,

        #[arg(long, value_enum)]
        batch_type: BatchType,

        #[arg(long, env = KEY_ENV, hide_env_values = true)]
        key: String,

        #[arg(long, env = SECRET_ENV, hide_env_values = true)]
        secret: String,

        #[arg(long, default_value = "5", help = "Seconds between job status polls")]
        poll_interval: u64,

        #[arg(long, help = "Give up on a job after this many polls")]
        max_polls: Option<u32>,

        #[arg(long, default_value = "1", help = "Jobs polled at the same time")]
        concurrency: usize,
    },

    /// Convert pulled weather CSVs to gzip-compressed JSON lines
    ToJson {
        #[arg(long, help = "Path to woreda_mapped.csv")]
        woreda_mapped_path: PathBuf,

        #[arg(long, help = "Directory holding the weather CSVs")]
        weather_data_dir: PathBuf,

        #[arg(long, help = "Directory weather.json.gz is written to")]
        output_dir: PathBuf,
    },
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, AWHERE_DATE_FORMAT)
        .map_err(|e| format!("expected YYYY-MM-DD: {e}"))
}
