mod auth;
mod batch;
pub mod cli;
mod client;
mod config;
mod error;
mod locations;
mod output;
mod types;

pub use client::Awhere;
pub use config::*;
pub use error::AwhereError;

pub use auth::error::AuthError;
pub use auth::token_provider::{
    AuthenticatedClient, OAuthTokenProvider, StaticTokenProvider, TokenProvider,
};

pub use batch::aggregator::ResultAggregator;
pub use batch::error::BatchError;
pub use batch::flatten::{flatten_batch, flatten_single, flatten_sub_results, SubResult};
pub use batch::jobs_api::JobsApi;
pub use batch::poller::{JobPoller, JobProgress, JobStatusSource, PollOptions, DEFAULT_POLL_INTERVAL};
pub use batch::request_builder::{build_multiple, build_single};

pub use types::date_window::*;
pub use types::job::*;
pub use types::location::*;
pub use types::observation::*;

pub use locations::{clamp_end_date, load_woreda_mapped, load_woredas, GEO_KEY_COLUMN};
pub use output::csv::{batch_file_name, location_file_name, write_result_csv};
pub use output::error::OutputError;
pub use output::ndjson::{write_weather_json, FIELDS, JSON_FILE_NAME};
