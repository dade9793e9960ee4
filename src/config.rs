//! Connection settings for the provider API.

use crate::batch::poller::{PollOptions, DEFAULT_POLL_INTERVAL};
use bon::Builder;
use std::env;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_API_HOST: &str = "https://api.awhere.com";
pub const DEFAULT_LEGACY_JOBS_URL: &str = "https://awhere-dev.apigee.net/gda_temporary/jobs";

pub const KEY_ENV: &str = "AWHERE_KEY";
pub const SECRET_ENV: &str = "AWHERE_SECRET";
pub const API_HOST_ENV: &str = "AWHERE_API_URL";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Environment variable {0} is not set")]
    MissingEnv(&'static str, #[source] env::VarError),
}

/// Credentials, endpoint URLs and polling behaviour.
///
/// # Examples
///
/// ```
/// use awhere::AwhereConfig;
/// use std::time::Duration;
///
/// let config = AwhereConfig::builder()
///     .key("my-key")
///     .secret("my-secret")
///     .poll_interval(Duration::from_secs(10))
///     .build();
/// assert_eq!(config.jobs_url(), "https://api.awhere.com/v2/jobs");
/// assert_eq!(config.concurrency(), 1);
/// ```
#[derive(Debug, Clone, Builder)]
pub struct AwhereConfig {
    #[builder(into)]
    key: String,
    #[builder(into)]
    secret: String,
    #[builder(into, default = format!("{}/oauth/token", DEFAULT_API_HOST))]
    token_url: String,
    #[builder(into, default = format!("{}/v2/weather/locations", DEFAULT_API_HOST))]
    weather_url: String,
    #[builder(into, default = format!("{}/v2/jobs", DEFAULT_API_HOST))]
    jobs_url: String,
    #[builder(into, default = String::from(DEFAULT_LEGACY_JOBS_URL))]
    legacy_jobs_url: String,
    #[builder(default = DEFAULT_POLL_INTERVAL)]
    poll_interval: Duration,
    /// Unbounded when unset.
    max_polls: Option<u32>,
    /// Jobs polled at the same time. 1 keeps polling strictly sequential.
    #[builder(default = 1)]
    concurrency: usize,
}

impl AwhereConfig {
    /// Settings for an API served from `host` (e.g. a local mock), with the
    /// standard paths below it.
    pub fn for_host(key: &str, secret: &str, host: &str) -> Self {
        let host = host.trim_end_matches('/');
        Self::builder()
            .key(key)
            .secret(secret)
            .token_url(format!("{}/oauth/token", host))
            .weather_url(format!("{}/v2/weather/locations", host))
            .jobs_url(format!("{}/v2/jobs", host))
            .build()
    }

    /// Reads credentials from `AWHERE_KEY` and `AWHERE_SECRET`. If
    /// `AWHERE_API_URL` is set, every endpoint except the legacy jobs URL is
    /// served from that host.
    pub fn from_env() -> Result<Self, ConfigError> {
        let key = env::var(KEY_ENV).map_err(|e| ConfigError::MissingEnv(KEY_ENV, e))?;
        let secret = env::var(SECRET_ENV).map_err(|e| ConfigError::MissingEnv(SECRET_ENV, e))?;
        let host = env::var(API_HOST_ENV).unwrap_or_else(|_| DEFAULT_API_HOST.to_string());
        Ok(Self::for_host(&key, &secret, &host))
    }

    pub fn key(&self) -> &str {
        self.key.trim()
    }

    pub fn secret(&self) -> &str {
        self.secret.trim()
    }

    pub fn token_url(&self) -> &str {
        &self.token_url
    }

    pub fn weather_url(&self) -> &str {
        &self.weather_url
    }

    pub fn jobs_url(&self) -> &str {
        &self.jobs_url
    }

    pub fn legacy_jobs_url(&self) -> &str {
        &self.legacy_jobs_url
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency.max(1)
    }

    pub fn poll_options(&self) -> PollOptions {
        PollOptions {
            interval: self.poll_interval,
            max_polls: self.max_polls,
        }
    }
}
