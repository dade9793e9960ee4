//! This module provides the main entry point for talking to the aWhere API.
//! It covers direct observation and norm queries as well as the batch job
//! pipeline: build jobs for many locations, submit them, wait for them and
//! flatten what they return.

use crate::auth::token_provider::{OAuthTokenProvider, TokenProvider};
use crate::batch::aggregator::ResultAggregator;
use crate::batch::error::BatchError;
use crate::batch::flatten::flatten_single;
use crate::batch::jobs_api::JobsApi;
use crate::batch::request_builder::{build_multiple, build_single};
use crate::config::AwhereConfig;
use crate::error::AwhereError;
use crate::types::date_window::{window, AWHERE_DATE_FORMAT, QUERY_MAX};
use crate::types::job::{BatchJobDescriptor, Endpoint, JobHandle};
use crate::types::location::LatLon;
use crate::types::observation::{ObservationRecord, ResultSet};
use bon::bon;
use chrono::NaiveDate;
use log::info;
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// The client for the aWhere weather API.
///
/// Every request asks the configured [`TokenProvider`] for a fresh
/// authenticated client; the default [`OAuthTokenProvider`] caches its token
/// so this costs one token request per token lifetime.
///
/// # Examples
///
/// ```no_run
/// # use awhere::{Awhere, AwhereError, LatLon};
/// # use chrono::NaiveDate;
/// # #[tokio::main]
/// # async fn main() -> Result<(), AwhereError> {
/// let client = Awhere::from_env()?;
/// let result = client
///     .fetch_data_multiple()
///     .locations(&[LatLon(9.03, 38.74), LatLon(13.5, 39.47)])
///     .labels(&["addis".to_string(), "mekele".to_string()])
///     .start_date(NaiveDate::from_ymd_opt(2019, 1, 1).unwrap())
///     .end_date(NaiveDate::from_ymd_opt(2019, 12, 31).unwrap())
///     .call()
///     .await?;
/// println!("{} rows, {} failed queries", result.records.len(), result.failures.len());
/// # Ok(())
/// # }
/// ```
pub struct Awhere {
    config: AwhereConfig,
    tokens: Arc<dyn TokenProvider>,
    jobs: JobsApi,
}

#[bon]
impl Awhere {
    /// Creates a client that authenticates with the OAuth2 client-credentials
    /// grant using the key and secret of `config`.
    pub fn new(config: AwhereConfig) -> Self {
        let tokens = Arc::new(OAuthTokenProvider::new(
            config.token_url(),
            config.key(),
            config.secret(),
        ));
        Self::with_token_provider(config, tokens)
    }

    pub fn with_token_provider(config: AwhereConfig, tokens: Arc<dyn TokenProvider>) -> Self {
        let jobs = JobsApi::new(
            Arc::clone(&tokens),
            config.jobs_url(),
            config.legacy_jobs_url(),
        );
        Self {
            config,
            tokens,
            jobs,
        }
    }

    /// Creates a client from `AWHERE_KEY` / `AWHERE_SECRET`.
    pub fn from_env() -> Result<Self, AwhereError> {
        Ok(Self::new(AwhereConfig::from_env()?))
    }

    pub fn config(&self) -> &AwhereConfig {
        &self.config
    }

    async fn get_json(&self, url: &str) -> Result<Value, BatchError> {
        info!("{}", url);
        let client = self.tokens.get_client().await?;
        let response = client
            .get(url)
            .send()
            .await
            .map_err(|e| BatchError::NetworkRequest(url.to_string(), e))?;
        let response = response.error_for_status().map_err(|e| match e.status() {
            Some(status) => BatchError::HttpStatus {
                url: url.to_string(),
                status,
                source: e,
            },
            None => BatchError::NetworkRequest(url.to_string(), e),
        })?;
        response
            .json()
            .await
            .map_err(|e| BatchError::ResponseDecode(url.to_string(), e))
    }

    /// Raw observations for one location, `end - start` at most
    /// [`QUERY_MAX`] days.
    pub async fn single_call(
        &self,
        location: LatLon,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Value, AwhereError> {
        let url = format!(
            "{}/{}/observations/{},{}/?limit={}",
            self.config.weather_url(),
            location,
            start_date.format(AWHERE_DATE_FORMAT),
            end_date.format(AWHERE_DATE_FORMAT),
            QUERY_MAX
        );
        Ok(self.get_json(&url).await?)
    }

    /// Raw climate norms: the average weather of each day between `start`
    /// and `end` (`MM-DD`) over the years `start_year..=end_year`.
    pub async fn norms_call(
        &self,
        location: LatLon,
        start: &str,
        end: &str,
        start_year: i32,
        end_year: i32,
    ) -> Result<Value, AwhereError> {
        let url = format!(
            "{}/{}/norms/{},{}/years/{},{}/?limit={}",
            self.config.weather_url(),
            location,
            start,
            end,
            start_year,
            end_year,
            QUERY_MAX
        );
        Ok(self.get_json(&url).await?)
    }

    /// Observations for one location without the batch API: one direct call
    /// per [`QUERY_MAX`]-day window, flattened and concatenated in date order.
    #[builder]
    pub async fn fetch_observations_single(
        &self,
        location: LatLon,
        title: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<ObservationRecord>, AwhereError> {
        let mut records = Vec::new();
        for w in &window(start_date, end_date, QUERY_MAX)? {
            let payload = self.single_call(location, w.start(), w.end()).await?;
            records.extend(flatten_single(title, &payload)?);
        }
        Ok(records)
    }

    async fn submit_all(
        &self,
        descriptors: &[BatchJobDescriptor],
        endpoint: Endpoint,
    ) -> Result<Vec<JobHandle>, AwhereError> {
        let mut handles = Vec::with_capacity(descriptors.len());
        for descriptor in descriptors {
            handles.push(self.jobs.submit(descriptor, endpoint).await?);
        }
        Ok(handles)
    }

    /// Builds and submits the batch job for one location.
    pub async fn create_and_submit_single(
        &self,
        location: LatLon,
        label: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
        endpoint: Endpoint,
    ) -> Result<Vec<JobHandle>, AwhereError> {
        let descriptor = build_single(location, label, start_date, end_date)?;
        self.submit_all(&[descriptor], endpoint).await
    }

    /// Builds every job first, then submits them one by one. A length
    /// mismatch or bad range fails before anything is submitted.
    pub async fn create_and_submit_multiple(
        &self,
        locations: &[LatLon],
        labels: &[String],
        start_date: NaiveDate,
        end_date: NaiveDate,
        endpoint: Endpoint,
    ) -> Result<Vec<JobHandle>, AwhereError> {
        let descriptors = build_multiple(locations, labels, start_date, end_date)?;
        self.submit_all(&descriptors, endpoint).await
    }

    /// Waits for `handles` and merges their results in handle order.
    pub async fn aggregate(
        &self,
        handles: &[JobHandle],
        cancel: &CancellationToken,
    ) -> Result<ResultSet, AwhereError> {
        Ok(
            ResultAggregator::new(&self.jobs, self.config.poll_options())
                .with_concurrency(self.config.concurrency())
                .aggregate(handles, cancel)
                .await?,
        )
    }

    /// Full pipeline for one location: split the range, submit one batch
    /// job, wait for it, flatten it.
    ///
    /// Optional builder arguments:
    /// * `.endpoint(Endpoint)`: defaults to [`Endpoint::Current`].
    /// * `.cancel(CancellationToken)`: stops polling when cancelled.
    #[builder]
    pub async fn fetch_data_single(
        &self,
        location: LatLon,
        label: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
        endpoint: Option<Endpoint>,
        cancel: Option<CancellationToken>,
    ) -> Result<ResultSet, AwhereError> {
        let handles = self
            .create_and_submit_single(
                location,
                label,
                start_date,
                end_date,
                endpoint.unwrap_or_default(),
            )
            .await?;
        self.aggregate(&handles, &cancel.unwrap_or_default()).await
    }

    /// Full pipeline for many locations: one batch job per location, all
    /// submitted before any is polled. Records come back in location order.
    #[builder]
    pub async fn fetch_data_multiple(
        &self,
        locations: &[LatLon],
        labels: &[String],
        start_date: NaiveDate,
        end_date: NaiveDate,
        endpoint: Option<Endpoint>,
        cancel: Option<CancellationToken>,
    ) -> Result<ResultSet, AwhereError> {
        let handles = self
            .create_and_submit_multiple(
                locations,
                labels,
                start_date,
                end_date,
                endpoint.unwrap_or_default(),
            )
            .await?;
        self.aggregate(&handles, &cancel.unwrap_or_default()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::token_provider::StaticTokenProvider;
    use crate::batch::test_support::{failed_result, observation, success_result};
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{method, path, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn client(server: &MockServer) -> Awhere {
        let config = AwhereConfig::builder()
            .key("k")
            .secret("s")
            .weather_url(format!("{}/v2/weather/locations", server.uri()))
            .jobs_url(format!("{}/v2/jobs", server.uri()))
            .poll_interval(Duration::from_millis(10))
            .max_polls(50)
            .build();
        Awhere::with_token_provider(config, Arc::new(StaticTokenProvider::new("tok")))
    }

    #[tokio::test]
    async fn test_single_call_url() -> Result<(), AwhereError> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(
                "/v2/weather/locations/9.03,38.74/observations/2020-01-01,2020-01-31/",
            ))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "observations": [observation("2020-01-01")] })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let body = client(&server)
            .single_call(LatLon(9.03, 38.74), date(2020, 1, 1), date(2020, 1, 31))
            .await?;
        assert_eq!(body["observations"].as_array().map(Vec::len), Some(1));
        Ok(())
    }

    #[tokio::test]
    async fn test_norms_call_url() -> Result<(), AwhereError> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(
                "/v2/weather/locations/9.03,38.74/norms/01-01,01-31/years/2010,2015/",
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "norms": [] })))
            .expect(1)
            .mount(&server)
            .await;

        client(&server)
            .norms_call(LatLon(9.03, 38.74), "01-01", "01-31", 2010, 2015)
            .await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_fetch_observations_single_windows_the_range() -> Result<(), AwhereError> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path_regex(r"^/v2/weather/locations/1,2/observations/.*"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "observations": [observation("2020-01-01")] })),
            )
            .expect(2)
            .mount(&server)
            .await;

        let records = client(&server)
            .fetch_observations_single()
            .location(LatLon(1.0, 2.0))
            .title("here")
            .start_date(date(2020, 1, 1))
            .end_date(date(2020, 5, 10))
            .call()
            .await?;
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.title == "here"));
        Ok(())
    }

    #[tokio::test]
    async fn test_fetch_data_multiple_end_to_end() -> Result<(), AwhereError> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/jobs"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "jobId": 11 })))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v2/jobs"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "jobId": 12 })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v2/jobs/11"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jobId": 11,
                "jobStatus": "Done",
                "results": [success_result("a", &["2020-01-01", "2020-01-02"])]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v2/jobs/12"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jobId": 12,
                "jobStatus": "Done",
                "results": [failed_result(404, "/v2/weather/locations/3,4/observations")]
            })))
            .mount(&server)
            .await;

        let result = client(&server)
            .fetch_data_multiple()
            .locations(&[LatLon(1.0, 2.0), LatLon(3.0, 4.0)])
            .labels(&["a".to_string(), "b".to_string()])
            .start_date(date(2020, 1, 1))
            .end_date(date(2020, 1, 2))
            .call()
            .await?;

        assert_eq!(result.records.len(), 2);
        assert!(result.records.iter().all(|r| r.title == "a"));
        assert_eq!(result.failures.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_length_mismatch_submits_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "jobId": 1 })))
            .expect(0)
            .mount(&server)
            .await;

        let err = client(&server)
            .create_and_submit_multiple(
                &[LatLon(1.0, 2.0)],
                &[],
                date(2020, 1, 1),
                date(2020, 1, 2),
                Endpoint::Current,
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AwhereError::Batch(BatchError::LengthMismatch { .. })
        ));
    }
}
