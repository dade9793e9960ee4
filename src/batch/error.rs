use crate::auth::error::AuthError;
use chrono::NaiveDate;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("Start date {start} is after end date {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("Query window size must be at least one day")]
    InvalidWindowSize,

    #[error("Got {locations} locations but {labels} labels")]
    LengthMismatch { locations: usize, labels: usize },

    #[error("Job submission to {url} was rejected with status {status}: {body}")]
    SubmissionRejected {
        url: String,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Job submission response from {url} has no jobId")]
    MissingJobId { url: String },

    #[error("Failed to encode job payload")]
    PayloadEncode(#[source] serde_json::Error),

    #[error("Field '{path}' is missing from {context}")]
    MissingField { path: String, context: String },

    #[error("Field '{path}' in {context} has an unexpected value: {value}")]
    MalformedField {
        path: String,
        context: String,
        value: String,
    },

    #[error("Job {job_id} ended with status '{status}'")]
    JobFailed { job_id: String, status: String },

    #[error("Job {job_id} was not done after {polls} polls ({waited:?})")]
    PollLimitExceeded {
        job_id: String,
        polls: u32,
        waited: Duration,
    },

    #[error("Polling of job {job_id} was cancelled")]
    Cancelled { job_id: String },

    #[error("Network request failed for {0}")]
    NetworkRequest(String, #[source] reqwest::Error),

    #[error("HTTP request failed for {url} with status {status}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to decode response from {0}")]
    ResponseDecode(String, #[source] reqwest::Error),

    #[error(transparent)]
    Auth(#[from] AuthError),
}
