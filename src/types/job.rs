//! Batch job descriptors sent to the provider and the handles it returns.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One call inside a batch job: a single observations query for one location
/// and one [`crate::DateWindow`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubRequest {
    /// Unique within its batch job: `id_{lat}_{lon}_{label}_{window start}`.
    pub full_title: String,
    /// The location label; flattened records carry it as their `title`.
    pub title: String,
    /// Provider call descriptor, e.g.
    /// `GET /v2/weather/locations/9.03,38.74/observations/2020-01-01,2020-04-29/?limit=120`.
    pub api: String,
}

/// Everything submitted as one batch job. One descriptor per location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchJobDescriptor {
    pub title: String,
    pub requests: Vec<SubRequest>,
}

/// Wire form of a [`BatchJobDescriptor`].
#[derive(Debug, Serialize)]
pub struct BatchPayload<'a> {
    title: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    requests: &'a [SubRequest],
}

impl BatchJobDescriptor {
    /// The JSON body of a job submission: `{title, type: "batch", requests}`.
    pub fn payload(&self) -> BatchPayload<'_> {
        BatchPayload {
            title: &self.title,
            kind: "batch",
            requests: &self.requests,
        }
    }
}

/// Opaque job identifier returned by a submission.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobHandle {
    job_id: String,
}

impl JobHandle {
    pub fn new(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }
}

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.job_id)
    }
}

/// Status of a submitted job as reported in the `jobStatus` field.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum JobStatus {
    Queued,
    Running,
    /// Terminal: results are embedded in the status payload.
    Done,
    /// Terminal: the provider gave up on the job.
    Failed(String),
    /// Any status the provider adds later; treated as still in progress.
    Other(String),
}

impl JobStatus {
    pub fn is_done(&self) -> bool {
        matches!(self, JobStatus::Done)
    }
}

impl From<String> for JobStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Queued" => JobStatus::Queued,
            "Running" | "In Progress" | "Processing" => JobStatus::Running,
            "Done" => JobStatus::Done,
            "Failed" | "Error" | "Cancelled" | "Canceled" => JobStatus::Failed(value),
            _ => JobStatus::Other(value),
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Queued => f.write_str("Queued"),
            JobStatus::Running => f.write_str("Running"),
            JobStatus::Done => f.write_str("Done"),
            JobStatus::Failed(raw) | JobStatus::Other(raw) => f.write_str(raw),
        }
    }
}

/// Which jobs endpoint a batch is submitted to.
///
/// The legacy endpoint takes the payload as a plain-text body; the current one
/// takes it as JSON. Both answer with the same `jobId` response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Endpoint {
    Legacy,
    #[default]
    Current,
}
