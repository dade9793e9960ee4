//! HTTP access to the provider's jobs endpoints: submitting batch jobs and
//! reading their status.

use crate::auth::token_provider::TokenProvider;
use crate::batch::error::BatchError;
use crate::batch::poller::JobStatusSource;
use crate::types::job::{BatchJobDescriptor, Endpoint, JobHandle};
use async_trait::async_trait;
use log::{info, warn};
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use std::sync::Arc;

pub struct JobsApi {
    tokens: Arc<dyn TokenProvider>,
    jobs_url: String,
    legacy_jobs_url: String,
}

impl JobsApi {
    pub fn new(
        tokens: Arc<dyn TokenProvider>,
        jobs_url: impl Into<String>,
        legacy_jobs_url: impl Into<String>,
    ) -> Self {
        Self {
            tokens,
            jobs_url: jobs_url.into(),
            legacy_jobs_url: legacy_jobs_url.into(),
        }
    }

    fn submit_url(&self, endpoint: Endpoint) -> &str {
        match endpoint {
            Endpoint::Legacy => &self.legacy_jobs_url,
            Endpoint::Current => &self.jobs_url,
        }
    }

    /// Submits one batch job and returns its handle. Not retried.
    ///
    /// # Errors
    ///
    /// [`BatchError::SubmissionRejected`] on a non-success status and
    /// [`BatchError::MissingJobId`] when the response has no `jobId`.
    pub async fn submit(
        &self,
        descriptor: &BatchJobDescriptor,
        endpoint: Endpoint,
    ) -> Result<JobHandle, BatchError> {
        let client = self.tokens.get_client().await?;
        let url = self.submit_url(endpoint);

        let request = match endpoint {
            Endpoint::Current => client.post(url).json(&descriptor.payload()),
            Endpoint::Legacy => {
                let body = serde_json::to_string(&descriptor.payload())
                    .map_err(BatchError::PayloadEncode)?;
                client
                    .post(url)
                    .header(CONTENT_TYPE, "text/plain")
                    .body(body)
            }
        };

        let response = request
            .send()
            .await
            .map_err(|e| BatchError::NetworkRequest(url.to_string(), e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Job submission to {} rejected with {}", url, status);
            return Err(BatchError::SubmissionRejected {
                url: url.to_string(),
                status,
                body,
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| BatchError::ResponseDecode(url.to_string(), e))?;
        let job_id = match body.get("jobId") {
            Some(Value::String(id)) => id.clone(),
            Some(Value::Number(id)) => id.to_string(),
            _ => {
                return Err(BatchError::MissingJobId {
                    url: url.to_string(),
                })
            }
        };

        info!(
            "Submitted job {} '{}' with {} requests",
            job_id,
            descriptor.title,
            descriptor.requests.len()
        );
        Ok(JobHandle::new(job_id))
    }
}

#[async_trait]
impl JobStatusSource for JobsApi {
    async fn job_status(&self, handle: &JobHandle) -> Result<Value, BatchError> {
        let client = self.tokens.get_client().await?;
        let url = format!("{}/{}", self.jobs_url, handle.job_id());

        let response = client
            .get(&url)
            .send()
            .await
            .map_err(|e| BatchError::NetworkRequest(url.clone(), e))?;
        let response = response.error_for_status().map_err(|e| match e.status() {
            Some(status) => BatchError::HttpStatus {
                url: url.clone(),
                status,
                source: e,
            },
            None => BatchError::NetworkRequest(url.clone(), e),
        })?;

        response
            .json()
            .await
            .map_err(|e| BatchError::ResponseDecode(url, e))
    }
}
