//! Waits for a submitted job to finish.
//!
//! A job is polled at a fixed interval until the provider reports `Done`
//! (success) or a failure status. The wait can be bounded with
//! [`PollOptions::max_polls`] and stopped early through a
//! [`CancellationToken`]; without either it lasts as long as the provider keeps
//! the job pending.

use crate::batch::error::BatchError;
use crate::batch::flatten::str_field;
use crate::types::job::{JobHandle, JobStatus};
use async_trait::async_trait;
use log::info;
use serde_json::Value;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Default pause between two status requests for the same job.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Anything that can report the current status payload of a job.
#[async_trait]
pub trait JobStatusSource: Send + Sync {
    /// Returns the raw status payload. It carries `jobStatus` and, once the
    /// job is done, `results`.
    async fn job_status(&self, handle: &JobHandle) -> Result<Value, BatchError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    pub interval: Duration,
    /// Give up after this many status requests. `None` waits indefinitely.
    pub max_polls: Option<u32>,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_polls: None,
        }
    }
}

/// Position of a job within the batch being processed, for progress logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobProgress {
    /// Zero-based.
    pub index: usize,
    pub total: usize,
}

pub struct JobPoller<'a> {
    source: &'a dyn JobStatusSource,
    options: PollOptions,
}

impl<'a> JobPoller<'a> {
    pub fn new(source: &'a dyn JobStatusSource, options: PollOptions) -> Self {
        Self { source, options }
    }

    /// Polls `handle` until it is done and returns the final status payload.
    ///
    /// # Errors
    ///
    /// * [`BatchError::JobFailed`] when the provider reports a failure status.
    /// * [`BatchError::PollLimitExceeded`] after `max_polls` requests without `Done`.
    /// * [`BatchError::Cancelled`] once `cancel` fires.
    /// * [`BatchError::MissingField`] if a payload has no `jobStatus`.
    /// * Any error of the status request itself.
    pub async fn poll_until_done(
        &self,
        handle: &JobHandle,
        progress: Option<JobProgress>,
        cancel: &CancellationToken,
    ) -> Result<Value, BatchError> {
        let mut polls: u32 = 0;
        let mut waited = Duration::ZERO;

        loop {
            if cancel.is_cancelled() {
                return Err(BatchError::Cancelled {
                    job_id: handle.job_id().to_string(),
                });
            }

            let payload = self.source.job_status(handle).await?;
            let status = JobStatus::from(str_field(&payload, "jobStatus", "job status")?.to_string());
            polls += 1;

            info!(
                "Job status: {}. Job timer: {} seconds.",
                status,
                waited.as_secs()
            );
            if let Some(p) = progress {
                info!("On job {} out of {}", p.index + 1, p.total);
            }

            match status {
                JobStatus::Done => return Ok(payload),
                JobStatus::Failed(raw) => {
                    return Err(BatchError::JobFailed {
                        job_id: handle.job_id().to_string(),
                        status: raw,
                    })
                }
                JobStatus::Queued | JobStatus::Running | JobStatus::Other(_) => {}
            }

            if self.options.max_polls.is_some_and(|max| polls >= max) {
                return Err(BatchError::PollLimitExceeded {
                    job_id: handle.job_id().to_string(),
                    polls,
                    waited,
                });
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    return Err(BatchError::Cancelled {
                        job_id: handle.job_id().to_string(),
                    });
                }
                _ = tokio::time::sleep(self.options.interval) => {
                    waited += self.options.interval;
                }
            }
        }
    }
}
