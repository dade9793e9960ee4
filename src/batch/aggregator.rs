//! Drives polling and flattening over every submitted job and merges the
//! results.

use crate::batch::error::BatchError;
use crate::batch::flatten::flatten_batch;
use crate::batch::poller::{JobPoller, JobProgress, JobStatusSource, PollOptions};
use crate::types::job::JobHandle;
use crate::types::observation::ResultSet;
use futures_util::stream::{self, StreamExt};
use log::{info, warn};
use tokio_util::sync::CancellationToken;

/// Waits for a list of jobs and merges their flattened results.
///
/// With the default concurrency of 1 jobs are polled strictly one after the
/// other. Higher values poll that many jobs at once; results are still merged
/// in submission order, so the output does not depend on which job finishes
/// first.
pub struct ResultAggregator<'a> {
    source: &'a dyn JobStatusSource,
    options: PollOptions,
    concurrency: usize,
}

impl<'a> ResultAggregator<'a> {
    pub fn new(source: &'a dyn JobStatusSource, options: PollOptions) -> Self {
        Self {
            source,
            options,
            concurrency: 1,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Polls every handle to completion, flattens it and appends its records
    /// and failures to the result, in the order of `handles`.
    ///
    /// The first error aborts the whole aggregation; no partial result is
    /// returned.
    pub async fn aggregate(
        &self,
        handles: &[JobHandle],
        cancel: &CancellationToken,
    ) -> Result<ResultSet, BatchError> {
        let total = handles.len();
        let poller = JobPoller::new(self.source, self.options);
        let poller = &poller;

        let mut outcomes = stream::iter(handles.iter().enumerate())
            .map(|(index, handle)| async move {
                let payload = poller
                    .poll_until_done(handle, Some(JobProgress { index, total }), cancel)
                    .await?;
                let flattened = flatten_batch(&payload)?;
                info!("Completed jobId: {}", handle);
                Ok::<_, BatchError>(flattened)
            })
            .buffered(self.concurrency);

        let mut result = ResultSet::new();
        while let Some(outcome) = outcomes.next().await {
            let (records, failures) = outcome?;
            result.extend(records, failures);
        }

        if result.has_failures() {
            warn!(
                "{} of the queries failed: {:?}",
                result.failures.len(),
                result.failures
            );
        }
        Ok(result)
    }
}
