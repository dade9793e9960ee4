//! In-memory job source and payload builders shared by the batch tests.

use crate::batch::error::BatchError;
use crate::batch::poller::JobStatusSource;
use crate::types::job::JobHandle;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Mutex;

enum Outcome {
    Done(Value),
    Failed(&'static str),
    Raw(Value),
}

struct Script {
    pending: u32,
    outcome: Outcome,
    polls: u32,
}

/// Jobs that stay `Running` for a fixed number of polls, then finish.
#[derive(Default)]
pub struct ScriptedJobs {
    scripts: Mutex<HashMap<String, Script>>,
}

impl ScriptedJobs {
    pub fn new() -> Self {
        Self::default()
    }

    fn with(self, job_id: &str, pending: u32, outcome: Outcome) -> Self {
        self.scripts.lock().unwrap().insert(
            job_id.to_string(),
            Script {
                pending,
                outcome,
                polls: 0,
            },
        );
        self
    }

    /// Done after `pending` non-terminal polls, with `results` as its results.
    pub fn job(self, job_id: &str, pending: u32, results: Value) -> Self {
        self.with(job_id, pending, Outcome::Done(results))
    }

    pub fn failing_job(self, job_id: &str, pending: u32, status: &'static str) -> Self {
        self.with(job_id, pending, Outcome::Failed(status))
    }

    /// Always answers with `payload`.
    pub fn raw_job(self, job_id: &str, payload: Value) -> Self {
        self.with(job_id, 0, Outcome::Raw(payload))
    }

    pub fn polls(&self, job_id: &str) -> u32 {
        self.scripts
            .lock()
            .unwrap()
            .get(job_id)
            .map_or(0, |s| s.polls)
    }
}

#[async_trait]
impl JobStatusSource for ScriptedJobs {
    async fn job_status(&self, handle: &JobHandle) -> Result<Value, BatchError> {
        let mut scripts = self.scripts.lock().unwrap();
        let script = scripts
            .get_mut(handle.job_id())
            .ok_or_else(|| BatchError::JobFailed {
                job_id: handle.job_id().to_string(),
                status: "unknown job".to_string(),
            })?;
        script.polls += 1;
        if script.polls <= script.pending {
            return Ok(json!({ "jobId": handle.job_id(), "jobStatus": "Running" }));
        }
        Ok(match &script.outcome {
            Outcome::Done(results) => {
                json!({ "jobId": handle.job_id(), "jobStatus": "Done", "results": results })
            }
            Outcome::Failed(status) => json!({ "jobId": handle.job_id(), "jobStatus": status }),
            Outcome::Raw(payload) => payload.clone(),
        })
    }
}

/// A complete observation day as the provider returns it.
pub fn observation(date: &str) -> Value {
    json!({
        "date": date,
        "location": { "latitude": 9.03, "longitude": 38.74, "fieldId": null },
        "precipitation": { "amount": 1.25, "units": "mm" },
        "solar": { "amount": 5000.0, "units": "Wh/m^2" },
        "relativeHumidity": { "average": 60.0, "max": 95.0, "min": 30.0 },
        "wind": { "morningMax": 4.0, "dayMax": 6.0, "average": 2.5, "units": "m/sec" },
        "temperatures": { "max": 28.0, "min": 12.0, "units": "C" }
    })
}

/// A successful batch sub-result with one observation per date.
pub fn success_result(title: &str, dates: &[&str]) -> Value {
    json!({
        "httpStatus": 200,
        "title": title,
        "payload": {
            "observations": dates.iter().map(|d| observation(d)).collect::<Vec<_>>()
        }
    })
}

pub fn failed_result(status: u16, self_link: &str) -> Value {
    json!({
        "httpStatus": status,
        "payload": {
            "statusCode": status,
            "_links": { "self": { "href": self_link } }
        }
    })
}
