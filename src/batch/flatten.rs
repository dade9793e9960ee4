//! Flattens provider responses into [`ObservationRecord`] rows.
//!
//! A batch job's results are a list of sub-results, each tagged with an
//! `httpStatus`. Successful ones wrap an observation list under
//! `payload.observations`; failed ones only carry a self link. A single
//! observations call returns the observation list at the top level. Both
//! shapes are adapted into [`SubResult`]s and go through the same field
//! extraction.
//!
//! Extraction is strict: an absent field aborts flattening with
//! [`BatchError::MissingField`] instead of producing a partially filled row.
//! A measurement explicitly reported as `null` is kept as `None`.

use crate::batch::error::BatchError;
use crate::types::date_window::AWHERE_DATE_FORMAT;
use crate::types::observation::{FailedQueryRef, ObservationRecord};
use chrono::NaiveDate;
use log::warn;
use serde_json::Value;
use std::fmt;

/// One sub-query outcome, independent of how deeply it was nested.
#[derive(Debug, Clone, PartialEq)]
pub enum SubResult<'a> {
    Success {
        title: &'a str,
        observations: &'a [Value],
    },
    Failure(FailedQueryRef),
}

/// Flattens the final status payload of a batch job.
///
/// Records and failures keep the order of the `results` array.
pub fn flatten_batch(
    payload: &Value,
) -> Result<(Vec<ObservationRecord>, Vec<FailedQueryRef>), BatchError> {
    let sub_results = array_field(payload, "results", "job payload")?
        .iter()
        .enumerate()
        .map(|(i, result)| batch_sub_result(result, i))
        .collect::<Result<Vec<_>, _>>()?;
    flatten_sub_results(sub_results)
}

/// Flattens the response of a single observations call. Every record gets
/// `title` as its location label.
pub fn flatten_single(title: &str, payload: &Value) -> Result<Vec<ObservationRecord>, BatchError> {
    let observations = array_field(payload, "observations", "observations response")?;
    let (records, _) = flatten_sub_results([SubResult::Success {
        title,
        observations,
    }])?;
    Ok(records)
}

/// Extracts records from every success and collects every failure.
pub fn flatten_sub_results<'a>(
    sub_results: impl IntoIterator<Item = SubResult<'a>>,
) -> Result<(Vec<ObservationRecord>, Vec<FailedQueryRef>), BatchError> {
    let mut records = Vec::new();
    let mut failures = Vec::new();
    for sub_result in sub_results {
        match sub_result {
            SubResult::Success {
                title,
                observations,
            } => {
                records.reserve(observations.len());
                for (index, observation) in observations.iter().enumerate() {
                    let context = ObservationContext { title, index };
                    records.push(extract_record(title, observation, &context)?);
                }
            }
            SubResult::Failure(link) => {
                warn!("{} failed", link);
                failures.push(link);
            }
        }
    }
    Ok((records, failures))
}

fn batch_sub_result(result: &Value, index: usize) -> Result<SubResult<'_>, BatchError> {
    let context = format!("result {}", index);
    let status = lookup(result, &["httpStatus"], &context)?;
    let status = status.as_u64().ok_or_else(|| malformed("httpStatus", &context, status))?;

    if status == 200 {
        Ok(SubResult::Success {
            title: str_field(result, "title", &context)?,
            observations: lookup(result, &["payload", "observations"], &context)?
                .as_array()
                .map(Vec::as_slice)
                .ok_or_else(|| {
                    malformed("payload.observations", &context, &result["payload"]["observations"])
                })?,
        })
    } else {
        Ok(SubResult::Failure(self_link(result, &context)?))
    }
}

/// The self link may be a bare string or a HAL-style `{ "href": ... }`.
fn self_link(result: &Value, context: &str) -> Result<FailedQueryRef, BatchError> {
    let link = lookup(result, &["payload", "_links", "self"], context)?;
    let text = match link {
        Value::String(s) => s.clone(),
        Value::Object(map) => match map.get("href") {
            Some(Value::String(href)) => href.clone(),
            _ => link.to_string(),
        },
        other => other.to_string(),
    };
    Ok(FailedQueryRef(text))
}

struct ObservationContext<'a> {
    title: &'a str,
    index: usize,
}

impl fmt::Display for ObservationContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "observation {} of '{}'", self.index, self.title)
    }
}

fn extract_record(
    title: &str,
    obs: &Value,
    context: &ObservationContext<'_>,
) -> Result<ObservationRecord, BatchError> {
    let date_value = lookup(obs, &["date"], context)?;
    let date = date_value
        .as_str()
        .and_then(|s| NaiveDate::parse_from_str(s, AWHERE_DATE_FORMAT).ok())
        .ok_or_else(|| malformed("date", context, date_value))?;

    Ok(ObservationRecord {
        date,
        title: title.to_string(),
        precipitation: measurement(obs, &["precipitation", "amount"], context)?,
        solar: measurement(obs, &["solar", "amount"], context)?,
        humid_max: measurement(obs, &["relativeHumidity", "max"], context)?,
        humid_min: measurement(obs, &["relativeHumidity", "min"], context)?,
        wind_avg: measurement(obs, &["wind", "average"], context)?,
        temp_max: measurement(obs, &["temperatures", "max"], context)?,
        temp_min: measurement(obs, &["temperatures", "min"], context)?,
        latitude: coordinate(obs, &["location", "latitude"], context)?,
        longitude: coordinate(obs, &["location", "longitude"], context)?,
    })
}

fn measurement<C: fmt::Display + ?Sized>(
    obs: &Value,
    path: &[&str],
    context: &C,
) -> Result<Option<f64>, BatchError> {
    match lookup(obs, path, context)? {
        Value::Null => Ok(None),
        value => value
            .as_f64()
            .map(Some)
            .ok_or_else(|| malformed(&path.join("."), context, value)),
    }
}

fn coordinate<C: fmt::Display + ?Sized>(
    obs: &Value,
    path: &[&str],
    context: &C,
) -> Result<f64, BatchError> {
    let value = lookup(obs, path, context)?;
    value
        .as_f64()
        .ok_or_else(|| malformed(&path.join("."), context, value))
}

/// Walks `path` through nested objects.
fn lookup<'v, C: fmt::Display + ?Sized>(
    value: &'v Value,
    path: &[&str],
    context: &C,
) -> Result<&'v Value, BatchError> {
    path.iter()
        .try_fold(value, |current, key| current.get(*key))
        .ok_or_else(|| BatchError::MissingField {
            path: path.join("."),
            context: context.to_string(),
        })
}

pub(crate) fn str_field<'v>(
    value: &'v Value,
    key: &str,
    context: impl fmt::Display,
) -> Result<&'v str, BatchError> {
    let field = lookup(value, &[key], &context)?;
    field.as_str().ok_or_else(|| malformed(key, &context, field))
}

fn array_field<'v>(
    value: &'v Value,
    key: &str,
    context: impl fmt::Display,
) -> Result<&'v [Value], BatchError> {
    let field = lookup(value, &[key], &context)?;
    field
        .as_array()
        .map(Vec::as_slice)
        .ok_or_else(|| malformed(key, &context, field))
}

fn malformed<C: fmt::Display + ?Sized>(path: &str, context: &C, value: &Value) -> BatchError {
    BatchError::MalformedField {
        path: path.to_string(),
        context: context.to_string(),
        value: value.to_string(),
    }
}
