//! Turns locations and a date range into submittable batch job descriptors.

use crate::batch::error::BatchError;
use crate::types::date_window::{window, AWHERE_DATE_FORMAT, QUERY_MAX};
use crate::types::job::{BatchJobDescriptor, SubRequest};
use crate::types::location::LatLon;
use chrono::NaiveDate;

/// Path of the observations resource on the provider, relative to the host.
const OBSERVATIONS_PATH: &str = "/v2/weather/locations";

/// Builds the batch job for one location: one [`SubRequest`] per
/// [`QUERY_MAX`]-day window of `[start_date, end_date]`.
///
/// The job takes the `full_title` of its first sub-request as its title.
///
/// # Errors
///
/// Returns [`BatchError::InvalidRange`] if `start_date > end_date`.
pub fn build_single(
    location: LatLon,
    label: &str,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<BatchJobDescriptor, BatchError> {
    let name = format!("id_{}_{}_{}", location.0, location.1, label);

    let requests: Vec<SubRequest> = window(start_date, end_date, QUERY_MAX)?
        .iter()
        .map(|w| {
            let start = w.start().format(AWHERE_DATE_FORMAT);
            SubRequest {
                full_title: format!("{}_{}", name, start),
                title: label.to_string(),
                api: format!(
                    "GET {}/{}/observations/{}/?limit={}",
                    OBSERVATIONS_PATH, location, w, QUERY_MAX
                ),
            }
        })
        .collect();

    let title = requests
        .first()
        .map(|r| r.full_title.clone())
        .unwrap_or(name);
    Ok(BatchJobDescriptor { title, requests })
}

/// Builds one batch job per `(location, label)` pair, in input order.
///
/// # Errors
///
/// Returns [`BatchError::LengthMismatch`] if the two slices differ in length,
/// and [`BatchError::InvalidRange`] if `start_date > end_date`. Nothing is
/// returned on error.
pub fn build_multiple<S: AsRef<str>>(
    locations: &[LatLon],
    labels: &[S],
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<Vec<BatchJobDescriptor>, BatchError> {
    if locations.len() != labels.len() {
        return Err(BatchError::LengthMismatch {
            locations: locations.len(),
            labels: labels.len(),
        });
    }
    locations
        .iter()
        .zip(labels)
        .map(|(location, label)| build_single(*location, label.as_ref(), start_date, end_date))
        .collect()
}
