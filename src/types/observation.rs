//! Flat observation rows and the result set assembled from them.

use chrono::NaiveDate;
use polars::prelude::*;
use std::fmt;

use crate::types::date_window::AWHERE_DATE_FORMAT;

/// Column names of the observation table, in output order. `title` is the
/// location label column; writers may rename it.
pub const OBSERVATION_COLUMNS: [&str; 11] = [
    "date",
    "title",
    "precipitation",
    "solar",
    "humid_max",
    "humid_min",
    "wind_avg",
    "temp_max",
    "temp_min",
    "latitude",
    "longitude",
];

/// One day of weather at one location.
///
/// Measurements the provider reported as `null` are `None`; a measurement
/// that is absent altogether never produces a record (see
/// [`crate::BatchError::MissingField`]).
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationRecord {
    pub date: NaiveDate,
    /// Label of the location this row belongs to.
    pub title: String,
    pub precipitation: Option<f64>,
    pub solar: Option<f64>,
    pub humid_max: Option<f64>,
    pub humid_min: Option<f64>,
    pub wind_avg: Option<f64>,
    pub temp_max: Option<f64>,
    pub temp_min: Option<f64>,
    pub latitude: f64,
    pub longitude: f64,
}

/// Reference (the provider's self link) to a sub-query that came back with a
/// non-200 status.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FailedQueryRef(pub String);

impl fmt::Display for FailedQueryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Records and failures of every processed job, in job submission order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    pub records: Vec<ObservationRecord>,
    pub failures: Vec<FailedQueryRef>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one job's contribution.
    pub fn extend(&mut self, records: Vec<ObservationRecord>, failures: Vec<FailedQueryRef>) {
        self.records.extend(records);
        self.failures.extend(failures);
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Builds the observation table, naming the location label column
    /// `label_column` (`"title"` keeps the provider's name).
    ///
    /// Dates are written as `YYYY-MM-DD` strings.
    pub fn to_dataframe(&self, label_column: &str) -> PolarsResult<DataFrame> {
        let rows = &self.records;
        let floats = |get: fn(&ObservationRecord) -> Option<f64>| -> Vec<Option<f64>> {
            rows.iter().map(get).collect()
        };

        df!(
            OBSERVATION_COLUMNS[0] => rows
                .iter()
                .map(|r| r.date.format(AWHERE_DATE_FORMAT).to_string())
                .collect::<Vec<_>>(),
            label_column => rows.iter().map(|r| r.title.clone()).collect::<Vec<_>>(),
            OBSERVATION_COLUMNS[2] => floats(|r| r.precipitation),
            OBSERVATION_COLUMNS[3] => floats(|r| r.solar),
            OBSERVATION_COLUMNS[4] => floats(|r| r.humid_max),
            OBSERVATION_COLUMNS[5] => floats(|r| r.humid_min),
            OBSERVATION_COLUMNS[6] => floats(|r| r.wind_avg),
            OBSERVATION_COLUMNS[7] => floats(|r| r.temp_max),
            OBSERVATION_COLUMNS[8] => floats(|r| r.temp_min),
            OBSERVATION_COLUMNS[9] => rows.iter().map(|r| r.latitude).collect::<Vec<_>>(),
            OBSERVATION_COLUMNS[10] => rows.iter().map(|r| r.longitude).collect::<Vec<_>>()
        )
    }
}
