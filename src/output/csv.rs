//! CSV input and output of weather and location tables.

use crate::locations::GEO_KEY_COLUMN;
use crate::output::error::OutputError;
use crate::types::observation::ResultSet;
use chrono::NaiveDate;
use polars::prelude::*;
use std::path::Path;
use tokio::task;

use crate::types::date_window::AWHERE_DATE_FORMAT;

/// File name of the combined output of a batch run.
pub fn batch_file_name(start: NaiveDate, end: NaiveDate) -> String {
    format!(
        "batch_{}_{}.csv",
        start.format(AWHERE_DATE_FORMAT),
        end.format(AWHERE_DATE_FORMAT)
    )
}

/// File name of the output for one location: its key with spaces replaced.
pub fn location_file_name(geo_key: &str) -> String {
    format!("{}.csv", geo_key.replace(' ', "_"))
}

/// Writes `result` to `path` with the label column named `GeoKey`.
pub async fn write_result_csv(result: &ResultSet, path: &Path) -> Result<(), OutputError> {
    let mut df = result.to_dataframe(GEO_KEY_COLUMN)?;
    let path_buf = path.to_path_buf();
    task::spawn_blocking(move || {
        let file = std::fs::File::create(&path_buf)
            .map_err(|e| OutputError::Io(path_buf.clone(), e))?;
        CsvWriter::new(file)
            .include_header(true)
            .finish(&mut df)
            .map_err(|e| OutputError::CsvWrite(path_buf, e))
    })
    .await?
}

/// Reads a CSV with every column as text so coordinates keep all their
/// digits.
pub(crate) fn read_text_csv(path: &Path) -> Result<DataFrame, OutputError> {
    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .map_err(|e| OutputError::CsvRead(path.to_path_buf(), e))?
        .finish()
        .map_err(|e| OutputError::CsvRead(path.to_path_buf(), e))
}

pub(crate) fn text_column<'a>(
    df: &'a DataFrame,
    name: &str,
    path: &Path,
) -> Result<&'a StringChunked, OutputError> {
    let column = df.column(name).map_err(|e| OutputError::MissingColumn {
        path: path.to_path_buf(),
        column: name.to_string(),
        source: e,
    })?;
    Ok(column.str()?)
}

pub(crate) fn parse_number(
    value: Option<&str>,
    column: &str,
    path: &Path,
) -> Result<f64, OutputError> {
    let raw = value.unwrap_or_default();
    raw.trim()
        .parse()
        .map_err(|_| OutputError::InvalidNumber {
            path: path.to_path_buf(),
            column: column.to_string(),
            value: raw.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::observation::{FailedQueryRef, ObservationRecord};

    fn record(title: &str, day: u32) -> ObservationRecord {
        ObservationRecord {
            date: NaiveDate::from_ymd_opt(2020, 1, day).unwrap(),
            title: title.to_string(),
            precipitation: Some(1.5),
            solar: None,
            humid_max: Some(90.0),
            humid_min: Some(20.0),
            wind_avg: Some(3.0),
            temp_max: Some(25.0),
            temp_min: Some(10.0),
            latitude: 9.03,
            longitude: 38.74,
        }
    }

    #[test]
    fn test_file_names() {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2020, 3, 31).unwrap();
        assert_eq!(batch_file_name(start, end), "batch_2020-01-01_2020-03-31.csv");
        assert_eq!(
            location_file_name("oromia__west shewa__ambo__"),
            "oromia__west_shewa__ambo__.csv"
        );
    }

    #[tokio::test]
    async fn test_write_then_read_as_text() -> Result<(), OutputError> {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let mut result = ResultSet::new();
        result.extend(
            vec![record("a", 1), record("b", 2)],
            vec![FailedQueryRef("/x".into())],
        );

        write_result_csv(&result, &path).await?;

        let df = read_text_csv(&path)?;
        assert_eq!(df.height(), 2);
        let keys: Vec<_> = text_column(&df, GEO_KEY_COLUMN, &path)?
            .into_iter()
            .collect();
        assert_eq!(keys, [Some("a"), Some("b")]);
        let dates = text_column(&df, "date", &path)?;
        assert_eq!(dates.get(1), Some("2020-01-02"));
        assert!(df.column("title").is_err());
        Ok(())
    }

    #[test]
    fn test_parse_number() {
        let path = Path::new("t.csv");
        assert_eq!(parse_number(Some(" 9.0312 "), "lat", path).unwrap(), 9.0312);
        assert!(matches!(
            parse_number(Some("n/a"), "lat", path),
            Err(OutputError::InvalidNumber { .. })
        ));
        assert!(parse_number(None, "lat", path).is_err());
    }
}
