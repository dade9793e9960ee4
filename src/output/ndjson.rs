//! Export of pulled weather CSVs as gzip-compressed newline-delimited JSON,
//! one object per location, date and weather field.

use crate::locations::{
    load_woreda_mapped, GEO_KEY_COLUMN, LAT_COLUMN, LON_COLUMN, REGION_COLUMN, WOREDA_COLUMN,
    ZONE_COLUMN,
};
use crate::output::csv::{parse_number, read_text_csv, text_column};
use crate::output::error::OutputError;
use async_compression::tokio::write::GzipEncoder;
use log::{debug, info};
use polars::prelude::DataFrame;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tokio::task;

pub const JSON_FILE_NAME: &str = "weather.json.gz";
pub const SOURCE: &str = "weather";

/// Weather columns exported, in output order.
pub const FIELDS: [&str; 7] = [
    "precipitation",
    "humid_max",
    "humid_min",
    "solar",
    "temp_max",
    "temp_min",
    "wind_avg",
];

const DATE_COLUMN: &str = "date";

/// Serialized field order is the output key order.
#[derive(Debug, Serialize)]
struct WeatherLine<'a> {
    #[serde(rename = "Real_Date")]
    real_date: &'a str,
    #[serde(rename = "RegionName")]
    region_name: &'a str,
    #[serde(rename = "ZoneName")]
    zone_name: &'a str,
    #[serde(rename = "WoredaName")]
    woreda_name: &'a str,
    #[serde(rename = "WoredaLat")]
    woreda_lat: f64,
    #[serde(rename = "WoredaLon")]
    woreda_lon: f64,
    source: &'static str,
    field: &'a str,
    val: f64,
}

#[derive(Debug, Clone)]
struct WoredaNames {
    region: String,
    zone: String,
    woreda: String,
    lat: Option<String>,
    lon: Option<String>,
}

type WoredaIndex = HashMap<String, Vec<WoredaNames>>;

fn index_by_geo_key(df: &DataFrame, path: &Path) -> Result<WoredaIndex, OutputError> {
    let keys = text_column(df, GEO_KEY_COLUMN, path)?;
    let regions = text_column(df, REGION_COLUMN, path)?;
    let zones = text_column(df, ZONE_COLUMN, path)?;
    let woredas = text_column(df, WOREDA_COLUMN, path)?;
    let lats = text_column(df, LAT_COLUMN, path)?;
    let lons = text_column(df, LON_COLUMN, path)?;

    let mut index = WoredaIndex::new();
    for i in 0..df.height() {
        let names = WoredaNames {
            region: regions.get(i).unwrap_or_default().to_string(),
            zone: zones.get(i).unwrap_or_default().to_string(),
            woreda: woredas.get(i).unwrap_or_default().to_string(),
            lat: lats.get(i).map(str::to_string),
            lon: lons.get(i).map(str::to_string),
        };
        index
            .entry(keys.get(i).unwrap_or_default().to_string())
            .or_default()
            .push(names);
    }
    Ok(index)
}

/// Renders the rows of one weather CSV that join with the woreda index.
/// Returns the encoded lines and how many there are.
fn render_weather_csv(
    csv_path: &Path,
    index: &WoredaIndex,
    mapped_path: &Path,
) -> Result<(Vec<u8>, usize), OutputError> {
    let df = read_text_csv(csv_path)?;
    let dates = text_column(&df, DATE_COLUMN, csv_path)?;
    let keys = text_column(&df, GEO_KEY_COLUMN, csv_path)?;
    let fields = FIELDS
        .iter()
        .map(|field| Ok((*field, text_column(&df, field, csv_path)?)))
        .collect::<Result<Vec<_>, OutputError>>()?;

    let mut buf = Vec::new();
    let mut count = 0;
    for row in 0..df.height() {
        let Some(matches) = keys.get(row).and_then(|key| index.get(key)) else {
            continue;
        };
        let date = dates.get(row).unwrap_or_default();
        for names in matches {
            let lat = parse_number(names.lat.as_deref(), LAT_COLUMN, mapped_path)?;
            let lon = parse_number(names.lon.as_deref(), LON_COLUMN, mapped_path)?;
            for (field, column) in &fields {
                let raw = match column.get(row) {
                    Some(raw) if !raw.trim().is_empty() => raw,
                    _ => continue,
                };
                let line = WeatherLine {
                    real_date: date,
                    region_name: &names.region,
                    zone_name: &names.zone,
                    woreda_name: &names.woreda,
                    woreda_lat: lat,
                    woreda_lon: lon,
                    source: SOURCE,
                    field,
                    val: parse_number(Some(raw), field, csv_path)?,
                };
                serde_json::to_writer(&mut buf, &line)?;
                buf.push(b'\n');
                count += 1;
            }
        }
    }
    Ok((buf, count))
}

async fn list_csv_files(dir: &Path) -> Result<Vec<PathBuf>, OutputError> {
    let mut entries = fs::read_dir(dir)
        .await
        .map_err(|e| OutputError::DirRead(dir.to_path_buf(), e))?;
    let mut files = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| OutputError::DirRead(dir.to_path_buf(), e))?
    {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "csv") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Joins every `*.csv` in `weather_dir` with the name-matched woreda table
/// on `GeoKey` and writes `weather.json.gz` into `output_dir`.
///
/// Each line is one JSON object with the keys `Real_Date`, `RegionName`,
/// `ZoneName`, `WoredaName`, `WoredaLat`, `WoredaLon`, `source`, `field`,
/// `val`. Empty weather values produce no line. Returns the written path.
pub async fn write_weather_json(
    woreda_mapped_path: &Path,
    weather_dir: &Path,
    output_dir: &Path,
) -> Result<PathBuf, OutputError> {
    let mapped_path = Arc::new(woreda_mapped_path.to_path_buf());
    let index = {
        let mapped_path = Arc::clone(&mapped_path);
        task::spawn_blocking(move || {
            let df = load_woreda_mapped(&mapped_path)?;
            index_by_geo_key(&df, &mapped_path)
        })
        .await??
    };
    let index = Arc::new(index);

    let out_path = output_dir.join(JSON_FILE_NAME);
    let file = File::create(&out_path)
        .await
        .map_err(|e| OutputError::Io(out_path.clone(), e))?;
    let mut encoder = GzipEncoder::new(file);

    let mut total = 0;
    for csv_path in list_csv_files(weather_dir).await? {
        let index = Arc::clone(&index);
        let mapped_path = Arc::clone(&mapped_path);
        let (lines, count) = task::spawn_blocking(move || {
            render_weather_csv(&csv_path, &index, &mapped_path).map(|(lines, count)| {
                debug!("{}: {} records", csv_path.display(), count);
                (lines, count)
            })
        })
        .await??;
        encoder
            .write_all(&lines)
            .await
            .map_err(|e| OutputError::Io(out_path.clone(), e))?;
        total += count;
    }
    encoder
        .shutdown()
        .await
        .map_err(|e| OutputError::Io(out_path.clone(), e))?;

    info!("Wrote {} records to {}", total, out_path.display());
    Ok(out_path)
}
