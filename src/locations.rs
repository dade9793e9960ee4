//! Loading the woreda tables that drive a pull and label its output.

use crate::output::csv::{parse_number, read_text_csv, text_column};
use crate::output::error::OutputError;
use crate::types::location::{geo_key, LatLon, Woreda};
use chrono::{Days, NaiveDate};
use log::info;
use polars::prelude::*;
use std::path::Path;

pub const GEO_KEY_COLUMN: &str = "GeoKey";
pub const LAT_COLUMN: &str = "WoredaLat";
pub const LON_COLUMN: &str = "WoredaLon";
pub const REGION_COLUMN: &str = "RegionName";
pub const ZONE_COLUMN: &str = "ZoneName";
pub const WOREDA_COLUMN: &str = "WoredaName";

/// Reads the location table (`WoredaLat`, `WoredaLon`, `GeoKey`), skipping
/// rows without a latitude.
pub fn load_woredas(path: &Path) -> Result<Vec<Woreda>, OutputError> {
    let df = read_text_csv(path)?;
    let lats = text_column(&df, LAT_COLUMN, path)?;
    let lons = text_column(&df, LON_COLUMN, path)?;
    let keys = text_column(&df, GEO_KEY_COLUMN, path)?;

    let mut woredas = Vec::with_capacity(df.height());
    for ((lat, lon), key) in lats.into_iter().zip(lons).zip(keys) {
        let lat = parse_number(lat, LAT_COLUMN, path)?;
        if lat == 0.0 {
            continue;
        }
        let lon = parse_number(lon, LON_COLUMN, path)?;
        woredas.push(Woreda {
            geo_key: key.unwrap_or_default().to_string(),
            lat_lon: LatLon(lat, lon),
        });
    }

    info!(
        "Loaded {} of {} woredas from {}",
        woredas.len(),
        df.height(),
        path.display()
    );
    Ok(woredas)
}

/// Reads the name-matched woreda table as text, drops the columns that were
/// only used for name matching and adds a `GeoKey` column.
pub fn load_woreda_mapped(path: &Path) -> Result<DataFrame, OutputError> {
    let df = read_text_csv(path)?;
    let matching: Vec<PlSmallStr> = df
        .get_column_names()
        .into_iter()
        .filter(|name| name.contains("match"))
        .cloned()
        .collect();
    let mut df = df.drop_many(matching);

    let keys: Vec<String> = {
        let regions = text_column(&df, REGION_COLUMN, path)?;
        let zones = text_column(&df, ZONE_COLUMN, path)?;
        let names = text_column(&df, WOREDA_COLUMN, path)?;
        regions
            .into_iter()
            .zip(zones)
            .zip(names)
            .map(|((r, z), w)| {
                geo_key(
                    r.unwrap_or_default(),
                    z.unwrap_or_default(),
                    w.unwrap_or_default(),
                )
            })
            .collect()
    };
    df.with_column(Column::new(GEO_KEY_COLUMN.into(), keys))?;
    Ok(df)
}

/// Observations are only available up to yesterday; later end dates are
/// pulled back.
pub fn clamp_end_date(end: NaiveDate, today: NaiveDate) -> NaiveDate {
    let yesterday = today.checked_sub_days(Days::new(1)).unwrap_or(today);
    if end > yesterday {
        info!("Max query date is up until yesterday: {}", yesterday);
        yesterday
    } else {
        end
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn csv_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_woredas_skips_zero_latitude() -> Result<(), OutputError> {
        let file = csv_file(
            "GeoKey,WoredaLat,WoredaLon,Other\n\
             oromia__west shewa__ambo__,8.98123456789,37.85,x\n\
             afar__zone 1__none__,0,0,y\n\
             tigray__mekele__mekele__,13.4967,39.4753,z\n",
        );

        let woredas = load_woredas(file.path())?;

        assert_eq!(woredas.len(), 2);
        assert_eq!(woredas[0].geo_key, "oromia__west shewa__ambo__");
        assert_eq!(woredas[0].lat_lon, LatLon(8.98123456789, 37.85));
        assert_eq!(woredas[1].lat_lon.to_string(), "13.4967,39.4753");
        Ok(())
    }

    #[test]
    fn test_load_woredas_missing_column() {
        let file = csv_file("GeoKey,WoredaLat\nx,1.0\n");
        let err = load_woredas(file.path()).unwrap_err();
        assert!(
            matches!(err, OutputError::MissingColumn { ref column, .. } if column == "WoredaLon")
        );
    }

    #[test]
    fn test_load_woreda_mapped() -> Result<(), OutputError> {
        let file = csv_file(
            "RegionName,ZoneName,WoredaName,WoredaLat,WoredaLon,match_score,name_match\n\
             Oromia,West Shewa,Ambo,8.98,37.85,0.9,Ambo\n",
        );

        let df = load_woreda_mapped(file.path())?;

        let names: Vec<String> = df
            .get_column_names()
            .into_iter()
            .map(|n| n.to_string())
            .collect();
        assert_eq!(
            names,
            ["RegionName", "ZoneName", "WoredaName", "WoredaLat", "WoredaLon", "GeoKey"]
        );
        let keys = text_column(&df, GEO_KEY_COLUMN, file.path())?;
        assert_eq!(keys.get(0), Some("oromia__west shewa__ambo__"));
        Ok(())
    }

    #[test]
    fn test_clamp_end_date() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let yesterday = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(clamp_end_date(today, today), yesterday);
        assert_eq!(
            clamp_end_date(NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(), today),
            yesterday
        );
        assert_eq!(clamp_end_date(yesterday, today), yesterday);
        let earlier = NaiveDate::from_ymd_opt(2023, 6, 1).unwrap();
        assert_eq!(clamp_end_date(earlier, today), earlier);
    }
}
