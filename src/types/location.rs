//! Geographic locations and the administrative-region rows they come from.

use std::fmt;

/// Represents a geographical coordinate using latitude and longitude.
///
/// Latitude is the first element (index 0), and longitude is the second (index 1).
///
/// # Examples
///
/// ```
/// use awhere::LatLon;
///
/// let addis = LatLon(9.03, 38.74);
/// assert_eq!(addis.0, 9.03); // Latitude
/// assert_eq!(addis.to_string(), "9.03,38.74");
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLon(pub f64, pub f64);

impl LatLon {
    pub fn latitude(&self) -> f64 {
        self.0
    }

    pub fn longitude(&self) -> f64 {
        self.1
    }
}

/// Formats as `lat,lon`, the form the provider expects in URL paths.
impl fmt::Display for LatLon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.0, self.1)
    }
}

/// One row of the location table: a woreda with its coordinates and key.
#[derive(Debug, Clone, PartialEq)]
pub struct Woreda {
    pub geo_key: String,
    pub lat_lon: LatLon,
}

/// Builds the join key shared by the location table and the weather output,
/// `region__zone__woreda__` lower-cased.
pub fn geo_key(region: &str, zone: &str, woreda: &str) -> String {
    format!("{}__{}__{}__", region, zone, woreda).to_lowercase()
}
