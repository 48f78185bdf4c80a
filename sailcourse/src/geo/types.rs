//! Geographic coordinate types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Maximum valid latitude in degrees.
pub const MAX_LAT: f64 = 90.0;
/// Minimum valid latitude in degrees.
pub const MIN_LAT: f64 = -90.0;
/// Maximum valid longitude in degrees.
pub const MAX_LON: f64 = 180.0;
/// Minimum valid longitude in degrees.
pub const MIN_LON: f64 = -180.0;

/// A geographic position in decimal degrees.
///
/// Plain `Copy` data; the validating constructor is available for inputs
/// arriving from outside the crate, but internal math operates on the raw
/// fields without revalidation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    /// Latitude in degrees, positive north.
    pub lat: f64,
    /// Longitude in degrees, positive east.
    pub lon: f64,
}

impl LatLon {
    /// Creates a coordinate, checking it lies in the valid geographic range.
    pub fn checked(lat: f64, lon: f64) -> Result<Self, GeoError> {
        if !(MIN_LAT..=MAX_LAT).contains(&lat) {
            return Err(GeoError::InvalidLatitude(lat));
        }
        if !(MIN_LON..=MAX_LON).contains(&lon) {
            return Err(GeoError::InvalidLongitude(lon));
        }
        Ok(Self { lat, lon })
    }

    /// Creates a coordinate without range checking.
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Returns true if the coordinate lies in the valid geographic range.
    pub fn is_valid(&self) -> bool {
        (MIN_LAT..=MAX_LAT).contains(&self.lat) && (MIN_LON..=MAX_LON).contains(&self.lon)
    }
}

impl fmt::Display for LatLon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}, {:.4}", self.lat, self.lon)
    }
}

/// Errors for geographic coordinate validation.
#[derive(Debug, Clone, PartialEq)]
pub enum GeoError {
    /// Latitude outside [-90, 90].
    InvalidLatitude(f64),
    /// Longitude outside [-180, 180].
    InvalidLongitude(f64),
}

impl fmt::Display for GeoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeoError::InvalidLatitude(lat) => write!(f, "invalid latitude: {}", lat),
            GeoError::InvalidLongitude(lon) => write!(f, "invalid longitude: {}", lon),
        }
    }
}

impl std::error::Error for GeoError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checked_accepts_valid_range() {
        assert!(LatLon::checked(38.0, 120.0).is_ok());
        assert!(LatLon::checked(-90.0, -180.0).is_ok());
        assert!(LatLon::checked(90.0, 180.0).is_ok());
    }

    #[test]
    fn test_checked_rejects_out_of_range() {
        assert!(matches!(
            LatLon::checked(90.1, 0.0),
            Err(GeoError::InvalidLatitude(_))
        ));
        assert!(matches!(
            LatLon::checked(0.0, -180.5),
            Err(GeoError::InvalidLongitude(_))
        ));
    }

    #[test]
    fn test_serde_round_trip_uses_lat_lon_keys() {
        let p = LatLon::new(38.5, -120.25);
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(json, r#"{"lat":38.5,"lon":-120.25}"#);
        let back: LatLon = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }

    #[test]
    fn test_display_four_decimals() {
        let p = LatLon::new(38.123456, -120.987654);
        assert_eq!(p.to_string(), "38.1235, -120.9877");
    }
}
