//! Sailing distance units.
//!
//! Every distance crossing into the geometry code is normalized to meters
//! first; display code converts back out. Boat lengths are a fixed 6 m.

use std::fmt;

/// Meters in one foot.
const METERS_PER_FOOT: f64 = 0.3048;
/// Meters in one statute mile.
const METERS_PER_MILE: f64 = 1609.34;
/// Meters in one kilometer.
const METERS_PER_KILOMETER: f64 = 1000.0;

/// One boat length in meters.
pub const BOAT_LENGTH_M: f64 = 6.0;

/// Distance units offered to sailors for mark placement and readouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SailingUnit {
    Feet,
    Meters,
    Miles,
    Kilometers,
    BoatLengths,
}

impl SailingUnit {
    /// Short unit symbol for display.
    pub fn symbol(&self) -> &'static str {
        match self {
            SailingUnit::Feet => "ft",
            SailingUnit::Meters => "m",
            SailingUnit::Miles => "mi",
            SailingUnit::Kilometers => "km",
            SailingUnit::BoatLengths => "boats",
        }
    }

    /// Conversion factor to meters.
    fn factor(&self) -> f64 {
        match self {
            SailingUnit::Feet => METERS_PER_FOOT,
            SailingUnit::Meters => 1.0,
            SailingUnit::Miles => METERS_PER_MILE,
            SailingUnit::Kilometers => METERS_PER_KILOMETER,
            SailingUnit::BoatLengths => BOAT_LENGTH_M,
        }
    }

    /// Converts a value in this unit to meters.
    pub fn to_meters(&self, value: f64) -> f64 {
        value * self.factor()
    }

    /// Converts meters to a value in this unit.
    pub fn from_meters(&self, meters: f64) -> f64 {
        meters / self.factor()
    }

    /// Converts a value in this unit to another unit.
    pub fn convert(&self, value: f64, to: SailingUnit) -> f64 {
        to.from_meters(self.to_meters(value))
    }
}

impl fmt::Display for SailingUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Rounds to the given number of significant digits.
///
/// Used when re-deriving forward/port distances for an edit field, so the
/// text shown does not accumulate floating noise.
pub fn round_significant(value: f64, digits: i32) -> f64 {
    if value == 0.0 {
        return 0.0;
    }
    let scale = 10f64.powi(digits - value.abs().log10().ceil() as i32);
    (value * scale).round() / scale
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feet_to_meters() {
        assert!((SailingUnit::Feet.to_meters(100.0) - 30.48).abs() < 1e-9);
    }

    #[test]
    fn test_boat_lengths_to_meters() {
        assert_eq!(SailingUnit::BoatLengths.to_meters(3.0), 18.0);
    }

    #[test]
    fn test_convert_miles_to_kilometers() {
        let km = SailingUnit::Miles.convert(1.0, SailingUnit::Kilometers);
        assert!((km - 1.60934).abs() < 1e-9);
    }

    #[test]
    fn test_convert_round_trip() {
        let v = SailingUnit::Feet.convert(550.0, SailingUnit::BoatLengths);
        let back = SailingUnit::BoatLengths.convert(v, SailingUnit::Feet);
        assert!((back - 550.0).abs() < 1e-9);
    }

    #[test]
    fn test_meters_identity() {
        assert_eq!(SailingUnit::Meters.to_meters(42.5), 42.5);
        assert_eq!(SailingUnit::Meters.from_meters(42.5), 42.5);
    }

    #[test]
    fn test_symbols() {
        assert_eq!(SailingUnit::Feet.symbol(), "ft");
        assert_eq!(SailingUnit::BoatLengths.symbol(), "boats");
        assert_eq!(format!("{}", SailingUnit::Kilometers), "km");
    }

    #[test]
    fn test_round_significant() {
        assert_eq!(round_significant(123.456, 4), 123.5);
        assert_eq!(round_significant(0.0012345, 3), 0.00123);
        assert_eq!(round_significant(0.0, 4), 0.0);
        assert_eq!(round_significant(-987.654, 2), -990.0);
    }
}
