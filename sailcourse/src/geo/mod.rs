//! Spherical-earth geometry.
//!
//! Distance, forward azimuth and destination-point calculations used by the
//! course layout model. All public inputs and outputs are in degrees;
//! radians appear only inside the formulas. Spherical approximation only.

mod types;

pub use types::{GeoError, LatLon, MAX_LAT, MAX_LON, MIN_LAT, MIN_LON};

/// Earth radius in meters (mean sphere).
pub const EARTH_RADIUS_M: f64 = 6_371_009.0;

/// Conversion factor from knots to meters per second.
pub const KNOTS_TO_MPS: f64 = 0.514444;

/// Great-circle distance between two points in meters (haversine).
pub fn distance(p1: LatLon, p2: LatLon) -> f64 {
    let phi1 = p1.lat.to_radians();
    let phi2 = p2.lat.to_radians();
    let d_phi = (p2.lat - p1.lat).to_radians();
    let d_lambda = (p2.lon - p1.lon).to_radians();

    let a = (d_phi / 2.0).sin() * (d_phi / 2.0).sin()
        + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin() * (d_lambda / 2.0).sin();
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

/// Forward azimuth from `p1` to `p2` in degrees.
///
/// Returned as `atan2` produces it, roughly (-180, 180]; callers that need
/// a display range normalize with [`normalize_signed_180`].
pub fn bearing(p1: LatLon, p2: LatLon) -> f64 {
    let phi1 = p1.lat.to_radians();
    let phi2 = p2.lat.to_radians();
    let d_lambda = (p2.lon - p1.lon).to_radians();

    let y = d_lambda.sin() * phi2.cos();
    let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * d_lambda.cos();

    y.atan2(x).to_degrees()
}

/// Point reached from `origin` after traveling `distance_m` meters on the
/// initial bearing `bearing_deg` (direct geodesic on a sphere).
pub fn destination(origin: LatLon, distance_m: f64, bearing_deg: f64) -> LatLon {
    let phi1 = origin.lat.to_radians();
    let lambda1 = origin.lon.to_radians();
    let theta = bearing_deg.to_radians();
    let delta = distance_m / EARTH_RADIUS_M;

    let phi2 = (phi1.sin() * delta.cos() + phi1.cos() * delta.sin() * theta.cos()).asin();
    let lambda2 = lambda1
        + (theta.sin() * delta.sin() * phi1.cos()).atan2(delta.cos() - phi1.sin() * phi2.sin());

    LatLon::new(phi2.to_degrees(), lambda2.to_degrees())
}

/// Normalizes an angle to an integer number of degrees in `[-180, 180)`.
///
/// The fractional part is truncated before normalization. Display code and
/// the leg-heading selection both depend on this truncate-then-normalize
/// order, so it must not be reordered.
pub fn normalize_signed_180(angle_deg: f64) -> i32 {
    let int_angle = angle_deg as i32;
    ((int_angle + 180) % 360 + 360) % 360 - 180
}
