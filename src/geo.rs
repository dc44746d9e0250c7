//! Great-circle distance helpers.
//!
//! All distances use the haversine formula on a spherical Earth with the
//! IUGG mean radius. Good to ~0.5% which is plenty for a 100-mile cut-off.

use crate::location::Coordinate;
use std::f64::consts::PI;

const DEG: f64 = PI / 180.0;

/// IUGG mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// International mile.
pub const METERS_PER_MILE: f64 = 1609.344;

pub fn miles_to_meters(miles: f64) -> f64 {
    miles * METERS_PER_MILE
}

pub fn meters_to_miles(meters: f64) -> f64 {
    meters / METERS_PER_MILE
}

/// Great-circle distance between two coordinates in meters.
pub fn distance_meters(from: Coordinate, to: Coordinate) -> f64 {
    let lat1 = from.lat * DEG;
    let lat2 = to.lat * DEG;
    let delta_lat = (to.lat - from.lat) * DEG;
    let delta_lon = (to.lon - from.lon) * DEG;

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().min(1.0).asin();

    EARTH_RADIUS_M * c
}

/// Signed longitude difference `to - from` folded into -180..=180.
pub(crate) fn lon_delta(from: f64, to: f64) -> f64 {
    let mut d = (to - from) % 360.0;
    if d > 180.0 {
        d -= 360.0;
    } else if d < -180.0 {
        d += 360.0;
    }
    d
}
