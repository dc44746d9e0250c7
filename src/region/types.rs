//! Core types for the region subsystem.

use crate::geo::{self, lon_delta};
use crate::location::Coordinate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One rectangle of a region's footprint, given as a center and full spans
/// in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionBounds {
    pub lat: f64,
    pub lon: f64,
    pub lat_span: f64,
    pub lon_span: f64,
}

impl RegionBounds {
    /// Half spans in degrees. The sign of a span is ignored.
    fn half_spans(&self) -> (f64, f64) {
        (self.lat_span.abs() / 2.0, self.lon_span.abs() / 2.0)
    }

    fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lon.is_finite() && self.lat_span.is_finite() && self.lon_span.is_finite()
    }

    pub fn contains(&self, point: Coordinate) -> bool {
        let (half_lat, half_lon) = self.half_spans();
        (point.lat - self.lat).abs() <= half_lat && lon_delta(self.lon, point.lon).abs() <= half_lon
    }

    /// Distance in meters from `point` to the nearest point of this
    /// rectangle; zero when inside. Bounds with a non-finite field are
    /// infinitely far away.
    pub fn distance_meters(&self, point: Coordinate) -> f64 {
        if !self.is_finite() {
            return f64::INFINITY;
        }
        if self.contains(point) {
            return 0.0;
        }
        let (half_lat, half_lon) = self.half_spans();
        let nearest = Coordinate {
            lat: point.lat.clamp(self.lat - half_lat, self.lat + half_lat),
            lon: self.lon + lon_delta(self.lon, point.lon).clamp(-half_lon, half_lon),
        };
        geo::distance_meters(point, nearest)
    }
}

/// A transit service coverage area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Region {
    pub id: u64,
    #[serde(rename = "regionName")]
    pub name: String,
    #[serde(default)]
    pub oba_base_url: Option<String>,
    #[serde(default)]
    pub bounds: Vec<RegionBounds>,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default = "default_true")]
    pub supports_oba_realtime_apis: bool,
    #[serde(default)]
    pub experimental: bool,
    #[serde(default)]
    pub contact_email: Option<String>,
}

fn default_true() -> bool {
    true
}

impl Region {
    /// An active, realtime-capable, non-experimental region with no bounds.
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            oba_base_url: None,
            bounds: Vec::new(),
            active: true,
            supports_oba_realtime_apis: true,
            experimental: false,
            contact_email: None,
        }
    }

    pub fn with_bounds(mut self, bounds: RegionBounds) -> Self {
        self.bounds.push(bounds);
        self
    }

    /// Shortest distance in meters from `point` to any of this region's
    /// bounds. `None` for a region without bounds.
    pub fn distance_meters(&self, point: Coordinate) -> Option<f64> {
        self.bounds
            .iter()
            .map(|b| b.distance_meters(point))
            .min_by(|a, b| a.total_cmp(b))
    }

    /// Whether the region can be offered for automatic selection at all.
    pub fn is_usable(&self, include_experimental: bool) -> bool {
        self.active && self.supports_oba_realtime_apis && (include_experimental || !self.experimental)
    }
}

/// Errors fetching the remote region list.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Invalid regions response: {0}")]
    InvalidResponse(String),
    #[error("Regions endpoint returned code {0}")]
    Status(i64),
}

/// Errors persisting the region set.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn puget_sound() -> Region {
        Region::new(1, "Puget Sound").with_bounds(RegionBounds {
            lat: 47.5,
            lon: -122.3,
            lat_span: 1.0,
            lon_span: 1.0,
        })
    }

    #[test]
    fn test_inside_bounds_is_zero() {
        let r = puget_sound();
        assert_eq!(r.distance_meters(Coordinate { lat: 47.6, lon: -122.3 }), Some(0.0));
    }

    #[test]
    fn test_distance_to_edge_not_center() {
        let r = puget_sound();
        // One degree north of the northern edge (48.0)
        let d = r.distance_meters(Coordinate { lat: 49.0, lon: -122.3 }).unwrap();
        assert_relative_eq!(d, 111_195.08, max_relative = 1e-3);
    }

    #[test]
    fn test_nearest_of_multiple_bounds() {
        let r = puget_sound().with_bounds(RegionBounds {
            lat: 40.0,
            lon: -122.3,
            lat_span: 0.2,
            lon_span: 0.2,
        });
        assert_eq!(r.distance_meters(Coordinate { lat: 40.05, lon: -122.3 }), Some(0.0));
    }

    #[test]
    fn test_no_bounds() {
        assert_eq!(Region::new(9, "Nowhere").distance_meters(Coordinate { lat: 0.0, lon: 0.0 }), None);
    }

    #[test]
    fn test_bounds_across_antimeridian() {
        let b = RegionBounds { lat: 0.0, lon: 179.8, lat_span: 1.0, lon_span: 1.0 };
        assert!(b.contains(Coordinate { lat: 0.0, lon: -179.9 }));
    }

    #[test]
    fn test_negative_spans_read_as_their_magnitude() {
        let flipped = RegionBounds { lat: 47.5, lon: -122.3, lat_span: -1.0, lon_span: -1.0 };
        assert!(flipped.contains(Coordinate { lat: 47.6, lon: -122.3 }));
        let d = flipped.distance_meters(Coordinate { lat: 49.0, lon: -122.3 });
        assert_relative_eq!(d, 111_195.08, max_relative = 1e-3);
    }

    #[test]
    fn test_non_finite_bounds_are_never_near() {
        let broken = RegionBounds { lat: 47.5, lon: -122.3, lat_span: f64::NAN, lon_span: 1.0 };
        let here = Coordinate { lat: 47.5, lon: -122.3 };
        assert!(!broken.contains(here));
        assert_eq!(broken.distance_meters(here), f64::INFINITY);
    }

    #[test]
    fn test_usable() {
        let mut r = Region::new(1, "x");
        assert!(r.is_usable(false));
        r.experimental = true;
        assert!(!r.is_usable(false));
        assert!(r.is_usable(true));
        r.active = false;
        assert!(!r.is_usable(true));
    }

    #[test]
    fn test_deserialize_oba_region() {
        let json = r#"{
            "id": 1,
            "regionName": "Puget Sound",
            "obaBaseUrl": "https://api.pugetsound.onebusaway.org/",
            "bounds": [{"lat": 47.2, "lon": -122.2, "latSpan": 1.5, "lonSpan": 1.0}],
            "active": true,
            "supportsObaRealtimeApis": true,
            "experimental": false,
            "contactEmail": "info@example.org",
            "language": "en_US"
        }"#;
        let r: Region = serde_json::from_str(json).unwrap();
        assert_eq!(r.name, "Puget Sound");
        assert_eq!(r.bounds.len(), 1);
        assert_relative_eq!(r.bounds[0].lat_span, 1.5);
        assert_eq!(r.contact_email.as_deref(), Some("info@example.org"));
    }
}
