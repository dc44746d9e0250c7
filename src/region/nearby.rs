//! Filtering a region set down to the regions near a point.

use super::types::Region;
use crate::config::HelperConfig;
use crate::geo::{meters_to_miles, miles_to_meters};
use crate::location::Coordinate;
use serde::Serialize;

/// A region together with its footprint distance from the query point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NearbyRegion {
    pub region: Region,
    pub distance_m: f64,
}

impl NearbyRegion {
    pub fn distance_miles(&self) -> f64 {
        meters_to_miles(self.distance_m)
    }
}

/// Usable regions whose footprint lies within `config.radius_miles` of
/// `location`, nearest first. Equal distances keep their input order.
pub fn regions_near(regions: &[Region], location: Coordinate, config: &HelperConfig) -> Vec<NearbyRegion> {
    let radius_m = miles_to_meters(config.radius_miles);

    let mut nearby: Vec<NearbyRegion> = regions
        .iter()
        .filter(|r| r.is_usable(config.include_experimental))
        .filter_map(|r| {
            let distance_m = r.distance_meters(location)?;
            (distance_m <= radius_m).then(|| NearbyRegion {
                region: r.clone(),
                distance_m,
            })
        })
        .collect();

    nearby.sort_by(|a, b| a.distance_m.total_cmp(&b.distance_m));
    nearby
}
