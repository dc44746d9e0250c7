//! Nearby transit region discovery.
//!
//! A [`RegionHelper`] listens to a [`LocationProvider`], filters the regions
//! held by a [`RegionStore`] down to those within range of the latest fix,
//! refreshes the store through a [`RegionFetchService`], and tells its
//! [`RegionHelperDelegate`] when nothing usable is nearby.

pub mod config;
pub mod error;
pub mod geo;
pub mod helper;
pub mod location;
pub mod logging;
pub mod region;
pub mod server;
mod sync;

pub use config::{HelperConfig, Settings};
pub use error::RegionError;
pub use helper::{HelperState, RefreshOutcome, RegionHelper, RegionHelperDelegate};
pub use location::{Coordinate, LocationError, LocationFix, LocationListener, LocationProvider};
pub use region::{FetchError, Region, RegionBounds, RegionFetchService, RegionStore, StoreError};
