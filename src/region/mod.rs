//! Region subsystem: the region model, persisted storage, and remote fetch.

pub mod nearby;
pub mod service;
pub mod store;
pub mod types;

pub use nearby::{regions_near, NearbyRegion};
pub use service::{parse_regions_document, HttpRegionService, StaticRegionService, DEFAULT_REGIONS_URL};
pub use store::{FileRegionStore, MemoryRegionStore};
pub use types::{FetchError, Region, RegionBounds, StoreError};

use chrono::{DateTime, Utc};

/// Read/write access to the persisted region set.
pub trait RegionStore: Send + Sync {
    /// All known regions, in stored order.
    fn regions(&self) -> Vec<Region>;

    /// Replace the whole region set and stamp the fetch time.
    fn replace_regions(&self, regions: Vec<Region>) -> Result<(), StoreError>;

    /// When the region set was last replaced.
    fn fetched_at(&self) -> Option<DateTime<Utc>>;

    /// The region the user is currently using, if it is still in the set.
    fn current_region(&self) -> Option<Region>;

    fn set_current_region(&self, region: Option<&Region>) -> Result<(), StoreError>;

    /// Whether the current region should follow the device location.
    fn automatically_select_region(&self) -> bool;

    fn set_automatically_select_region(&self, enabled: bool) -> Result<(), StoreError>;
}

/// Produces the up-to-date region list from a remote source.
pub trait RegionFetchService: Send + Sync {
    /// Blocking fetch of the full region list.
    fn fetch_regions(&self) -> Result<Vec<Region>, FetchError>;
}
