//! Region helper — ties the location provider, the region store, and the
//! region fetch service together.
//!
//! Location flow:  start → first fix → nearby regions → {auto-select nearest | ask delegate}
//! Refresh flow:   fetch → replace store → re-evaluate against the last fix
//!
//! The nearby list is recomputed on every read from the latest fix and the
//! store's current contents, so it can never go stale.

use crate::config::HelperConfig;
use crate::error::RegionError;
use crate::location::{Coordinate, LocationError, LocationFix, LocationListener, LocationProvider};
use crate::region::{regions_near, FileRegionStore, NearbyRegion, Region, RegionFetchService, RegionStore};
use crate::sync::lock;
use serde::Serialize;
use std::sync::{Arc, Mutex, Weak};
use tracing::{debug, info, warn};

/// Receives notifications from a [`RegionHelper`].
pub trait RegionHelperDelegate: Send + Sync {
    /// No usable region is near the current location (or the location is
    /// unknown). The host should let the user pick a region by hand.
    fn show_region_list(&self, helper: &RegionHelper);

    /// A refresh failed; the previously stored regions are still in place.
    fn refresh_failed(&self, _helper: &RegionHelper, _error: &RegionError) {}
}

/// Where the helper is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HelperState {
    /// Not started, or stopped.
    Idle,
    /// Started, no fix yet.
    AwaitingLocation,
    /// At least one usable region is nearby.
    Steady,
    /// Nothing usable is near the latest fix; the delegate has been told.
    DelegateNotified,
    /// Location could not be obtained; the delegate has been told.
    LocationUnavailable,
}

/// Result of a successful [`RegionHelper::refresh_data`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RefreshOutcome {
    pub region_count: usize,
    pub nearby_count: usize,
}

/// The (location, region set) pair an empty result was reported for.
#[derive(PartialEq)]
struct EmptyKey {
    location: Option<Coordinate>,
    regions: Vec<Region>,
}

struct Inner {
    state: HelperState,
    started: bool,
    subscribed: bool,
    last_fix: Option<LocationFix>,
    location_error: Option<LocationError>,
    last_empty: Option<EmptyKey>,
}

/// Finds the transit regions near the device.
///
/// A helper can only be built from a location provider and a fetch service:
///
/// ```compile_fail
/// use transit_regions::RegionHelper;
/// let helper = RegionHelper::default();
/// ```
///
/// ```compile_fail
/// use std::sync::Arc;
/// use transit_regions::location::ManualLocationProvider;
/// use transit_regions::RegionHelper;
/// let helper = RegionHelper::new(Arc::new(ManualLocationProvider::new()));
/// ```
pub struct RegionHelper {
    me: Weak<RegionHelper>,
    location_provider: Arc<dyn LocationProvider>,
    fetch_service: Arc<dyn RegionFetchService>,
    store: Arc<dyn RegionStore>,
    config: HelperConfig,
    delegate: Mutex<Option<Weak<dyn RegionHelperDelegate>>>,
    inner: Mutex<Inner>,
}

impl RegionHelper {
    /// Create a helper backed by the default on-disk region store.
    pub fn new(
        location_provider: Arc<dyn LocationProvider>,
        fetch_service: Arc<dyn RegionFetchService>,
    ) -> Arc<Self> {
        Self::with_store(location_provider, fetch_service, Arc::new(FileRegionStore::load()))
    }

    /// Create a helper with a specific store.
    pub fn with_store(
        location_provider: Arc<dyn LocationProvider>,
        fetch_service: Arc<dyn RegionFetchService>,
        store: Arc<dyn RegionStore>,
    ) -> Arc<Self> {
        Self::with_config(location_provider, fetch_service, store, HelperConfig::default())
    }

    pub fn with_config(
        location_provider: Arc<dyn LocationProvider>,
        fetch_service: Arc<dyn RegionFetchService>,
        store: Arc<dyn RegionStore>,
        config: HelperConfig,
    ) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            location_provider,
            fetch_service,
            store,
            config,
            delegate: Mutex::new(None),
            inner: Mutex::new(Inner {
                state: HelperState::Idle,
                started: false,
                subscribed: false,
                last_fix: None,
                location_error: None,
                last_empty: None,
            }),
        })
    }

    /// Attach a delegate. Only a weak reference is kept.
    pub fn set_delegate<D: RegionHelperDelegate + 'static>(&self, delegate: &Arc<D>) {
        let weak = Arc::downgrade(delegate);
        let weak: Weak<dyn RegionHelperDelegate> = weak;
        *lock(&self.delegate) = Some(weak);
    }

    pub fn clear_delegate(&self) {
        *lock(&self.delegate) = None;
    }

    pub fn config(&self) -> &HelperConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn RegionStore> {
        &self.store
    }

    pub fn state(&self) -> HelperState {
        lock(&self.inner).state
    }

    pub fn is_started(&self) -> bool {
        lock(&self.inner).started
    }

    pub fn last_location(&self) -> Option<LocationFix> {
        lock(&self.inner).last_fix.clone()
    }

    /// Begin observing location. Returns immediately; results arrive through
    /// the provider's callbacks. Calling it again while subscribed does
    /// nothing. If the provider refused the last attempt, subscribing is
    /// tried again.
    pub fn start(&self) {
        let retrying = {
            let mut inner = lock(&self.inner);
            if inner.subscribed {
                debug!("Region helper already started");
                return;
            }
            if inner.started {
                info!("Retrying location subscription");
                true
            } else {
                info!("Starting region helper");
                inner.started = true;
                inner.state = HelperState::AwaitingLocation;
                false
            }
        };

        let listener: Weak<dyn LocationListener> = self.me.clone();
        if let Err(e) = self.location_provider.start_updates(listener) {
            self.handle_location_failure(e);
            return;
        }
        {
            let mut inner = lock(&self.inner);
            inner.subscribed = true;
            if retrying && inner.last_fix.is_none() {
                inner.location_error = None;
                inner.state = HelperState::AwaitingLocation;
            }
        }

        // The provider may already know where we are.
        if let Some(fix) = self.location_provider.current_location() {
            let already_seen = lock(&self.inner).last_fix.as_ref() == Some(&fix);
            if !already_seen {
                self.location_updated(fix);
            }
        }
    }

    /// Stop observing location and forget the last fix.
    pub fn stop(&self) {
        {
            let mut inner = lock(&self.inner);
            if !inner.started {
                return;
            }
            inner.started = false;
            inner.subscribed = false;
            inner.state = HelperState::Idle;
            inner.last_fix = None;
            inner.location_error = None;
            inner.last_empty = None;
        }
        self.location_provider.stop_updates();
        info!("Stopped region helper");
    }

    /// Fetch the region list and replace the stored set with it.
    ///
    /// On failure the stored regions are left as they were, the delegate's
    /// [`refresh_failed`](RegionHelperDelegate::refresh_failed) hook is
    /// called, and the error is returned. An empty list is a success.
    pub fn refresh_data(&self) -> Result<RefreshOutcome, RegionError> {
        info!("Refreshing region data");
        let result = self.fetch_and_store();
        match result {
            Ok(region_count) => {
                let nearby_count = self.evaluate().len();
                info!(region_count, nearby_count, "Region data refreshed");
                Ok(RefreshOutcome {
                    region_count,
                    nearby_count,
                })
            }
            Err(e) => {
                warn!(error = %e, "Region refresh failed; keeping stored regions");
                if let Some(delegate) = self.delegate() {
                    delegate.refresh_failed(self, &e);
                }
                Err(e)
            }
        }
    }

    fn fetch_and_store(&self) -> Result<usize, RegionError> {
        let regions = self.fetch_service.fetch_regions()?;
        let previous = self.store.current_region();
        let count = regions.len();
        self.store.replace_regions(regions)?;

        if let Some(previous) = previous {
            if self.store.current_region().is_none() {
                debug!(region = %previous.name, "Current region no longer offered; clearing it");
                // The new list is already stored, so this must not fail the refresh.
                if let Err(e) = self.store.set_current_region(None) {
                    warn!(error = %e, "Could not clear current region");
                }
            }
        }
        Ok(count)
    }

    /// Usable regions near the latest fix, nearest first.
    ///
    /// The name follows the default radius. A configured
    /// [`HelperConfig::radius_miles`] replaces the 100 miles here, and the
    /// delegate decision uses the same set. Empty while no fix is known.
    pub fn regions_within_100_miles(&self) -> Vec<Region> {
        self.nearby_regions().into_iter().map(|n| n.region).collect()
    }

    /// Like [`regions_within_100_miles`](Self::regions_within_100_miles), with
    /// distances.
    pub fn nearby_regions(&self) -> Vec<NearbyRegion> {
        let inner = lock(&self.inner);
        match inner.last_fix.as_ref() {
            Some(fix) => regions_near(&self.store.regions(), fix.coordinate, &self.config),
            None => Vec::new(),
        }
    }

    /// Recompute the nearby set, update state, auto-select the nearest region
    /// and notify the delegate when the empty result is new.
    fn evaluate(&self) -> Vec<NearbyRegion> {
        let (nearby, notify) = {
            let mut inner = lock(&self.inner);
            if !inner.started {
                return Vec::new();
            }
            let regions = self.store.regions();
            let location = inner.last_fix.as_ref().map(|f| f.coordinate);
            let nearby = match location {
                Some(location) => regions_near(&regions, location, &self.config),
                None if inner.location_error.is_some() => Vec::new(),
                None => return Vec::new(),
            };

            if nearby.is_empty() {
                let key = EmptyKey { location, regions };
                let fresh = inner.last_empty.as_ref() != Some(&key);
                inner.last_empty = Some(key);
                inner.state = if location.is_some() {
                    HelperState::DelegateNotified
                } else {
                    HelperState::LocationUnavailable
                };
                (nearby, fresh)
            } else {
                inner.last_empty = None;
                inner.state = HelperState::Steady;
                (nearby, false)
            }
        };

        if let Some(nearest) = nearby.first() {
            self.auto_select(&nearest.region);
        }
        if notify {
            self.notify_show_region_list();
        }
        nearby
    }

    fn auto_select(&self, nearest: &Region) {
        if !self.store.automatically_select_region() {
            return;
        }
        if self.store.current_region().map(|r| r.id) == Some(nearest.id) {
            return;
        }
        match self.store.set_current_region(Some(nearest)) {
            Ok(()) => info!(region = %nearest.name, "Selected nearest region"),
            Err(e) => warn!(error = %e, "Could not save current region"),
        }
    }

    fn handle_location_failure(&self, error: LocationError) {
        {
            let mut inner = lock(&self.inner);
            if !inner.started {
                return;
            }
            if error == LocationError::PermissionDenied {
                inner.last_fix = None;
            }
            if inner.last_fix.is_some() {
                drop(inner);
                warn!(error = %error, "Location update failed; keeping last fix");
                return;
            }
            inner.location_error = Some(error.clone());
        }
        warn!(error = %error, "Location unavailable");
        self.evaluate();
    }

    fn delegate(&self) -> Option<Arc<dyn RegionHelperDelegate>> {
        lock(&self.delegate).as_ref().and_then(Weak::upgrade)
    }

    fn notify_show_region_list(&self) {
        match self.delegate() {
            Some(delegate) => {
                info!("No nearby region; asking delegate to show the region list");
                delegate.show_region_list(self);
            }
            None => debug!("No nearby region and no delegate attached"),
        }
    }
}

impl LocationListener for RegionHelper {
    fn location_updated(&self, fix: LocationFix) {
        {
            let mut inner = lock(&self.inner);
            if !inner.started {
                return;
            }
            debug!(location = %fix.coordinate, source = %fix.source, "Location update");
            inner.last_fix = Some(fix);
            inner.location_error = None;
        }
        self.evaluate();
    }

    fn location_failed(&self, error: LocationError) {
        self.handle_location_failure(error);
    }
}

impl Drop for RegionHelper {
    fn drop(&mut self) {
        let subscribed = lock(&self.inner).subscribed;
        if subscribed {
            self.location_provider.stop_updates();
        }
    }
}
