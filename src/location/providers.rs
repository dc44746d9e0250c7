//! Location providers: host-driven manual fixes, a fixed point, and IP-based
//! geolocation.

use super::types::{Coordinate, LocationError, LocationFix, LocationSource};
use super::{LocationListener, LocationProvider};
use crate::sync::lock;
use serde::Deserialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

type ListenerSlot = Option<Weak<dyn LocationListener>>;

fn upgrade(slot: &ListenerSlot) -> Option<Arc<dyn LocationListener>> {
    slot.as_ref().and_then(Weak::upgrade)
}

// ─── Manual provider ────────────────────────────────────────────

#[derive(Default)]
struct ManualState {
    listener: ListenerSlot,
    current: Option<LocationFix>,
    permission_denied: bool,
    start_calls: usize,
}

/// A provider the host feeds directly.
///
/// Every [`update`](Self::update) is remembered as the current location and
/// forwarded synchronously to the registered listener.
#[derive(Default)]
pub struct ManualLocationProvider {
    state: Mutex<ManualState>,
}

impl ManualLocationProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// A provider whose `start_updates` fails with
    /// [`LocationError::PermissionDenied`] until permission is granted.
    pub fn denied() -> Self {
        Self {
            state: Mutex::new(ManualState {
                permission_denied: true,
                ..Default::default()
            }),
        }
    }

    /// Grant or revoke location permission for later `start_updates` calls.
    pub fn set_permission_denied(&self, denied: bool) {
        lock(&self.state).permission_denied = denied;
    }

    /// How many times `start_updates` was called, refused or not.
    pub fn start_calls(&self) -> usize {
        lock(&self.state).start_calls
    }

    /// Record a new fix and deliver it if someone is listening.
    pub fn update(&self, fix: LocationFix) {
        let listener = {
            let mut state = lock(&self.state);
            state.current = Some(fix.clone());
            upgrade(&state.listener)
        };
        if let Some(listener) = listener {
            listener.location_updated(fix);
        }
    }

    /// Report a failure to the listener. The last good fix is kept.
    pub fn fail(&self, error: LocationError) {
        let listener = upgrade(&lock(&self.state).listener);
        if let Some(listener) = listener {
            listener.location_failed(error);
        }
    }

    pub fn is_listening(&self) -> bool {
        lock(&self.state).listener.is_some()
    }
}

impl LocationProvider for ManualLocationProvider {
    fn start_updates(&self, listener: Weak<dyn LocationListener>) -> Result<(), LocationError> {
        let mut state = lock(&self.state);
        state.start_calls += 1;
        if state.permission_denied {
            return Err(LocationError::PermissionDenied);
        }
        state.listener = Some(listener);
        Ok(())
    }

    fn stop_updates(&self) {
        lock(&self.state).listener = None;
    }

    fn current_location(&self) -> Option<LocationFix> {
        lock(&self.state).current.clone()
    }
}

// ─── Fixed provider ─────────────────────────────────────────────

/// Always reports the same coordinates, delivered once on start.
pub struct FixedLocationProvider {
    fix: LocationFix,
}

impl FixedLocationProvider {
    pub fn new(lat: f64, lon: f64) -> Result<Self, LocationError> {
        let coordinate = Coordinate::new(lat, lon)?;
        Ok(Self {
            fix: LocationFix::new(coordinate, LocationSource::Fixed),
        })
    }
}

impl LocationProvider for FixedLocationProvider {
    fn start_updates(&self, listener: Weak<dyn LocationListener>) -> Result<(), LocationError> {
        if let Some(listener) = listener.upgrade() {
            listener.location_updated(self.fix.clone());
        }
        Ok(())
    }

    fn stop_updates(&self) {}

    fn current_location(&self) -> Option<LocationFix> {
        Some(self.fix.clone())
    }
}

// ─── IP-based geolocation ───────────────────────────────────────

pub const DEFAULT_IP_API_URL: &str = "https://ipapi.co/json/";

const USER_AGENT: &str = concat!("TransitRegions/", env!("CARGO_PKG_VERSION"));

#[derive(Deserialize)]
struct IpApiResult {
    latitude: Option<f64>,
    longitude: Option<f64>,
}

/// Geolocate the current machine by its public IP address (blocking).
pub fn ip_geolocate(url: &str) -> Result<LocationFix, LocationError> {
    let response = ureq::get(url)
        .set("User-Agent", USER_AGENT)
        .timeout(Duration::from_secs(5))
        .call()
        .map_err(|e| LocationError::Network(e.to_string()))?;

    let r: IpApiResult = response
        .into_json()
        .map_err(|e| LocationError::InvalidResponse(e.to_string()))?;

    let lat = r.latitude.ok_or_else(|| LocationError::InvalidResponse("no latitude".into()))?;
    let lon = r.longitude.ok_or_else(|| LocationError::InvalidResponse("no longitude".into()))?;

    // City-level precision at best.
    Ok(LocationFix::new(Coordinate::new(lat, lon)?, LocationSource::IpApi).with_accuracy(25_000.0))
}

/// Listener slot shared with the lookup threads.
///
/// Every `start_updates` and `stop_updates` bumps `generation`; a lookup only
/// delivers if the generation it was started under is still current.
#[derive(Default)]
struct IpShared {
    listener: Mutex<ListenerSlot>,
    generation: AtomicU64,
    current: Mutex<Option<LocationFix>>,
}

impl IpShared {
    fn register(&self, listener: Weak<dyn LocationListener>) -> u64 {
        let mut slot = lock(&self.listener);
        *slot = Some(listener);
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn clear(&self) {
        let mut slot = lock(&self.listener);
        *slot = None;
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    fn deliver(&self, generation: u64, result: Result<LocationFix, LocationError>) {
        let listener = {
            let slot = lock(&self.listener);
            if self.generation.load(Ordering::SeqCst) != generation {
                debug!("Discarding IP geolocation result from an earlier subscription");
                return;
            }
            upgrade(&slot)
        };
        // Stopped while the request was in flight.
        let Some(listener) = listener else {
            return;
        };
        match result {
            Ok(fix) => {
                debug!(location = %fix.coordinate, "IP geolocation succeeded");
                *lock(&self.current) = Some(fix.clone());
                listener.location_updated(fix);
            }
            Err(e) => {
                warn!(error = %e, "IP geolocation failed");
                listener.location_failed(e);
            }
        }
    }
}

/// Looks up the IP location on a background thread after `start_updates`.
pub struct IpLocationProvider {
    url: String,
    shared: Arc<IpShared>,
}

impl IpLocationProvider {
    pub fn new() -> Self {
        Self::with_url(DEFAULT_IP_API_URL)
    }

    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            shared: Arc::new(IpShared::default()),
        }
    }
}

impl Default for IpLocationProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl LocationProvider for IpLocationProvider {
    fn start_updates(&self, listener: Weak<dyn LocationListener>) -> Result<(), LocationError> {
        let generation = self.shared.register(listener);

        let url = self.url.clone();
        let shared = Arc::clone(&self.shared);
        thread::Builder::new()
            .name("ip-geolocate".into())
            .spawn(move || shared.deliver(generation, ip_geolocate(&url)))
            .map_err(|e| LocationError::Unavailable(e.to_string()))?;
        Ok(())
    }

    fn stop_updates(&self) {
        self.shared.clear();
    }

    fn current_location(&self) -> Option<LocationFix> {
        lock(&self.shared.current).clone()
    }
}
