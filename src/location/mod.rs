//! Location subsystem.
//!
//! A [`LocationProvider`] pushes fixes and failures to a registered
//! [`LocationListener`]. Providers own their delivery thread (if any); a
//! listener must accept calls from whichever thread the provider uses.

pub mod providers;
pub mod types;

use std::sync::Weak;

pub use providers::{ip_geolocate, FixedLocationProvider, IpLocationProvider, ManualLocationProvider};
pub use types::{Coordinate, LocationError, LocationFix, LocationSource};

/// Receives location updates from a [`LocationProvider`].
pub trait LocationListener: Send + Sync {
    fn location_updated(&self, fix: LocationFix);
    fn location_failed(&self, error: LocationError);
}

/// Source of location fixes.
///
/// The provider only keeps a `Weak` handle to its listener, so registering
/// never extends the listener's lifetime.
pub trait LocationProvider: Send + Sync {
    /// Begin delivering updates to `listener`. Replaces any previous listener.
    ///
    /// Returns an error when updates cannot be started at all (for example,
    /// permission was refused). Failures after a successful start are
    /// reported through [`LocationListener::location_failed`].
    fn start_updates(&self, listener: Weak<dyn LocationListener>) -> Result<(), LocationError>;

    /// Stop delivering updates and forget the listener.
    fn stop_updates(&self);

    /// Most recent fix, if one has been obtained.
    fn current_location(&self) -> Option<LocationFix>;
}
