use thiserror::Error;

use crate::location::LocationError;
use crate::region::{FetchError, StoreError};

/// Errors surfaced by [`crate::RegionHelper`] operations.
#[derive(Debug, Error)]
pub enum RegionError {
    #[error(transparent)]
    Location(#[from] LocationError),

    #[error("region refresh failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("region store write failed: {0}")]
    Store(#[from] StoreError),
}
