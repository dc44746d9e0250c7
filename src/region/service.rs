//! Region fetch services: the OneBusAway regions document over HTTP, and a
//! canned service for offline use.

use super::types::{FetchError, Region};
use super::RegionFetchService;
use crate::sync::lock;
use serde::Deserialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, info};

pub const DEFAULT_REGIONS_URL: &str = "https://regions.onebusaway.org/regions-v3.json";

const USER_AGENT: &str = concat!("TransitRegions/", env!("CARGO_PKG_VERSION"));

#[derive(Deserialize)]
struct RegionsResponse {
    code: i64,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    data: Option<RegionsData>,
}

#[derive(Deserialize)]
struct RegionsData {
    #[serde(default)]
    list: Vec<Region>,
}

/// Decode a regions document: `{"code": 200, "data": {"list": [...]}}`.
pub fn parse_regions_document(body: &str) -> Result<Vec<Region>, FetchError> {
    let response: RegionsResponse =
        serde_json::from_str(body).map_err(|e| FetchError::InvalidResponse(e.to_string()))?;

    if response.code != 200 {
        debug!(code = response.code, text = ?response.text, "Regions endpoint reported failure");
        return Err(FetchError::Status(response.code));
    }

    let data = response
        .data
        .ok_or_else(|| FetchError::InvalidResponse("missing data".into()))?;
    Ok(data.list)
}

/// Fetches the region list from a regions-v3 style endpoint.
pub struct HttpRegionService {
    url: String,
    timeout: Duration,
}

impl HttpRegionService {
    pub fn new() -> Self {
        Self::with_url(DEFAULT_REGIONS_URL)
    }

    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Default for HttpRegionService {
    fn default() -> Self {
        Self::new()
    }
}

impl RegionFetchService for HttpRegionService {
    fn fetch_regions(&self) -> Result<Vec<Region>, FetchError> {
        info!(url = %self.url, "Fetching regions");
        let body = ureq::get(&self.url)
            .set("User-Agent", USER_AGENT)
            .timeout(self.timeout)
            .call()
            .map_err(|e| FetchError::Network(e.to_string()))?
            .into_string()
            .map_err(|e| FetchError::InvalidResponse(e.to_string()))?;

        let regions = parse_regions_document(&body)?;
        debug!(count = regions.len(), "Fetched regions");
        Ok(regions)
    }
}

/// Returns a preset answer. Used for offline mode and by tests.
pub struct StaticRegionService {
    response: Mutex<Result<Vec<Region>, FetchError>>,
    calls: AtomicUsize,
}

impl StaticRegionService {
    pub fn new(regions: Vec<Region>) -> Self {
        Self {
            response: Mutex::new(Ok(regions)),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(error: FetchError) -> Self {
        Self {
            response: Mutex::new(Err(error)),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set_response(&self, response: Result<Vec<Region>, FetchError>) {
        *lock(&self.response) = response;
    }

    /// Number of fetches served so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl RegionFetchService for StaticRegionService {
    fn fetch_regions(&self) -> Result<Vec<Region>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.response).clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_document() {
        let body = r#"{
            "code": 200,
            "currentTime": 1700000000000,
            "text": "OK",
            "version": 3,
            "data": {
                "list": [
                    {"id": 0, "regionName": "Tampa Bay", "active": true,
                     "supportsObaRealtimeApis": true, "experimental": false,
                     "bounds": [{"lat": 27.97, "lon": -82.45, "latSpan": 0.5, "lonSpan": 0.6}]},
                    {"id": 1, "regionName": "Puget Sound", "active": true,
                     "supportsObaRealtimeApis": true, "experimental": false, "bounds": []}
                ],
                "references": {}
            }
        }"#;
        let regions = parse_regions_document(body).unwrap();
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].name, "Tampa Bay");
        assert_eq!(regions[1].id, 1);
    }

    #[test]
    fn test_parse_empty_list_is_ok() {
        let regions = parse_regions_document(r#"{"code": 200, "data": {"list": []}}"#).unwrap();
        assert!(regions.is_empty());
    }

    #[test]
    fn test_parse_rejects_error_code() {
        let err = parse_regions_document(r#"{"code": 500, "text": "boom"}"#).unwrap_err();
        assert_eq!(err, FetchError::Status(500));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            parse_regions_document("<html>"),
            Err(FetchError::InvalidResponse(_))
        ));
        assert!(matches!(
            parse_regions_document(r#"{"code": 200}"#),
            Err(FetchError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_static_service() {
        let service = StaticRegionService::new(vec![Region::new(1, "A")]);
        assert_eq!(service.fetch_regions().unwrap().len(), 1);
        service.set_response(Err(FetchError::Network("down".into())));
        assert!(service.fetch_regions().is_err());
        assert_eq!(service.calls(), 2);
    }

    #[test]
    fn test_http_service_builder() {
        let service = HttpRegionService::with_url("http://localhost/regions.json")
            .with_timeout(Duration::from_secs(1));
        assert_eq!(service.url(), "http://localhost/regions.json");
        assert_eq!(HttpRegionService::new().url(), DEFAULT_REGIONS_URL);
    }
}
