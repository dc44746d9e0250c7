//! Configuration loaded from ~/.transit-regions/config.json.
//!
//! Every field has a default, so a missing file or a partial file is fine.
//! CLI flags override whatever is loaded here.

use crate::location::providers::DEFAULT_IP_API_URL;
use crate::region::DEFAULT_REGIONS_URL;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Radius used when nothing else is configured.
pub const DEFAULT_RADIUS_MILES: f64 = 100.0;

/// Directory holding the config file and the region store.
pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".transit-regions")
}

/// Tuning for [`crate::RegionHelper`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HelperConfig {
    /// Regions whose footprint is farther than this are not "nearby".
    #[serde(default = "default_radius")]
    pub radius_miles: f64,
    /// Offer experimental regions as nearby candidates.
    #[serde(default)]
    pub include_experimental: bool,
}

fn default_radius() -> f64 {
    DEFAULT_RADIUS_MILES
}

impl Default for HelperConfig {
    fn default() -> Self {
        Self {
            radius_miles: DEFAULT_RADIUS_MILES,
            include_experimental: false,
        }
    }
}

/// Persisted user settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(flatten)]
    pub helper: HelperConfig,
    #[serde(default = "default_regions_url")]
    pub regions_url: String,
    #[serde(default = "default_ip_api_url")]
    pub ip_api_url: String,
}

fn default_regions_url() -> String {
    DEFAULT_REGIONS_URL.to_string()
}

fn default_ip_api_url() -> String {
    DEFAULT_IP_API_URL.to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            helper: HelperConfig::default(),
            regions_url: default_regions_url(),
            ip_api_url: default_ip_api_url(),
        }
    }
}

impl Settings {
    /// Load from the default location, falling back to defaults.
    pub fn load() -> Self {
        Self::load_from(&data_dir().join("config.json"))
    }

    pub fn load_from(path: &Path) -> Self {
        let Ok(data) = fs::read_to_string(path) else {
            return Self::default();
        };
        serde_json::from_str(&data).unwrap_or_else(|e| {
            warn!(path = %path.display(), error = %e, "Invalid config, using defaults");
            Self::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_defaults() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::load_from(&dir.path().join("config.json"));
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.helper.radius_miles, 100.0);
    }

    #[test]
    fn test_partial_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"radius_miles": 50.0, "include_experimental": true}"#).unwrap();

        let settings = Settings::load_from(&path);
        assert_eq!(settings.helper.radius_miles, 50.0);
        assert!(settings.helper.include_experimental);
        assert_eq!(settings.regions_url, DEFAULT_REGIONS_URL);
    }

    #[test]
    fn test_invalid_file_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "radius = 5").unwrap();
        assert_eq!(Settings::load_from(&path), Settings::default());
    }
}
