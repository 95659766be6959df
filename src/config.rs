use crate::api::{DEFAULT_BASE_URL, DEFAULT_PROVIDER_TIMEOUT_MS, DEFAULT_USER_AGENT};
use crate::capture::{CaptureConfig, DEFAULT_HIGH_ACCURACY_METERS};
use crate::geocode::{ReconcilerSettings, DEFAULT_COLLISION_DISTANCE_KM, DEFAULT_MAX_DISTANCE_KM};
use crate::jump::DEFAULT_MAX_SPEED_KMH;
use crate::location::DEFAULT_IP_ACCURACY_METERS;
use crate::regions::{BoundingBox, RegionRegistry, DEFAULT_BBOX_BUFFER_DEG, INDIA_BOUNDING_BOX};
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub capture: CaptureSection,
    pub location: LocationConfig,
    pub jump: JumpConfig,
    pub geocoding: GeocodingConfig,
    pub regions: RegionsConfig,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct CaptureSection {
    pub max_accuracy_meters: f64,
    /// Soft threshold used by the high-accuracy capture variant.
    pub high_accuracy_meters: f64,
    pub timeout_ms: u64,
    pub enable_high_accuracy: bool,
    pub maximum_age_ms: u64,
}

impl Default for CaptureSection {
    fn default() -> Self {
        let policy = CaptureConfig::default();
        Self {
            max_accuracy_meters: policy.max_accuracy_meters,
            high_accuracy_meters: DEFAULT_HIGH_ACCURACY_METERS,
            timeout_ms: policy.timeout_ms,
            enable_high_accuracy: policy.enable_high_accuracy,
            maximum_age_ms: policy.maximum_age_ms,
        }
    }
}

impl CaptureSection {
    pub fn policy(&self) -> CaptureConfig {
        CaptureConfig {
            max_accuracy_meters: self.max_accuracy_meters,
            timeout_ms: self.timeout_ms,
            enable_high_accuracy: self.enable_high_accuracy,
            maximum_age_ms: self.maximum_age_ms,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct LocationConfig {
    pub auto_locate: bool,        // Use IP geolocation if true
    pub manual_lat: f64,          // Latitude used if auto_locate is false
    pub manual_lon: f64,          // Longitude used if auto_locate is false
    pub lookup_ip: String,        // Address handed to the IP geolocation service
    pub ip_accuracy_meters: f64,  // Accuracy assigned to IP-derived fixes
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            auto_locate: true,
            manual_lat: 19.0760,
            manual_lon: 72.8777,
            lookup_ip: "1.1.1.1".to_string(),
            ip_accuracy_meters: DEFAULT_IP_ACCURACY_METERS,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct JumpConfig {
    pub max_speed_kmh: f64,
}

impl Default for JumpConfig {
    fn default() -> Self {
        Self {
            max_speed_kmh: DEFAULT_MAX_SPEED_KMH,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct GeocodingConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub user_agent: String,
    pub timeout_ms: u64,
    pub max_distance_km: f64,
    pub collision_distance_km: f64,
    pub country_codes: Option<String>,
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_ms: DEFAULT_PROVIDER_TIMEOUT_MS,
            max_distance_km: DEFAULT_MAX_DISTANCE_KM,
            collision_distance_km: DEFAULT_COLLISION_DISTANCE_KM,
            country_codes: Some("in".to_string()),
        }
    }
}

impl GeocodingConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn reconciler_settings(&self) -> ReconcilerSettings {
        ReconcilerSettings {
            timeout: self.timeout(),
            max_distance_km: self.max_distance_km,
            collision_distance_km: self.collision_distance_km,
            country_codes: self.country_codes.clone(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct RegionsConfig {
    pub file: Option<String>, // CSV region table; built-in metros if unset
    pub bbox_buffer_deg: f64,
    pub country_box: BoundingBox,
}

impl Default for RegionsConfig {
    fn default() -> Self {
        Self {
            file: None,
            bbox_buffer_deg: DEFAULT_BBOX_BUFFER_DEG,
            country_box: INDIA_BOUNDING_BOX,
        }
    }
}

impl RegionsConfig {
    /// Builds the registry once; it is read-only from here on.
    pub fn load_registry(&self) -> Result<RegionRegistry> {
        match &self.file {
            Some(path) => RegionRegistry::from_csv(path, self.country_box, self.bbox_buffer_deg),
            None => Ok(RegionRegistry::builtin_with(
                self.country_box,
                self.bbox_buffer_deg,
            )),
        }
    }
}

impl Config {
    /// Parses a TOML document; missing sections take their defaults.
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).wrap_err("Failed to parse configuration")
    }

    /// Loads config.toml from the given path.
    /// If it doesn't exist, creates a default one.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let config_path = path.as_ref();

        if let Ok(content) = fs::read_to_string(config_path) {
            match Self::from_toml(&content) {
                Ok(config) => return config,
                Err(e) => {
                    warn!(
                        "Failed to parse {}: {:?}. Using defaults.",
                        config_path.display(),
                        e
                    );
                    return Self::default();
                }
            }
        }

        let default_config = Self::default();

        // Save default config to disk for the operator to edit later
        match toml::to_string_pretty(&default_config) {
            Ok(toml_string) => {
                if fs::write(config_path, toml_string).is_err() {
                    warn!("Could not write default {} to disk.", config_path.display());
                }
            }
            Err(e) => warn!("Could not serialize default configuration: {}", e),
        }

        info!("Loaded default configuration.");
        default_config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            [jump]
            max_speed_kmh = 120.0

            [capture]
            timeout_ms = 5000
            "#,
        )
        .unwrap();

        assert_eq!(config.jump.max_speed_kmh, 120.0);
        assert_eq!(config.capture.policy().timeout_ms, 5000);
        assert_eq!(config.capture.policy().max_accuracy_meters, 100.0);
        assert_eq!(config.geocoding.max_distance_km, 5.0);
    }

    #[test]
    fn test_bad_toml_is_an_error() {
        assert!(Config::from_toml("[jump\nmax_speed_kmh = ").is_err());
    }

    #[test]
    fn test_load_writes_defaults_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let config = Config::load(&path);
        assert_eq!(config, Config::default());
        assert!(path.exists());

        // The file written is readable by the same loader.
        assert_eq!(Config::load(&path), Config::default());
    }

    #[test]
    fn test_load_falls_back_on_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "capture = 12").unwrap();

        assert_eq!(Config::load(&path), Config::default());
    }

    #[test]
    fn test_builtin_registry_uses_configured_box() {
        let regions = RegionsConfig {
            bbox_buffer_deg: 0.25,
            ..Default::default()
        };
        let registry = regions.load_registry().unwrap();

        assert_eq!(registry.len(), 8);
        let pune = registry.get("pune").unwrap();
        assert!((registry.bounds(pune).max_lat - 18.7704).abs() < 1e-9);
    }

    #[test]
    fn test_missing_region_file_is_an_error() {
        let regions = RegionsConfig {
            file: Some("/nonexistent/regions.csv".into()),
            ..Default::default()
        };
        assert!(regions.load_registry().is_err());
    }
}
