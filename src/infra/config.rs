//! Configuration loading from TOML files
//!
//! Config file is selected via:
//! 1. --config <path> command line argument
//! 2. CONFIG_FILE environment variable
//! 3. Default: config/dev.toml

use crate::domain::types::FacilityPoint;
use anyhow::Context;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct SiteConfig {
    /// Unique site identifier (e.g. "somnath", "dwarka")
    #[serde(default = "default_site_id")]
    pub id: String,
}

fn default_site_id() -> String {
    "temple".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the temple-management backend
    #[serde(default = "default_api_base_url")]
    pub base_url: String,
    /// Bearer credential for SOS creation and staff alert actions
    #[serde(default)]
    pub bearer_token: Option<String>,
    /// Per-request timeout so an in-flight poll never blocks the next tick
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_api_base_url(),
            bearer_token: None,
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

fn default_api_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    /// Live occupancy poll cadence
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self { poll_interval_ms: default_poll_interval_ms() }
    }
}

fn default_poll_interval_ms() -> u64 {
    5_000
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlertsConfig {
    /// SOS alert feed refresh cadence
    #[serde(default = "default_alert_refresh_interval_ms")]
    pub refresh_interval_ms: u64,
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self { refresh_interval_ms: default_alert_refresh_interval_ms() }
    }
}

fn default_alert_refresh_interval_ms() -> u64 {
    5_000
}

#[derive(Debug, Clone, Deserialize)]
pub struct MapConfig {
    #[serde(default = "default_map_center_lat")]
    pub center_lat: f64,
    #[serde(default = "default_map_center_lon")]
    pub center_lon: f64,
    #[serde(default = "default_map_zoom")]
    pub zoom: u8,
    #[serde(default = "default_tile_url")]
    pub tile_url: String,
    #[serde(default = "default_tile_attribution")]
    pub tile_attribution: String,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            center_lat: default_map_center_lat(),
            center_lon: default_map_center_lon(),
            zoom: default_map_zoom(),
            tile_url: default_tile_url(),
            tile_attribution: default_tile_attribution(),
        }
    }
}

// Somnath temple grounds
fn default_map_center_lat() -> f64 {
    20.8880
}

fn default_map_center_lon() -> f64 {
    70.4013
}

fn default_map_zoom() -> u8 {
    16
}

fn default_tile_url() -> String {
    "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png".to_string()
}

fn default_tile_attribution() -> String {
    "© OpenStreetMap contributors".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct FacilityEntry {
    pub id: String,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub alerts: AlertsConfig,
    #[serde(default)]
    pub map: MapConfig,
    #[serde(default)]
    pub facilities: Vec<FacilityEntry>,
}

/// Main configuration struct used throughout the application
#[derive(Debug, Clone)]
pub struct Config {
    site_id: String,
    api_base_url: String,
    api_bearer_token: Option<String>,
    request_timeout_ms: u64,
    poll_interval_ms: u64,
    alert_refresh_interval_ms: u64,
    map_center_lat: f64,
    map_center_lon: f64,
    map_zoom: u8,
    tile_url: String,
    tile_attribution: String,
    facilities: Vec<FacilityPoint>,
    config_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            site_id: default_site_id(),
            api_base_url: default_api_base_url(),
            api_bearer_token: None,
            request_timeout_ms: default_request_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            alert_refresh_interval_ms: default_alert_refresh_interval_ms(),
            map_center_lat: default_map_center_lat(),
            map_center_lon: default_map_center_lon(),
            map_zoom: default_map_zoom(),
            tile_url: default_tile_url(),
            tile_attribution: default_tile_attribution(),
            facilities: Self::default_facilities(),
            config_file: "default".to_string(),
        }
    }
}

impl Config {
    /// Facility points drawn by the intensity overlay when none are configured
    pub fn default_facilities() -> Vec<FacilityPoint> {
        vec![
            FacilityPoint::new("main_entrance", "Main Entrance", 20.8880, 70.4013),
            FacilityPoint::new("sabha_mandap", "Sabha Mandap", 20.8882, 70.4015),
            FacilityPoint::new("nritya_mandap", "Nritya Mandap", 20.8878, 70.4011),
        ]
    }

    /// Determine config file path from args or environment
    pub fn resolve_config_path(args: &[String]) -> String {
        for (i, arg) in args.iter().enumerate() {
            if arg == "--config" {
                if let Some(path) = args.get(i + 1) {
                    return path.clone();
                }
            }
            if let Some(path) = arg.strip_prefix("--config=") {
                return path.to_string();
            }
        }

        if let Ok(path) = env::var("CONFIG_FILE") {
            return path;
        }

        "config/dev.toml".to_string()
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let toml_config: TomlConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        let facilities = if toml_config.facilities.is_empty() {
            Self::default_facilities()
        } else {
            toml_config
                .facilities
                .into_iter()
                .map(|f| FacilityPoint::new(&f.id, &f.name, f.lat, f.lon))
                .collect()
        };

        Ok(Self {
            site_id: toml_config.site.id,
            api_base_url: toml_config.api.base_url,
            api_bearer_token: toml_config.api.bearer_token,
            request_timeout_ms: toml_config.api.request_timeout_ms,
            poll_interval_ms: toml_config.telemetry.poll_interval_ms,
            alert_refresh_interval_ms: toml_config.alerts.refresh_interval_ms,
            map_center_lat: toml_config.map.center_lat,
            map_center_lon: toml_config.map.center_lon,
            map_zoom: toml_config.map.zoom,
            tile_url: toml_config.map.tile_url,
            tile_attribution: toml_config.map.tile_attribution,
            facilities,
            config_file: path.display().to_string(),
        })
    }

    /// Load configuration - tries the TOML file first, falls back to defaults
    pub fn load_from_path(path: &str) -> Self {
        match Self::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Warning: {}. Using defaults.", e);
                Self::default()
            }
        }
    }

    // Getters for all config fields
    pub fn site_id(&self) -> &str {
        &self.site_id
    }

    pub fn api_base_url(&self) -> &str {
        &self.api_base_url
    }

    pub fn api_bearer_token(&self) -> Option<&str> {
        self.api_bearer_token.as_deref()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn poll_interval_ms(&self) -> u64 {
        self.poll_interval_ms
    }

    pub fn alert_refresh_interval(&self) -> Duration {
        Duration::from_millis(self.alert_refresh_interval_ms)
    }

    pub fn map_center(&self) -> (f64, f64) {
        (self.map_center_lat, self.map_center_lon)
    }

    pub fn map_zoom(&self) -> u8 {
        self.map_zoom
    }

    pub fn tile_url(&self) -> &str {
        &self.tile_url
    }

    pub fn tile_attribution(&self) -> &str {
        &self.tile_attribution
    }

    pub fn facilities(&self) -> &[FacilityPoint] {
        &self.facilities
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.site_id(), "temple");
        assert_eq!(config.api_base_url(), "http://localhost:8000");
        assert_eq!(config.poll_interval(), Duration::from_secs(5));
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.facilities().len(), 3);
        assert_eq!(config.facilities()[0].id.as_str(), "main_entrance");
    }

    #[test]
    fn test_resolve_config_path_from_args() {
        let args = vec!["--config".to_string(), "/tmp/test.toml".to_string()];
        assert_eq!(Config::resolve_config_path(&args), "/tmp/test.toml");

        let args = vec!["--config=/tmp/other.toml".to_string()];
        assert_eq!(Config::resolve_config_path(&args), "/tmp/other.toml");
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config: TomlConfig = toml::from_str("").unwrap();
        assert_eq!(config.telemetry.poll_interval_ms, 5_000);
        assert_eq!(config.api.request_timeout_ms, 10_000);
        assert!(config.facilities.is_empty());
    }
}
