//! # Config Loader
//!
//! Loads and validates the hub configuration.
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let config = ConfigLoader::load_from_path(Path::new("hub.toml")).unwrap();
//! println!("device: {}", config.device.device_name);
//! ```

mod parser;
mod validator;

pub use contracts::HubConfig;
pub use parser::ConfigFormat;

use contracts::{HubError, SensorId, SensorSetting};
use std::path::Path;

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a file.
    ///
    /// The format is detected from the extension (`.toml` / `.json`).
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_path(path: &Path) -> Result<HubConfig, HubError> {
        let format = Self::detect_format(path)?;
        let content = std::fs::read_to_string(path)?;
        Self::load_from_str(&content, format)
    }

    /// Load configuration from a string
    pub fn load_from_str(content: &str, format: ConfigFormat) -> Result<HubConfig, HubError> {
        let config = parser::parse(content, format)?;
        validator::validate(&config)?;
        Ok(config)
    }

    /// Validate an already-built config
    pub fn validate(config: &HubConfig) -> Result<(), HubError> {
        validator::validate(config)
    }

    pub fn to_toml(config: &HubConfig) -> Result<String, HubError> {
        toml::to_string_pretty(config)
            .map_err(|e| HubError::config_parse(format!("TOML serialize error: {e}")))
    }

    pub fn to_json(config: &HubConfig) -> Result<String, HubError> {
        serde_json::to_string_pretty(config)
            .map_err(|e| HubError::config_parse(format!("JSON serialize error: {e}")))
    }

    /// Resolve the configured start-up sensors.
    ///
    /// Only meaningful on a validated config; unknown names are skipped.
    pub fn startup_sensors(config: &HubConfig) -> Vec<(SensorId, &SensorSetting)> {
        config
            .sensors
            .iter()
            .filter_map(|s| s.name.parse::<SensorId>().ok().map(|id| (id, s)))
            .collect()
    }

    fn detect_format(path: &Path) -> Result<ConfigFormat, HubError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| HubError::config_parse("cannot determine file format from extension"))?;

        ConfigFormat::from_extension(ext)
            .ok_or_else(|| HubError::config_parse(format!("unsupported config format: .{ext}")))
    }
}
