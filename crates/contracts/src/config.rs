//! HubConfig - configuration contracts shared across crates
//!
//! Parsed by `config_loader`, consumed by `device`, `hub_engine` and the CLI.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use validator::Validate;

use crate::CalibrationKind;

/// Top-level hub configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct HubConfig {
    /// Device discovery and buffer setup
    #[serde(default)]
    #[validate(nested)]
    pub device: DeviceConfig,

    /// Engine tuning
    #[serde(default)]
    #[validate(nested)]
    pub engine: EngineConfig,

    /// Calibration persistence
    #[serde(default)]
    #[validate(nested)]
    pub calibration: CalibrationConfig,

    /// Sensors enabled at start
    #[serde(default)]
    #[validate(nested)]
    pub sensors: Vec<SensorSetting>,

    /// Logging and metrics
    #[serde(default)]
    #[validate(nested)]
    pub observability: ObservabilitySettings,
}

/// Device discovery configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct DeviceConfig {
    /// IIO bus directory scanned for `iio:deviceN`
    pub iio_dir: PathBuf,

    /// Value of the device `name` attribute
    #[validate(length(min = 1))]
    pub device_name: String,

    /// Directory holding `iio:deviceN` character devices
    pub dev_dir: PathBuf,

    /// Hub control attribute directory
    pub control_dir: PathBuf,

    /// Hub-side buffer length in records
    #[validate(range(min = 1, max = 65536))]
    pub buffer_length: u32,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            iio_dir: PathBuf::from("/sys/bus/iio/devices/"),
            device_name: "CwMcuSensor".to_string(),
            dev_dir: PathBuf::from("/dev"),
            control_dir: PathBuf::from("/sys/class/htc_sensorhub/sensor_hub/"),
            buffer_length: 1024,
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct EngineConfig {
    /// Undrained records retained between drain calls
    #[validate(range(min = 1))]
    pub reader_capacity: usize,

    /// Events requested per drain call
    #[validate(range(min = 1))]
    pub drain_capacity: usize,

    /// How delivered events are stamped
    #[serde(default)]
    pub timestamp_policy: TimestampPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            reader_capacity: 1024,
            drain_capacity: 64,
            timestamp_policy: TimestampPolicy::default(),
        }
    }
}

/// Delivery timestamp policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampPolicy {
    /// Host monotonic clock sampled at drain time
    #[default]
    HostClock,
    /// Committed resync reference plus hub timestamp once synced
    HubCorrected,
}

/// Calibration file configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Restore persisted calibration at bring-up
    pub restore_on_start: bool,

    /// Persisted accelerometer blob
    pub accelerometer_path: Option<PathBuf>,

    /// Persisted gyroscope blob
    pub gyroscope_path: Option<PathBuf>,

    /// Persisted magnetometer blob
    pub magnetometer_path: Option<PathBuf>,

    /// Hub-side accelerometer attribute, relative to the control dir
    #[validate(length(min = 1))]
    pub hub_accelerometer_attr: String,

    /// Hub-side gyroscope attribute, relative to the control dir
    #[validate(length(min = 1))]
    pub hub_gyroscope_attr: String,

    /// Hub-side magnetometer attribute, relative to the control dir
    #[validate(length(min = 1))]
    pub hub_magnetometer_attr: String,
}

impl CalibrationConfig {
    /// Persisted path for a kind
    pub fn persisted_path(&self, kind: CalibrationKind) -> Option<&PathBuf> {
        match kind {
            CalibrationKind::Accelerometer => self.accelerometer_path.as_ref(),
            CalibrationKind::Gyroscope => self.gyroscope_path.as_ref(),
            CalibrationKind::Magnetometer => self.magnetometer_path.as_ref(),
        }
    }

    /// Hub attribute for a kind
    pub fn hub_attr(&self, kind: CalibrationKind) -> &str {
        match kind {
            CalibrationKind::Accelerometer => &self.hub_accelerometer_attr,
            CalibrationKind::Gyroscope => &self.hub_gyroscope_attr,
            CalibrationKind::Magnetometer => &self.hub_magnetometer_attr,
        }
    }
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            restore_on_start: true,
            accelerometer_path: Some(PathBuf::from("/data/misc/AccOffset.txt")),
            gyroscope_path: None,
            magnetometer_path: Some(PathBuf::from("/data/misc/cw_calibrator_mag.ini")),
            hub_accelerometer_attr: "calibrator_data_acc".to_string(),
            hub_gyroscope_attr: "calibrator_data_gyro".to_string(),
            hub_magnetometer_attr: "calibrator_data_mag".to_string(),
        }
    }
}

/// Sensor enabled at start
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SensorSetting {
    /// Sensor name (`SensorId::name`)
    #[validate(length(min = 1))]
    pub name: String,

    /// Sampling period in milliseconds
    #[serde(default)]
    #[validate(range(min = 1))]
    pub period_ms: Option<u64>,

    /// Batch timeout in milliseconds
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// JSON structured logs
    #[default]
    Json,
    /// Human readable
    Pretty,
    /// Compact single line
    Compact,
}

/// Logging and metrics settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ObservabilitySettings {
    pub log_format: LogFormat,

    #[validate(length(min = 1))]
    pub log_level: String,

    /// Prometheus port (None = disabled)
    #[serde(default)]
    pub metrics_port: Option<u16>,
}

impl Default for ObservabilitySettings {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Json,
            log_level: "info".to_string(),
            metrics_port: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = HubConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.device.buffer_length, 1024);
        assert_eq!(config.engine.timestamp_policy, TimestampPolicy::HostClock);
    }

    #[test]
    fn test_zero_buffer_length_rejected() {
        let mut config = HubConfig::default();
        config.device.buffer_length = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_policy_serde() {
        let policy: TimestampPolicy = serde_json::from_str("\"hub_corrected\"").unwrap();
        assert_eq!(policy, TimestampPolicy::HubCorrected);
    }

    #[test]
    fn test_calibration_lookup() {
        let config = CalibrationConfig::default();
        assert!(config
            .persisted_path(CalibrationKind::Magnetometer)
            .is_some());
        assert!(config.persisted_path(CalibrationKind::Gyroscope).is_none());
        assert_eq!(
            config.hub_attr(CalibrationKind::Magnetometer),
            "calibrator_data_mag"
        );
    }
}
