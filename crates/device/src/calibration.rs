//! Calibration stores.
//!
//! Both stores hold one line of whitespace-separated integers per blob. The
//! persisted store maps kinds to configured file paths; the hub store maps
//! kinds to attributes in the hub control directory.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use contracts::{CalibrationConfig, CalibrationData, CalibrationKind, CalibrationStore, HubError, Result};
use tracing::debug;

fn read_blob(kind: CalibrationKind, path: &Path) -> Result<CalibrationData> {
    match fs::read_to_string(path) {
        Ok(text) => CalibrationData::parse(kind, &text),
        Err(e) if e.kind() == ErrorKind::NotFound => Err(HubError::CalibrationNotFound { kind }),
        Err(e) => Err(HubError::calibration(
            kind,
            format!("failed to read {}: {e}", path.display()),
        )),
    }
}

fn write_blob(path: &Path, data: &CalibrationData) -> Result<()> {
    fs::write(path, data.to_line()).map_err(|e| {
        HubError::calibration(
            data.kind(),
            format!("failed to write {}: {e}", path.display()),
        )
    })?;
    debug!(kind = %data.kind(), path = %path.display(), "calibration written");
    Ok(())
}

/// Calibration files that survive reboots
#[derive(Debug, Clone, Default)]
pub struct FileCalibrationStore {
    accelerometer: Option<PathBuf>,
    gyroscope: Option<PathBuf>,
    magnetometer: Option<PathBuf>,
}

impl FileCalibrationStore {
    pub fn from_config(config: &CalibrationConfig) -> Self {
        Self {
            accelerometer: config.accelerometer_path.clone(),
            gyroscope: config.gyroscope_path.clone(),
            magnetometer: config.magnetometer_path.clone(),
        }
    }

    pub fn path(&self, kind: CalibrationKind) -> Option<&Path> {
        match kind {
            CalibrationKind::Accelerometer => self.accelerometer.as_deref(),
            CalibrationKind::Gyroscope => self.gyroscope.as_deref(),
            CalibrationKind::Magnetometer => self.magnetometer.as_deref(),
        }
    }
}

impl CalibrationStore for FileCalibrationStore {
    fn load(&self, kind: CalibrationKind) -> Result<CalibrationData> {
        let path = self
            .path(kind)
            .ok_or(HubError::CalibrationNotFound { kind })?;
        read_blob(kind, path)
    }

    fn save(&self, data: &CalibrationData) -> Result<()> {
        let path = self.path(data.kind()).ok_or_else(|| {
            HubError::calibration(data.kind(), "no persisted path configured")
        })?;
        write_blob(path, data)
    }
}

/// Calibration attributes on the hub
#[derive(Debug, Clone)]
pub struct SysfsCalibrationStore {
    control_dir: PathBuf,
    config: CalibrationConfig,
}

impl SysfsCalibrationStore {
    pub fn new(control_dir: impl Into<PathBuf>, config: &CalibrationConfig) -> Self {
        Self {
            control_dir: control_dir.into(),
            config: config.clone(),
        }
    }

    pub fn path(&self, kind: CalibrationKind) -> PathBuf {
        self.control_dir.join(self.config.hub_attr(kind))
    }
}

impl CalibrationStore for SysfsCalibrationStore {
    fn load(&self, kind: CalibrationKind) -> Result<CalibrationData> {
        read_blob(kind, &self.path(kind))
    }

    fn save(&self, data: &CalibrationData) -> Result<()> {
        write_blob(&self.path(data.kind()), data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let config = CalibrationConfig {
            accelerometer_path: Some(dir.path().join("AccOffset.txt")),
            gyroscope_path: None,
            magnetometer_path: Some(dir.path().join("mag.ini")),
            ..Default::default()
        };
        let store = FileCalibrationStore::from_config(&config);

        let blob = CalibrationData::new(CalibrationKind::Accelerometer, vec![12, -3, 40]).unwrap();
        store.save(&blob).unwrap();
        assert_eq!(
            fs::read_to_string(dir.path().join("AccOffset.txt")).unwrap(),
            "12 -3 40\n"
        );
        assert_eq!(store.load(CalibrationKind::Accelerometer).unwrap(), blob);
    }

    #[test]
    fn test_missing_blob_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let config = CalibrationConfig {
            magnetometer_path: Some(dir.path().join("absent.ini")),
            ..Default::default()
        };
        let store = FileCalibrationStore::from_config(&config);
        assert!(matches!(
            store.load(CalibrationKind::Magnetometer),
            Err(HubError::CalibrationNotFound { .. })
        ));
        // unconfigured kind
        assert!(matches!(
            store.load(CalibrationKind::Gyroscope),
            Err(HubError::CalibrationNotFound { .. })
        ));
    }

    #[test]
    fn test_corrupt_blob() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("AccOffset.txt");
        fs::write(&path, "1 two 3\n").unwrap();
        let config = CalibrationConfig {
            accelerometer_path: Some(path),
            ..Default::default()
        };
        let store = FileCalibrationStore::from_config(&config);
        assert!(matches!(
            store.load(CalibrationKind::Accelerometer),
            Err(HubError::Calibration { .. })
        ));
    }

    #[test]
    fn test_sysfs_store_uses_hub_attrs() {
        let dir = tempfile::tempdir().unwrap();
        let store = SysfsCalibrationStore::new(dir.path(), &CalibrationConfig::default());
        let values: Vec<i32> = (0..26).collect();
        fs::write(
            dir.path().join("calibrator_data_mag"),
            values
                .iter()
                .map(i32::to_string)
                .collect::<Vec<_>>()
                .join(" "),
        )
        .unwrap();
        let blob = store.load(CalibrationKind::Magnetometer).unwrap();
        assert_eq!(blob.values(), values.as_slice());

        let gyro = CalibrationData::new(CalibrationKind::Gyroscope, vec![1, 1, 1]).unwrap();
        store.save(&gyro).unwrap();
        assert!(dir.path().join("calibrator_data_gyro").exists());
    }
}
