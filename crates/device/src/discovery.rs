//! IIO device discovery.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{DeviceError, Result};

const DEVICE_PREFIX: &str = "iio:device";

/// A discovered IIO device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IioDevice {
    /// `N` in `iio:deviceN`
    pub index: u32,
    /// Value of the `name` attribute
    pub name: String,
    /// `<iio_dir>/iio:deviceN`
    pub sysfs_dir: PathBuf,
    /// `<dev_dir>/iio:deviceN`
    pub dev_path: PathBuf,
}

impl IioDevice {
    /// Trigger bound to the device buffer
    pub fn trigger_name(&self) -> String {
        format!("{}-dev{}", self.name, self.index)
    }
}

/// Find the lowest-numbered `iio:deviceN` whose `name` matches
pub fn discover(iio_dir: &Path, dev_dir: &Path, device_name: &str) -> Result<IioDevice> {
    let entries = fs::read_dir(iio_dir).map_err(|source| DeviceError::Discovery {
        dir: iio_dir.to_path_buf(),
        source,
    })?;

    let mut candidates: Vec<(u32, PathBuf)> = entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let file_name = entry.file_name();
            let index = file_name
                .to_str()?
                .strip_prefix(DEVICE_PREFIX)?
                .parse::<u32>()
                .ok()?;
            Some((index, entry.path()))
        })
        .collect();
    candidates.sort_unstable_by_key(|(index, _)| *index);

    for (index, sysfs_dir) in candidates {
        let Ok(name) = fs::read_to_string(sysfs_dir.join("name")) else {
            debug!(dir = %sysfs_dir.display(), "no name attribute, skipping");
            continue;
        };
        if name.trim() != device_name {
            continue;
        }
        let device = IioDevice {
            index,
            name: device_name.to_string(),
            dev_path: dev_dir.join(format!("{DEVICE_PREFIX}{index}")),
            sysfs_dir,
        };
        info!(index, dev = %device.dev_path.display(), "IIO device found");
        return Ok(device);
    }

    Err(DeviceError::NotFound {
        name: device_name.to_string(),
        dir: iio_dir.to_path_buf(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn add_device(root: &Path, index: u32, name: &str) {
        let dir = root.join(format!("iio:device{index}"));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("name"), format!("{name}\n")).unwrap();
    }

    #[test]
    fn test_discover_by_name() {
        let root = tempfile::tempdir().unwrap();
        add_device(root.path(), 0, "accel_3d");
        add_device(root.path(), 2, "CwMcuSensor");
        fs::create_dir_all(root.path().join("trigger0")).unwrap();

        let device = discover(root.path(), Path::new("/dev"), "CwMcuSensor").unwrap();
        assert_eq!(device.index, 2);
        assert_eq!(device.dev_path, Path::new("/dev/iio:device2"));
        assert_eq!(device.trigger_name(), "CwMcuSensor-dev2");
    }

    #[test]
    fn test_lowest_index_wins() {
        let root = tempfile::tempdir().unwrap();
        add_device(root.path(), 10, "CwMcuSensor");
        add_device(root.path(), 3, "CwMcuSensor");
        let device = discover(root.path(), Path::new("/dev"), "CwMcuSensor").unwrap();
        assert_eq!(device.index, 3);
    }

    #[test]
    fn test_not_found() {
        let root = tempfile::tempdir().unwrap();
        add_device(root.path(), 0, "other");
        let err = discover(root.path(), Path::new("/dev"), "CwMcuSensor").unwrap_err();
        assert!(matches!(err, DeviceError::NotFound { .. }));
    }

    #[test]
    fn test_missing_bus_dir() {
        let err = discover(
            Path::new("/nonexistent/iio"),
            Path::new("/dev"),
            "CwMcuSensor",
        )
        .unwrap_err();
        assert!(matches!(err, DeviceError::Discovery { .. }));
    }
}
