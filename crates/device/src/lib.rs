//! # Device
//!
//! Linux bindings for the sensor hub.
//!
//! - IIO device discovery by name
//! - Sysfs control sink and calibration attributes
//! - Character device and capture file event sources
//! - Bring-up: buffer arm, calibration restore, start-up sensors

pub mod bringup;
pub mod calibration;
pub mod discovery;
pub mod error;
pub mod source;
pub mod sysfs;

pub use bringup::{apply_sensor_settings, bring_up, replay_engine, HubDevice, ReplayControl};
pub use calibration::{FileCalibrationStore, SysfsCalibrationStore};
pub use discovery::{discover, IioDevice};
pub use error::{DeviceError, Result};
pub use source::{CaptureFileSource, IioEventSource};
pub use sysfs::SysfsControl;
