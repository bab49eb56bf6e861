//! # Contracts
//!
//! Frozen interface contracts (ICD) between the sensor hub engine and its collaborators.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Identity Model
//! - `SensorId` is the closed set of sensors the hub knows about
//! - the hub addresses sensors by wire id (byte 0 of each record)
//! - callers address sensors by `SensorHandle`
//!
//! ## Time Model
//! - Hub records carry a hub-side timestamp (`hub_timestamp`)
//! - Delivered events carry a host timestamp chosen by `TimestampPolicy`

mod calibration;
mod config;
mod error;
mod record;
mod sensor;
mod sensor_id;
mod transport;

pub use calibration::*;
pub use config::*;
pub use error::*;
pub use record::*;
pub use sensor::*;
pub use sensor_id::{SensorClass, SensorHandle, SensorId, SENSOR_COUNT};
pub use transport::*;
