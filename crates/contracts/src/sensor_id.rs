//! SensorId - closed set of hub sensors
//!
//! Every sensor has three identities:
//! - a dense table index (`SensorId::index`) used by the engine's slot table
//! - the hub wire id carried in byte 0 of each record
//! - the external `SensorHandle` presented by callers
//!
//! All three are generated from one table so the lookups stay inverse of each other.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of known sensors
pub const SENSOR_COUNT: usize = 17;

/// External sensor handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SensorHandle(pub i32);

impl fmt::Display for SensorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for SensorHandle {
    #[inline]
    fn from(value: i32) -> Self {
        Self(value)
    }
}

/// Decoding class of a sensor
///
/// Determines how raw record fields become an event payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorClass {
    /// Three axes at 0.1 resolution plus accuracy status
    Orientation,
    /// Three axes at 0.01 resolution
    Motion,
    /// Three axes at 0.01 resolution plus accuracy status
    Magnetic,
    /// 32-bit pressure plus temperature
    Pressure,
    /// Quaternion x/y/z at 0.0001 resolution, w derived
    RotationVector,
    /// Three axes plus three bias components
    Uncalibrated,
    /// Raw trigger values, one-shot
    SignificantMotion,
    /// Discrete lux level
    Light,
    /// Step trigger, feeds the step counter
    StepDetector,
    /// 32-bit running count
    StepCounter,
    /// Trigger flag, one-shot
    WakeGesture,
}

impl SensorClass {
    /// Single-trigger classes must be re-armed after every delivered event
    pub const fn is_one_shot(self) -> bool {
        matches!(self, Self::SignificantMotion | Self::WakeGesture)
    }

    /// Classes that accept a non-zero batch timeout
    pub const fn is_batchable(self) -> bool {
        !matches!(self, Self::Light | Self::SignificantMotion)
    }
}

macro_rules! define_sensor_table {
    (
        $(
            $variant:ident => {
                wire: $wire:literal,
                handle: $handle:literal,
                name: $name:literal,
                class: $class:ident $(,)?
            }
        ),+ $(,)?
    ) => {
        /// Known hub sensor
        ///
        /// Variant order defines the dense slot index.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum SensorId {
            $($variant),+
        }

        impl SensorId {
            /// All sensors in slot order
            pub const ALL: [SensorId; SENSOR_COUNT] = [$(SensorId::$variant),+];

            /// Hub wire id
            pub const fn wire_id(self) -> u8 {
                match self {
                    $(SensorId::$variant => $wire),+
                }
            }

            /// External handle
            pub const fn handle(self) -> SensorHandle {
                match self {
                    $(SensorId::$variant => SensorHandle($handle)),+
                }
            }

            /// Stable snake_case name
            pub const fn name(self) -> &'static str {
                match self {
                    $(SensorId::$variant => $name),+
                }
            }

            /// Decoding class
            pub const fn class(self) -> SensorClass {
                match self {
                    $(SensorId::$variant => SensorClass::$class),+
                }
            }

            /// Lookup by hub wire id
            pub const fn from_wire(wire: u8) -> Option<Self> {
                match wire {
                    $($wire => Some(SensorId::$variant),)+
                    _ => None,
                }
            }

            /// Lookup by external handle
            pub const fn from_handle(handle: SensorHandle) -> Option<Self> {
                match handle.0 {
                    $($handle => Some(SensorId::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

define_sensor_table! {
    Accelerometer => { wire: 0, handle: 0, name: "accelerometer", class: Motion },
    Magnetometer => { wire: 1, handle: 1, name: "magnetometer", class: Magnetic },
    Gyroscope => { wire: 2, handle: 2, name: "gyroscope", class: Motion },
    Light => { wire: 3, handle: 3, name: "light", class: Light },
    Pressure => { wire: 5, handle: 4, name: "pressure", class: Pressure },
    Orientation => { wire: 6, handle: 5, name: "orientation", class: Orientation },
    RotationVector => { wire: 7, handle: 6, name: "rotation_vector", class: RotationVector },
    LinearAcceleration => { wire: 8, handle: 7, name: "linear_acceleration", class: Motion },
    Gravity => { wire: 9, handle: 8, name: "gravity", class: Motion },
    MagnetometerUncalibrated => {
        wire: 16,
        handle: 9,
        name: "magnetometer_uncalibrated",
        class: Uncalibrated,
    },
    GyroscopeUncalibrated => {
        wire: 17,
        handle: 10,
        name: "gyroscope_uncalibrated",
        class: Uncalibrated,
    },
    GameRotationVector => {
        wire: 18,
        handle: 11,
        name: "game_rotation_vector",
        class: RotationVector,
    },
    GeomagneticRotationVector => {
        wire: 19,
        handle: 12,
        name: "geomagnetic_rotation_vector",
        class: RotationVector,
    },
    SignificantMotion => {
        wire: 20,
        handle: 13,
        name: "significant_motion",
        class: SignificantMotion,
    },
    StepDetector => { wire: 21, handle: 14, name: "step_detector", class: StepDetector },
    StepCounter => { wire: 22, handle: 15, name: "step_counter", class: StepCounter },
    WakeGesture => { wire: 24, handle: 16, name: "wake_gesture", class: WakeGesture },
}

impl SensorId {
    /// Dense slot index in `0..SENSOR_COUNT`
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Shortcut for `class().is_one_shot()`
    #[inline]
    pub const fn is_one_shot(self) -> bool {
        self.class().is_one_shot()
    }
}

impl fmt::Display for SensorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SensorId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|id| id.name() == s)
            .ok_or_else(|| format!("unknown sensor name: {s}"))
    }
}

impl TryFrom<SensorHandle> for SensorId {
    type Error = SensorHandle;

    fn try_from(handle: SensorHandle) -> Result<Self, Self::Error> {
        Self::from_handle(handle).ok_or(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_index_is_dense() {
        for (i, id) in SensorId::ALL.iter().enumerate() {
            assert_eq!(id.index(), i);
        }
    }

    #[test]
    fn test_handle_lookup_is_bijective() {
        let mut seen = HashSet::new();
        for id in SensorId::ALL {
            assert!(seen.insert(id.handle()), "duplicate handle for {id}");
            assert_eq!(SensorId::from_handle(id.handle()), Some(id));
        }
        assert_eq!(SensorId::from_handle(SensorHandle(99)), None);
        assert_eq!(SensorId::from_handle(SensorHandle(-1)), None);
    }

    #[test]
    fn test_wire_lookup_is_bijective() {
        let mut seen = HashSet::new();
        for id in SensorId::ALL {
            assert!(seen.insert(id.wire_id()), "duplicate wire id for {id}");
            assert_eq!(SensorId::from_wire(id.wire_id()), Some(id));
            assert!(id.wire_id() < 32, "wire id must fit the enable mask");
        }
        assert_eq!(SensorId::from_wire(4), None);
        assert_eq!(SensorId::from_wire(200), None);
    }

    #[test]
    fn test_one_shot_classes() {
        let one_shot: Vec<_> = SensorId::ALL
            .iter()
            .copied()
            .filter(|id| id.is_one_shot())
            .collect();
        assert_eq!(
            one_shot,
            vec![SensorId::SignificantMotion, SensorId::WakeGesture]
        );
    }

    #[test]
    fn test_batchable_classes() {
        assert!(!SensorId::Light.class().is_batchable());
        assert!(!SensorId::SignificantMotion.class().is_batchable());
        assert!(SensorId::Accelerometer.class().is_batchable());
        assert!(SensorId::WakeGesture.class().is_batchable());
    }

    #[test]
    fn test_name_round_trip() {
        for id in SensorId::ALL {
            assert_eq!(id.name().parse::<SensorId>(), Ok(id));
        }
        assert!("barometer".parse::<SensorId>().is_err());
    }

    #[test]
    fn test_serde_uses_name() {
        let json = serde_json::to_string(&SensorId::GameRotationVector).unwrap();
        assert_eq!(json, "\"game_rotation_vector\"");
        let handle = serde_json::to_string(&SensorHandle(7)).unwrap();
        assert_eq!(handle, "7");
    }
}
