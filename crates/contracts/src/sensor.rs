//! SensorEvent - engine output
//!
//! Typed, scaled, application-facing sensor readings.

use serde::{Deserialize, Serialize};

use crate::{SensorHandle, SensorId};

/// Scaled sensor reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorEvent {
    /// Sensor that produced the reading
    pub sensor: SensorId,

    /// External handle of `sensor`
    pub handle: SensorHandle,

    /// Delivery timestamp (ns), chosen by `TimestampPolicy`
    pub timestamp: i64,

    /// Raw hub-side timestamp from the wire record
    pub hub_timestamp: i64,

    /// Class-specific payload
    pub payload: EventPayload,
}

impl SensorEvent {
    /// Empty event for a sensor that has not reported yet
    pub fn empty(sensor: SensorId) -> Self {
        Self {
            sensor,
            handle: sensor.handle(),
            timestamp: 0,
            hub_timestamp: 0,
            payload: EventPayload::Empty,
        }
    }
}

/// Event payload, one variant per decoding shape
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    /// No reading yet
    Empty,

    /// Three axes, with accuracy status where the class reports one
    Vector { values: [f32; 3], status: Option<i8> },

    /// Single value (light level in lux)
    Scalar { value: f32 },

    /// Quaternion x, y, z plus derived w
    RotationVector { values: [f32; 4] },

    /// Three axes plus three bias components
    Uncalibrated { values: [f32; 3], bias: [f32; 3] },

    /// Running step count
    StepCounter { steps: u64 },

    /// Trigger values (significant motion, step detector, wake gesture)
    Trigger { values: [f32; 3] },

    /// Pressure in hectopascals plus temperature
    Pressure { hpa: f32, temperature: f32 },
}

/// Item delivered to a drain caller
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HubEvent {
    /// Sensor reading
    Sensor(SensorEvent),

    /// A previously requested flush has finished
    FlushComplete { handle: SensorHandle },
}

impl HubEvent {
    /// External handle the event refers to
    pub fn handle(&self) -> SensorHandle {
        match self {
            HubEvent::Sensor(event) => event.handle,
            HubEvent::FlushComplete { handle } => *handle,
        }
    }

    /// Sensor reading, if this is one
    pub fn as_sensor(&self) -> Option<&SensorEvent> {
        match self {
            HubEvent::Sensor(event) => Some(event),
            HubEvent::FlushComplete { .. } => None,
        }
    }

    pub fn is_flush_complete(&self) -> bool {
        matches!(self, HubEvent::FlushComplete { .. })
    }
}
