//! Collaborator traits at the transport boundary
//!
//! The engine never opens device paths itself. It reads raw bytes through an
//! `EventSource`, writes control lines through a `ControlSink`, and samples
//! time through a `Clock`. Real devices and test mocks implement the same traits.

use bytes::Bytes;
use std::fmt;

use crate::{Result, SensorId, TIMESTAMP_SYNC_CODE};

/// Raw byte supply of the hub's event stream
///
/// Owned by the single drain context.
pub trait EventSource: Send {
    /// Read up to `max_len` bytes.
    ///
    /// An empty buffer means no data is currently available.
    /// Read failures surface as `HubError::TransportFailure`.
    fn read_raw(&mut self, max_len: usize) -> Result<Bytes>;
}

impl<T: EventSource + ?Sized> EventSource for Box<T> {
    fn read_raw(&mut self, max_len: usize) -> Result<Bytes> {
        (**self).read_raw(max_len)
    }
}

/// Accepts control-channel writes
///
/// Shared by the control plane. Implementations must be safe to call from any thread.
pub trait ControlSink: Send + Sync {
    /// Write one control command
    fn write_control(&self, command: &ControlCommand) -> Result<()>;
}

/// Monotonic time source in nanoseconds
pub trait Clock: Send + Sync {
    fn now_ns(&self) -> i64;
}

/// Control attribute a command is written to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlAttr {
    Enable,
    BatchEnable,
    Flush,
    DelayMs,
    BufferEnable,
    BufferLength,
    CurrentTrigger,
}

impl ControlAttr {
    /// Attribute path relative to the control directory
    pub const fn path(self) -> &'static str {
        match self {
            ControlAttr::Enable => "enable",
            ControlAttr::BatchEnable => "batch_enable",
            ControlAttr::Flush => "flush",
            ControlAttr::DelayMs => "delay_ms",
            ControlAttr::BufferEnable => "iio/buffer/enable",
            ControlAttr::BufferLength => "iio/buffer/length",
            ControlAttr::CurrentTrigger => "iio/trigger/current_trigger",
        }
    }
}

impl fmt::Display for ControlAttr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Control-channel command
///
/// Sensor-addressed commands carry the hub wire id, not the external handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlCommand {
    /// `"<wire> <0|1>\n"` to `enable`
    Enable { sensor: SensorId, on: bool },

    /// `"<wire> <flags> <delay_ms> <timeout_ms>\n"` to `batch_enable`
    Batch {
        sensor: SensorId,
        flags: i32,
        delay_ms: i64,
        timeout_ms: i64,
    },

    /// `"<wire>\n"` to `flush`
    Flush { sensor: SensorId },

    /// `"<sync opcode>\n"` to `flush`
    Resync,

    /// `"<wire> <delay_ms>\n"` to `delay_ms`
    Delay { sensor: SensorId, delay_ms: i64 },

    /// Hub-side buffer on/off
    BufferEnable { on: bool },

    /// Hub-side buffer length in records
    BufferLength { records: u32 },

    /// Trigger name bound to the device buffer
    Trigger { name: String },
}

impl ControlCommand {
    /// Destination attribute
    pub fn attr(&self) -> ControlAttr {
        match self {
            ControlCommand::Enable { .. } => ControlAttr::Enable,
            ControlCommand::Batch { .. } => ControlAttr::BatchEnable,
            ControlCommand::Flush { .. } | ControlCommand::Resync => ControlAttr::Flush,
            ControlCommand::Delay { .. } => ControlAttr::DelayMs,
            ControlCommand::BufferEnable { .. } => ControlAttr::BufferEnable,
            ControlCommand::BufferLength { .. } => ControlAttr::BufferLength,
            ControlCommand::Trigger { .. } => ControlAttr::CurrentTrigger,
        }
    }

    /// Text line written to the attribute
    pub fn line(&self) -> String {
        match self {
            ControlCommand::Enable { sensor, on } => {
                format!("{} {}\n", sensor.wire_id(), u8::from(*on))
            }
            ControlCommand::Batch {
                sensor,
                flags,
                delay_ms,
                timeout_ms,
            } => format!(
                "{} {} {} {}\n",
                sensor.wire_id(),
                flags,
                delay_ms,
                timeout_ms
            ),
            ControlCommand::Flush { sensor } => format!("{}\n", sensor.wire_id()),
            ControlCommand::Resync => format!("{}\n", TIMESTAMP_SYNC_CODE),
            ControlCommand::Delay { sensor, delay_ms } => {
                format!("{} {}\n", sensor.wire_id(), delay_ms)
            }
            ControlCommand::BufferEnable { on } => format!("{}\n", u8::from(*on)),
            ControlCommand::BufferLength { records } => format!("{}\n", records),
            ControlCommand::Trigger { name } => format!("{}\n", name),
        }
    }

    /// Sensor the command addresses, if any
    pub fn sensor(&self) -> Option<SensorId> {
        match self {
            ControlCommand::Enable { sensor, .. }
            | ControlCommand::Batch { sensor, .. }
            | ControlCommand::Flush { sensor }
            | ControlCommand::Delay { sensor, .. } => Some(*sensor),
            _ => None,
        }
    }
}

impl fmt::Display for ControlCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <- {:?}", self.attr(), self.line().trim_end())
    }
}
