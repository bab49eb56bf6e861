//! SensorRecord - wire record layout
//!
//! One fixed-size, little-endian record per hub reading or protocol signal:
//!
//! ```text
//! offset 0      : wire id (1 byte)
//! offset 1..6   : int16[3] data
//! offset 7..12  : int16[3] bias
//! offset 13..20 : int64 timestamp
//! offset 21..23 : reserved
//! ```

use serde::{Deserialize, Serialize};

use crate::SensorId;

/// Size of one wire record in bytes
pub const RECORD_SIZE: usize = 24;

/// Wire id of the time-difference budget exhausted signal
pub const WIRE_TIME_DIFF_EXHAUSTED: u8 = 97;

/// Outbound opcode requesting a timestamp resync
pub const TIMESTAMP_SYNC_CODE: u8 = 98;

/// Wire id of flush-completion metadata
pub const WIRE_META_DATA: u8 = 99;

/// Wire id of the sync acknowledgment
pub const WIRE_SYNC_ACK: u8 = 100;

/// Payload marker of a valid sync acknowledgment
pub const SYNC_ACK_MAGIC: i16 = 0x66;

/// Payload marker of a valid exhaustion signal
pub const EXHAUSTED_MAGIC: i16 = 0x77;

/// Decoded wire record
///
/// Transient: produced once per decoded window, consumed by the synthesizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SensorRecord {
    /// Hub wire id (byte 0)
    pub wire_id: u8,

    /// Raw data triplet
    pub values: [i16; 3],

    /// Raw bias triplet
    pub bias: [i16; 3],

    /// Hub-side timestamp
    pub timestamp: i64,
}

/// What a record means to the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    /// User-visible sensor reading
    Sensor(SensorId),
    /// Flush-completion metadata
    MetaData,
    /// Clock sync acknowledgment
    SyncAck,
    /// Hub time-difference budget exhausted
    TimeDiffExhausted,
    /// Unrecognized wire id
    Unknown(u8),
}

impl SensorRecord {
    /// Classify by wire id
    pub fn kind(&self) -> RecordKind {
        match self.wire_id {
            WIRE_META_DATA => RecordKind::MetaData,
            WIRE_SYNC_ACK => RecordKind::SyncAck,
            WIRE_TIME_DIFF_EXHAUSTED => RecordKind::TimeDiffExhausted,
            wire => match SensorId::from_wire(wire) {
                Some(id) => RecordKind::Sensor(id),
                None => RecordKind::Unknown(wire),
            },
        }
    }

    /// `values[0]` as the low half and `values[1]` as the high half of a signed 32-bit value
    #[inline]
    pub fn values_as_i32(&self) -> i32 {
        self.values_as_u32() as i32
    }

    /// `values[0]` as the low half and `values[1]` as the high half of an unsigned 32-bit value
    #[inline]
    pub fn values_as_u32(&self) -> u32 {
        let lo = self.values[0] as u16 as u32;
        let hi = self.values[1] as u16 as u32;
        (hi << 16) | lo
    }
}
