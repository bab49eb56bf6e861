//! Record encoder
//!
//! Inverse of the decoder. Used to build capture files and scripted streams.

use bytes::{BufMut, Bytes};
use contracts::{
    SensorId, SensorRecord, EXHAUSTED_MAGIC, RECORD_SIZE, SYNC_ACK_MAGIC, WIRE_META_DATA,
    WIRE_SYNC_ACK, WIRE_TIME_DIFF_EXHAUSTED,
};

/// Encode one record, reserved bytes zeroed
pub fn encode_record(record: &SensorRecord) -> [u8; RECORD_SIZE] {
    let mut window = [0u8; RECORD_SIZE];
    let mut buf = &mut window[..];
    buf.put_u8(record.wire_id);
    for v in record.values {
        buf.put_i16_le(v);
    }
    for b in record.bias {
        buf.put_i16_le(b);
    }
    buf.put_i64_le(record.timestamp);
    window
}

/// Encode records back to back
pub fn encode_records(records: &[SensorRecord]) -> Bytes {
    let windows: Vec<[u8; RECORD_SIZE]> = records.iter().map(encode_record).collect();
    Bytes::copy_from_slice(bytemuck::cast_slice(&windows))
}

/// Sensor reading record
pub fn sensor_record(sensor: SensorId, values: [i16; 3], timestamp: i64) -> SensorRecord {
    SensorRecord {
        wire_id: sensor.wire_id(),
        values,
        bias: [0; 3],
        timestamp,
    }
}

/// Sensor reading record with bias / status triplet
pub fn sensor_record_with_bias(
    sensor: SensorId,
    values: [i16; 3],
    bias: [i16; 3],
    timestamp: i64,
) -> SensorRecord {
    SensorRecord {
        bias,
        ..sensor_record(sensor, values, timestamp)
    }
}

/// Flush-completion metadata for `sensor`
pub fn meta_record(sensor: SensorId) -> SensorRecord {
    SensorRecord {
        wire_id: WIRE_META_DATA,
        values: [sensor.wire_id() as i16, 0, 0],
        ..Default::default()
    }
}

/// Sync acknowledgment carrying `marker`
pub fn sync_ack_record(marker: i16) -> SensorRecord {
    SensorRecord {
        wire_id: WIRE_SYNC_ACK,
        values: [marker, 0, 0],
        ..Default::default()
    }
}

/// Sync acknowledgment with the valid marker
pub fn valid_sync_ack() -> SensorRecord {
    sync_ack_record(SYNC_ACK_MAGIC)
}

/// Time-difference exhausted signal carrying `marker`
pub fn exhausted_record(marker: i16) -> SensorRecord {
    SensorRecord {
        wire_id: WIRE_TIME_DIFF_EXHAUSTED,
        values: [marker, 0, 0],
        ..Default::default()
    }
}

/// Exhaustion signal with the valid marker
pub fn valid_exhausted() -> SensorRecord {
    exhausted_record(EXHAUSTED_MAGIC)
}
