//! Record decoder
//!
//! Pure: slices one 24-byte window into a `SensorRecord`, no I/O.

use bytes::Buf;
use contracts::{HubError, Result, SensorRecord, RECORD_SIZE};

/// Decode one record window
///
/// Bytes past `RECORD_SIZE` are ignored. A short window is `MalformedRecord`.
#[inline]
pub fn decode_record(window: &[u8]) -> Result<SensorRecord> {
    if window.len() < RECORD_SIZE {
        return Err(HubError::MalformedRecord {
            expected: RECORD_SIZE,
            actual: window.len(),
        });
    }

    let mut buf = &window[..RECORD_SIZE];
    let wire_id = buf.get_u8();
    let values = [buf.get_i16_le(), buf.get_i16_le(), buf.get_i16_le()];
    let bias = [buf.get_i16_le(), buf.get_i16_le(), buf.get_i16_le()];
    let timestamp = buf.get_i64_le();
    // bytes 21..23 reserved

    Ok(SensorRecord {
        wire_id,
        values,
        bias,
        timestamp,
    })
}
