//! Event synthesizer.
//!
//! Per-class transform from a decoded record to a slot update.

use contracts::{EventPayload, SensorClass, SensorId, SensorRecord};
use tracing::trace;

use crate::table::SensorTable;

/// Orientation resolution
pub const SCALE_ORIENTATION: f32 = 0.1;
/// Motion, magnetic, pressure and bias resolution
pub const SCALE_MOTION: f32 = 0.01;
/// Quaternion resolution
pub const SCALE_QUATERNION: f32 = 0.0001;

/// Light level to lux, ascending
pub const LUX_TABLE: [f32; 10] = [
    0.0, 10.0, 40.0, 90.0, 160.0, 225.0, 320.0, 640.0, 1280.0, 2600.0,
];

/// Lux for a discrete light level.
///
/// Any level outside the table, negative ones included, maps to the last entry.
pub fn lux_for_level(level: i16) -> f32 {
    usize::try_from(level)
        .ok()
        .and_then(|index| LUX_TABLE.get(index))
        .copied()
        .unwrap_or(LUX_TABLE[LUX_TABLE.len() - 1])
}

/// Derived quaternion w from already-scaled x, y, z
pub fn rotation_w(x: f32, y: f32, z: f32) -> f32 {
    let q0 = 1.0 - x * x - y * y - z * z;
    if q0 > 0.0 {
        q0.sqrt()
    } else {
        0.0
    }
}

#[inline]
fn scaled(raw: [i16; 3], scale: f32) -> [f32; 3] {
    raw.map(|v| v as f32 * scale)
}

/// Class transform, without side effects
pub fn payload_for(class: SensorClass, record: &SensorRecord) -> EventPayload {
    match class {
        SensorClass::Orientation => EventPayload::Vector {
            values: scaled(record.values, SCALE_ORIENTATION),
            status: Some(record.bias[0] as i8),
        },
        SensorClass::Motion => EventPayload::Vector {
            values: scaled(record.values, SCALE_MOTION),
            status: None,
        },
        SensorClass::Magnetic => EventPayload::Vector {
            values: scaled(record.values, SCALE_MOTION),
            status: Some(record.bias[0] as i8),
        },
        SensorClass::Pressure => EventPayload::Pressure {
            hpa: record.values_as_i32() as f32 * SCALE_MOTION,
            temperature: record.values[2] as f32 * SCALE_MOTION,
        },
        SensorClass::RotationVector => {
            let [x, y, z] = scaled(record.values, SCALE_QUATERNION);
            EventPayload::RotationVector {
                values: [x, y, z, rotation_w(x, y, z)],
            }
        }
        SensorClass::Uncalibrated => EventPayload::Uncalibrated {
            values: scaled(record.values, SCALE_MOTION),
            bias: scaled(record.bias, SCALE_MOTION),
        },
        SensorClass::SignificantMotion => EventPayload::Trigger {
            values: record.values.map(f32::from),
        },
        SensorClass::Light => EventPayload::Scalar {
            value: lux_for_level(record.values[0]),
        },
        SensorClass::StepDetector | SensorClass::WakeGesture => EventPayload::Trigger {
            values: [1.0, 0.0, 0.0],
        },
        SensorClass::StepCounter => EventPayload::StepCounter {
            steps: u64::from(record.values_as_u32()),
        },
    }
}

/// Apply `record` for `sensor` to the table at host time `now_ns`.
///
/// Sets the sensor's pending bit and stamps its slot. A step-detector
/// record also carries the step count into the step-counter slot, leaving
/// the counter's timestamps alone.
pub fn synthesize(table: &mut SensorTable, sensor: SensorId, record: &SensorRecord, now_ns: i64) {
    let payload = payload_for(sensor.class(), record);

    if sensor.class() == SensorClass::StepDetector {
        let counter = table.slot_mut(SensorId::StepCounter);
        counter.event.payload = EventPayload::StepCounter {
            steps: u64::from(record.values[0] as u16),
        };
    }

    let slot = table.slot_mut(sensor);
    slot.event.payload = payload;
    slot.event.timestamp = now_ns;
    slot.event.hub_timestamp = record.timestamp;
    slot.last_timestamp = now_ns;
    slot.updates += 1;
    table.mark_pending(sensor);

    trace!(sensor = %sensor, payload = ?payload, "slot updated");
}

#[cfg(test)]
mod tests {
    use super::*;
    use ingestion::{sensor_record, sensor_record_with_bias};

    fn apply(table: &mut SensorTable, record: SensorRecord, now: i64) -> SensorId {
        let id = SensorId::from_wire(record.wire_id).unwrap();
        synthesize(table, id, &record, now);
        id
    }

    fn assert_close(a: f32, b: f32) {
        let tolerance = 1e-5 * b.abs().max(1.0);
        assert!((a - b).abs() < tolerance, "{a} != {b}");
    }

    #[test]
    fn test_rotation_w() {
        assert_close(rotation_w(0.3, 0.4, 0.0), 0.75f32.sqrt());
        assert_close(rotation_w(0.3, 0.4, 0.0), 0.866_025_4);
        assert_eq!(rotation_w(1.0, 0.0, 0.0), 0.0);
        assert_eq!(rotation_w(0.9, 0.9, 0.0), 0.0);
        assert_eq!(rotation_w(0.0, 0.0, 0.0), 1.0);
    }

    #[test]
    fn test_rotation_vector_family() {
        for id in [
            SensorId::RotationVector,
            SensorId::GameRotationVector,
            SensorId::GeomagneticRotationVector,
        ] {
            let mut table = SensorTable::new();
            apply(&mut table, sensor_record(id, [3000, 4000, 0], 1), 10);
            match table.slot(id).event.payload {
                EventPayload::RotationVector { values } => {
                    assert_close(values[0], 0.3);
                    assert_close(values[1], 0.4);
                    assert_close(values[2], 0.0);
                    assert_close(values[3], 0.866_025_4);
                }
                other => panic!("unexpected payload {other:?}"),
            }
        }
    }

    #[test]
    fn test_light_clamp() {
        assert_eq!(lux_for_level(15), lux_for_level(9));
        assert_eq!(lux_for_level(9), 2600.0);
        assert_eq!(lux_for_level(2), 40.0);
        assert_eq!(lux_for_level(0), 0.0);
        assert_eq!(lux_for_level(-1), 2600.0);
        assert_eq!(lux_for_level(i16::MIN), 2600.0);
    }

    #[test]
    fn test_orientation_scale_and_status() {
        let mut table = SensorTable::new();
        let record = sensor_record_with_bias(SensorId::Orientation, [900, -450, 10], [3, 0, 0], 0);
        apply(&mut table, record, 0);
        match table.slot(SensorId::Orientation).event.payload {
            EventPayload::Vector { values, status } => {
                assert_close(values[0], 90.0);
                assert_close(values[1], -45.0);
                assert_close(values[2], 1.0);
                assert_eq!(status, Some(3));
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn test_motion_and_magnetic() {
        let mut table = SensorTable::new();
        apply(
            &mut table,
            sensor_record(SensorId::Accelerometer, [981, 0, -981], 0),
            0,
        );
        match table.slot(SensorId::Accelerometer).event.payload {
            EventPayload::Vector { values, status } => {
                assert_close(values[0], 9.81);
                assert_close(values[2], -9.81);
                assert_eq!(status, None);
            }
            other => panic!("unexpected payload {other:?}"),
        }

        let record = sensor_record_with_bias(SensorId::Magnetometer, [100, 200, 300], [2, 9, 9], 0);
        apply(&mut table, record, 0);
        match table.slot(SensorId::Magnetometer).event.payload {
            EventPayload::Vector { status, .. } => assert_eq!(status, Some(2)),
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn test_pressure_uses_32_bits() {
        let mut table = SensorTable::new();
        // 101325 = 0x0001_8BCD
        let lo = 0x8BCDu16 as i16;
        apply(
            &mut table,
            sensor_record(SensorId::Pressure, [lo, 1, 2500], 0),
            0,
        );
        match table.slot(SensorId::Pressure).event.payload {
            EventPayload::Pressure { hpa, temperature } => {
                assert_close(hpa, 1013.25);
                assert_close(temperature, 25.0);
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn test_uncalibrated_bias() {
        let mut table = SensorTable::new();
        let record = sensor_record_with_bias(
            SensorId::GyroscopeUncalibrated,
            [100, 0, 0],
            [-50, 0, 25],
            0,
        );
        apply(&mut table, record, 0);
        match table.slot(SensorId::GyroscopeUncalibrated).event.payload {
            EventPayload::Uncalibrated { values, bias } => {
                assert_close(values[0], 1.0);
                assert_close(bias[0], -0.5);
                assert_close(bias[2], 0.25);
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn test_significant_motion_unscaled() {
        let mut table = SensorTable::new();
        apply(
            &mut table,
            sensor_record(SensorId::SignificantMotion, [1, -2, 300], 0),
            0,
        );
        assert_eq!(
            table.slot(SensorId::SignificantMotion).event.payload,
            EventPayload::Trigger {
                values: [1.0, -2.0, 300.0]
            }
        );
    }

    #[test]
    fn test_step_counter_u32() {
        let mut table = SensorTable::new();
        apply(
            &mut table,
            sensor_record(SensorId::StepCounter, [-1, 0x0002, 0], 0),
            0,
        );
        assert_eq!(
            table.slot(SensorId::StepCounter).event.payload,
            EventPayload::StepCounter { steps: 0x0002_ffff }
        );
    }

    #[test]
    fn test_step_detector_leaves_counter_timestamp() {
        let mut table = SensorTable::new();
        apply(
            &mut table,
            sensor_record(SensorId::StepCounter, [10, 0, 0], 0),
            100,
        );
        let counter_before = *table.slot(SensorId::StepCounter);

        apply(
            &mut table,
            sensor_record(SensorId::StepDetector, [11, 0, 0], 0),
            200,
        );

        let counter = table.slot(SensorId::StepCounter);
        assert_eq!(counter.event.payload, EventPayload::StepCounter { steps: 11 });
        assert_eq!(counter.event.timestamp, counter_before.event.timestamp);
        assert_eq!(counter.last_timestamp, 100);

        let detector = table.slot(SensorId::StepDetector);
        assert_eq!(detector.last_timestamp, 200);
        assert_eq!(detector.event.timestamp, 200);
        assert!(table.pending().contains(SensorId::StepDetector));
    }

    #[test]
    fn test_wake_gesture_flag() {
        let mut table = SensorTable::new();
        apply(
            &mut table,
            sensor_record(SensorId::WakeGesture, [0, 0, 0], 0),
            0,
        );
        assert_eq!(
            table.slot(SensorId::WakeGesture).event.payload,
            EventPayload::Trigger {
                values: [1.0, 0.0, 0.0]
            }
        );
    }

    #[test]
    fn test_synthesis_is_deterministic() {
        for id in SensorId::ALL {
            let record = sensor_record_with_bias(id, [123, -456, 789], [1, 2, 3], 42);
            let mut a = SensorTable::new();
            let mut b = SensorTable::new();
            synthesize(&mut a, id, &record, 7);
            synthesize(&mut b, id, &record, 7);
            assert_eq!(a.slot(id), b.slot(id));
            assert_eq!(a.slot(id).event.handle, id.handle());
            assert_eq!(a.slot(id).event.hub_timestamp, 42);
        }
    }
}
