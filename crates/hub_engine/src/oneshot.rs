//! One-shot controller.
//!
//! Single-trigger sensors are disarmed before their event is handed out.
//! The disarm goes through the public `set_enabled` operation, like any
//! caller's request. Re-arming is always left to the caller.

use contracts::SensorId;
use tracing::{debug, warn};

use crate::control::HubControl;

/// Disarm a one-shot sensor that is about to deliver an event
pub(crate) fn disarm(control: &HubControl, sensor: SensorId) {
    debug_assert!(sensor.is_one_shot());
    match control.set_enabled(sensor.handle(), false) {
        Ok(()) => debug!(sensor = %sensor, "one-shot sensor disarmed"),
        // flag is already cleared; only the hub write failed
        Err(e) => warn!(sensor = %sensor, error = %e, "one-shot disarm write failed"),
    }
    metrics::counter!("hub_one_shot_disarmed_total", "sensor" => sensor.name()).increment(1);
}
