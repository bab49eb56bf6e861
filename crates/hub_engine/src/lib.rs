//! Sensor hub engine.
//!
//! Decoded records flow through the synthesizer into the slot table, and
//! the drainer hands pending slots out as events. Control operations share
//! one `HubControl` with the drain path.

pub mod clock;
pub mod control;
pub mod engine;
mod oneshot;
pub mod synth;
pub mod table;

pub use clock::{AckOutcome, ClockPhase, ClockSync, ExhaustedAction, MonotonicClock};
pub use control::{
    BufferSetup, CalibrationRestore, CalibrationStores, HubControl, BATCH_DRY_RUN,
    BATCH_WAKE_UPON_FIFO_FULL, NS_PER_MS,
};
pub use engine::{DrainOutcome, EngineStats, HubEngine};
pub use synth::{
    lux_for_level, payload_for, rotation_w, synthesize, LUX_TABLE, SCALE_MOTION,
    SCALE_ORIENTATION, SCALE_QUATERNION,
};
pub use table::{PendingMask, SensorSlot, SensorTable};
