//! Control plane.
//!
//! Every control operation (enable, batch, flush, delay, resync, calibration)
//! serializes on one lock scoped to control-channel state. The enabled mask
//! is also published through an atomic so the drain path can gate records
//! without taking that lock.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use contracts::{
    CalibrationKind, CalibrationStore, Clock, ControlCommand, ControlSink, HubError, Result,
    SensorHandle, SensorId,
};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::clock::{AckOutcome, ClockPhase, ClockSync, ExhaustedAction};

/// Nanoseconds per millisecond
pub const NS_PER_MS: i64 = 1_000_000;

/// Batch flag: validate only, write nothing
pub const BATCH_DRY_RUN: i32 = 0x1;

/// Batch flag: wake the host when the hub FIFO fills
pub const BATCH_WAKE_UPON_FIFO_FULL: i32 = 0x2;

/// Sensors whose disablement persists the hub's magnetometer calibration
const MAGNETOMETER_USERS: [SensorId; 3] = [
    SensorId::Magnetometer,
    SensorId::Orientation,
    SensorId::RotationVector,
];

/// Hub-side buffer setup written when the first sensor is batched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferSetup {
    /// Buffer length in records
    pub length: u32,
    /// Trigger bound to the buffer, if the transport needs one
    pub trigger: Option<String>,
}

impl Default for BufferSetup {
    fn default() -> Self {
        Self {
            length: 1024,
            trigger: None,
        }
    }
}

/// Hub-side and persisted calibration stores
#[derive(Clone)]
pub struct CalibrationStores {
    /// Calibration attributes on the hub
    pub hub: Arc<dyn CalibrationStore>,
    /// Files that survive reboots
    pub persisted: Arc<dyn CalibrationStore>,
}

/// Which blobs `restore_calibration` copied to the hub
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CalibrationRestore {
    pub magnetometer: bool,
    pub accelerometer: bool,
    pub gyroscope: bool,
}

#[derive(Debug, Default)]
struct ControlState {
    sync: ClockSync,
}

/// Shared control plane
pub struct HubControl {
    sink: Arc<dyn ControlSink>,
    clock: Arc<dyn Clock>,
    enabled: AtomicU32,
    state: Mutex<ControlState>,
    buffer: BufferSetup,
    calibration: Option<CalibrationStores>,
}

impl fmt::Debug for HubControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HubControl")
            .field("enabled", &format_args!("{:#x}", self.enabled_mask()))
            .field("phase", &self.clock_phase())
            .field("buffer", &self.buffer)
            .field("calibration", &self.calibration.is_some())
            .finish()
    }
}

#[inline]
fn bit(sensor: SensorId) -> u32 {
    1 << sensor.index()
}

fn resolve(handle: SensorHandle) -> Result<SensorId> {
    SensorId::from_handle(handle).ok_or(HubError::InvalidHandle { handle })
}

impl HubControl {
    pub fn new(sink: Arc<dyn ControlSink>, clock: Arc<dyn Clock>) -> Self {
        Self {
            sink,
            clock,
            enabled: AtomicU32::new(0),
            state: Mutex::new(ControlState::default()),
            buffer: BufferSetup::default(),
            calibration: None,
        }
    }

    pub fn with_buffer(mut self, buffer: BufferSetup) -> Self {
        self.buffer = buffer;
        self
    }

    pub fn with_calibration(mut self, stores: CalibrationStores) -> Self {
        self.calibration = Some(stores);
        self
    }

    fn lock_state(&self) -> MutexGuard<'_, ControlState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    // ===== Enable =====

    /// Enable or disable a sensor.
    ///
    /// The enabled flag follows the request even when the write fails; the
    /// write error is still returned.
    #[instrument(name = "hub_set_enabled", skip(self))]
    pub fn set_enabled(&self, handle: SensorHandle, on: bool) -> Result<()> {
        let sensor = resolve(handle)?;
        let _state = self.lock_state();
        self.set_enabled_locked(sensor, on)
    }

    fn set_enabled_locked(&self, sensor: SensorId, on: bool) -> Result<()> {
        let written = self
            .sink
            .write_control(&ControlCommand::Enable { sensor, on });
        if let Err(e) = &written {
            warn!(sensor = %sensor, on, error = %e, "enable write failed");
            observability::record_transport_failure("enable");
        }

        let mask = if on {
            self.enabled.fetch_or(bit(sensor), Ordering::AcqRel) | bit(sensor)
        } else {
            self.enabled.fetch_and(!bit(sensor), Ordering::AcqRel) & !bit(sensor)
        };
        observability::record_enabled_sensors(mask.count_ones());

        if mask == 0 {
            if let Err(e) = self
                .sink
                .write_control(&ControlCommand::BufferEnable { on: false })
            {
                warn!(error = %e, "failed to disable hub buffer");
            }
        }

        if !on && MAGNETOMETER_USERS.contains(&sensor) {
            self.save_magnetometer_calibration();
        }

        info!(sensor = %sensor, on, mask, "sensor enable updated");
        written
    }

    /// Disable every enabled sensor, returning the first failure
    #[instrument(name = "hub_disable_all", skip(self))]
    pub fn disable_all(&self) -> Result<()> {
        let _state = self.lock_state();
        let mut first_error = None;
        for sensor in self.enabled_sensors() {
            if let Err(e) = self.set_enabled_locked(sensor, false) {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    // ===== Batch / Flush / Delay =====

    /// Configure batching.
    ///
    /// `flags` bit 0 is a dry run: the request is validated and nothing is
    /// written. When no sensor is enabled yet the hub buffer is armed first.
    /// Every applied batch is preceded by a resync request.
    #[instrument(name = "hub_set_batch", skip(self))]
    pub fn set_batch(
        &self,
        handle: SensorHandle,
        flags: i32,
        period_ns: i64,
        timeout_ns: i64,
    ) -> Result<()> {
        let sensor = resolve(handle)?;
        if timeout_ns > 0 && !sensor.class().is_batchable() {
            return Err(HubError::unsupported(
                sensor.name(),
                "batch",
                "sensor cannot batch with a non-zero timeout",
            ));
        }
        if flags & BATCH_DRY_RUN != 0 {
            debug!(sensor = %sensor, "batch dry run accepted");
            return Ok(());
        }
        if flags & BATCH_WAKE_UPON_FIFO_FULL != 0 {
            debug!(sensor = %sensor, "wake upon fifo full requested");
        }

        let mut state = self.lock_state();
        if self.enabled_mask() == 0 {
            self.arm_buffer();
        }
        if let Err(e) = self.request_resync_locked(&mut state) {
            warn!(error = %e, "resync before batch failed");
        }

        self.sink
            .write_control(&ControlCommand::Batch {
                sensor,
                flags,
                delay_ms: period_ns / NS_PER_MS,
                timeout_ms: timeout_ns / NS_PER_MS,
            })
            .inspect_err(|_| observability::record_transport_failure("batch"))
    }

    /// Arm the hub buffer. Failed writes are logged; the batch request
    /// still goes out.
    fn arm_buffer(&self) {
        let mut commands = vec![ControlCommand::BufferLength {
            records: self.buffer.length,
        }];
        if let Some(name) = &self.buffer.trigger {
            commands.push(ControlCommand::Trigger { name: name.clone() });
        }
        commands.push(ControlCommand::BufferEnable { on: true });

        let mut armed = true;
        for command in &commands {
            if let Err(e) = self.sink.write_control(command) {
                warn!(attr = %command.attr(), error = %e, "buffer setup write failed");
                observability::record_transport_failure("buffer");
                armed = false;
            }
        }
        if armed {
            debug!(length = self.buffer.length, "hub buffer armed");
        }
    }

    /// Ask the hub to flush buffered data for a sensor.
    ///
    /// Completion arrives later as a flush-complete event.
    #[instrument(name = "hub_request_flush", skip(self))]
    pub fn request_flush(&self, handle: SensorHandle) -> Result<()> {
        let sensor = resolve(handle)?;
        let _state = self.lock_state();
        self.sink
            .write_control(&ControlCommand::Flush { sensor })
            .map_err(|e| match e {
                HubError::Unsupported { message, .. } => {
                    HubError::unsupported(sensor.name(), "flush", message)
                }
                other => {
                    observability::record_transport_failure("flush");
                    other
                }
            })
    }

    /// Set the sampling period
    #[instrument(name = "hub_set_delay", skip(self))]
    pub fn set_delay(&self, handle: SensorHandle, delay_ns: i64) -> Result<()> {
        let sensor = resolve(handle)?;
        let _state = self.lock_state();
        self.sink
            .write_control(&ControlCommand::Delay {
                sensor,
                delay_ms: delay_ns / NS_PER_MS,
            })
            .inspect_err(|_| observability::record_transport_failure("delay"))
    }

    // ===== Clock resync =====

    /// Issue a resync request now
    #[instrument(name = "hub_request_resync", skip(self))]
    pub fn request_resync(&self) -> Result<()> {
        let mut state = self.lock_state();
        self.request_resync_locked(&mut state)
    }

    fn request_resync_locked(&self, state: &mut ControlState) -> Result<()> {
        self.sink
            .write_control(&ControlCommand::Resync)
            .inspect_err(|_| observability::record_transport_failure("resync"))?;
        let now = self.clock.now_ns();
        state.sync.request_issued(now);
        observability::record_resync_requested();
        info!(local_ns = now, phase = ?state.sync.phase(), "resync requested");
        Ok(())
    }

    /// Hub reported its time-difference budget exhausted
    pub(crate) fn on_time_diff_exhausted(&self, marker: i16) {
        let mut state = self.lock_state();
        match state.sync.on_exhausted(marker) {
            ExhaustedAction::Resync => {
                if let Err(e) = self.request_resync_locked(&mut state) {
                    warn!(error = %e, "resync after exhaustion failed");
                }
            }
            ExhaustedAction::Retry => {
                debug!("exhaustion while awaiting ack, re-issuing resync");
                if let Err(e) = self.request_resync_locked(&mut state) {
                    warn!(error = %e, "resync retry failed");
                }
            }
            ExhaustedAction::BadMarker => {
                warn!(marker, "exhaustion signal with bad marker");
                observability::record_protocol_anomaly("exhausted_bad_marker");
            }
        }
    }

    /// Hub acknowledged a resync request
    pub(crate) fn on_sync_ack(&self, marker: i16) {
        let mut state = self.lock_state();
        match state.sync.on_ack(marker) {
            AckOutcome::Committed { reference } => {
                observability::record_resync_committed();
                info!(reference_ns = reference, "clock resync committed");
            }
            AckOutcome::BadMarker => {
                warn!(marker, "sync ack with bad marker");
                observability::record_protocol_anomaly("ack_bad_marker");
            }
            AckOutcome::Unexpected => {
                warn!(phase = ?state.sync.phase(), "sync ack outside awaiting phase");
                observability::record_protocol_anomaly("ack_unexpected");
            }
        }
    }

    // ===== Calibration =====

    /// Copy persisted calibration to the hub.
    ///
    /// Magnetometer data is always restored; accelerometer and gyroscope data
    /// only when not all zeros. Missing blobs are skipped.
    #[instrument(name = "hub_restore_calibration", skip(self))]
    pub fn restore_calibration(&self) -> Result<CalibrationRestore> {
        let mut report = CalibrationRestore::default();
        let Some(stores) = &self.calibration else {
            debug!("no calibration stores configured");
            return Ok(report);
        };
        let _state = self.lock_state();

        for kind in [
            CalibrationKind::Magnetometer,
            CalibrationKind::Accelerometer,
            CalibrationKind::Gyroscope,
        ] {
            let data = match stores.persisted.load(kind) {
                Ok(data) => data,
                Err(HubError::CalibrationNotFound { .. }) => {
                    info!(kind = %kind, "no persisted calibration");
                    continue;
                }
                Err(e) => {
                    warn!(kind = %kind, error = %e, "persisted calibration unreadable");
                    continue;
                }
            };
            if kind != CalibrationKind::Magnetometer && data.is_zero() {
                debug!(kind = %kind, "skipping all-zero calibration");
                continue;
            }
            stores.hub.save(&data)?;
            info!(kind = %kind, "calibration restored");
            match kind {
                CalibrationKind::Magnetometer => report.magnetometer = true,
                CalibrationKind::Accelerometer => report.accelerometer = true,
                CalibrationKind::Gyroscope => report.gyroscope = true,
            }
        }
        Ok(report)
    }

    fn save_magnetometer_calibration(&self) {
        let Some(stores) = &self.calibration else {
            return;
        };
        let result = stores
            .hub
            .load(CalibrationKind::Magnetometer)
            .and_then(|data| stores.persisted.save(&data));
        match result {
            Ok(()) => debug!("magnetometer calibration persisted"),
            Err(e) => warn!(error = %e, "failed to persist magnetometer calibration"),
        }
    }

    // ===== Accessors =====

    /// Lock-free enabled check for the drain path
    #[inline]
    pub fn is_sensor_enabled(&self, sensor: SensorId) -> bool {
        self.enabled.load(Ordering::Acquire) & bit(sensor) != 0
    }

    pub fn is_enabled(&self, handle: SensorHandle) -> Result<bool> {
        resolve(handle).map(|sensor| self.is_sensor_enabled(sensor))
    }

    /// Enabled bitset over slot indices
    pub fn enabled_mask(&self) -> u32 {
        self.enabled.load(Ordering::Acquire)
    }

    pub fn enabled_sensors(&self) -> Vec<SensorId> {
        let mask = self.enabled_mask();
        SensorId::ALL
            .into_iter()
            .filter(|id| mask & bit(*id) != 0)
            .collect()
    }

    pub fn clock_phase(&self) -> ClockPhase {
        self.lock_state().sync.phase()
    }

    /// Copy of the resync state
    pub fn clock_sync(&self) -> ClockSync {
        self.lock_state().sync
    }
}
