//! Device bring-up and offline replay assembly.

use std::path::Path;
use std::sync::Arc;

use contracts::{
    ControlCommand, ControlSink, EngineConfig, EventSource, HubConfig, Result as HubResult,
    SensorId, SensorSetting,
};
use hub_engine::{BufferSetup, CalibrationStores, HubControl, HubEngine, MonotonicClock, NS_PER_MS};
use tracing::{debug, info, instrument, warn};

use crate::calibration::{FileCalibrationStore, SysfsCalibrationStore};
use crate::discovery::{discover, IioDevice};
use crate::error::Result;
use crate::source::{CaptureFileSource, IioEventSource};
use crate::sysfs::SysfsControl;

/// A brought-up hub
pub struct HubDevice {
    pub device: IioDevice,
    pub control: Arc<HubControl>,
    pub engine: HubEngine<Box<dyn EventSource>>,
}

/// Discover the hub, arm its buffer and open its event stream.
///
/// Persisted calibration is restored when configured; restore failures are
/// logged and do not fail bring-up.
#[instrument(name = "device_bring_up", skip(config), fields(device = %config.device.device_name))]
pub fn bring_up(config: &HubConfig) -> Result<HubDevice> {
    let device = discover(
        &config.device.iio_dir,
        &config.device.dev_dir,
        &config.device.device_name,
    )?;

    let sink = SysfsControl::new(&config.device.control_dir).with_iio_dir(&device.sysfs_dir);
    let buffer = BufferSetup {
        length: config.device.buffer_length,
        trigger: Some(device.trigger_name()),
    };
    arm_buffer(&sink, &buffer)?;

    let stores = CalibrationStores {
        hub: Arc::new(SysfsCalibrationStore::new(
            &config.device.control_dir,
            &config.calibration,
        )),
        persisted: Arc::new(FileCalibrationStore::from_config(&config.calibration)),
    };
    let control = Arc::new(
        HubControl::new(Arc::new(sink), Arc::new(MonotonicClock::new()))
            .with_buffer(buffer)
            .with_calibration(stores),
    );

    if config.calibration.restore_on_start {
        match control.restore_calibration() {
            Ok(report) => info!(?report, "calibration restore finished"),
            Err(e) => warn!(error = %e, "calibration restore failed"),
        }
    }

    let source = IioEventSource::open(&device.dev_path)?;
    let engine = HubEngine::new(
        Box::new(source) as Box<dyn EventSource>,
        Arc::clone(&control),
        &config.engine,
    );

    info!(index = device.index, "hub device ready");
    Ok(HubDevice {
        device,
        control,
        engine,
    })
}

fn arm_buffer(sink: &dyn ControlSink, buffer: &BufferSetup) -> HubResult<()> {
    sink.write_control(&ControlCommand::BufferLength {
        records: buffer.length,
    })?;
    if let Some(name) = &buffer.trigger {
        sink.write_control(&ControlCommand::Trigger { name: name.clone() })?;
    }
    sink.write_control(&ControlCommand::BufferEnable { on: true })?;
    debug!(length = buffer.length, "hub buffer armed");
    Ok(())
}

/// Batch and enable the configured start-up sensors.
///
/// Stops at the first failure; sensors enabled so far stay enabled.
pub fn apply_sensor_settings(
    control: &HubControl,
    settings: &[SensorSetting],
) -> HubResult<Vec<SensorId>> {
    let mut enabled = Vec::with_capacity(settings.len());
    for setting in settings {
        let id: SensorId = setting.name.parse().map_err(|e: String| {
            contracts::HubError::config_validation("sensors.name", e)
        })?;
        let period_ns = setting.period_ms.unwrap_or(0) as i64 * NS_PER_MS;
        let timeout_ns = setting.timeout_ms.unwrap_or(0) as i64 * NS_PER_MS;
        if period_ns > 0 || timeout_ns > 0 {
            control.set_batch(id.handle(), 0, period_ns, timeout_ns)?;
        }
        control.set_enabled(id.handle(), true)?;
        enabled.push(id);
    }
    info!(count = enabled.len(), "start-up sensors enabled");
    Ok(enabled)
}

/// Control sink for offline replay: accepts every command
#[derive(Debug, Clone, Copy, Default)]
pub struct ReplayControl;

impl ControlSink for ReplayControl {
    fn write_control(&self, command: &ControlCommand) -> HubResult<()> {
        debug!(%command, "replay control write");
        Ok(())
    }
}

/// Engine over a capture file with every sensor enabled
pub fn replay_engine(path: &Path, config: &EngineConfig) -> Result<HubEngine<CaptureFileSource>> {
    let source = CaptureFileSource::open(path)?;
    let control = Arc::new(HubControl::new(
        Arc::new(ReplayControl),
        Arc::new(MonotonicClock::new()),
    ));
    for id in SensorId::ALL {
        control.set_enabled(id.handle(), true)?;
    }
    Ok(HubEngine::new(source, control, config))
}
