//! Sysfs control sink.
//!
//! Hub attributes (`enable`, `batch_enable`, `flush`, `delay_ms`) live in the
//! hub control directory. `iio/...` attributes live under the IIO device's
//! sysfs directory.

use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use contracts::{ControlAttr, ControlCommand, ControlSink, HubError, Result};
use tracing::{debug, trace, warn};

/// Control sink writing text lines to sysfs attributes
#[derive(Debug, Clone)]
pub struct SysfsControl {
    control_dir: PathBuf,
    iio_dir: Option<PathBuf>,
}

impl SysfsControl {
    pub fn new(control_dir: impl Into<PathBuf>) -> Self {
        Self {
            control_dir: control_dir.into(),
            iio_dir: None,
        }
    }

    /// Route `iio/...` attributes to this device directory
    pub fn with_iio_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.iio_dir = Some(dir.into());
        self
    }

    pub fn control_dir(&self) -> &Path {
        &self.control_dir
    }

    /// Filesystem path of an attribute
    pub fn attr_path(&self, attr: ControlAttr) -> Result<PathBuf> {
        match attr.path().strip_prefix("iio/") {
            Some(rest) => self
                .iio_dir
                .as_ref()
                .map(|dir| dir.join(rest))
                .ok_or_else(|| HubError::transport("write", format!("no IIO device for {attr}"))),
            None => Ok(self.control_dir.join(attr.path())),
        }
    }
}

/// Overwrite an attribute in one write
fn write_attr(path: &Path, line: &str) -> std::io::Result<()> {
    let mut file = OpenOptions::new().write(true).truncate(true).open(path)?;
    file.write_all(line.as_bytes())
}

impl ControlSink for SysfsControl {
    fn write_control(&self, command: &ControlCommand) -> Result<()> {
        let attr = command.attr();
        let path = self.attr_path(attr)?;
        let line = command.line();

        match write_attr(&path, &line) {
            Ok(()) => {
                trace!(path = %path.display(), line = line.trim_end(), "control write");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound && attr == ControlAttr::Flush => {
                debug!(path = %path.display(), "flush attribute missing");
                let sensor = command
                    .sensor()
                    .map_or_else(|| "hub".to_string(), |s| s.name().to_string());
                Err(HubError::unsupported(
                    sensor,
                    "flush",
                    "control interface has no flush attribute",
                ))
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "control write failed");
                Err(HubError::transport_io("write", e))
            }
        }
    }
}
