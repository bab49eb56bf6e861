//! Event sources backed by files.

use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};

use bytes::{Bytes, BytesMut};
use contracts::{EventSource, HubError, Result};
use tracing::{debug, info};

use crate::error::DeviceError;

/// One read of at most `max_len` bytes.
///
/// `WouldBlock` is treated as no data; `Interrupted` is retried.
fn read_chunk<R: Read>(reader: &mut R, max_len: usize) -> std::io::Result<Bytes> {
    let mut buf = BytesMut::zeroed(max_len);
    loop {
        match reader.read(&mut buf) {
            Ok(n) => {
                buf.truncate(n);
                return Ok(buf.freeze());
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) if e.kind() == ErrorKind::WouldBlock => return Ok(Bytes::new()),
            Err(e) => return Err(e),
        }
    }
}

/// IIO character device (`/dev/iio:deviceN`)
///
/// Reads block until the hub delivers data.
#[derive(Debug)]
pub struct IioEventSource {
    file: File,
    path: PathBuf,
}

impl IioEventSource {
    pub fn open(path: impl AsRef<Path>) -> std::result::Result<Self, DeviceError> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|e| DeviceError::open(&path, e))?;
        info!(path = %path.display(), "event source opened");
        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EventSource for IioEventSource {
    fn read_raw(&mut self, max_len: usize) -> Result<Bytes> {
        read_chunk(&mut self.file, max_len).map_err(|e| HubError::transport_io("read", e))
    }
}

/// Captured raw stream for offline decoding
#[derive(Debug)]
pub struct CaptureFileSource {
    file: File,
    path: PathBuf,
    bytes_read: u64,
    exhausted: bool,
}

impl CaptureFileSource {
    pub fn open(path: impl AsRef<Path>) -> std::result::Result<Self, DeviceError> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|e| DeviceError::open(&path, e))?;
        debug!(path = %path.display(), "capture opened");
        Ok(Self {
            file,
            path,
            bytes_read: 0,
            exhausted: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// End of file reached
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }
}

impl EventSource for CaptureFileSource {
    fn read_raw(&mut self, max_len: usize) -> Result<Bytes> {
        if self.exhausted {
            return Ok(Bytes::new());
        }
        let chunk =
            read_chunk(&mut self.file, max_len).map_err(|e| HubError::transport_io("read", e))?;
        if chunk.is_empty() {
            self.exhausted = true;
            debug!(bytes = self.bytes_read, "capture exhausted");
        }
        self.bytes_read += chunk.len() as u64;
        Ok(chunk)
    }
}
