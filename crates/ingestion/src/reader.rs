//! Buffered record reader
//!
//! Slices raw chunks from an `EventSource` into 24-byte windows.
//!
//! - Complete windows live in a fixed-capacity ring and survive across drain calls
//! - A partial tail waits in the staging buffer for the rest of its bytes
//! - A read never requests more bytes than the ring can hold

use std::fmt;
use std::sync::Arc;

use bytes::{Buf, BytesMut};
use contracts::{EventSource, HubError, Result, RECORD_SIZE};
use ringbuf::{traits::*, HeapRb};
use tracing::{debug, trace, warn};

use crate::config::{IngestionMetrics, ReaderConfig};

/// One undecoded record
pub type RecordWindow = [u8; RECORD_SIZE];

/// Buffered record reader
pub struct RecordReader {
    windows: HeapRb<RecordWindow>,
    staging: BytesMut,
    read_chunk: usize,
    metrics: Arc<IngestionMetrics>,
}

impl fmt::Debug for RecordReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordReader")
            .field("pending", &self.windows.occupied_len())
            .field("capacity", &self.windows.capacity())
            .field("staged_bytes", &self.staging.len())
            .finish()
    }
}

impl RecordReader {
    /// Create a reader with its own metrics
    pub fn new(config: ReaderConfig) -> Self {
        Self::with_metrics(config, Arc::new(IngestionMetrics::new()))
    }

    /// Create a reader sharing `metrics`
    pub fn with_metrics(config: ReaderConfig, metrics: Arc<IngestionMetrics>) -> Self {
        let capacity = config.capacity.max(1);
        Self {
            windows: HeapRb::new(capacity),
            staging: BytesMut::with_capacity(config.effective_chunk() + RECORD_SIZE),
            read_chunk: config.effective_chunk(),
            metrics,
        }
    }

    /// Perform at most one read from `source`.
    ///
    /// Returns the number of complete windows added. Zero means either the
    /// ring is full or the source had nothing to give.
    pub fn fill<S: EventSource + ?Sized>(&mut self, source: &mut S) -> Result<usize> {
        let mut added = self.promote_staged();

        let room = self.windows.vacant_len();
        if room == 0 {
            trace!(pending = self.windows.occupied_len(), "reader full, skipping read");
            return Ok(added);
        }

        let want = (room * RECORD_SIZE)
            .saturating_sub(self.staging.len())
            .min(self.read_chunk)
            .max(1);

        let chunk = match source.read_raw(want) {
            Ok(chunk) => chunk,
            Err(e) => {
                self.metrics.record_read_error();
                warn!(error = %e, "event source read failed");
                return Err(e);
            }
        };

        if chunk.is_empty() {
            return Ok(added);
        }

        self.metrics.record_read(chunk.len());
        self.staging.extend_from_slice(&chunk);
        added += self.promote_staged();

        trace!(
            bytes = chunk.len(),
            added,
            staged = self.staging.len(),
            "read chunk"
        );
        Ok(added)
    }

    /// Move complete staged windows into the ring while it has room
    fn promote_staged(&mut self) -> usize {
        let mut added = 0;
        while self.staging.len() >= RECORD_SIZE && !self.windows.is_full() {
            let mut window = [0u8; RECORD_SIZE];
            self.staging.copy_to_slice(&mut window);
            if self.windows.try_push(window).is_err() {
                break;
            }
            added += 1;
        }
        if added > 0 {
            self.metrics.record_buffered(added);
            self.metrics.update_pending(self.windows.occupied_len());
        }
        added
    }

    /// Take the oldest undrained window
    #[inline]
    pub fn pop_window(&mut self) -> Option<RecordWindow> {
        let window = self.windows.try_pop();
        if window.is_some() {
            self.metrics.update_pending(self.windows.occupied_len());
        }
        window
    }

    /// Undrained complete windows
    #[inline]
    pub fn pending(&self) -> usize {
        self.windows.occupied_len()
    }

    /// Whether a complete window is ready
    #[inline]
    pub fn has_window(&self) -> bool {
        !self.windows.is_empty()
    }

    /// Bytes of an incomplete trailing window
    #[inline]
    pub fn staged_bytes(&self) -> usize {
        self.staging.len() % RECORD_SIZE
    }

    /// Drop an incomplete trailing window.
    ///
    /// Used when the source has ended; the tail can never complete.
    pub fn discard_partial(&mut self) -> Option<HubError> {
        let partial = self.staged_bytes();
        if partial == 0 {
            return None;
        }
        let keep = self.staging.len() - partial;
        self.staging.truncate(keep);
        self.metrics.record_malformed();
        debug!(bytes = partial, "discarded partial record window");
        Some(HubError::MalformedRecord {
            expected: RECORD_SIZE,
            actual: partial,
        })
    }

    /// Shared metrics handle
    pub fn metrics(&self) -> &Arc<IngestionMetrics> {
        &self.metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::{encode_records, sensor_record};
    use crate::mock::MockEventSource;
    use bytes::Bytes;
    use contracts::SensorId;

    fn records(n: usize) -> Bytes {
        let records: Vec<_> = (0..n)
            .map(|i| sensor_record(SensorId::Accelerometer, [i as i16, 0, 0], i as i64))
            .collect();
        encode_records(&records)
    }

    #[test]
    fn test_fill_slices_windows() {
        let mut source = MockEventSource::new();
        source.push_bytes(records(3));

        let mut reader = RecordReader::new(ReaderConfig::new(8));
        assert_eq!(reader.fill(&mut source).unwrap(), 3);
        assert_eq!(reader.pending(), 3);

        let first = reader.pop_window().unwrap();
        assert_eq!(first[1], 0);
        let second = reader.pop_window().unwrap();
        assert_eq!(second[1], 1);
        assert_eq!(reader.pending(), 1);
    }

    #[test]
    fn test_partial_tail_waits_for_rest() {
        let bytes = records(2);
        let mut source = MockEventSource::new();
        source.push_bytes(bytes.slice(..30));
        source.push_bytes(bytes.slice(30..));

        let mut reader = RecordReader::new(ReaderConfig::new(8));
        assert_eq!(reader.fill(&mut source).unwrap(), 1);
        assert_eq!(reader.staged_bytes(), 6);
        assert_eq!(reader.fill(&mut source).unwrap(), 1);
        assert_eq!(reader.staged_bytes(), 0);
        assert_eq!(reader.pending(), 2);
    }

    #[test]
    fn test_read_bounded_by_capacity() {
        let mut source = MockEventSource::new();
        source.push_bytes(records(5));

        let mut reader = RecordReader::new(ReaderConfig::new(2));
        assert_eq!(reader.fill(&mut source).unwrap(), 2);
        // full: no read happens
        assert_eq!(reader.fill(&mut source).unwrap(), 0);
        assert_eq!(source.remaining_bytes(), 3 * RECORD_SIZE);

        reader.pop_window();
        reader.pop_window();
        assert_eq!(reader.fill(&mut source).unwrap(), 2);
        assert_eq!(source.remaining_bytes(), RECORD_SIZE);
    }

    #[test]
    fn test_read_error_propagates() {
        let mut source = MockEventSource::new();
        source.push_failure("device gone");

        let mut reader = RecordReader::new(ReaderConfig::new(4));
        let err = reader.fill(&mut source).unwrap_err();
        assert!(err.is_transport());
        assert_eq!(reader.metrics().snapshot().read_errors, 1);
    }

    #[test]
    fn test_discard_partial() {
        let mut source = MockEventSource::new();
        source.push_bytes(records(1).slice(..10));

        let mut reader = RecordReader::new(ReaderConfig::new(4));
        assert_eq!(reader.fill(&mut source).unwrap(), 0);
        let err = reader.discard_partial().unwrap();
        assert!(matches!(err, HubError::MalformedRecord { actual: 10, .. }));
        assert!(reader.discard_partial().is_none());
        assert_eq!(reader.metrics().snapshot().malformed_windows, 1);
    }

    #[test]
    fn test_empty_source_adds_nothing() {
        let mut source = MockEventSource::new();
        let mut reader = RecordReader::new(ReaderConfig::new(4));
        assert_eq!(reader.fill(&mut source).unwrap(), 0);
        assert!(!reader.has_window());
    }
}
