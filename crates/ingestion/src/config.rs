//! Reader configuration and metrics

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use contracts::RECORD_SIZE;

/// Default hub buffer read size in bytes
pub const DEFAULT_READ_CHUNK: usize = 1024;

/// Record reader configuration
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    /// Complete windows retained between drain calls
    pub capacity: usize,

    /// Upper bound of a single read, in bytes
    pub read_chunk: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            capacity: 1024,
            read_chunk: DEFAULT_READ_CHUNK,
        }
    }
}

impl ReaderConfig {
    /// Create new reader configuration
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            ..Default::default()
        }
    }

    /// Read chunk rounded down to whole records, at least one record
    pub fn effective_chunk(&self) -> usize {
        (self.read_chunk / RECORD_SIZE).max(1) * RECORD_SIZE
    }
}

/// Ingestion metrics
#[derive(Debug, Default)]
pub struct IngestionMetrics {
    /// Total bytes read from the source
    pub bytes_read: AtomicU64,

    /// Total successful reads
    pub reads: AtomicU64,

    /// Total complete windows buffered
    pub windows_buffered: AtomicU64,

    /// Windows that failed to decode
    pub malformed_windows: AtomicU64,

    /// Read failures
    pub read_errors: AtomicU64,

    /// Current undrained windows
    pub pending: AtomicUsize,
}

impl IngestionMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful read
    pub fn record_read(&self, bytes: usize) {
        self.reads.fetch_add(1, Ordering::Relaxed);
        self.bytes_read.fetch_add(bytes as u64, Ordering::Relaxed);
        metrics::counter!("hub_ingestion_bytes_total").increment(bytes as u64);
    }

    /// Record buffered windows
    pub fn record_buffered(&self, windows: usize) {
        self.windows_buffered
            .fetch_add(windows as u64, Ordering::Relaxed);
    }

    /// Record malformed window
    pub fn record_malformed(&self) {
        self.malformed_windows.fetch_add(1, Ordering::Relaxed);
    }

    /// Record read failure
    pub fn record_read_error(&self) {
        self.read_errors.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("hub_ingestion_read_errors_total").increment(1);
    }

    /// Update pending window count
    pub fn update_pending(&self, len: usize) {
        self.pending.store(len, Ordering::Relaxed);
        metrics::gauge!("hub_ingestion_pending_windows").set(len as f64);
    }

    /// Get snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
            reads: self.reads.load(Ordering::Relaxed),
            windows_buffered: self.windows_buffered.load(Ordering::Relaxed),
            malformed_windows: self.malformed_windows.load(Ordering::Relaxed),
            read_errors: self.read_errors.load(Ordering::Relaxed),
            pending: self.pending.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub bytes_read: u64,
    pub reads: u64,
    pub windows_buffered: u64,
    pub malformed_windows: u64,
    pub read_errors: u64,
    pub pending: usize,
}
