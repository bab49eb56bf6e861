//! # Ingestion
//!
//! Raw hub byte stream to decoded records.
//!
//! Responsibilities:
//! - Decode fixed-size wire records (`decode_record`)
//! - Slice raw reads into record windows and retain undrained windows (`RecordReader`)
//! - Encode records for capture files and scripted streams
//! - Reader-level metrics
//! - Mock collaborators for tests and offline replay
//!
//! ## Usage Example
//!
//! ```ignore
//! use ingestion::{decode_record, ReaderConfig, RecordReader};
//!
//! let mut reader = RecordReader::new(ReaderConfig::new(1024));
//! reader.fill(&mut source)?;
//! while let Some(window) = reader.pop_window() {
//!     let record = decode_record(&window)?;
//!     // route record
//! }
//! ```

mod config;
mod decoder;
mod encoder;
pub mod mock;
mod reader;

// Re-exports
pub use config::{IngestionMetrics, MetricsSnapshot, ReaderConfig, DEFAULT_READ_CHUNK};
pub use decoder::decode_record;
pub use encoder::{
    encode_record, encode_records, exhausted_record, meta_record, sensor_record,
    sensor_record_with_bias, sync_ack_record, valid_exhausted, valid_sync_ack,
};
pub use mock::{ManualClock, MemoryCalibrationStore, MockControlSink, MockEventSource};
pub use reader::{RecordReader, RecordWindow};
