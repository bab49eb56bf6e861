//! Mock collaborators
//!
//! Scripted event source, recording control sink, manual clock and in-memory
//! calibration store. Used by unit and end-to-end tests, and by offline replay.
//! All mocks are cheap to clone; clones share state so a test can keep a handle
//! after moving one into the engine.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use contracts::{
    CalibrationData, CalibrationKind, CalibrationStore, Clock, ControlAttr, ControlCommand,
    ControlSink, EventSource, HubError, Result, SensorRecord,
};
use tracing::trace;

use crate::encoder::encode_records;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One scripted read result
#[derive(Debug, Clone)]
enum ScriptedRead {
    Data(Bytes),
    Fail(String),
}

/// Scripted event source
///
/// Returns queued chunks in order, splitting a chunk when the caller asks for
/// fewer bytes. An empty queue reads as "no data".
#[derive(Debug, Clone, Default)]
pub struct MockEventSource {
    script: Arc<Mutex<VecDeque<ScriptedRead>>>,
    read_calls: Arc<AtomicUsize>,
}

impl MockEventSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue raw bytes
    pub fn push_bytes(&self, bytes: Bytes) {
        lock(&self.script).push_back(ScriptedRead::Data(bytes));
    }

    /// Queue encoded records as one chunk
    pub fn push_records(&self, records: &[SensorRecord]) {
        self.push_bytes(encode_records(records));
    }

    /// Queue a read failure
    pub fn push_failure(&self, message: impl Into<String>) {
        lock(&self.script).push_back(ScriptedRead::Fail(message.into()));
    }

    /// Bytes still queued
    pub fn remaining_bytes(&self) -> usize {
        lock(&self.script)
            .iter()
            .map(|read| match read {
                ScriptedRead::Data(bytes) => bytes.len(),
                ScriptedRead::Fail(_) => 0,
            })
            .sum()
    }

    /// Number of `read_raw` calls so far
    pub fn read_calls(&self) -> usize {
        self.read_calls.load(Ordering::Relaxed)
    }
}

impl EventSource for MockEventSource {
    fn read_raw(&mut self, max_len: usize) -> Result<Bytes> {
        self.read_calls.fetch_add(1, Ordering::Relaxed);
        let mut script = lock(&self.script);
        match script.pop_front() {
            None => Ok(Bytes::new()),
            Some(ScriptedRead::Fail(message)) => Err(HubError::transport("read", message)),
            Some(ScriptedRead::Data(mut bytes)) => {
                if bytes.len() > max_len {
                    let rest = bytes.split_off(max_len);
                    script.push_front(ScriptedRead::Data(rest));
                }
                trace!(bytes = bytes.len(), "mock read");
                Ok(bytes)
            }
        }
    }
}

/// Recording control sink
///
/// Every accepted command is appended to the log. Failures can be injected per
/// attribute; a rejected write is still logged as attempted.
#[derive(Debug, Clone)]
pub struct MockControlSink {
    log: Arc<Mutex<Vec<ControlCommand>>>,
    fail_attrs: Arc<Mutex<Vec<ControlAttr>>>,
    flush_supported: Arc<AtomicBool>,
}

impl Default for MockControlSink {
    fn default() -> Self {
        Self {
            log: Arc::default(),
            fail_attrs: Arc::default(),
            flush_supported: Arc::new(AtomicBool::new(true)),
        }
    }
}

impl MockControlSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sink whose flush attribute does not exist
    pub fn without_flush() -> Self {
        let sink = Self::default();
        sink.flush_supported.store(false, Ordering::Relaxed);
        sink
    }

    /// Make writes to `attr` fail
    pub fn fail_attr(&self, attr: ControlAttr) {
        lock(&self.fail_attrs).push(attr);
    }

    /// Stop failing writes
    pub fn clear_failures(&self) {
        lock(&self.fail_attrs).clear();
    }

    /// All attempted commands in order
    pub fn commands(&self) -> Vec<ControlCommand> {
        lock(&self.log).clone()
    }

    /// Attempted `(attr path, line)` pairs in order
    pub fn lines(&self) -> Vec<(&'static str, String)> {
        lock(&self.log)
            .iter()
            .map(|cmd| (cmd.attr().path(), cmd.line()))
            .collect()
    }

    /// Forget recorded commands
    pub fn clear(&self) {
        lock(&self.log).clear();
    }
}

impl ControlSink for MockControlSink {
    fn write_control(&self, command: &ControlCommand) -> Result<()> {
        lock(&self.log).push(command.clone());

        let attr = command.attr();
        if attr == ControlAttr::Flush && !self.flush_supported.load(Ordering::Relaxed) {
            return Err(HubError::unsupported(
                command
                    .sensor()
                    .map(|s| s.name().to_string())
                    .unwrap_or_default(),
                "flush",
                "flush not supported",
            ));
        }
        if lock(&self.fail_attrs).contains(&attr) {
            return Err(HubError::transport("write_control", format!("injected failure on {attr}")));
        }
        Ok(())
    }
}

/// Manually advanced clock
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicI64>,
}

impl ManualClock {
    pub fn new(start_ns: i64) -> Self {
        Self {
            now: Arc::new(AtomicI64::new(start_ns)),
        }
    }

    pub fn set(&self, now_ns: i64) {
        self.now.store(now_ns, Ordering::SeqCst);
    }

    pub fn advance(&self, delta_ns: i64) {
        self.now.fetch_add(delta_ns, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ns(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// In-memory calibration store
#[derive(Debug, Clone, Default)]
pub struct MemoryCalibrationStore {
    blobs: Arc<Mutex<HashMap<CalibrationKind, CalibrationData>>>,
}

impl MemoryCalibrationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored blob, if any
    pub fn get(&self, kind: CalibrationKind) -> Option<CalibrationData> {
        lock(&self.blobs).get(&kind).cloned()
    }
}

impl CalibrationStore for MemoryCalibrationStore {
    fn load(&self, kind: CalibrationKind) -> Result<CalibrationData> {
        self.get(kind)
            .ok_or(HubError::CalibrationNotFound { kind })
    }

    fn save(&self, data: &CalibrationData) -> Result<()> {
        lock(&self.blobs).insert(data.kind(), data.clone());
        Ok(())
    }
}
