//! Clock resync handshake state.
//!
//! `Unsynced -> AwaitingAck -> Synced`, and back to `AwaitingAck` on every
//! later exhaustion signal. A dropped ack leaves the state in `AwaitingAck`
//! until the hub signals exhaustion again, which re-issues the request.

use std::time::Instant;

use contracts::{Clock, EXHAUSTED_MAGIC, SYNC_ACK_MAGIC};
use serde::Serialize;

/// Host monotonic clock, nanoseconds since construction
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ns(&self) -> i64 {
        i64::try_from(self.origin.elapsed().as_nanos()).unwrap_or(i64::MAX)
    }
}

/// Handshake phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClockPhase {
    #[default]
    Unsynced,
    AwaitingAck,
    Synced,
}

/// What to do with an exhaustion signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExhaustedAction {
    /// Issue a resync request
    Resync,
    /// Issue a fresh request, replacing one whose ack never arrived
    Retry,
    /// Payload does not carry the exhaustion marker
    BadMarker,
}

/// Result of an ack signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckOutcome {
    /// Reference committed, phase is `Synced`
    Committed { reference: i64 },
    /// Payload does not carry the ack marker
    BadMarker,
    /// No request outstanding
    Unexpected,
}

/// Resync handshake state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ClockSync {
    phase: ClockPhase,
    local_at_request: i64,
    committed_reference: Option<i64>,
    requests: u64,
    commits: u64,
}

impl ClockSync {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> ClockPhase {
        self.phase
    }

    /// Local clock captured when the outstanding request was issued
    pub fn local_at_request(&self) -> i64 {
        self.local_at_request
    }

    /// Reference committed by the last valid ack
    pub fn committed_reference(&self) -> Option<i64> {
        self.committed_reference
    }

    /// Resync requests issued
    pub fn requests(&self) -> u64 {
        self.requests
    }

    /// Acks committed
    pub fn commits(&self) -> u64 {
        self.commits
    }

    /// Decide how to react to an exhaustion signal carrying `marker`
    pub fn on_exhausted(&self, marker: i16) -> ExhaustedAction {
        if marker != EXHAUSTED_MAGIC {
            ExhaustedAction::BadMarker
        } else if self.phase == ClockPhase::AwaitingAck {
            ExhaustedAction::Retry
        } else {
            ExhaustedAction::Resync
        }
    }

    /// A resync request was written at local time `now_ns`
    pub fn request_issued(&mut self, now_ns: i64) {
        self.local_at_request = now_ns;
        self.phase = ClockPhase::AwaitingAck;
        self.requests += 1;
    }

    /// Apply an ack carrying `marker`
    pub fn on_ack(&mut self, marker: i16) -> AckOutcome {
        if marker != SYNC_ACK_MAGIC {
            return AckOutcome::BadMarker;
        }
        if self.phase != ClockPhase::AwaitingAck {
            return AckOutcome::Unexpected;
        }
        self.committed_reference = Some(self.local_at_request);
        self.phase = ClockPhase::Synced;
        self.commits += 1;
        AckOutcome::Committed {
            reference: self.local_at_request,
        }
    }

    /// Hub timestamp corrected by the last committed reference.
    ///
    /// The reference survives later resync requests; it is only replaced by
    /// the next committed ack.
    pub fn corrected(&self, hub_timestamp: i64) -> Option<i64> {
        self.committed_reference
            .map(|reference| reference.saturating_add(hub_timestamp))
    }
}
