//! Blocking drain loop.
//!
//! Runs on its own thread because event-source reads block. Events are
//! forwarded over a bounded channel; a closed channel or the stop flag ends
//! the loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use contracts::{EventSource, HubError, HubEvent};
use hub_engine::{EngineStats, HubEngine};
use ingestion::MetricsSnapshot;
use observability::DrainStatsAggregator;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct DrainLoopConfig {
    /// Events requested per drain call
    pub capacity: usize,
    /// Pause after a drain call that returned nothing
    pub idle_backoff: Duration,
    /// Give up after this many failed drain calls in a row
    pub max_consecutive_failures: u32,
}

impl Default for DrainLoopConfig {
    fn default() -> Self {
        Self {
            capacity: 64,
            idle_backoff: Duration::from_millis(5),
            max_consecutive_failures: 5,
        }
    }
}

/// What the drain thread saw
#[derive(Debug, Default)]
pub struct DrainReport {
    pub aggregator: DrainStatsAggregator,
    pub engine: EngineStats,
    pub ingestion: MetricsSnapshot,
    /// Last transport failure when the loop gave up
    pub error: Option<HubError>,
    /// Source ended inside a record
    pub partial_tail: bool,
}

/// Drain `engine` until stopped, the receiver goes away, or `finished`
/// reports the source has nothing more to give.
pub fn drain_loop<S, F>(
    mut engine: HubEngine<S>,
    tx: async_channel::Sender<HubEvent>,
    stop: Arc<AtomicBool>,
    config: DrainLoopConfig,
    finished: F,
) -> DrainReport
where
    S: EventSource,
    F: Fn(&HubEngine<S>) -> bool,
{
    let mut report = DrainReport::default();
    let mut failures = 0u32;

    'outer: while !stop.load(Ordering::Acquire) {
        let started = Instant::now();
        let outcome = engine.drain(config.capacity);
        report
            .aggregator
            .update(&outcome.events, started.elapsed().as_secs_f64() * 1_000_000.0);

        let empty = outcome.events.is_empty();
        for event in outcome.events {
            if tx.send_blocking(event).is_err() {
                debug!("event receiver closed");
                break 'outer;
            }
        }

        match outcome.error {
            Some(e) => {
                report.aggregator.record_error();
                failures += 1;
                warn!(error = %e, failures, "drain failed");
                if failures >= config.max_consecutive_failures {
                    report.error = Some(e);
                    break;
                }
                thread::sleep(config.idle_backoff);
                continue;
            }
            None => failures = 0,
        }

        if empty {
            if finished(&engine) {
                info!("event source finished");
                break;
            }
            thread::sleep(config.idle_backoff);
        }
    }

    if let Some(e) = engine.finish() {
        warn!(error = %e, "event stream ended inside a record");
        report.partial_tail = true;
    }
    report.engine = engine.stats();
    report.ingestion = engine.reader_metrics().snapshot();
    report
}
