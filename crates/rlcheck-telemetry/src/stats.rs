//! Classification statistics
//!
//! Workers record one [`StatEvent`] per indicator through a cloneable
//! [`StatsRecorder`]. The category counter and the total move together under a
//! single lock, so every snapshot satisfies `total == blocked + policy + error`.
//! A reporter thread logs the progress line roughly once per interval; it only
//! reads the counters and never holds up `record()`.

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use rlcheck_core::{Result, StatEvent};
use serde::Serialize;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Upper bound on how long the reporter sleeps between stop checks
const REPORTER_POLL: Duration = Duration::from_millis(250);

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub total: u64,
    pub blocked: u64,
    pub policy: u64,
    pub error: u64,
}

impl StatsSnapshot {
    fn apply(&mut self, event: StatEvent) {
        match event {
            StatEvent::Blocked => self.blocked += 1,
            StatEvent::Policy => self.policy += 1,
            StatEvent::Error => self.error += 1,
        }
        self.total += 1;
    }

    /// Count for one outcome
    pub fn count(&self, event: StatEvent) -> u64 {
        match event {
            StatEvent::Blocked => self.blocked,
            StatEvent::Policy => self.policy,
            StatEvent::Error => self.error,
        }
    }

    /// `total == blocked + policy + error`
    pub fn is_consistent(&self) -> bool {
        self.total == self.blocked + self.policy + self.error
    }
}

impl std::fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Processed: {}, Blocked: {}, Policy: {}, Error: {}",
            self.total, self.blocked, self.policy, self.error
        )
    }
}

/// Thread-safe counter handle
#[derive(Clone, Default)]
pub struct StatsRecorder {
    counters: Arc<Mutex<StatsSnapshot>>,
}

impl StatsRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one processed indicator
    pub fn record(&self, event: StatEvent) {
        self.counters.lock().apply(event);
        metrics::counter!("rlcheck_indicators_total", "outcome" => event.as_str()).increment(1);
    }

    /// Consistent copy of all four counters
    pub fn snapshot(&self) -> StatsSnapshot {
        *self.counters.lock()
    }
}

/// Counters plus the periodic progress reporter
pub struct StatsAggregator {
    recorder: StatsRecorder,
    stop: Option<Sender<()>>,
    reporter: Option<JoinHandle<()>>,
}

impl StatsAggregator {
    /// Start the reporter thread
    pub fn start(interval: Duration) -> Result<Self> {
        let recorder = StatsRecorder::new();
        let (stop, stopped) = bounded(1);

        let reporter_counters = recorder.clone();
        let reporter = std::thread::Builder::new()
            .name("rlcheck-stats".to_string())
            .spawn(move || run_reporter(reporter_counters, interval, stopped))?;

        Ok(Self {
            recorder,
            stop: Some(stop),
            reporter: Some(reporter),
        })
    }

    /// A recorder for worker threads
    pub fn recorder(&self) -> StatsRecorder {
        self.recorder.clone()
    }

    pub fn record(&self, event: StatEvent) {
        self.recorder.record(event);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        self.recorder.snapshot()
    }

    /// Stop the reporter
    ///
    /// Callers must make sure no more events are recorded; the returned
    /// snapshot is the final one.
    pub fn close(mut self) -> StatsSnapshot {
        self.shutdown();
        self.recorder.snapshot()
    }

    fn shutdown(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(reporter) = self.reporter.take() {
            if reporter.join().is_err() {
                debug!("stats reporter panicked");
            }
        }
    }
}

impl Drop for StatsAggregator {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_reporter(recorder: StatsRecorder, interval: Duration, stopped: Receiver<()>) {
    let poll = interval.min(REPORTER_POLL);
    let mut last_report = Instant::now();

    loop {
        match stopped.recv_timeout(poll) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {}
        }

        if last_report.elapsed() >= interval {
            last_report = Instant::now();
            info!(target: "rlcheck::progress", "{}", recorder.snapshot());
        }
    }
}
