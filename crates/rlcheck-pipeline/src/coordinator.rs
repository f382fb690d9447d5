//! Run coordinator
//!
//! A run moves through `Idle → Filling → Draining → ShuttingDown → Done`:
//!
//! - **Filling**: sinks and stats are opened, workers started, then every
//!   input row is enqueued. Rows with an unsupported threat type skip the
//!   queue and go straight to the error output.
//! - **Draining**: wait until every queued record is acknowledged.
//! - **ShuttingDown**: raise the shutdown flag and join the workers, close the
//!   sinks (each waits for its pending writes), log the final totals, then
//!   close stats.
//!
//! Sinks are never closed before the queue has drained.

use crate::config::PipelineConfig;
use crate::ingest::IndicatorReader;
use crate::queue::WorkQueue;
use crate::worker::{run_worker, Outputs, WorkerContext};
use rlcheck_classifiers::{ClassifyError, ThreatClassifier};
use rlcheck_core::{output_schema, Error, Result, StatEvent};
use rlcheck_telemetry::{ResultSink, SinkReport, SinkRole, StatsAggregator, StatsSnapshot};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Lifecycle of a pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Filling,
    Draining,
    ShuttingDown,
    Done,
}

/// Result of a completed run
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Final counters
    pub stats: StatsSnapshot,

    /// One report per output, in blocked, policy, error order
    pub outputs: Vec<SinkReport>,

    /// Wall-clock duration of the run
    pub elapsed: Duration,
}

impl RunSummary {
    /// Report for one output
    pub fn output_for(&self, role: SinkRole) -> Option<&SinkReport> {
        self.outputs.iter().find(|report| report.role == role)
    }
}

/// The three open sinks of a run
struct Sinks {
    blocked: ResultSink,
    policy: ResultSink,
    error: ResultSink,
}

impl Sinks {
    fn open(
        dir: &Path,
        run_stamp: &str,
        input: &Path,
        schema: &[String],
        config: &PipelineConfig,
    ) -> Result<Self> {
        let open = |role: SinkRole| {
            ResultSink::create(role.output_path(dir, run_stamp, input), role, schema, &config.sink)
        };
        Ok(Self {
            blocked: open(SinkRole::Blocked)?,
            policy: open(SinkRole::Policy)?,
            error: open(SinkRole::Error)?,
        })
    }

    fn outputs(&self) -> Outputs {
        Outputs {
            blocked: self.blocked.handle(),
            policy: self.policy.handle(),
            error: self.error.handle(),
        }
    }

    /// Close in role order; keeps closing after a failure
    fn close(self) -> Result<Vec<SinkReport>> {
        let mut reports = Vec::with_capacity(3);
        let mut failure = None;
        for sink in [self.blocked, self.policy, self.error] {
            match sink.close() {
                Ok(report) => reports.push(report),
                Err(e) => {
                    error!("failed to close sink: {}", e);
                    failure.get_or_insert(e);
                }
            }
        }
        match failure {
            Some(e) => Err(e),
            None => Ok(reports),
        }
    }
}

/// Coordinates one classification run
pub struct Pipeline {
    config: PipelineConfig,
    classifier: Arc<dyn ThreatClassifier>,
    state: PipelineState,
}

impl Pipeline {
    /// Create a new pipeline
    pub fn new(config: PipelineConfig, classifier: Arc<dyn ThreatClassifier>) -> Self {
        Self {
            config,
            classifier,
            state: PipelineState::Idle,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn transition(&mut self, next: PipelineState) {
        debug!(from = ?self.state, to = ?next, "pipeline state");
        self.state = next;
    }

    /// Classify every row of `input`, writing the three outputs to `output_dir`
    ///
    /// Blocks until the run is complete. Must not be called from inside an
    /// async runtime: the pipeline runs its own for the classifier.
    pub fn run(&mut self, input: &Path, output_dir: &Path) -> Result<RunSummary> {
        if self.state != PipelineState::Idle {
            return Err(Error::internal(format!(
                "pipeline already used (state {:?})",
                self.state
            )));
        }
        self.config.validate()?;
        let started = Instant::now();

        // Everything that can fail fatally happens before any worker starts.
        let reader = IndicatorReader::open(input, self.config.input_delimiter)?;
        let schema = output_schema(reader.headers());

        std::fs::create_dir_all(output_dir).map_err(|e| {
            Error::output(format!("cannot create {}: {}", output_dir.display(), e))
        })?;
        let run_stamp = chrono::Local::now().format("%Y%m%d%H%M%S").to_string();
        let sinks = Sinks::open(output_dir, &run_stamp, input, &schema, &self.config)?;
        let stats = StatsAggregator::start(self.config.progress_interval())?;

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.config.io_threads)
            .thread_name("rlcheck-io")
            .enable_all()
            .build()?;

        let queue = Arc::new(WorkQueue::new());
        let shutdown = Arc::new(AtomicBool::new(false));
        let outputs = sinks.outputs();
        let ctx = WorkerContext {
            queue: Arc::clone(&queue),
            classifier: Arc::clone(&self.classifier),
            outputs: outputs.clone(),
            stats: stats.recorder(),
            shutdown: Arc::clone(&shutdown),
            runtime: runtime.handle().clone(),
            poll_interval: self.config.poll_interval(),
        };

        let mut workers = Vec::with_capacity(self.config.workers);
        for id in 0..self.config.workers {
            let ctx = ctx.clone();
            let spawned = std::thread::Builder::new()
                .name(format!("rlcheck-worker-{}", id))
                .spawn(move || run_worker(id, ctx));
            match spawned {
                Ok(handle) => workers.push(handle),
                Err(e) => {
                    shutdown.store(true, Ordering::Release);
                    join_workers(workers);
                    return Err(e.into());
                }
            }
        }
        drop(ctx);
        self.transition(PipelineState::Filling);

        let recorder = stats.recorder();
        let mut enqueued = 0u64;
        let mut ingest_error = None;
        for row in reader {
            match row {
                Ok(record) if self.config.supports(record.threat_type()) => {
                    queue.enqueue(record);
                    enqueued += 1;
                }
                Ok(record) => {
                    let reason = ClassifyError::UnsupportedThreatType(record.threat_type().to_string());
                    warn!(indicator = record.indicator(), "Error while processing: {}", reason);
                    outputs.route(record, StatEvent::Error, &recorder);
                }
                Err(e) => {
                    error!("stopping ingestion: {}", e);
                    ingest_error = Some(e);
                    break;
                }
            }
        }
        drop(outputs);
        debug!(enqueued, "ingestion complete");

        self.transition(PipelineState::Draining);
        queue.await_drained();

        self.transition(PipelineState::ShuttingDown);
        shutdown.store(true, Ordering::Release);
        let panicked = join_workers(workers);
        let reports = sinks.close();

        let snapshot = stats.snapshot();
        info!(
            "Total: {}, Blocked: {}, Policy: {}, Error: {}",
            snapshot.total, snapshot.blocked, snapshot.policy, snapshot.error
        );
        stats.close();
        runtime.shutdown_timeout(Duration::from_secs(1));
        self.transition(PipelineState::Done);

        let outputs = reports?;
        if let Some(e) = ingest_error {
            return Err(e);
        }
        if panicked > 0 {
            return Err(Error::internal(format!("{} worker thread(s) panicked", panicked)));
        }

        Ok(RunSummary {
            stats: snapshot,
            outputs,
            elapsed: started.elapsed(),
        })
    }
}

/// Join every worker, returning how many panicked
fn join_workers(workers: Vec<JoinHandle<()>>) -> usize {
    let mut panicked = 0;
    for worker in workers {
        let name = worker.thread().name().unwrap_or("worker").to_string();
        if worker.join().is_err() {
            warn!("{} panicked", name);
            panicked += 1;
        }
    }
    panicked
}
