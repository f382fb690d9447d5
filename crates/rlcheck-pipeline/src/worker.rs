//! Classification workers

use crate::queue::WorkQueue;
use futures::FutureExt;
use rlcheck_classifiers::{ClassificationResult, ClassifyError, ThreatClassifier};
use rlcheck_core::types::fields;
use rlcheck_core::{IndicatorRecord, StatEvent};
use rlcheck_telemetry::{SinkHandle, StatsRecorder};
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::{debug, error, warn};

/// Submission handles for the three outputs
#[derive(Clone)]
pub(crate) struct Outputs {
    pub blocked: SinkHandle,
    pub policy: SinkHandle,
    pub error: SinkHandle,
}

impl Outputs {
    fn for_event(&self, event: StatEvent) -> &SinkHandle {
        match event {
            StatEvent::Blocked => &self.blocked,
            StatEvent::Policy => &self.policy,
            StatEvent::Error => &self.error,
        }
    }

    /// Send a record to the output matching `event` and count it
    pub fn route(&self, record: IndicatorRecord, event: StatEvent, stats: &StatsRecorder) {
        let indicator = record.indicator().to_string();
        if let Err(e) = self.for_event(event).submit(record) {
            error!(indicator = %indicator, "record lost: {}", e);
        }
        stats.record(event);
    }
}

/// Everything a worker thread needs, shared with its siblings
#[derive(Clone)]
pub(crate) struct WorkerContext {
    pub queue: Arc<WorkQueue<IndicatorRecord>>,
    pub classifier: Arc<dyn ThreatClassifier>,
    pub outputs: Outputs,
    pub stats: StatsRecorder,
    pub shutdown: Arc<AtomicBool>,
    pub runtime: Handle,
    pub poll_interval: Duration,
}

/// Worker loop: runs until the shutdown flag is raised
pub(crate) fn run_worker(id: usize, ctx: WorkerContext) {
    debug!(worker = id, "worker started");
    let mut processed = 0u64;

    while !ctx.shutdown.load(Ordering::Acquire) {
        let Some(record) = ctx.queue.dequeue(ctx.poll_interval) else {
            continue;
        };
        let _done = ctx.queue.completion();

        let outcome = classify(&ctx, record.indicator());
        let (record, event) = apply(record, outcome);
        ctx.outputs.route(record, event, &ctx.stats);
        processed += 1;
    }

    debug!(worker = id, processed, "worker stopped");
}

/// Run the classifier, turning a panic inside it into a transport error
fn classify(ctx: &WorkerContext, indicator: &str) -> Result<ClassificationResult, ClassifyError> {
    let call = AssertUnwindSafe(ctx.classifier.classify(indicator)).catch_unwind();
    match ctx.runtime.block_on(call) {
        Ok(outcome) => outcome,
        Err(_) => Err(ClassifyError::transport(format!(
            "{} classifier panicked",
            ctx.classifier.name()
        ))),
    }
}

/// Decide the output for a classification outcome, adding the derived fields
/// on success
pub(crate) fn apply(
    mut record: IndicatorRecord,
    outcome: Result<ClassificationResult, ClassifyError>,
) -> (IndicatorRecord, StatEvent) {
    match outcome {
        Err(e) => {
            match e.status_code() {
                Some(code) => warn!(indicator = record.indicator(), "Error {} while processing: {}", code, e),
                None => warn!(indicator = record.indicator(), "Error while processing: {}", e),
            }
            (record, StatEvent::Error)
        }
        Ok(result) => {
            record.set(fields::RISK_LEVEL, result.risk_level.to_string());
            record.set(fields::CATEGORY, result.category_list());
            let event = if result.blocked {
                StatEvent::Blocked
            } else {
                StatEvent::Policy
            };
            (record, event)
        }
    }
}
