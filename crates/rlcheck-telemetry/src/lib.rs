//! rlcheck Telemetry
//!
//! Everything that leaves a worker thread ends up here.
//!
//! Provides:
//! - Result sinks: one CSV file per outcome, each owned by a single writer thread
//! - A statistics aggregator with a periodic progress line

pub mod sink;
pub mod stats;

pub use sink::{ResultSink, SinkHandle, SinkOptions, SinkReport, SinkRole};
pub use stats::{StatsAggregator, StatsRecorder, StatsSnapshot};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::sink::{ResultSink, SinkHandle, SinkOptions, SinkReport, SinkRole};
    pub use crate::stats::{StatsAggregator, StatsRecorder, StatsSnapshot};
}
