//! rlcheck Pipeline
//!
//! The concurrent core of rlcheck: indicators read from the input file are
//! queued, classified by a pool of worker threads and routed to one of three
//! result sinks, while live counters track progress.
//!
//! ```text
//! ingestion ──> WorkQueue ──> workers ──> { blocked | policy | error } sinks
//!                                   └───> stats
//! ```
//!
//! The [`Pipeline`] coordinator owns every queue, sink and thread handle and
//! enforces the shutdown order: drain, stop workers, close sinks, close stats.

pub mod config;
pub mod coordinator;
pub mod ingest;
pub mod queue;
mod worker;

pub use config::PipelineConfig;
pub use coordinator::{Pipeline, PipelineState, RunSummary};
pub use ingest::IndicatorReader;
pub use queue::{TaskDone, WorkQueue};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::config::PipelineConfig;
    pub use crate::coordinator::{Pipeline, PipelineState, RunSummary};
    pub use crate::ingest::IndicatorReader;
    pub use crate::queue::WorkQueue;
}
