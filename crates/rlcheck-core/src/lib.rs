//! rlcheck Core
//!
//! Types shared by every rlcheck component.
//!
//! This crate provides:
//! - The `IndicatorRecord` row model that travels from ingestion to the sinks
//! - The closed set of statistics events emitted by workers
//! - Error types and result handling

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{output_schema, IndicatorRecord, StatEvent};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::types::{fields, IndicatorRecord, StatEvent};
}
