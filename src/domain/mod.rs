//! Domain layer for the autoscale agent.
//!
//! Contains the canonical types shared across all modules:
//! - `Measurement`: one observed queue depth at one instant
//! - `ReportBatch`: the ordered time series shipped in a single report
//! - `AgentError`: top-level error type for construction-time failures

pub mod error;
pub mod measurement;

pub use error::AgentError;
pub use measurement::{Measurement, ReportBatch};
