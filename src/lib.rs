#![deny(rust_2024_compatibility)]
// Specific pedantic lints enforced (not blanket allow):
#![deny(
    clippy::explicit_iter_loop,
    clippy::manual_let_else,
    clippy::semicolon_if_nothing_returned,
    clippy::inconsistent_struct_constructor
)]
#![allow(
    clippy::cast_possible_truncation, // Safe within realistic value bounds (durations, counts)
    clippy::cast_possible_wrap,       // Queue depths and timestamps fit in i64
    clippy::missing_errors_doc,       // Internal API
    clippy::module_name_repetitions,  // e.g. SamplerStats in sampler module
    clippy::must_use_candidate        // Annotated selectively on critical APIs
)]

pub mod app;
pub mod buffer;
pub mod domain;
pub mod sampler;
pub mod scheduler;
pub mod sender;

// Re-export main types for easy access
pub use app::{Agent, AgentHandle, Config};
pub use domain::{AgentError, Measurement, ReportBatch};
pub use sender::{ApiResponse, RegistrationParams, ReportParams, ReportingClient};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
