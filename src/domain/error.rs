use thiserror::Error;

/// Top-level error type for agent start-up.
///
/// Only constructors return these. Once the agent is running, every network
/// outcome is an `ApiResponse` and every collaborator failure is swallowed.
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Configuration error: {0}")]
    Config(#[from] crate::app::ConfigError),

    #[error("Buffer error: {0}")]
    Buffer(#[from] crate::buffer::BufferError),

    #[error("HTTP client initialization failed: {0}")]
    ClientInit(String),

    #[error("Logging initialization failed: {0}")]
    LoggingInit(String),
}
