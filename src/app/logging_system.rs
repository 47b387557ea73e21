use super::config::LogLevel;
use crate::domain::AgentError;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Output format of the installed subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

/// A single `target=level` filter directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogDirective {
    target: String,
    level: LogLevel,
}

impl LogDirective {
    pub fn new(target: impl Into<String>, level: LogLevel) -> Self {
        Self {
            target: target.into(),
            level,
        }
    }

    /// Parses `target=level`; returns `None` for anything else.
    pub fn parse(directive: &str) -> Option<Self> {
        let (target, level) = directive.split_once('=')?;
        let target = target.trim();
        if target.is_empty() {
            return None;
        }

        let level = match level.trim().to_ascii_lowercase().as_str() {
            "error" => LogLevel::Error,
            "warn" => LogLevel::Warn,
            "info" => LogLevel::Info,
            "debug" => LogLevel::Debug,
            "trace" => LogLevel::Trace,
            _ => return None,
        };

        Some(Self::new(target, level))
    }

    pub fn to_filter_string(&self) -> String {
        format!("{}={}", self.target, self.level.as_str())
    }
}

/// Builds and installs the process-wide `tracing` subscriber.
///
/// Embedding hosts usually own logging already; in that case `initialize`
/// returns `AgentError::LoggingInit` and the agent's events flow into the
/// host's subscriber instead.
pub struct LoggingSystem {
    directives: Arc<RwLock<Vec<LogDirective>>>,
    format: LogFormat,
}

impl LoggingSystem {
    pub fn new() -> Self {
        Self {
            directives: Arc::new(RwLock::new(Vec::new())),
            format: LogFormat::Compact,
        }
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Adds a `target=level` directive; malformed input is skipped.
    pub fn add_directive(&self, directive_str: &str) -> bool {
        match LogDirective::parse(directive_str) {
            Some(directive) => {
                self.directives.write().push(directive);
                true
            }
            None => {
                eprintln!("Warning: invalid log directive '{directive_str}', skipping");
                false
            }
        }
    }

    /// Quiets the HTTP stack so per-request chatter stays out of host logs.
    pub fn add_default_directives(&self) {
        let mut directives = self.directives.write();
        for target in ["hyper", "hyper_util", "reqwest", "h2", "rustls"] {
            directives.push(LogDirective::new(target, LogLevel::Warn));
        }
    }

    pub fn build_filter_string(&self, default_level: LogLevel) -> String {
        let directives = self.directives.read();

        let mut filter_parts = Vec::with_capacity(directives.len() + 1);
        filter_parts.push(default_level.as_str().to_string());
        filter_parts.extend(directives.iter().map(LogDirective::to_filter_string));

        filter_parts.join(",")
    }

    pub fn directive_count(&self) -> usize {
        self.directives.read().len()
    }

    pub fn initialize(&self, default_level: LogLevel) -> Result<(), AgentError> {
        let filter_string = self.build_filter_string(default_level);

        let env_filter = EnvFilter::try_new(&filter_string).map_err(|e| {
            AgentError::LoggingInit(format!("Failed to create EnvFilter with '{filter_string}': {e}"))
        })?;

        let registry = tracing_subscriber::registry().with(env_filter);
        let result = match self.format {
            LogFormat::Compact => registry
                .with(
                    fmt::layer()
                        .with_target(true)
                        .with_thread_ids(true)
                        .with_level(true)
                        .compact(),
                )
                .try_init(),
            LogFormat::Json => registry
                .with(fmt::layer().json().with_current_span(false))
                .try_init(),
        };

        result.map_err(|e| AgentError::LoggingInit(format!("Failed to set global subscriber: {e}")))
    }
}

impl Default for LoggingSystem {
    fn default() -> Self {
        Self::new()
    }
}

/// Installs the default compact subscriber at `level`.
pub fn setup_logging(level: LogLevel) -> Result<(), AgentError> {
    let logging_system = LoggingSystem::new();
    logging_system.add_default_directives();
    logging_system.initialize(level)
}
