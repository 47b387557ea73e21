use super::{ConfigError, LogLevel};
use crate::app::ProcessIdentity;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Agent settings. Built once at process start and never mutated; every
/// component receives it by reference or behind an `Arc`.
#[derive(Parser, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[command(name = "queue-autoscale-agent", version, about, long_about = None)]
#[serde(default)]
pub struct Config {
    /// Autoscale service base URL, including the app token path.
    /// Reporting is disabled while this is empty.
    #[arg(long, env = "AUTOSCALE_URL", default_value = "")]
    pub api_base_url: String,

    /// Development mode (accepts self-signed certificates)
    #[arg(long, env = "AUTOSCALE_DEV")]
    pub dev_mode: bool,

    /// Identity of this process as seen by the autoscale service
    /// (falls back to the hostname)
    #[arg(long, env = "DYNO")]
    pub process_identity: Option<String>,

    /// Seconds between queue-depth samples
    #[arg(long, env = "AUTOSCALE_SAMPLE_INTERVAL_SECS", default_value = "10")]
    pub sample_interval_secs: u64,

    /// Seconds between reports to the autoscale service
    #[arg(long, env = "AUTOSCALE_REPORT_INTERVAL_SECS", default_value = "60")]
    pub report_interval_secs: u64,

    /// Maximum measurements held while the service is unreachable
    #[arg(long, env = "AUTOSCALE_BUFFER_CAPACITY", default_value = "1000")]
    pub buffer_capacity: usize,

    /// HTTP request timeout in seconds
    #[arg(long, env = "AUTOSCALE_REQUEST_TIMEOUT_SECS", default_value = "5")]
    pub request_timeout_secs: u64,

    /// Log level
    #[arg(long, env = "AUTOSCALE_LOG_LEVEL", default_value = "info")]
    pub log_level: LogLevel,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: String::new(),
            dev_mode: false,
            process_identity: None,
            sample_interval_secs: 10,
            report_interval_secs: 60,
            buffer_capacity: 1000,
            request_timeout_secs: 5,
            log_level: LogLevel::Info,
        }
    }
}

impl Config {
    /// Parses arguments, falling back to environment variables and defaults.
    /// Never exits the process on bad input.
    pub fn from_args<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let config =
            Config::try_parse_from(args).map_err(|e| ConfigError::EnvError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_args(["queue-autoscale-agent"])
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn is_enabled(&self) -> bool {
        !self.api_base_url.trim().is_empty()
    }

    pub fn sample_interval(&self) -> Duration {
        Duration::from_secs(self.sample_interval_secs)
    }

    pub fn report_interval(&self) -> Duration {
        Duration::from_secs(self.report_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Identity of the current process: configured name or hostname, plus pid.
    pub fn current_identity(&self) -> ProcessIdentity {
        let process_identity = self
            .process_identity
            .clone()
            .filter(|name| !name.trim().is_empty())
            .or_else(|| {
                hostname::get()
                    .ok()
                    .and_then(|name| name.into_string().ok())
            })
            .unwrap_or_default();

        ProcessIdentity::new(process_identity, std::process::id().to_string())
    }
}
