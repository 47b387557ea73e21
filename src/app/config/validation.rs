use super::{Config, ConfigError};
use crate::scheduler::MAX_INTERVAL_SECS;
use url::Url;

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        // An empty URL is valid: it disables reporting
        if self.is_enabled() {
            let url = Url::parse(self.api_base_url.trim()).map_err(|e| {
                ConfigError::InvalidUrl(format!(
                    "Invalid api_base_url '{}': {}",
                    self.api_base_url, e
                ))
            })?;

            if !matches!(url.scheme(), "http" | "https") {
                return Err(ConfigError::InvalidUrl(format!(
                    "Unsupported scheme '{}' in api_base_url (expected http or https)",
                    url.scheme()
                )));
            }
        }

        if self.sample_interval_secs == 0 {
            return Err(ConfigError::InvalidConfig(
                "Sample interval must be greater than 0".to_string(),
            ));
        }

        if self.report_interval_secs == 0 {
            return Err(ConfigError::InvalidConfig(
                "Report interval must be greater than 0".to_string(),
            ));
        }

        for (name, secs) in [
            ("Sample interval", self.sample_interval_secs),
            ("Report interval", self.report_interval_secs),
        ] {
            if secs > MAX_INTERVAL_SECS {
                return Err(ConfigError::InvalidConfig(format!(
                    "{name} must be at most {MAX_INTERVAL_SECS} seconds, got {secs}"
                )));
            }
        }

        if self.buffer_capacity == 0 {
            return Err(ConfigError::InvalidConfig(
                "Buffer capacity must be greater than 0".to_string(),
            ));
        }

        if self.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidConfig(
                "Request timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
