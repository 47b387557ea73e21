use crate::app::ProcessIdentity;
use serde::Serialize;

/// Identity of the reporting process, sent as query parameters.
///
/// Empty fields are left out of the request entirely. The remote service
/// owns validation, so a missing identity comes back as a 4xx `Failure`
/// rather than being rejected locally.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReportParams {
    #[serde(rename = "dyno", skip_serializing_if = "String::is_empty")]
    pub process_identity: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub pid: String,
}

impl ReportParams {
    pub fn new(process_identity: impl Into<String>, pid: impl Into<String>) -> Self {
        Self {
            process_identity: process_identity.into(),
            pid: pid.into(),
        }
    }
}

impl From<&ProcessIdentity> for ReportParams {
    fn from(identity: &ProcessIdentity) -> Self {
        Self::new(identity.process_identity.clone(), identity.pid.clone())
    }
}

/// Descriptive facts sent in the body of the registration handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistrationMetadata {
    pub agent_version: String,
    pub depth_sources: Vec<String>,
    /// Seconds between samples.
    pub sample_interval: u64,
}

impl Default for RegistrationMetadata {
    fn default() -> Self {
        Self {
            agent_version: crate::VERSION.to_string(),
            depth_sources: Vec::new(),
            sample_interval: 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrationParams {
    pub identity: ReportParams,
    pub metadata: RegistrationMetadata,
}

impl RegistrationParams {
    pub fn new(identity: ReportParams) -> Self {
        Self {
            identity,
            metadata: RegistrationMetadata::default(),
        }
    }

    pub fn with_depth_sources<I, S>(mut self, sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.metadata.depth_sources = sources.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_sample_interval(mut self, secs: u64) -> Self {
        self.metadata.sample_interval = secs;
        self
    }

    /// JSON body of the registration request.
    pub fn body(&self) -> serde_json::Value {
        serde_json::json!({ "registration": self.metadata })
    }
}
