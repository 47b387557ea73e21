use crate::app::Config;

/// Who is reporting: the process name known to the platform and its pid.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessIdentity {
    pub process_identity: String,
    pub pid: String,
}

impl ProcessIdentity {
    pub fn new(process_identity: impl Into<String>, pid: impl Into<String>) -> Self {
        Self {
            process_identity: process_identity.into(),
            pid: pid.into(),
        }
    }
}

/// Supplies the identity used for registration and every report.
/// Read once when the agent starts.
pub trait IdentitySource: Send + Sync {
    fn current_identity(&self) -> ProcessIdentity;
}

impl IdentitySource for ProcessIdentity {
    fn current_identity(&self) -> ProcessIdentity {
        self.clone()
    }
}

impl IdentitySource for Config {
    fn current_identity(&self) -> ProcessIdentity {
        Config::current_identity(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configured_identity_wins() {
        let config = Config {
            process_identity: Some("web.1".to_string()),
            ..Config::default()
        };

        let identity = IdentitySource::current_identity(&config);
        assert_eq!(identity.process_identity, "web.1");
        assert_eq!(identity.pid, std::process::id().to_string());
    }

    #[test]
    fn test_blank_identity_falls_back_to_hostname() {
        let config = Config {
            process_identity: Some("  ".to_string()),
            ..Config::default()
        };

        let expected = hostname::get()
            .ok()
            .and_then(|name| name.into_string().ok())
            .unwrap_or_default();
        assert_eq!(config.current_identity().process_identity, expected);
    }

    #[test]
    fn test_fixed_identity_is_returned_as_is() {
        let identity = ProcessIdentity::new("worker.3", "42");
        assert_eq!(identity.current_identity(), identity);
    }
}
