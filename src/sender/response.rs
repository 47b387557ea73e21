use reqwest::StatusCode;

/// Outcome of a single call to the remote service.
///
/// Every `ReportingClient` call ends in one of these; transport errors are
/// folded into `Failure` instead of being returned as `Err`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiResponse {
    /// 2xx, carrying the raw response body.
    Success { body: String },
    /// Anything else, carrying `"<status> - <reason phrase>"`.
    Failure { message: String },
}

impl ApiResponse {
    pub fn success(body: impl Into<String>) -> Self {
        Self::Success { body: body.into() }
    }

    /// Failure message for a non-2xx status.
    pub fn from_status(status: StatusCode) -> Self {
        Self::Failure {
            message: format!(
                "{} - {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown Status")
            ),
        }
    }

    /// Unreachable host, DNS failure, refused connection or timeout.
    pub fn service_unavailable() -> Self {
        Self::from_status(StatusCode::SERVICE_UNAVAILABLE)
    }

    /// Target URL or request could not be formed.
    pub fn bad_request() -> Self {
        Self::from_status(StatusCode::BAD_REQUEST)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn is_failure(&self) -> bool {
        !self.is_success()
    }

    pub fn body(&self) -> Option<&str> {
        match self {
            Self::Success { body } => Some(body),
            Self::Failure { .. } => None,
        }
    }

    pub fn failure_message(&self) -> Option<&str> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { message } => Some(message),
        }
    }

    /// Success body parsed as JSON, if it is JSON.
    pub fn data(&self) -> Option<serde_json::Value> {
        self.body().and_then(|body| serde_json::from_str(body).ok())
    }
}
