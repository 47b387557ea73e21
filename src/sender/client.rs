use super::{ApiResponse, RegistrationParams, ReportParams};
use crate::app::Config;
use crate::domain::{AgentError, ReportBatch};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, ClientBuilder};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

pub const REPORT_PATH: &str = "reports";
pub const REGISTRATION_PATH: &str = "registrations";

const REPORT_ID_HEADER: &str = "x-report-id";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionStats {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub average_response_time: Duration,
}

#[derive(Debug, Default)]
pub struct ClientStats {
    total_requests: AtomicU64,
    successful_requests: AtomicU64,
    failed_requests: AtomicU64,
    total_response_time: AtomicU64,
}

impl ClientStats {
    pub fn record_request(&self, success: bool, response_time: Duration) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.total_response_time
            .fetch_add(response_time.as_millis() as u64, Ordering::Relaxed);

        if success {
            self.successful_requests.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed_requests.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> ConnectionStats {
        let total_requests = self.total_requests.load(Ordering::Relaxed);
        let total_response_time = self.total_response_time.load(Ordering::Relaxed);

        let average_response_time = if total_requests > 0 {
            Duration::from_millis(total_response_time / total_requests)
        } else {
            Duration::ZERO
        };

        ConnectionStats {
            total_requests,
            successful_requests: self.successful_requests.load(Ordering::Relaxed),
            failed_requests: self.failed_requests.load(Ordering::Relaxed),
            average_response_time,
        }
    }
}

enum RequestBody {
    Csv(String),
    Json(serde_json::Value),
}

/// HTTP client for the remote autoscaling service.
///
/// Holds no per-call state: the stats counters are write-only from the
/// request path and never influence classification.
#[derive(Debug, Clone)]
pub struct ReportingClient {
    client: Client,
    api_base_url: String,
    request_timeout: Duration,
    stats: Arc<ClientStats>,
}

impl ReportingClient {
    pub fn new(config: &Config) -> Result<Self, AgentError> {
        let request_timeout = config.request_timeout();

        let mut client_builder = ClientBuilder::new()
            .timeout(request_timeout)
            .connect_timeout(request_timeout)
            .user_agent(format!("queue-autoscale-agent/{}", crate::VERSION));

        if config.dev_mode {
            // Local dev servers commonly run with self-signed certificates
            client_builder = client_builder.danger_accept_invalid_certs(true);
        }

        let client = client_builder
            .build()
            .map_err(|e| AgentError::ClientInit(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_base_url: config.api_base_url.clone(),
            request_timeout,
            stats: Arc::new(ClientStats::default()),
        })
    }

    pub fn api_base_url(&self) -> &str {
        &self.api_base_url
    }

    pub fn connection_stats(&self) -> ConnectionStats {
        self.stats.snapshot()
    }

    /// Posts a CSV time series to the report endpoint.
    pub async fn report_metrics(
        &self,
        params: &ReportParams,
        csv: impl Into<String>,
    ) -> ApiResponse {
        self.post(REPORT_PATH, params, RequestBody::Csv(csv.into()))
            .await
    }

    pub async fn report_batch(&self, params: &ReportParams, batch: &ReportBatch) -> ApiResponse {
        self.report_metrics(params, batch.to_csv()).await
    }

    /// One-time handshake announcing this process to the remote service.
    pub async fn register_reporter(&self, params: &RegistrationParams) -> ApiResponse {
        self.post(
            REGISTRATION_PATH,
            &params.identity,
            RequestBody::Json(params.body()),
        )
        .await
    }

    /// `{api_base_url}/{path}` for http and https bases; `None` otherwise.
    pub fn endpoint_url(&self, path: &str) -> Option<Url> {
        let mut url = Url::parse(self.api_base_url.trim()).ok()?;
        if !matches!(url.scheme(), "http" | "https") {
            return None;
        }

        url.path_segments_mut().ok()?.pop_if_empty().push(path);
        Some(url)
    }

    async fn post(&self, path: &str, params: &ReportParams, body: RequestBody) -> ApiResponse {
        let Some(url) = self.endpoint_url(path) else {
            warn!(
                api_base_url = %self.api_base_url,
                path,
                "Cannot build request URL from api_base_url"
            );
            self.stats.record_request(false, Duration::ZERO);
            return ApiResponse::bad_request();
        };

        let report_id = Uuid::new_v4().to_string();
        let request = self
            .client
            .post(url.clone())
            .query(params)
            .header(REPORT_ID_HEADER, &report_id);

        let request = match body {
            RequestBody::Csv(csv) => request.header(CONTENT_TYPE, "text/csv").body(csv),
            RequestBody::Json(json) => request.json(&json),
        };

        debug!(%url, %report_id, "Sending request");
        let start = Instant::now();

        let response = match timeout(self.request_timeout, request.send()).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                self.stats.record_request(false, start.elapsed());
                return Self::classify_transport_error(&url, &e);
            }
            Err(_) => {
                self.stats.record_request(false, start.elapsed());
                warn!(%url, timeout = ?self.request_timeout, "Request timed out");
                return ApiResponse::service_unavailable();
            }
        };

        let status = response.status();
        if !status.is_success() {
            self.stats.record_request(false, start.elapsed());
            let outcome = ApiResponse::from_status(status);
            warn!(
                %url,
                failure = outcome.failure_message().unwrap_or_default(),
                "Remote service rejected request"
            );
            return outcome;
        }

        match timeout(self.request_timeout, response.text()).await {
            Ok(Ok(body)) => {
                let latency = start.elapsed();
                self.stats.record_request(true, latency);
                info!(%url, status = status.as_u16(), ?latency, "Request succeeded");
                ApiResponse::success(body)
            }
            Ok(Err(e)) => {
                self.stats.record_request(false, start.elapsed());
                Self::classify_transport_error(&url, &e)
            }
            Err(_) => {
                self.stats.record_request(false, start.elapsed());
                warn!(%url, "Timed out reading response body");
                ApiResponse::service_unavailable()
            }
        }
    }

    fn classify_transport_error(url: &Url, error: &reqwest::Error) -> ApiResponse {
        if error.is_builder() {
            warn!(%url, error = %error, "Request could not be built");
            return ApiResponse::bad_request();
        }

        warn!(
            %url,
            error = %error,
            connect = error.is_connect(),
            timeout = error.is_timeout(),
            "Remote service unreachable"
        );
        ApiResponse::service_unavailable()
    }
}
