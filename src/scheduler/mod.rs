//! Periodic drivers for the sampling and flush cycles.
//!
//! The two cycles run as independent tokio tasks that share only the
//! measurement buffer. A failed flush leaves the buffer intact and waits
//! for the next tick; there is no retry loop of its own.

use crate::buffer::MeasurementBuffer;
use crate::sampler::Sampler;
use crate::sender::{ApiResponse, RegistrationParams, ReportParams, ReportingClient};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior, interval, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Longest sampling or reporting period accepted from config or from the
/// remote service.
pub const MAX_INTERVAL_SECS: u64 = 86_400;

/// Clamps a period into the range tokio timers accept.
fn bounded_period(period: Duration) -> Duration {
    period.clamp(Duration::from_millis(1), Duration::from_secs(MAX_INTERVAL_SECS))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub sample_interval: Duration,
    pub report_interval: Duration,
    /// Attempt one last flush when the flush loop is cancelled.
    pub flush_on_shutdown: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            sample_interval: Duration::from_secs(10),
            report_interval: Duration::from_secs(60),
            flush_on_shutdown: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Nothing buffered, no request sent.
    Empty,
    Delivered { count: usize },
    Failed { message: String, retained: usize },
}

pub struct Scheduler {
    sampler: Arc<Sampler>,
    buffer: Arc<MeasurementBuffer>,
    client: ReportingClient,
    params: ReportParams,
    config: SchedulerConfig,
}

impl Scheduler {
    pub fn new(
        sampler: Arc<Sampler>,
        buffer: Arc<MeasurementBuffer>,
        client: ReportingClient,
        params: ReportParams,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            sampler,
            buffer,
            client,
            params,
            config,
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Snapshots the buffer and delivers it. Reported entries are released
    /// only after a `Success`.
    pub async fn flush_once(&self) -> FlushOutcome {
        let snapshot = self.buffer.snapshot_and_hold();
        if snapshot.is_empty() {
            debug!("Nothing to report");
            return FlushOutcome::Empty;
        }

        let batch = snapshot.to_batch();
        match self.client.report_batch(&self.params, &batch).await {
            ApiResponse::Success { .. } => {
                let count = self.buffer.release(&snapshot);
                info!(count, "Reported measurements");
                FlushOutcome::Delivered { count }
            }
            ApiResponse::Failure { message } => {
                let retained = self.buffer.len();
                warn!(
                    failure = %message,
                    retained,
                    "Report failed, keeping measurements for next cycle"
                );
                FlushOutcome::Failed { message, retained }
            }
        }
    }

    /// Performs the registration handshake. Returns the report interval the
    /// service asked for, if any.
    pub async fn register(&self, params: &RegistrationParams) -> Option<Duration> {
        let response = self.client.register_reporter(params).await;
        match &response {
            ApiResponse::Success { .. } => {
                let requested = requested_report_interval(&response);
                info!(
                    process_identity = %params.identity.process_identity,
                    pid = %params.identity.pid,
                    ?requested,
                    "Registered reporter"
                );
                requested
            }
            ApiResponse::Failure { message } => {
                warn!(failure = %message, "Reporter registration failed, reporting anyway");
                None
            }
        }
    }

    pub async fn run_sampling(self: Arc<Self>, shutdown: CancellationToken) {
        let period = bounded_period(self.config.sample_interval);
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(interval = ?period, "Sampling loop started");

        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    self.sampler.sample_once().await;
                }
            }
        }

        info!("Sampling loop stopped");
    }

    /// Flushes every `period`, starting one period from now. Periods above
    /// `MAX_INTERVAL_SECS` are clamped.
    pub async fn run_flushing(self: Arc<Self>, period: Duration, shutdown: CancellationToken) {
        let period = bounded_period(period);
        let now = Instant::now();
        let start = now.checked_add(period).unwrap_or(now);
        let mut ticker = interval_at(start, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(interval = ?period, "Flush loop started");

        loop {
            tokio::select! {
                () = shutdown.cancelled() => {
                    if self.config.flush_on_shutdown {
                        self.flush_once().await;
                    }
                    break;
                }
                _ = ticker.tick() => {
                    self.flush_once().await;
                }
            }
        }

        info!("Flush loop stopped");
    }
}

/// `report_interval` (whole seconds) from a JSON success body. Values
/// outside `1..=MAX_INTERVAL_SECS` are ignored.
pub fn requested_report_interval(response: &ApiResponse) -> Option<Duration> {
    response
        .data()?
        .get("report_interval")?
        .as_u64()
        .filter(|secs| (1..=MAX_INTERVAL_SECS).contains(secs))
        .map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requested_report_interval() {
        let response = ApiResponse::success(r#"{"report_interval": 15}"#);
        assert_eq!(
            requested_report_interval(&response),
            Some(Duration::from_secs(15))
        );
    }

    #[test]
    fn test_requested_report_interval_ignores_bad_values() {
        for body in [
            "OK",
            "{}",
            r#"{"report_interval": 0}"#,
            r#"{"report_interval": "30"}"#,
            r#"{"report_interval": -5}"#,
            r#"{"report_interval": 86401}"#,
            r#"{"report_interval": 18446744073709551615}"#,
        ] {
            assert_eq!(requested_report_interval(&ApiResponse::success(body)), None);
        }
        assert_eq!(requested_report_interval(&ApiResponse::bad_request()), None);
    }

    #[test]
    fn test_requested_report_interval_accepts_upper_bound() {
        let response = ApiResponse::success(r#"{"report_interval": 86400}"#);
        assert_eq!(
            requested_report_interval(&response),
            Some(Duration::from_secs(MAX_INTERVAL_SECS))
        );
    }

    #[test]
    fn test_bounded_period() {
        assert_eq!(bounded_period(Duration::MAX), Duration::from_secs(MAX_INTERVAL_SECS));
        assert_eq!(bounded_period(Duration::ZERO), Duration::from_millis(1));
        assert_eq!(bounded_period(Duration::from_secs(60)), Duration::from_secs(60));
    }
}
