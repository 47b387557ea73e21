pub mod config;
pub mod identity;
pub mod logging_system;

pub use config::{Config, ConfigError, LogLevel};
pub use identity::{IdentitySource, ProcessIdentity};
pub use logging_system::{LogFormat, LoggingSystem, setup_logging};

use crate::buffer::{BufferStats, MeasurementBuffer};
use crate::domain::AgentError;
use crate::sampler::{Clock, DepthSource, Sampler, SamplerSnapshot, SamplerStats, SystemClock};
use crate::scheduler::{Scheduler, SchedulerConfig};
use crate::sender::{ConnectionStats, RegistrationParams, ReportParams, ReportingClient};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(4);

/// Wires the reporting pipeline together and starts it in the background.
///
/// ```no_run
/// # async fn run() -> Result<(), queue_autoscale_agent::AgentError> {
/// use queue_autoscale_agent::{Agent, Config};
/// use queue_autoscale_agent::sampler::FnDepthSource;
///
/// let config = Config::from_env()?;
/// let handle = Agent::new(config)
///     .with_source(FnDepthSource::new("default", || Ok(0)))
///     .start()?;
///
/// if let Some(handle) = handle {
///     handle.shutdown().await;
/// }
/// # Ok(())
/// # }
/// ```
pub struct Agent {
    config: Arc<Config>,
    sources: Vec<Arc<dyn DepthSource>>,
    identity: Option<ProcessIdentity>,
    clock: Arc<dyn Clock>,
    flush_on_shutdown: bool,
}

impl Agent {
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
            sources: Vec::new(),
            identity: None,
            clock: Arc::new(SystemClock),
            flush_on_shutdown: true,
        }
    }

    pub fn with_source(self, source: impl DepthSource + 'static) -> Self {
        self.with_shared_source(Arc::new(source))
    }

    pub fn with_shared_source(mut self, source: Arc<dyn DepthSource>) -> Self {
        self.sources.push(source);
        self
    }

    /// Overrides the identity otherwise derived from the config.
    pub fn with_identity(mut self, identity: &dyn IdentitySource) -> Self {
        self.identity = Some(identity.current_identity());
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_flush_on_shutdown(mut self, enabled: bool) -> Self {
        self.flush_on_shutdown = enabled;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Starts sampling and reporting on the current tokio runtime.
    ///
    /// Returns `Ok(None)` when no `api_base_url` is configured.
    pub fn start(self) -> Result<Option<AgentHandle>, AgentError> {
        if !self.config.is_enabled() {
            info!("Reporting disabled: api_base_url is not set");
            return Ok(None);
        }

        self.config.validate()?;
        if self.sources.is_empty() {
            warn!("No depth sources configured; reports will be empty");
        }
        if self.config.dev_mode {
            info!("Dev mode enabled: TLS certificate verification is off");
        }

        let identity = self
            .identity
            .unwrap_or_else(|| self.config.current_identity());
        let params = ReportParams::from(&identity);

        let buffer = Arc::new(MeasurementBuffer::new(self.config.buffer_capacity)?);
        let client = ReportingClient::new(&self.config)?;
        let sampler = Arc::new(Sampler::new(self.sources, Arc::clone(&buffer), self.clock));
        let sampler_stats = sampler.stats();

        let registration = RegistrationParams::new(params.clone())
            .with_depth_sources(sampler.source_names())
            .with_sample_interval(self.config.sample_interval_secs);

        let scheduler = Arc::new(Scheduler::new(
            sampler,
            Arc::clone(&buffer),
            client.clone(),
            params,
            SchedulerConfig {
                sample_interval: self.config.sample_interval(),
                report_interval: self.config.report_interval(),
                flush_on_shutdown: self.flush_on_shutdown,
            },
        ));

        let shutdown = CancellationToken::new();

        let sampling = tokio::spawn(Arc::clone(&scheduler).run_sampling(shutdown.child_token()));

        let reporting = {
            let scheduler = Arc::clone(&scheduler);
            let shutdown = shutdown.child_token();
            tokio::spawn(async move {
                let requested = tokio::select! {
                    () = shutdown.cancelled() => None,
                    requested = scheduler.register(&registration) => requested,
                };
                let period = requested.unwrap_or(scheduler.config().report_interval);
                scheduler.run_flushing(period, shutdown).await;
            })
        };

        info!(
            version = crate::VERSION,
            process_identity = %identity.process_identity,
            pid = %identity.pid,
            "Autoscale agent started"
        );

        Ok(Some(AgentHandle {
            shutdown,
            tasks: vec![sampling, reporting],
            buffer,
            sampler_stats,
            client,
        }))
    }
}

/// Running agent. Dropping it leaves the background tasks running until
/// the runtime shuts down; call `shutdown` to stop them explicitly.
pub struct AgentHandle {
    shutdown: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
    buffer: Arc<MeasurementBuffer>,
    sampler_stats: Arc<SamplerStats>,
    client: ReportingClient,
}

impl AgentHandle {
    pub fn buffer_stats(&self) -> BufferStats {
        self.buffer.stats()
    }

    pub fn sampler_stats(&self) -> SamplerSnapshot {
        self.sampler_stats.snapshot()
    }

    pub fn connection_stats(&self) -> ConnectionStats {
        self.client.connection_stats()
    }

    /// Cancels both loops and waits for them, including a final flush.
    /// Tasks still running after the grace period are aborted.
    pub async fn shutdown(self) {
        info!("Stopping autoscale agent");
        self.shutdown.cancel();

        let aborts: Vec<_> = self.tasks.iter().map(JoinHandle::abort_handle).collect();
        match tokio::time::timeout(SHUTDOWN_GRACE, futures::future::join_all(self.tasks)).await {
            Ok(results) => {
                for result in results {
                    if let Err(e) = result {
                        error!(error = %e, "Agent task ended abnormally");
                    }
                }
            }
            Err(_) => {
                warn!(grace = ?SHUTDOWN_GRACE, "Agent tasks did not stop in time, aborting");
                for abort in aborts {
                    abort.abort();
                }
            }
        }

        info!(
            unreported = self.buffer.len(),
            "Autoscale agent stopped"
        );
    }
}
