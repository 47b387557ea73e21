pub mod clock;
pub mod source;

pub use clock::{Clock, SystemClock};
pub use source::{DepthSource, FnDepthSource, SourceError};

use crate::buffer::MeasurementBuffer;
use crate::domain::Measurement;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SamplerSnapshot {
    pub ticks: u64,
    pub samples_recorded: u64,
    pub samples_missed: u64,
}

#[derive(Debug, Default)]
pub struct SamplerStats {
    ticks: AtomicU64,
    samples_recorded: AtomicU64,
    samples_missed: AtomicU64,
}

impl SamplerStats {
    pub fn snapshot(&self) -> SamplerSnapshot {
        SamplerSnapshot {
            ticks: self.ticks.load(Ordering::Relaxed),
            samples_recorded: self.samples_recorded.load(Ordering::Relaxed),
            samples_missed: self.samples_missed.load(Ordering::Relaxed),
        }
    }
}

/// Queries every depth source once per tick and appends the results.
pub struct Sampler {
    sources: Vec<Arc<dyn DepthSource>>,
    buffer: Arc<MeasurementBuffer>,
    clock: Arc<dyn Clock>,
    stats: Arc<SamplerStats>,
}

impl Sampler {
    pub fn new(
        sources: Vec<Arc<dyn DepthSource>>,
        buffer: Arc<MeasurementBuffer>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            sources,
            buffer,
            clock,
            stats: Arc::new(SamplerStats::default()),
        }
    }

    pub fn source_names(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.name().to_string()).collect()
    }

    pub fn stats(&self) -> Arc<SamplerStats> {
        Arc::clone(&self.stats)
    }

    /// Runs one sampling tick. Returns the number of measurements appended.
    ///
    /// A source that errors or panics contributes nothing this tick; the
    /// remaining sources are still queried.
    pub async fn sample_once(&self) -> usize {
        self.stats.ticks.fetch_add(1, Ordering::Relaxed);
        let timestamp = self.clock.now_unix();
        let mut recorded = 0;

        for source in &self.sources {
            let outcome = AssertUnwindSafe(source.query_depth())
                .catch_unwind()
                .await
                .unwrap_or(Err(SourceError::Panicked));

            let depth = match outcome {
                Ok(depth) => depth,
                Err(e) => {
                    self.stats.samples_missed.fetch_add(1, Ordering::Relaxed);
                    warn!(source = source.name(), error = %e, "Skipping sample");
                    continue;
                }
            };

            if let Some(evicted) = self.buffer.append(Measurement::new(timestamp, depth)) {
                debug!(
                    source = source.name(),
                    evicted_timestamp = evicted.timestamp,
                    "Buffer full, evicted oldest measurement"
                );
            }

            self.stats.samples_recorded.fetch_add(1, Ordering::Relaxed);
            recorded += 1;
        }

        recorded
    }
}

impl std::fmt::Debug for Sampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sampler")
            .field("sources", &self.source_names())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}
