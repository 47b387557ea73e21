use futures::future::BoxFuture;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Depth query failed: {0}")]
    QueryFailed(String),
    #[error("Depth query panicked")]
    Panicked,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Something that can report how many jobs are waiting in a queue.
///
/// Implementations talk to a specific queue backend; the agent only needs a
/// number. Errors are expected and cost at most one sample.
pub trait DepthSource: Send + Sync {
    /// Name used in logs and in the registration metadata.
    fn name(&self) -> &str;

    fn query_depth(&self) -> BoxFuture<'_, Result<i64, SourceError>>;
}

/// Adapts a synchronous, possibly blocking closure into a `DepthSource`.
///
/// Each query runs on tokio's blocking pool, so a slow backend call never
/// occupies a runtime worker shared with the host application.
pub struct FnDepthSource<F> {
    name: String,
    query: Arc<F>,
}

impl<F> FnDepthSource<F>
where
    F: Fn() -> anyhow::Result<i64> + Send + Sync + 'static,
{
    pub fn new(name: impl Into<String>, query: F) -> Self {
        Self {
            name: name.into(),
            query: Arc::new(query),
        }
    }
}

impl<F> DepthSource for FnDepthSource<F>
where
    F: Fn() -> anyhow::Result<i64> + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn query_depth(&self) -> BoxFuture<'_, Result<i64, SourceError>> {
        let query = Arc::clone(&self.query);
        Box::pin(async move {
            match tokio::task::spawn_blocking(move || query()).await {
                Ok(result) => result.map_err(SourceError::from),
                Err(e) if e.is_panic() => Err(SourceError::Panicked),
                Err(e) => Err(SourceError::QueryFailed(e.to_string())),
            }
        })
    }
}

impl<F> std::fmt::Debug for FnDepthSource<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnDepthSource")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
