#[cfg(test)]
use mockall::automock;

/// Wall-clock source for measurement timestamps.
#[cfg_attr(test, automock)]
pub trait Clock: Send + Sync {
    /// Current unix time in seconds.
    fn now_unix(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}
