use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Per-call options for a single gateway request.
///
/// # Examples
///
/// ```
/// use metaproc_fetch::FetchOptions;
///
/// let options = FetchOptions::default()
///     .max_size(Some(1024 * 1024))
///     .header("Accept", "application/json");
/// ```
#[derive(Clone, Default)]
pub struct FetchOptions {
    /// Declared upper bound for the response body.
    ///
    /// Carried through to the transport but not enforced while streaming.
    pub max_size: Option<u64>,

    /// Extra headers sent with the request, after the User-Agent.
    pub headers: Arc<[(String, String)]>,
}

impl fmt::Debug for FetchOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchOptions")
            .field("max_size", &self.max_size)
            .field("headers", &self.headers.len())
            .finish()
    }
}

impl FetchOptions {
    #[must_use]
    pub fn max_size(mut self, max_size: Option<u64>) -> Self {
        self.max_size = max_size;
        self
    }

    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut headers: Vec<_> = self.headers.iter().cloned().collect();
        headers.push((key.into(), value.into()));
        self.headers = headers.into();
        self
    }
}

/// Retry schedule for the resilient downloader.
///
/// `attempts` counts whole primary-then-fallback rounds, so the first round
/// is attempt 1. Between rounds the delay starts at `initial_delay` and is
/// multiplied by `backoff_factor` with no upper bound.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub initial_delay: Duration,
    pub backoff_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            initial_delay: Duration::from_secs(10),
            backoff_factor: 1.5,
        }
    }
}

impl RetryPolicy {
    pub fn with_attempts(attempts: u32) -> Self {
        Self {
            attempts,
            ..Self::default()
        }
    }
}
