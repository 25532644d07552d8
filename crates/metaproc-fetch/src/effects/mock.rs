//! Scripted in-memory transport.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use bytes::Bytes;
use thiserror::Error;

use crate::effects::http::{HttpClient, TransportError};

#[derive(Debug, Error)]
pub enum MockError {
    #[error("mock HTTP {status} for {url}")]
    Status { status: u16, url: String },

    #[error("mock request to {url} timed out")]
    TimedOut { url: String },
}

impl TransportError for MockError {
    fn is_timeout(&self) -> bool {
        matches!(self, MockError::TimedOut { .. })
    }
}

type Hook = Box<dyn FnOnce() + Send>;

#[derive(Default)]
struct MockState {
    hooks: HashMap<String, Hook>,
    content: HashMap<String, Bytes>,
    down: Vec<String>,
    slow: Vec<String>,
    requests: Vec<String>,
    last_headers: Vec<(String, String)>,
}

/// A [`HttpClient`] that serves registered IPFS paths from memory.
///
/// Content is keyed by the path after `/ipfs/`, so it resolves through any
/// gateway that is not marked down. Unknown paths answer 404. Every
/// request URL is recorded in order.
#[derive(Clone, Default)]
pub struct MockHttpClient {
    state: Arc<Mutex<MockState>>,
}

impl MockHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` for `ipfs_path` (the URI without its `ipfs://` prefix).
    pub fn with_content(self, ipfs_path: impl Into<String>, body: impl Into<Bytes>) -> Self {
        self.state().content.insert(ipfs_path.into(), body.into());
        self
    }

    /// Answer 502 for every request to `gateway`.
    pub fn with_gateway_down(self, gateway: impl Into<String>) -> Self {
        self.state().down.push(gateway.into());
        self
    }

    /// Run `hook` once, the first time `ipfs_path` is requested, before
    /// answering. Lets a test act as a concurrent writer mid-download.
    pub fn on_request(self, ipfs_path: impl Into<String>, hook: impl FnOnce() + Send + 'static) -> Self {
        self.state().hooks.insert(ipfs_path.into(), Box::new(hook));
        self
    }

    /// Time out every request to `gateway`.
    pub fn with_gateway_timeout(self, gateway: impl Into<String>) -> Self {
        self.state().slow.push(gateway.into());
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.state().requests.clone()
    }

    pub fn request_count(&self) -> usize {
        self.state().requests.len()
    }

    pub fn last_headers(&self) -> Vec<(String, String)> {
        self.state().last_headers.clone()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn respond(&self, url: &str, headers: &[(String, String)]) -> Result<Bytes, MockError> {
        let path = url.split_once("/ipfs/").map(|(_, path)| path).unwrap_or_default();
        let hook = self.state().hooks.remove(path);
        if let Some(hook) = hook {
            hook();
        }

        let mut state = self.state();
        state.requests.push(url.to_string());
        state.last_headers = headers.to_vec();

        if state.slow.iter().any(|gateway| url.starts_with(gateway.as_str())) {
            return Err(MockError::TimedOut { url: url.to_string() });
        }
        if state.down.iter().any(|gateway| url.starts_with(gateway.as_str())) {
            return Err(MockError::Status {
                status: 502,
                url: url.to_string(),
            });
        }

        state.content.get(path).cloned().ok_or_else(|| MockError::Status {
            status: 404,
            url: url.to_string(),
        })
    }
}

impl HttpClient for MockHttpClient {
    type Error = MockError;

    async fn get(&self, url: &str, headers: &[(String, String)]) -> Result<Bytes, Self::Error> {
        self.respond(url, headers)
    }
}
