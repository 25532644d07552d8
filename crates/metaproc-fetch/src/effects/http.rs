use std::future::Future;

use bytes::Bytes;

/// Asynchronous HTTP transport abstraction.
///
/// One capability: a GET that yields the full body or fails. Implementations
/// own their timeouts and connection limits and must fail on any non-2xx
/// status.
///
/// # Implementations
///
/// - [`ReqwestClient`]: Production implementation using `reqwest`
/// - `MockHttpClient` (feature `mock`): scripted responses for tests
pub trait HttpClient: Send + Sync {
    /// Error type for HTTP operations.
    type Error: TransportError;

    /// Fetch `url` and return the whole response body.
    fn get(
        &self,
        url: &str,
        headers: &[(String, String)],
    ) -> impl Future<Output = std::result::Result<Bytes, Self::Error>> + Send;
}

/// A transport failure that knows whether the request ran out of time.
pub trait TransportError: std::error::Error + Send + Sync + 'static {
    fn is_timeout(&self) -> bool {
        false
    }
}

#[cfg(feature = "reqwest")]
mod reqwest_impl {
    use std::sync::Arc;
    use std::time::Duration;

    use tokio::sync::Semaphore;

    use super::*;
    use crate::error::{FetchError, Result};

    /// Production HTTP client implementation using reqwest.
    ///
    /// A single shared connection pool; `max_connections` bounds the number
    /// of requests in flight regardless of how many workers call in.
    #[derive(Clone)]
    pub struct ReqwestClient {
        client: reqwest::Client,
        permits: Arc<Semaphore>,
    }

    impl ReqwestClient {
        /// Create a client with uniform connect and read timeouts.
        pub fn new(timeout: Duration, max_connections: usize) -> Result<Self> {
            let client = reqwest::Client::builder()
                .connect_timeout(timeout)
                .read_timeout(timeout)
                .build()
                .map_err(|e| FetchError::ClientBuild(e.to_string()))?;

            Ok(Self {
                client,
                permits: Arc::new(Semaphore::new(max_connections.max(1))),
            })
        }
    }

    impl TransportError for reqwest::Error {
        fn is_timeout(&self) -> bool {
            reqwest::Error::is_timeout(self)
        }
    }

    impl HttpClient for ReqwestClient {
        type Error = reqwest::Error;

        async fn get(
            &self,
            url: &str,
            headers: &[(String, String)],
        ) -> std::result::Result<Bytes, Self::Error> {
            // The semaphore is never closed, so acquire cannot fail.
            let _permit = self.permits.acquire().await.ok();

            let mut request = self.client.get(url);
            for (key, value) in headers {
                request = request.header(key, value);
            }

            let response = request.send().await?.error_for_status()?;
            response.bytes().await
        }
    }
}

#[cfg(feature = "reqwest")]
pub use reqwest_impl::ReqwestClient;
