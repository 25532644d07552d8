//! Gateway fallback and retry on top of [`Fetcher`].
//!
//! One round is: a random primary gateway, then the fixed fallback gateway.
//! Failed rounds are retried with exponential backoff until the policy's
//! attempts are spent.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::core::Backoff;
use crate::data::{FetchOptions, Fetched, Gateways, RetryPolicy};
use crate::effects::fetcher::Fetcher;
use crate::effects::http::HttpClient;
use crate::error::{FetchError, Result};

pub struct Downloader<C: HttpClient> {
    fetcher: Arc<Fetcher<C>>,
    gateways: Gateways,
    retry: RetryPolicy,
}

impl<C: HttpClient> Downloader<C> {
    pub fn new(fetcher: Arc<Fetcher<C>>, gateways: Gateways, retry: RetryPolicy) -> Self {
        Self {
            fetcher,
            gateways,
            retry,
        }
    }

    pub fn gateways(&self) -> &Gateways {
        &self.gateways
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Download `uri`, retrying whole rounds with backoff.
    ///
    /// `max_size` is passed along as a declared cap; it is not enforced
    /// while the body streams in.
    pub async fn fetch(&self, uri: &str, max_size: Option<u64>) -> Result<Fetched> {
        let options = FetchOptions::default().max_size(max_size);
        let mut delays = Backoff::new(self.retry);
        let mut attempt = 1;

        loop {
            match self.fetch_with_fallback(uri, &options).await {
                Ok(fetched) => return Ok(fetched),
                Err(e) if !e.is_transient() => return Err(e),
                Err(e) => match delays.next() {
                    Some(delay) => {
                        info!(uri, attempt, error = %e, "backoff: sleeping for {:.1}s", delay.as_secs_f64());
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                    }
                    None => {
                        error!(uri, attempts = attempt, error = %e, "IPFS download exhausted retries");
                        return Err(FetchError::DownloadExhausted { attempts: attempt });
                    }
                },
            }
        }
    }

    /// One round: a random primary, then the fallback.
    pub async fn fetch_with_fallback(&self, uri: &str, options: &FetchOptions) -> Result<Fetched> {
        let primary = self.gateways.random_primary();
        let first = match self.fetcher.fetch(uri, primary, options).await {
            Ok(fetched) => return Ok(fetched),
            Err(e) if !e.is_transient() => return Err(e),
            Err(e) => e,
        };
        warn!(uri, gateway = primary, error = %first, "IPFS download failed, trying fallback");

        let fallback = self.gateways.fallback();
        match self.fetcher.fetch(uri, fallback, options).await {
            Ok(fetched) => Ok(fetched),
            Err(e) if !e.is_transient() => Err(e),
            Err(e) => {
                warn!(uri, gateway = fallback, error = %e, "IPFS fallback download failed");
                Err(FetchError::GatewaysFailed {
                    uri: uri.to_string(),
                    last: Box::new(e),
                })
            }
        }
    }
}
