use tracing::debug;

use crate::core::{gateway_link, normalize_ipfs_uri};
use crate::data::{FetchOptions, Fetched};
use crate::effects::http::{HttpClient, TransportError};
use crate::error::{FetchError, Result};

/// Performs one GET of an `ipfs://` URI against one gateway.
pub struct Fetcher<C: HttpClient> {
    client: C,
    user_agent: String,
}

impl<C: HttpClient> Fetcher<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            user_agent: default_user_agent(),
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Fetch `uri` through `gateway`, telling JSON bodies from binary ones.
    pub async fn fetch(&self, uri: &str, gateway: &str, options: &FetchOptions) -> Result<Fetched> {
        let uri = normalize_ipfs_uri(uri)?;
        let url = gateway_link(&uri, gateway)?;
        debug!(url = %url, max_size = ?options.max_size, "fetching");

        let mut headers = Vec::with_capacity(options.headers.len() + 1);
        headers.push(("User-Agent".to_string(), self.user_agent.clone()));
        headers.extend(options.headers.iter().cloned());

        let body = self.client.get(&url, &headers).await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout { url: url.clone() }
            } else {
                FetchError::Http {
                    url: url.clone(),
                    message: e.to_string(),
                }
            }
        })?;

        Ok(Fetched::from_body(body))
    }
}

fn default_user_agent() -> String {
    format!(
        "metaproc/{} ({}; {})",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        std::env::consts::ARCH
    )
}
