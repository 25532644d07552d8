//! Error types for metaproc-fetch.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("not an IPFS URI: {0}")]
    InvalidUri(String),

    #[error("no gateways configured")]
    NoGateways,

    #[error("HTTP error from {url}: {message}")]
    Http { url: String, message: String },

    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("both gateways failed for {uri}: {last}")]
    GatewaysFailed { uri: String, last: Box<FetchError> },

    #[error("IPFS download failed after {attempts} attempts")]
    DownloadExhausted { attempts: u32 },

    #[error("failed to build HTTP client: {0}")]
    ClientBuild(String),
}

impl FetchError {
    /// Whether this error came out of the transport rather than from the input.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            FetchError::Http { .. } | FetchError::Timeout { .. } | FetchError::GatewaysFailed { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, FetchError>;
