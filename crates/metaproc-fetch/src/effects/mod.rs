//! I/O operations for gateway fetching.

mod downloader;
mod fetcher;
mod http;
#[cfg(any(test, feature = "mock"))]
mod mock;

pub use downloader::Downloader;
pub use fetcher::Fetcher;
pub use http::{HttpClient, TransportError};
#[cfg(any(test, feature = "mock"))]
pub use mock::{MockError, MockHttpClient};

#[cfg(feature = "reqwest")]
pub use http::ReqwestClient;
