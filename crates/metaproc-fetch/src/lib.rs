//! IPFS gateway fetching with fallback and exponential backoff.
//!
//! # Architecture
//!
//! This crate follows the three-layer pattern:
//! - [`data`] - Immutable configuration and fetch results
//! - [`core`] - Pure transformations (URI handling, backoff schedule)
//! - [`effects`] - I/O operations behind the [`HttpClient`] trait
//!
//! A [`Fetcher`] performs a single GET against one gateway. A
//! [`Downloader`] wraps it with random-primary/fixed-fallback gateway
//! selection and retries whole rounds with exponential backoff.

mod core;
mod data;
mod effects;
mod error;

pub use core::{Backoff, IPFS_PREFIX, gateway_link, normalize_ipfs_uri, retry_delay};
pub use data::{FetchOptions, Fetched, Gateways, Payload, RetryPolicy};
pub use effects::{Downloader, Fetcher, HttpClient, TransportError};

#[cfg(any(test, feature = "mock"))]
pub use effects::{MockError, MockHttpClient};

#[cfg(feature = "reqwest")]
pub use effects::ReqwestClient;

pub use error::{FetchError, Result};
