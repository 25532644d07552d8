//! Immutable data types for gateway fetching.
//!
//! Everything here is configuration or a fetch result; nothing in this
//! module performs I/O.

pub mod gateways;
pub mod options;
pub mod payload;

pub use gateways::Gateways;
pub use options::{FetchOptions, RetryPolicy};
pub use payload::{Fetched, Payload};
