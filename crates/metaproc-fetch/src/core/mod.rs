//! Pure transformations for gateway fetching.
//!
//! Nothing in here touches the network or the clock.

mod retry;
mod uri;

pub use retry::{Backoff, retry_delay};
pub use uri::{IPFS_PREFIX, gateway_link, normalize_ipfs_uri};
