//! Metadata processing daemon.
//!
//! Discovers indexed entities whose metadata is still `New`, fetches their
//! IPFS manifests, validates them (and, for items, the referenced 3D
//! artifact) and writes the derived records back transactionally.

pub mod cache;
pub mod config;
pub mod cursor;
pub mod daemon;
pub mod error;
pub mod grid;
pub mod logging;
pub mod manifest;
pub mod pipeline;

pub use config::{Config, Environment};
pub use error::{PipelineError, Result};
pub use pipeline::{EntityRef, MetadataProcessor, Outcome};
