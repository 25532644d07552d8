//! Transactional entity store.
//!
//! Holds the indexed entities (items, places, contracts), the metadata
//! records derived from them, tags and tag links, and the manifest cache.
//! Uniqueness of cache entries per URI and of derived records per logical
//! identity is enforced inside sled transactions.

mod error;
mod faults;
mod keys;
mod models;
mod store;

pub use error::{Result, StoreError};
pub use faults::TxOp;
pub use keys::DbKeys;
pub use models::{
    CacheEntry, Contract, ContractMetadata, Entity, EntityKind, ItemMetadata, ItemToken, MetadataStatus,
    PlaceMetadata, PlaceToken, Provenance, Tag, TagMapEntry, TokenKey,
};
pub use store::Store;
