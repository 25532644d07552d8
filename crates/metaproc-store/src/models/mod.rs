mod entity;
mod metadata;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use entity::{Contract, Entity, ItemToken, PlaceToken};
pub use metadata::{CacheEntry, ContractMetadata, ItemMetadata, PlaceMetadata, Tag, TagMapEntry};

/// Processing state of an entity's metadata. Only `New` is ever picked up
/// by the cursors; the other three are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetadataStatus {
    New,
    Valid,
    Invalid,
    Failed,
}

impl MetadataStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, MetadataStatus::New)
    }
}

impl fmt::Display for MetadataStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MetadataStatus::New => "new",
            MetadataStatus::Valid => "valid",
            MetadataStatus::Invalid => "invalid",
            MetadataStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Item,
    Place,
    Contract,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EntityKind::Item => "item",
            EntityKind::Place => "place",
            EntityKind::Contract => "contract",
        };
        f.write_str(s)
    }
}

/// Chain position an entity was indexed at. Copied onto every record
/// derived from the entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    pub level: u64,
    pub timestamp: DateTime<Utc>,
}

impl Provenance {
    pub fn new(level: u64, timestamp: DateTime<Utc>) -> Self {
        Self { level, timestamp }
    }
}

/// Logical identity of a token: the FA2 contract plus its token id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TokenKey {
    pub contract: String,
    pub token_id: u64,
}

impl TokenKey {
    pub fn new(contract: impl Into<String>, token_id: u64) -> Self {
        Self {
            contract: contract.into(),
            token_id,
        }
    }
}

impl fmt::Display for TokenKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.contract, self.token_id)
    }
}
