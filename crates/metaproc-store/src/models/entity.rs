use std::fmt;

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use super::{ContractMetadata, EntityKind, ItemMetadata, MetadataStatus, PlaceMetadata, Provenance, TokenKey};
use crate::keys::DbKeys;

/// An indexed object whose metadata URI is awaiting processing.
///
/// `Key` is the process-local ordering key the cursors walk; `MetadataKey`
/// is the logical identity its derived record is stored under, which is
/// also the store's uniqueness constraint for that record.
pub trait Entity: Serialize + DeserializeOwned + Clone + fmt::Debug + Send + Sync + 'static {
    const KIND: EntityKind;
    const TREE: &'static str;
    const METADATA_TREE: &'static str;
    /// `None` for kinds that carry no tags.
    const TAG_MAP_TREE: Option<&'static str>;

    type Key: Clone + fmt::Debug + fmt::Display + Send + Sync + 'static;
    type MetadataKey: Clone + fmt::Debug + fmt::Display + PartialEq + Send + Sync + 'static;
    type Metadata: Serialize + DeserializeOwned + Clone + fmt::Debug + Send + Sync + 'static;

    fn key(&self) -> Self::Key;
    fn encode_key(key: &Self::Key) -> Vec<u8>;

    fn metadata_key(&self) -> Self::MetadataKey;
    fn encode_metadata_key(key: &Self::MetadataKey) -> Vec<u8>;

    fn metadata_uri(&self) -> &str;
    fn status(&self) -> MetadataStatus;
    fn set_status(&mut self, status: MetadataStatus);
    fn provenance(&self) -> &Provenance;

    fn metadata(&self) -> Option<&Self::MetadataKey>;
    fn attach(&mut self, key: Self::MetadataKey);
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemToken {
    pub transient_id: u64,
    pub token: TokenKey,
    pub metadata_uri: String,
    pub metadata_status: MetadataStatus,
    pub provenance: Provenance,
    pub metadata: Option<TokenKey>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceToken {
    pub transient_id: u64,
    pub token: TokenKey,
    pub metadata_uri: String,
    pub metadata_status: MetadataStatus,
    pub provenance: Provenance,
    pub metadata: Option<TokenKey>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    pub address: String,
    pub metadata_uri: String,
    pub metadata_status: MetadataStatus,
    pub provenance: Provenance,
    pub metadata: Option<String>,
}

macro_rules! token_entity {
    ($ty:ty, $kind:expr, $tree:expr, $meta_tree:expr, $tag_map:expr, $meta:ty) => {
        impl $ty {
            pub fn new(
                transient_id: u64,
                token: TokenKey,
                metadata_uri: impl Into<String>,
                provenance: Provenance,
            ) -> Self {
                Self {
                    transient_id,
                    token,
                    metadata_uri: metadata_uri.into(),
                    metadata_status: MetadataStatus::New,
                    provenance,
                    metadata: None,
                }
            }
        }

        impl Entity for $ty {
            const KIND: EntityKind = $kind;
            const TREE: &'static str = $tree;
            const METADATA_TREE: &'static str = $meta_tree;
            const TAG_MAP_TREE: Option<&'static str> = $tag_map;

            type Key = u64;
            type MetadataKey = TokenKey;
            type Metadata = $meta;

            fn key(&self) -> u64 {
                self.transient_id
            }

            fn encode_key(key: &u64) -> Vec<u8> {
                DbKeys::transient_id(*key)
            }

            fn metadata_key(&self) -> TokenKey {
                self.token.clone()
            }

            fn encode_metadata_key(key: &TokenKey) -> Vec<u8> {
                DbKeys::token(key)
            }

            fn metadata_uri(&self) -> &str {
                &self.metadata_uri
            }

            fn status(&self) -> MetadataStatus {
                self.metadata_status
            }

            fn set_status(&mut self, status: MetadataStatus) {
                self.metadata_status = status;
            }

            fn provenance(&self) -> &Provenance {
                &self.provenance
            }

            fn metadata(&self) -> Option<&TokenKey> {
                self.metadata.as_ref()
            }

            fn attach(&mut self, key: TokenKey) {
                self.metadata = Some(key);
            }
        }
    };
}

token_entity!(
    ItemToken,
    EntityKind::Item,
    DbKeys::ITEM_TOKENS,
    DbKeys::ITEM_METADATA,
    Some(DbKeys::ITEM_TAG_MAP),
    ItemMetadata
);

token_entity!(
    PlaceToken,
    EntityKind::Place,
    DbKeys::PLACE_TOKENS,
    DbKeys::PLACE_METADATA,
    None,
    PlaceMetadata
);

impl Contract {
    pub fn new(address: impl Into<String>, metadata_uri: impl Into<String>, provenance: Provenance) -> Self {
        Self {
            address: address.into(),
            metadata_uri: metadata_uri.into(),
            metadata_status: MetadataStatus::New,
            provenance,
            metadata: None,
        }
    }
}

impl Entity for Contract {
    const KIND: EntityKind = EntityKind::Contract;
    const TREE: &'static str = DbKeys::CONTRACTS;
    const METADATA_TREE: &'static str = DbKeys::CONTRACT_METADATA;
    const TAG_MAP_TREE: Option<&'static str> = Some(DbKeys::CONTRACT_TAG_MAP);

    type Key = String;
    type MetadataKey = String;
    type Metadata = ContractMetadata;

    fn key(&self) -> String {
        self.address.clone()
    }

    fn encode_key(key: &String) -> Vec<u8> {
        DbKeys::address(key)
    }

    fn metadata_key(&self) -> String {
        self.address.clone()
    }

    fn encode_metadata_key(key: &String) -> Vec<u8> {
        DbKeys::address(key)
    }

    fn metadata_uri(&self) -> &str {
        &self.metadata_uri
    }

    fn status(&self) -> MetadataStatus {
        self.metadata_status
    }

    fn set_status(&mut self, status: MetadataStatus) {
        self.metadata_status = status;
    }

    fn provenance(&self) -> &Provenance {
        &self.provenance
    }

    fn metadata(&self) -> Option<&String> {
        self.metadata.as_ref()
    }

    fn attach(&mut self, key: String) {
        self.metadata = Some(key);
    }
}
