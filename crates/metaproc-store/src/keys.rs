//! Tree names and key encodings.
//!
//! Numeric keys are big-endian so that sled's byte ordering is numeric
//! ordering, which the watermark scans rely on.

use crate::models::TokenKey;

pub struct DbKeys;

impl DbKeys {
    pub const ITEM_TOKENS: &'static str = "item_tokens";
    pub const PLACE_TOKENS: &'static str = "place_tokens";
    pub const CONTRACTS: &'static str = "contracts";
    pub const ITEM_METADATA: &'static str = "item_metadata";
    pub const PLACE_METADATA: &'static str = "place_metadata";
    pub const CONTRACT_METADATA: &'static str = "contract_metadata";
    pub const TAGS: &'static str = "tags";
    pub const ITEM_TAG_MAP: &'static str = "item_tag_map";
    pub const CONTRACT_TAG_MAP: &'static str = "contract_tag_map";
    pub const METADATA_CACHE: &'static str = "ipfs_metadata_cache";

    pub fn transient_id(id: u64) -> Vec<u8> {
        id.to_be_bytes().to_vec()
    }

    pub fn address(address: &str) -> Vec<u8> {
        address.as_bytes().to_vec()
    }

    pub fn token(key: &TokenKey) -> Vec<u8> {
        let mut out = Vec::with_capacity(key.contract.len() + 9);
        out.extend_from_slice(key.contract.as_bytes());
        out.push(0);
        out.extend_from_slice(&key.token_id.to_be_bytes());
        out
    }

    pub fn tag(name: &str) -> Vec<u8> {
        name.as_bytes().to_vec()
    }

    /// Tag-map keys are prefixed by the owning metadata key so a record's
    /// tags can be listed with one prefix scan.
    pub fn tag_map(metadata_key: &[u8], tag: &str) -> Vec<u8> {
        let mut out = Self::tag_map_prefix(metadata_key);
        out.extend_from_slice(tag.as_bytes());
        out
    }

    pub fn tag_map_prefix(metadata_key: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(metadata_key.len() + 1);
        out.extend_from_slice(metadata_key);
        out.push(0xff);
        out
    }

    pub fn metadata_uri(uri: &str) -> Vec<u8> {
        uri.as_bytes().to_vec()
    }
}
