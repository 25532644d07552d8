use serde::{Deserialize, Serialize};

use super::{Provenance, TokenKey};

/// Validated metadata of an item token. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemMetadata {
    pub token: TokenKey,
    pub name: String,
    pub description: String,
    pub artifact_uri: String,
    pub thumbnail_uri: Option<String>,
    pub display_uri: Option<String>,
    pub mime_type: String,
    pub file_size: u64,
    pub base_scale: f64,
    pub polygon_count: u64,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Raw JSON of the `imageFrame` object, present for image artifacts.
    pub image_frame: Option<String>,
    pub provenance: Provenance,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceMetadata {
    pub token: TokenKey,
    pub name: Option<String>,
    pub description: Option<String>,
    pub place_type: String,
    pub build_height: f64,
    pub center_coordinates: Vec<f64>,
    /// Raw JSON of `borderCoordinates`; its shape varies by place type.
    pub border_coordinates: String,
    pub grid_hash: String,
    pub provenance: Provenance,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractMetadata {
    pub address: String,
    pub name: String,
    pub description: String,
    pub user_description: Option<String>,
    pub provenance: Provenance,
}

/// A normalized tag name, shared by every record that references it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    pub provenance: Provenance,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagMapEntry {
    pub tag: String,
    pub provenance: Provenance,
}

/// A manifest fetched once from IPFS, keyed by its URI.
///
/// The JSON is kept as text so that the on-disk encoding does not depend
/// on a self-describing format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub metadata_uri: String,
    pub metadata_json: String,
}
