#![allow(dead_code)]

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use metaproc::config::config_for;
use metaproc::daemon::build_processor;
use metaproc::{Config, Environment, MetadataProcessor};
use metaproc_fetch::MockHttpClient;
use metaproc_store::{Contract, ItemToken, PlaceToken, Provenance, Store, TokenKey};
use serde_json::{Value, json};

pub const ITEM_CONTRACT: &str = "KT1items";
pub const PLACE_CONTRACT: &str = "KT1places";

pub fn test_config() -> Config {
    config_for(Environment::Test)
}

pub fn processor(client: MockHttpClient, store: Store, config: Config) -> MetadataProcessor<MockHttpClient> {
    build_processor(client, store, Arc::new(config)).unwrap()
}

pub fn provenance(level: u64) -> Provenance {
    Provenance::new(level, Utc.with_ymd_and_hms(2024, 5, 17, 9, 30, 0).unwrap())
}

pub fn item(id: u64, token_id: u64, cid: &str) -> ItemToken {
    ItemToken::new(id, TokenKey::new(ITEM_CONTRACT, token_id), format!("ipfs://{cid}"), provenance(100 + id))
}

pub fn place(id: u64, token_id: u64, cid: &str) -> PlaceToken {
    PlaceToken::new(id, TokenKey::new(PLACE_CONTRACT, token_id), format!("ipfs://{cid}"), provenance(200 + id))
}

pub fn contract(address: &str, cid: &str) -> Contract {
    Contract::new(address, format!("ipfs://{cid}"), provenance(300))
}

/// A glTF JSON document whose single mesh node has one TRIANGLES
/// primitive with `triangles * 3` indices.
pub fn gltf_with_triangles(triangles: u64) -> Vec<u8> {
    let index_bytes = triangles * 3 * 4;
    let doc = json!({
        "asset": { "version": "2.0" },
        "buffers": [{ "byteLength": 36 + index_bytes, "uri": "model.bin" }],
        "bufferViews": [
            { "buffer": 0, "byteLength": 36 },
            { "buffer": 0, "byteOffset": 36, "byteLength": index_bytes }
        ],
        "scene": 0,
        "scenes": [{ "nodes": [0] }],
        "nodes": [{ "mesh": 0 }],
        "meshes": [{
            "primitives": [{ "attributes": { "POSITION": 0 }, "indices": 1, "mode": 4 }]
        }],
        "accessors": [
            {
                "bufferView": 0,
                "componentType": 5126,
                "count": 3,
                "type": "VEC3",
                "min": [0.0, 0.0, 0.0],
                "max": [1.0, 1.0, 1.0]
            },
            { "bufferView": 1, "componentType": 5125, "count": triangles * 3, "type": "SCALAR" }
        ]
    });
    serde_json::to_vec(&doc).unwrap()
}

pub fn item_manifest(artifact_cid: &str, polygon_count: u64, file_size: usize) -> Value {
    json!({
        "name": "Chair",
        "description": "A wooden chair",
        "polygonCount": polygon_count,
        "baseScale": 1.0,
        "artifactUri": format!("ipfs://{artifact_cid}"),
        "thumbnailUri": "ipfs://QmThumb",
        "formats": [
            {
                "uri": format!("ipfs://{artifact_cid}"),
                "mimeType": "model/gltf+json",
                "fileSize": file_size
            }
        ],
        "tags": ["Furniture, Wood"]
    })
}

pub fn place_manifest() -> Value {
    json!({
        "name": "Corner lot",
        "placeType": "exterior",
        "buildHeight": 10.0,
        "centerCoordinates": [150.0, 0.0, -150.0],
        "borderCoordinates": [[-10.0, 0.0, -10.0], [10.0, 0.0, -10.0], [10.0, 0.0, 10.0]]
    })
}

pub fn contract_manifest() -> Value {
    json!({
        "name": "Collection",
        "description": "Things and stuff",
        "tags": ["art", "Music, art"]
    })
}

pub fn body(value: &Value) -> Vec<u8> {
    serde_json::to_vec(value).unwrap()
}
