mod common;

use common::*;
use metaproc::grid::grid_cell_hash;
use metaproc::{EntityRef, Outcome};
use metaproc_fetch::MockHttpClient;
use metaproc_store::{Contract, ItemToken, MetadataStatus, PlaceMetadata, PlaceToken, Store, TokenKey, TxOp};
use serde_json::json;

fn item_status(store: &Store, id: u64) -> MetadataStatus {
    store.get::<ItemToken>(&id).unwrap().unwrap().metadata_status
}

fn place_status(store: &Store, id: u64) -> MetadataStatus {
    store.get::<PlaceToken>(&id).unwrap().unwrap().metadata_status
}

#[tokio::test]
async fn test_item_with_matching_model_is_valid() {
    let artifact = gltf_with_triangles(100);
    let client = MockHttpClient::new()
        .with_content("QmItem", body(&item_manifest("QmModel", 100, artifact.len())))
        .with_content("QmModel", artifact);
    let store = Store::temporary().unwrap();
    store.put_item(&item(1, 10, "QmItem")).unwrap();

    let processor = processor(client.clone(), store.clone(), test_config());
    assert_eq!(processor.process(EntityRef::Item(1)).await, Outcome::Valid);

    let token = store.get::<ItemToken>(&1).unwrap().unwrap();
    assert_eq!(token.metadata_status, MetadataStatus::Valid);
    assert_eq!(token.metadata, Some(TokenKey::new(ITEM_CONTRACT, 10)));

    let record = store.metadata::<ItemToken>(&TokenKey::new(ITEM_CONTRACT, 10)).unwrap().unwrap();
    assert_eq!(record.polygon_count, 100);
    assert_eq!(record.mime_type, "model/gltf+json");
    assert_eq!(record.thumbnail_uri.as_deref(), Some("ipfs://QmThumb"));
    assert_eq!(record.provenance, token.provenance);

    let tags = store.tags_for::<ItemToken>(&TokenKey::new(ITEM_CONTRACT, 10)).unwrap();
    let names: Vec<_> = tags.iter().map(|t| t.tag.as_str()).collect();
    assert_eq!(names, vec!["furniture", "wood"]);
    assert_eq!(client.request_count(), 2);
}

#[tokio::test]
async fn test_missing_polygon_count_is_invalid_without_artifact_download() {
    let mut manifest = item_manifest("QmModel", 100, 10);
    manifest.as_object_mut().unwrap().remove("polygonCount");
    let client = MockHttpClient::new().with_content("QmItem", body(&manifest));
    let store = Store::temporary().unwrap();
    store.put_item(&item(1, 10, "QmItem")).unwrap();

    let outcome = processor(client.clone(), store.clone(), test_config())
        .process(EntityRef::Item(1))
        .await;
    assert!(matches!(&outcome, Outcome::Invalid(reason) if reason.contains("polygonCount")));
    assert_eq!(item_status(&store, 1), MetadataStatus::Invalid);
    assert_eq!(client.requests(), vec!["http://gw.test/ipfs/QmItem".to_string()]);
}

#[tokio::test]
async fn test_non_json_manifest_is_invalid() {
    let client = MockHttpClient::new().with_content("QmImage", vec![0x89u8, b'P', b'N', b'G', 0, 1, 2]);
    let store = Store::temporary().unwrap();
    store.put_item(&item(1, 10, "QmImage")).unwrap();

    let outcome = processor(client, store.clone(), test_config())
        .process(EntityRef::Item(1))
        .await;
    assert_eq!(outcome, Outcome::Invalid("metadata is not JSON".into()));
    assert_eq!(item_status(&store, 1), MetadataStatus::Invalid);
    assert_eq!(store.cache_len().unwrap(), 0);
}

#[tokio::test]
async fn test_unresolvable_uri_fails_after_one_attempt() {
    let client = MockHttpClient::new();
    let store = Store::temporary().unwrap();
    store.put_item(&item(1, 10, "QmMissing")).unwrap();

    let config = metaproc::Config {
        download_retries: 1,
        ..test_config()
    };
    let outcome = processor(client.clone(), store.clone(), config)
        .process(EntityRef::Item(1))
        .await;
    assert!(matches!(&outcome, Outcome::Failed(reason) if reason.contains("1 attempts")));
    assert_eq!(item_status(&store, 1), MetadataStatus::Failed);
    // one round: a primary, then the fallback
    assert_eq!(client.request_count(), 2);
}

#[tokio::test]
async fn test_non_ipfs_uri_fails_without_network() {
    let client = MockHttpClient::new();
    let store = Store::temporary().unwrap();
    let mut token = item(1, 10, "unused");
    token.metadata_uri = "https://example.com/meta.json".into();
    store.put_item(&token).unwrap();

    let outcome = processor(client.clone(), store.clone(), test_config())
        .process(EntityRef::Item(1))
        .await;
    assert!(matches!(outcome, Outcome::Failed(_)));
    assert_eq!(client.request_count(), 0);
}

#[tokio::test]
async fn test_attached_metadata_is_a_no_op() {
    let client = MockHttpClient::new();
    let store = Store::temporary().unwrap();
    let mut token = item(1, 10, "QmItem");
    token.metadata = Some(TokenKey::new(ITEM_CONTRACT, 10));
    store.put_item(&token).unwrap();

    let outcome = processor(client.clone(), store.clone(), test_config())
        .process(EntityRef::Item(1))
        .await;
    assert_eq!(outcome, Outcome::AlreadyProcessed);
    assert_eq!(store.get::<ItemToken>(&1).unwrap().unwrap(), token);
    assert_eq!(client.request_count(), 0);
}

#[tokio::test]
async fn test_terminal_entity_is_not_reprocessed() {
    let client = MockHttpClient::new();
    let store = Store::temporary().unwrap();
    store.put_item(&item(1, 10, "QmItem")).unwrap();
    store.transition::<ItemToken>(&1, MetadataStatus::Failed).unwrap();

    let outcome = processor(client.clone(), store.clone(), test_config())
        .process(EntityRef::Item(1))
        .await;
    assert_eq!(outcome, Outcome::AlreadyProcessed);
    assert_eq!(item_status(&store, 1), MetadataStatus::Failed);
}

#[tokio::test]
async fn test_missing_entity_is_skipped() {
    let store = Store::temporary().unwrap();
    let outcome = processor(MockHttpClient::new(), store, test_config())
        .process(EntityRef::Item(99))
        .await;
    assert_eq!(outcome, Outcome::AlreadyProcessed);
}

#[tokio::test]
async fn test_existing_record_is_reused_without_network() {
    let artifact = gltf_with_triangles(100);
    let client = MockHttpClient::new()
        .with_content("QmItem", body(&item_manifest("QmModel", 100, artifact.len())))
        .with_content("QmModel", artifact);
    let store = Store::temporary().unwrap();
    // the indexer re-created the same token under a new transient id
    store.put_item(&item(1, 10, "QmItem")).unwrap();
    store.put_item(&item(2, 10, "QmItem")).unwrap();

    let processor = processor(client.clone(), store.clone(), test_config());
    assert_eq!(processor.process(EntityRef::Item(1)).await, Outcome::Valid);
    let requests = client.request_count();

    assert_eq!(processor.process(EntityRef::Item(2)).await, Outcome::Reused);
    assert_eq!(client.request_count(), requests);
    let second = store.get::<ItemToken>(&2).unwrap().unwrap();
    assert_eq!(second.metadata_status, MetadataStatus::Valid);
    assert_eq!(second.metadata, Some(TokenKey::new(ITEM_CONTRACT, 10)));
}

#[tokio::test]
async fn test_polygon_overage_beyond_tolerance_is_invalid() {
    let artifact = gltf_with_triangles(102);
    let client = MockHttpClient::new()
        .with_content("QmItem", body(&item_manifest("QmModel", 100, artifact.len())))
        .with_content("QmModel", artifact);
    let store = Store::temporary().unwrap();
    store.put_item(&item(1, 10, "QmItem")).unwrap();

    // 100 basis points of 100 polygons allows one extra
    let config = metaproc::Config {
        polygon_count_error: 100,
        ..test_config()
    };
    let outcome = processor(client, store.clone(), config).process(EntityRef::Item(1)).await;
    assert!(matches!(&outcome, Outcome::Invalid(reason) if reason.contains("polycount")));
    assert!(store.metadata::<ItemToken>(&TokenKey::new(ITEM_CONTRACT, 10)).unwrap().is_none());
}

#[tokio::test]
async fn test_polygon_overage_within_tolerance_is_valid() {
    let artifact = gltf_with_triangles(101);
    let client = MockHttpClient::new()
        .with_content("QmItem", body(&item_manifest("QmModel", 100, artifact.len())))
        .with_content("QmModel", artifact);
    let store = Store::temporary().unwrap();
    store.put_item(&item(1, 10, "QmItem")).unwrap();

    let config = metaproc::Config {
        polygon_count_error: 100,
        ..test_config()
    };
    let outcome = processor(client, store.clone(), config).process(EntityRef::Item(1)).await;
    assert_eq!(outcome, Outcome::Valid);
    let record = store.metadata::<ItemToken>(&TokenKey::new(ITEM_CONTRACT, 10)).unwrap().unwrap();
    // the declared count is what gets stored
    assert_eq!(record.polygon_count, 100);
}

#[tokio::test]
async fn test_file_size_mismatch_is_invalid() {
    let artifact = gltf_with_triangles(100);
    let client = MockHttpClient::new()
        .with_content("QmItem", body(&item_manifest("QmModel", 100, artifact.len() + 1)))
        .with_content("QmModel", artifact);
    let store = Store::temporary().unwrap();
    store.put_item(&item(1, 10, "QmItem")).unwrap();

    let outcome = processor(client, store.clone(), test_config())
        .process(EntityRef::Item(1))
        .await;
    assert!(matches!(&outcome, Outcome::Invalid(reason) if reason.contains("file size")));
    assert_eq!(item_status(&store, 1), MetadataStatus::Invalid);
}

#[tokio::test]
async fn test_undecodable_model_is_invalid() {
    let artifact = b"glTF-not-really".to_vec();
    let client = MockHttpClient::new()
        .with_content("QmItem", body(&item_manifest("QmModel", 100, artifact.len())))
        .with_content("QmModel", artifact);
    let store = Store::temporary().unwrap();
    store.put_item(&item(1, 10, "QmItem")).unwrap();

    let outcome = processor(client, store.clone(), test_config())
        .process(EntityRef::Item(1))
        .await;
    assert!(matches!(&outcome, Outcome::Invalid(reason) if reason.contains("model invalid")));
}

#[tokio::test]
async fn test_image_item_skips_geometry() {
    let image = vec![0x89u8, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];
    let manifest = json!({
        "name": "Poster",
        "polygonCount": 0,
        "baseScale": 1.0,
        "artifactUri": "ipfs://QmPoster",
        "formats": [{
            "uri": "ipfs://QmPoster",
            "mimeType": "image/png",
            "fileSize": image.len(),
            "dimensions": { "value": "640x480", "unit": "px" }
        }],
        "imageFrame": { "kind": "Classic" }
    });
    let client = MockHttpClient::new()
        .with_content("QmItem", body(&manifest))
        .with_content("QmPoster", image);
    let store = Store::temporary().unwrap();
    store.put_item(&item(1, 10, "QmItem")).unwrap();

    let outcome = processor(client, store.clone(), test_config())
        .process(EntityRef::Item(1))
        .await;
    assert_eq!(outcome, Outcome::Valid);
    let record = store.metadata::<ItemToken>(&TokenKey::new(ITEM_CONTRACT, 10)).unwrap().unwrap();
    assert_eq!((record.width, record.height), (Some(640), Some(480)));
    assert_eq!(record.image_frame.as_deref(), Some(r#"{"kind":"Classic"}"#));
    assert!(store.tags_for::<ItemToken>(&TokenKey::new(ITEM_CONTRACT, 10)).unwrap().is_empty());
}

#[tokio::test]
async fn test_place_gets_grid_hash() {
    let client = MockHttpClient::new().with_content("QmPlace", body(&place_manifest()));
    let store = Store::temporary().unwrap();
    store.put_place(&place(1, 7, "QmPlace")).unwrap();

    let config = test_config();
    let grid_size = config.grid_size;
    let outcome = processor(client, store.clone(), config)
        .process(EntityRef::Place(1))
        .await;
    assert_eq!(outcome, Outcome::Valid);

    let record = store.metadata::<PlaceToken>(&TokenKey::new(PLACE_CONTRACT, 7)).unwrap().unwrap();
    assert_eq!(record.grid_hash, grid_cell_hash(150.0, 0.0, -150.0, grid_size));
    assert_eq!(record.place_type, "exterior");
    assert_eq!(record.name.as_deref(), Some("Corner lot"));
    assert_eq!(record.center_coordinates, vec![150.0, 0.0, -150.0]);
}

#[tokio::test]
async fn test_place_without_center_is_invalid() {
    let mut manifest = place_manifest();
    manifest["centerCoordinates"] = json!("middle");
    let client = MockHttpClient::new().with_content("QmPlace", body(&manifest));
    let store = Store::temporary().unwrap();
    store.put_place(&place(1, 7, "QmPlace")).unwrap();

    let outcome = processor(client, store.clone(), test_config())
        .process(EntityRef::Place(1))
        .await;
    assert!(matches!(outcome, Outcome::Invalid(_)));
    assert_eq!(
        store.get::<PlaceToken>(&1).unwrap().unwrap().metadata_status,
        MetadataStatus::Invalid
    );
}

#[tokio::test]
async fn test_contracts_sharing_a_uri_fetch_it_once() {
    let client = MockHttpClient::new().with_content("QmCollection", body(&contract_manifest()));
    let store = Store::temporary().unwrap();
    store.put_contract(&contract("KT1a", "QmCollection")).unwrap();
    store.put_contract(&contract("KT1b", "QmCollection")).unwrap();

    let processor = processor(client.clone(), store.clone(), test_config());
    assert_eq!(processor.process(EntityRef::Contract("KT1a".into())).await, Outcome::Valid);
    assert_eq!(processor.process(EntityRef::Contract("KT1b".into())).await, Outcome::Valid);
    assert_eq!(client.request_count(), 1);

    let record = store.metadata::<Contract>(&"KT1b".to_string()).unwrap().unwrap();
    assert_eq!(record.name, "Collection");
    assert_eq!(store.tags_for::<Contract>(&"KT1a".to_string()).unwrap().len(), 2);
    assert_eq!(store.tag_count().unwrap(), 2);
}

#[tokio::test]
async fn test_contract_missing_description_is_invalid() {
    let client = MockHttpClient::new().with_content("QmCollection", body(&json!({"name": "only"})));
    let store = Store::temporary().unwrap();
    store.put_contract(&contract("KT1a", "QmCollection")).unwrap();

    let outcome = processor(client, store.clone(), test_config())
        .process(EntityRef::Contract("KT1a".into()))
        .await;
    assert!(matches!(&outcome, Outcome::Invalid(reason) if reason.contains("description")));
}

#[tokio::test]
async fn test_commit_transaction_failure_leaves_entity_new() {
    let client = MockHttpClient::new().with_content("QmPlace", body(&place_manifest()));
    let store = Store::temporary().unwrap();
    store.put_place(&place(1, 7, "QmPlace")).unwrap();
    store.fail_next(TxOp::Commit);

    let processor = processor(client.clone(), store.clone(), test_config());
    let outcome = processor.process(EntityRef::Place(1)).await;
    assert!(matches!(outcome, Outcome::Deferred(_)));
    assert_eq!(place_status(&store, 1), MetadataStatus::New);
    assert!(store.metadata::<PlaceToken>(&TokenKey::new(PLACE_CONTRACT, 7)).unwrap().is_none());

    // next pass succeeds from the cached manifest
    assert_eq!(processor.process(EntityRef::Place(1)).await, Outcome::Valid);
    assert_eq!(place_status(&store, 1), MetadataStatus::Valid);
    assert_eq!(client.request_count(), 1);
}

#[tokio::test]
async fn test_transaction_failure_while_marking_invalid_leaves_entity_new() {
    let mut manifest = place_manifest();
    manifest["centerCoordinates"] = json!("middle");
    let client = MockHttpClient::new().with_content("QmPlace", body(&manifest));
    let store = Store::temporary().unwrap();
    store.put_place(&place(1, 7, "QmPlace")).unwrap();
    store.fail_next(TxOp::Transition);

    let outcome = processor(client, store.clone(), test_config())
        .process(EntityRef::Place(1))
        .await;
    assert!(matches!(outcome, Outcome::Deferred(_)));
    assert_eq!(place_status(&store, 1), MetadataStatus::New);
}

#[tokio::test]
async fn test_lost_commit_race_attaches_winning_record() {
    let store = Store::temporary().unwrap();
    store.put_place(&place(1, 7, "QmPlace")).unwrap();
    store.put_place(&place(2, 7, "QmPlace")).unwrap();

    let token = TokenKey::new(PLACE_CONTRACT, 7);
    let winner = PlaceMetadata {
        token: token.clone(),
        name: None,
        description: None,
        place_type: "interior".into(),
        build_height: 5.0,
        center_coordinates: vec![0.0, 0.0, 0.0],
        border_coordinates: "[]".into(),
        grid_hash: "winner".into(),
        provenance: provenance(202),
    };
    let writer = store.clone();
    let client = MockHttpClient::new()
        .with_content("QmPlace", body(&place_manifest()))
        .on_request("QmPlace", move || {
            writer.commit::<PlaceToken>(&2, &winner, &[]).unwrap();
        });

    let outcome = processor(client, store.clone(), test_config())
        .process(EntityRef::Place(1))
        .await;
    assert_eq!(outcome, Outcome::Reused);

    let first = store.get::<PlaceToken>(&1).unwrap().unwrap();
    assert_eq!(first.metadata_status, MetadataStatus::Valid);
    assert_eq!(first.metadata, Some(token.clone()));
    let record = store.metadata::<PlaceToken>(&token).unwrap().unwrap();
    assert_eq!(record.grid_hash, "winner");
}

#[tokio::test]
async fn test_entity_finished_elsewhere_is_already_processed() {
    let store = Store::temporary().unwrap();
    store.put_place(&place(1, 7, "QmPlace")).unwrap();

    let writer = store.clone();
    let client = MockHttpClient::new()
        .with_content("QmPlace", body(&place_manifest()))
        .on_request("QmPlace", move || {
            writer.transition::<PlaceToken>(&1, MetadataStatus::Valid).unwrap();
        });

    let outcome = processor(client, store.clone(), test_config())
        .process(EntityRef::Place(1))
        .await;
    assert_eq!(outcome, Outcome::AlreadyProcessed);
    assert_eq!(place_status(&store, 1), MetadataStatus::Valid);
    assert!(store.metadata::<PlaceToken>(&TokenKey::new(PLACE_CONTRACT, 7)).unwrap().is_none());
}
