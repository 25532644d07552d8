use metaproc_fetch::HttpClient;
use metaproc_geometry::{ToleranceCheck, check_tolerance, count_polygons};
use metaproc_store::{Entity, ItemMetadata, ItemToken};
use serde_json::Value;
use tracing::{debug, warn};

use super::{Derived, MetadataProcessor};
use crate::error::Result;
use crate::manifest::ItemManifest;

impl<C: HttpClient> MetadataProcessor<C> {
    /// Validates the manifest, then downloads the artifact and checks its
    /// size and, for glTF, its polygon count.
    pub(crate) async fn derive_item(&self, item: ItemToken, manifest: Value) -> Result<Derived<ItemMetadata>> {
        let manifest = match ItemManifest::from_json(&manifest) {
            Ok(manifest) => manifest,
            Err(errors) => return Ok(Derived::Invalid(format!("required fields: {errors}"))),
        };

        let artifact = self
            .downloader
            .fetch(&manifest.artifact_uri, Some(self.config.max_artifact_file_size))
            .await?;

        if artifact.len() != manifest.format.file_size {
            return Ok(Derived::Invalid(format!(
                "file size does not match metadata: declared {}, downloaded {}",
                manifest.format.file_size,
                artifact.len()
            )));
        }

        let counted = if manifest.is_gltf() {
            match count_polygons(&artifact.bytes) {
                Ok(counted) => counted,
                Err(e) => return Ok(Derived::Invalid(format!("model invalid: {e}"))),
            }
        } else {
            // no geometry to check for image artifacts
            0
        };

        let key = item.transient_id;
        match check_tolerance(manifest.polygon_count, counted, self.config.polygon_count_error) {
            ToleranceCheck::Exact => debug!(key, counted, "polycount matches"),
            ToleranceCheck::WithinTolerance { diff } => warn!(
                key,
                token = %item.token,
                expected = manifest.polygon_count,
                counted,
                diff,
                "polycount did not match"
            ),
            ToleranceCheck::Exceeded { diff } => {
                return Ok(Derived::Invalid(format!(
                    "polycount exceeds tolerance: expected {}, counted {counted}, diff {diff}",
                    manifest.polygon_count
                )));
            }
        }

        let (width, height) = match manifest.format.dimensions {
            Some(d) => (Some(d.width), Some(d.height)),
            None => (None, None),
        };
        let record = ItemMetadata {
            token: item.metadata_key(),
            name: manifest.name,
            description: manifest.description,
            artifact_uri: manifest.artifact_uri,
            thumbnail_uri: manifest.thumbnail_uri,
            display_uri: manifest.display_uri,
            mime_type: manifest.format.mime_type,
            file_size: manifest.format.file_size,
            base_scale: manifest.base_scale,
            polygon_count: manifest.polygon_count,
            width,
            height,
            image_frame: manifest.image_frame.map(|frame| frame.to_string()),
            provenance: item.provenance.clone(),
        };
        Ok(Derived::Record {
            record,
            tags: manifest.tags,
        })
    }
}
