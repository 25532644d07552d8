use metaproc_fetch::HttpClient;
use metaproc_store::{Entity, PlaceMetadata, PlaceToken};
use serde_json::Value;

use super::{Derived, MetadataProcessor};
use crate::error::Result;
use crate::grid::grid_cell_hash;
use crate::manifest::PlaceManifest;

impl<C: HttpClient> MetadataProcessor<C> {
    pub(crate) fn derive_place(&self, place: &PlaceToken, manifest: &Value) -> Result<Derived<PlaceMetadata>> {
        let manifest = match PlaceManifest::from_json(manifest) {
            Ok(manifest) => manifest,
            Err(errors) => return Ok(Derived::Invalid(format!("required fields: {errors}"))),
        };

        let (x, y, z) = manifest.center();
        let grid_hash = grid_cell_hash(x, y, z, self.config.grid_size);

        let record = PlaceMetadata {
            token: place.metadata_key(),
            name: manifest.name,
            description: manifest.description,
            place_type: manifest.place_type,
            build_height: manifest.build_height,
            center_coordinates: manifest.center_coordinates,
            border_coordinates: manifest.border_coordinates.to_string(),
            grid_hash,
            provenance: place.provenance.clone(),
        };
        Ok(Derived::Record {
            record,
            tags: Vec::new(),
        })
    }
}
