use metaproc_fetch::HttpClient;
use metaproc_store::{Contract, ContractMetadata};
use serde_json::Value;

use super::{Derived, MetadataProcessor};
use crate::error::Result;
use crate::manifest::ContractManifest;

impl<C: HttpClient> MetadataProcessor<C> {
    pub(crate) fn derive_contract(&self, contract: &Contract, manifest: &Value) -> Result<Derived<ContractMetadata>> {
        let manifest = match ContractManifest::from_json(manifest) {
            Ok(manifest) => manifest,
            Err(errors) => return Ok(Derived::Invalid(format!("required fields: {errors}"))),
        };

        let record = ContractMetadata {
            address: contract.address.clone(),
            name: manifest.name,
            description: manifest.description,
            user_description: manifest.user_description,
            provenance: contract.provenance.clone(),
        };
        Ok(Derived::Record {
            record,
            tags: manifest.tags,
        })
    }
}
