//! Manifests fetched at most once per URI.
//!
//! The first pipeline to need a URI downloads it and inserts a cache entry
//! in a transaction. A concurrent pipeline that loses the insert race
//! reads back the winner's entry instead.

use std::sync::Arc;

use metaproc_fetch::{Downloader, HttpClient, Payload};
use metaproc_store::{CacheEntry, Store};
use serde_json::Value;
use tracing::info;

use crate::error::{PipelineError, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum Manifest {
    Json(Value),
    /// The URI resolved to a body that is not JSON.
    NotJson { len: u64 },
}

pub struct MetadataCache<C: HttpClient> {
    store: Store,
    downloader: Arc<Downloader<C>>,
    max_size: u64,
}

impl<C: HttpClient> MetadataCache<C> {
    pub fn new(store: Store, downloader: Arc<Downloader<C>>, max_size: u64) -> Self {
        Self {
            store,
            downloader,
            max_size,
        }
    }

    pub async fn load_or_fetch(&self, uri: &str) -> Result<Manifest> {
        if let Some(entry) = self.store.cached_manifest(uri)? {
            info!(uri, "loaded metadata from cache");
            return parse_entry(entry).map(Manifest::Json);
        }

        let fetched = self.downloader.fetch(uri, Some(self.max_size)).await?;
        let len = fetched.len();
        let Payload::Json(value) = fetched.payload else {
            return Ok(Manifest::NotJson { len });
        };

        let entry = CacheEntry {
            metadata_uri: uri.to_string(),
            metadata_json: value.to_string(),
        };
        match self.store.insert_cache_entry(&entry) {
            Ok(()) => {
                info!(uri, "cached metadata");
                Ok(Manifest::Json(value))
            }
            Err(e) if e.is_unique_violation() => match self.store.cached_manifest(uri)? {
                Some(winner) => parse_entry(winner).map(Manifest::Json),
                None => Ok(Manifest::Json(value)),
            },
            Err(e) => Err(e.into()),
        }
    }
}

fn parse_entry(entry: CacheEntry) -> Result<Value> {
    serde_json::from_str(&entry.metadata_json).map_err(|source| PipelineError::CorruptCache {
        uri: entry.metadata_uri,
        source,
    })
}
