//! Per-kind metadata pipelines and the status state machine they drive.
//!
//! Every kind runs the same frame: short-circuit entities that already
//! have metadata, reuse a record created by an earlier run, otherwise
//! fetch the manifest (through the cache), derive a record and commit it
//! together with the `Valid` status. Only the derivation step differs per
//! kind.

mod contract;
mod item;
mod place;

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use metaproc_fetch::{Downloader, HttpClient};
use metaproc_store::{Contract, Entity, ItemToken, MetadataStatus, PlaceToken, Store};
use serde_json::Value;
use tracing::{error, info, warn};

use crate::cache::{Manifest, MetadataCache};
use crate::config::Config;
use crate::error::Result;

/// Which entity a unit of work is about.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntityRef {
    Item(u64),
    Place(u64),
    Contract(String),
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityRef::Item(id) => write!(f, "item {id}"),
            EntityRef::Place(id) => write!(f, "place {id}"),
            EntityRef::Contract(address) => write!(f, "contract {address}"),
        }
    }
}

/// How one pipeline run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Metadata was already attached, or the entity is no longer `New`.
    AlreadyProcessed,
    /// Attached a record created by an earlier run; nothing was fetched.
    Reused,
    Valid,
    Invalid(String),
    Failed(String),
    /// Transaction failure; the entity stays `New` for the next pass.
    Deferred(String),
}

/// Result of deriving a record from a manifest.
pub(crate) enum Derived<M> {
    Record { record: M, tags: Vec<String> },
    Invalid(String),
}

pub struct MetadataProcessor<C: HttpClient> {
    store: Store,
    downloader: Arc<Downloader<C>>,
    cache: MetadataCache<C>,
    config: Arc<Config>,
}

impl<C: HttpClient> MetadataProcessor<C> {
    pub fn new(store: Store, downloader: Arc<Downloader<C>>, config: Arc<Config>) -> Self {
        let cache = MetadataCache::new(store.clone(), Arc::clone(&downloader), config.max_metadata_file_size);
        Self {
            store,
            downloader,
            cache,
            config,
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub async fn process(&self, entity: EntityRef) -> Outcome {
        match entity {
            EntityRef::Item(id) => self.run::<ItemToken, _, _>(id, |item, manifest| self.derive_item(item, manifest)).await,
            EntityRef::Place(id) => {
                self.run::<PlaceToken, _, _>(id, |place, manifest| async move { self.derive_place(&place, &manifest) })
                    .await
            }
            EntityRef::Contract(address) => {
                self.run::<Contract, _, _>(address, |contract, manifest| async move {
                    self.derive_contract(&contract, &manifest)
                })
                .await
            }
        }
    }

    /// Marks an entity whose pipeline died without an outcome as `Failed`.
    /// Entities that already left `New` are left alone.
    pub fn mark_failed(&self, entity: &EntityRef) {
        let result = match entity {
            EntityRef::Item(id) => self.store.transition::<ItemToken>(id, MetadataStatus::Failed).map(drop),
            EntityRef::Place(id) => self.store.transition::<PlaceToken>(id, MetadataStatus::Failed).map(drop),
            EntityRef::Contract(address) => self.store.transition::<Contract>(address, MetadataStatus::Failed).map(drop),
        };
        if let Err(e) = result {
            warn!(%entity, error = %e, "could not mark entity failed");
        }
    }

    async fn run<E, F, Fut>(&self, key: E::Key, derive: F) -> Outcome
    where
        E: Entity,
        F: FnOnce(E, Value) -> Fut,
        Fut: Future<Output = Result<Derived<E::Metadata>>>,
    {
        let kind = E::KIND;
        let entity = match self.store.get::<E>(&key) {
            Ok(Some(entity)) => entity,
            Ok(None) => {
                warn!(%kind, %key, "entity vanished before processing");
                return Outcome::AlreadyProcessed;
            }
            Err(e) => return self.fail::<E>(&key, e.into()),
        };
        info!(%kind, %key, uri = entity.metadata_uri(), "processing");

        if entity.metadata().is_some() || entity.status() != MetadataStatus::New {
            return Outcome::AlreadyProcessed;
        }

        match self.store.attach_existing::<E>(&key) {
            Ok(Some(_)) => {
                info!(%kind, %key, "using existing metadata");
                return Outcome::Reused;
            }
            Ok(None) => {}
            Err(e) => return self.fail::<E>(&key, e.into()),
        }

        match self.derive_and_commit::<E, _, _>(&key, entity, derive).await {
            Ok(outcome) => outcome,
            Err(e) => self.fail::<E>(&key, e),
        }
    }

    async fn derive_and_commit<E, F, Fut>(&self, key: &E::Key, entity: E, derive: F) -> Result<Outcome>
    where
        E: Entity,
        F: FnOnce(E, Value) -> Fut,
        Fut: Future<Output = Result<Derived<E::Metadata>>>,
    {
        let manifest = match self.cache.load_or_fetch(entity.metadata_uri()).await? {
            Manifest::Json(value) => value,
            Manifest::NotJson { len } => {
                warn!(kind = %E::KIND, %key, len, "metadata is not JSON");
                return self.invalidate::<E>(key, "metadata is not JSON".into());
            }
        };

        let (record, tags) = match derive(entity, manifest).await? {
            Derived::Record { record, tags } => (record, tags),
            Derived::Invalid(reason) => return self.invalidate::<E>(key, reason),
        };

        match self.store.commit::<E>(key, &record, &tags) {
            Ok(_) => {
                info!(kind = %E::KIND, %key, tags = tags.len(), "metadata valid");
                Ok(Outcome::Valid)
            }
            // another run committed a record for the same identity first
            Err(e) if e.is_unique_violation() => match self.store.attach_existing::<E>(key)? {
                Some(_) => Ok(Outcome::Reused),
                None => Err(e.into()),
            },
            Err(e) => Err(e.into()),
        }
    }

    fn invalidate<E: Entity>(&self, key: &E::Key, reason: String) -> Result<Outcome> {
        self.store.transition::<E>(key, MetadataStatus::Invalid)?;
        warn!(kind = %E::KIND, %key, %reason, "metadata invalid");
        Ok(Outcome::Invalid(reason))
    }

    fn fail<E: Entity>(&self, key: &E::Key, e: crate::error::PipelineError) -> Outcome {
        let kind = E::KIND;
        let reason = e.to_string();
        if e.is_transaction() {
            warn!(%kind, %key, error = %reason, "transaction failed, will retry next pass");
            return Outcome::Deferred(reason);
        }
        if e.is_stale_status() {
            info!(%kind, %key, error = %reason, "entity processed concurrently");
            return Outcome::AlreadyProcessed;
        }

        error!(%kind, %key, error = %reason, "failed to process metadata");
        if let Err(e) = self.store.transition::<E>(key, MetadataStatus::Failed) {
            error!(%kind, %key, error = %e, "could not mark entity failed");
        }
        Outcome::Failed(reason)
    }
}
