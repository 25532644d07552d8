use std::ops::Bound;
use std::path::Path;

use serde::{Serialize, de::DeserializeOwned};
use sled::transaction::{
    ConflictableTransactionError, ConflictableTransactionResult, Transactional, TransactionalTree,
};
use tracing::debug;

use crate::error::{Result, StoreError};
#[cfg(any(test, feature = "fault-injection"))]
use crate::faults::Faults;
use crate::faults::TxOp;
use crate::keys::DbKeys;
use crate::models::{CacheEntry, Contract, Entity, ItemToken, MetadataStatus, PlaceToken, Tag, TagMapEntry};

/// Entity store backed by a single sled database, one tree per record kind.
#[derive(Clone)]
pub struct Store {
    db: sled::Db,
    #[cfg(any(test, feature = "fault-injection"))]
    faults: Faults,
}

impl Store {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = sled::open(path)?;
        Ok(Self::with_db(db))
    }

    /// An in-memory database removed on drop.
    pub fn temporary() -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Self::with_db(db))
    }

    fn with_db(db: sled::Db) -> Self {
        Self {
            db,
            #[cfg(any(test, feature = "fault-injection"))]
            faults: Faults::default(),
        }
    }

    /// Makes the next `op` on this store (and its clones) fail with
    /// [`StoreError::Transaction`] before touching the database.
    #[cfg(any(test, feature = "fault-injection"))]
    pub fn fail_next(&self, op: TxOp) {
        self.faults.arm(op);
    }

    #[cfg(any(test, feature = "fault-injection"))]
    fn injected(&self, op: TxOp) -> Result<()> {
        self.faults.check(op)
    }

    #[cfg(not(any(test, feature = "fault-injection")))]
    fn injected(&self, _op: TxOp) -> Result<()> {
        Ok(())
    }

    pub fn flush(&self) -> Result<usize> {
        Ok(self.db.flush()?)
    }

    fn tree(&self, name: &str) -> Result<sled::Tree> {
        Ok(self.db.open_tree(name)?)
    }

    pub fn create<E: Entity>(&self, entity: &E) -> Result<()> {
        let key = E::encode_key(&entity.key());
        let val = encode(entity)?;
        let tree = self.tree(E::TREE)?;
        match tree.compare_and_swap(key, None as Option<&[u8]>, Some(val))? {
            Ok(()) => Ok(()),
            Err(_) => Err(StoreError::UniqueViolation {
                what: "entity",
                key: entity.key().to_string(),
            }),
        }
    }

    pub fn put_item(&self, item: &ItemToken) -> Result<()> {
        self.create(item)
    }

    pub fn put_place(&self, place: &PlaceToken) -> Result<()> {
        self.create(place)
    }

    pub fn put_contract(&self, contract: &Contract) -> Result<()> {
        self.create(contract)
    }

    pub fn get<E: Entity>(&self, key: &E::Key) -> Result<Option<E>> {
        let data = self.tree(E::TREE)?.get(E::encode_key(key))?;
        data.map(|d| decode(&d)).transpose()
    }

    pub fn delete<E: Entity>(&self, key: &E::Key) -> Result<Option<E>> {
        let data = self.tree(E::TREE)?.remove(E::encode_key(key))?;
        data.map(|d| decode(&d)).transpose()
    }

    pub fn entities<E: Entity>(&self) -> Result<Vec<E>> {
        let mut out = Vec::new();
        for entry in self.tree(E::TREE)?.iter() {
            let (_, val) = entry?;
            out.push(decode(&val)?);
        }
        Ok(out)
    }

    /// Lowest-keyed entity still `New` whose key is strictly greater than
    /// `after`, or the lowest overall when `after` is `None`.
    pub fn next_new<E: Entity>(&self, after: Option<&E::Key>) -> Result<Option<E>> {
        let tree = self.tree(E::TREE)?;
        let iter = match after {
            Some(key) => tree.range::<Vec<u8>, _>((Bound::Excluded(E::encode_key(key)), Bound::Unbounded)),
            None => tree.iter(),
        };
        for entry in iter {
            let (_, val) = entry?;
            let entity: E = decode(&val)?;
            if entity.status() == MetadataStatus::New {
                return Ok(Some(entity));
            }
        }
        Ok(None)
    }

    pub fn metadata<E: Entity>(&self, key: &E::MetadataKey) -> Result<Option<E::Metadata>> {
        let data = self.tree(E::METADATA_TREE)?.get(E::encode_metadata_key(key))?;
        data.map(|d| decode(&d)).transpose()
    }

    /// Moves a `New` entity to `to`. Terminal statuses never move.
    pub fn transition<E: Entity>(&self, key: &E::Key, to: MetadataStatus) -> Result<E> {
        self.injected(TxOp::Transition)?;
        let tree = self.tree(E::TREE)?;
        let raw_key = E::encode_key(key);
        let updated = tree.transaction(|tx| {
            let mut entity: E = match tx.get(&raw_key)? {
                Some(data) => decode(&data).map_err(ConflictableTransactionError::Abort)?,
                None => return abort(not_found("entity", key)),
            };
            check_transition(&entity, to)?;
            entity.set_status(to);
            tx.insert(raw_key.as_slice(), encode(&entity).map_err(ConflictableTransactionError::Abort)?)?;
            Ok(entity)
        })?;
        debug!(kind = %E::KIND, %key, status = %to, "status updated");
        Ok(updated)
    }

    /// Links the entity to a derived record that already exists under its
    /// logical identity and marks it `Valid`. Returns `None` when there is
    /// no such record.
    pub fn attach_existing<E: Entity>(&self, key: &E::Key) -> Result<Option<E>> {
        self.injected(TxOp::Attach)?;
        let entities = self.tree(E::TREE)?;
        let metadata = self.tree(E::METADATA_TREE)?;
        let raw_key = E::encode_key(key);
        let attached = (&entities, &metadata).transaction(|(entities, metadata)| {
            let mut entity: E = match entities.get(&raw_key)? {
                Some(data) => decode(&data).map_err(ConflictableTransactionError::Abort)?,
                None => return abort(not_found("entity", key)),
            };
            let metadata_key = entity.metadata_key();
            if metadata.get(E::encode_metadata_key(&metadata_key))?.is_none() {
                return Ok(None);
            }
            if entity.metadata().is_none() {
                check_transition(&entity, MetadataStatus::Valid)?;
                entity.set_status(MetadataStatus::Valid);
                entity.attach(metadata_key);
                entities.insert(raw_key.as_slice(), encode(&entity).map_err(ConflictableTransactionError::Abort)?)?;
            }
            Ok(Some(entity))
        })?;
        Ok(attached)
    }

    /// Writes the derived record, marks the entity `Valid` and links it, and
    /// records each tag, all in one transaction.
    ///
    /// Fails with `UniqueViolation` if a record already exists under the
    /// entity's logical identity.
    pub fn commit<E: Entity>(&self, key: &E::Key, record: &E::Metadata, tags: &[String]) -> Result<E> {
        self.injected(TxOp::Commit)?;
        let entities = self.tree(E::TREE)?;
        let metadata = self.tree(E::METADATA_TREE)?;
        let raw_key = E::encode_key(key);
        let record = encode(record)?;

        let committed = match E::TAG_MAP_TREE {
            Some(tag_map_tree) => {
                let tag_tree = self.tree(DbKeys::TAGS)?;
                let tag_map = self.tree(tag_map_tree)?;
                (&entities, &metadata, &tag_tree, &tag_map).transaction(
                    |(entities, metadata, tag_tree, tag_map)| {
                        let entity = write_record::<E>(entities, metadata, &raw_key, key, &record)?;
                        let owner = E::encode_metadata_key(&entity.metadata_key());
                        for name in tags {
                            write_tag(tag_tree, tag_map, &owner, name, &entity)?;
                        }
                        Ok(entity)
                    },
                )?
            }
            None => (&entities, &metadata).transaction(|(entities, metadata)| {
                write_record::<E>(entities, metadata, &raw_key, key, &record)
            })?,
        };
        debug!(kind = %E::KIND, %key, tags = tags.len(), "metadata committed");
        Ok(committed)
    }

    pub fn tag(&self, name: &str) -> Result<Option<Tag>> {
        let data = self.tree(DbKeys::TAGS)?.get(DbKeys::tag(name))?;
        data.map(|d| decode(&d)).transpose()
    }

    pub fn tag_count(&self) -> Result<usize> {
        Ok(self.tree(DbKeys::TAGS)?.len())
    }

    /// Tags linked to the derived record stored under `key`.
    pub fn tags_for<E: Entity>(&self, key: &E::MetadataKey) -> Result<Vec<TagMapEntry>> {
        let Some(tree) = E::TAG_MAP_TREE else {
            return Ok(Vec::new());
        };
        let prefix = DbKeys::tag_map_prefix(&E::encode_metadata_key(key));
        let mut out = Vec::new();
        for entry in self.tree(tree)?.scan_prefix(prefix) {
            let (_, val) = entry?;
            out.push(decode(&val)?);
        }
        Ok(out)
    }

    pub fn cached_manifest(&self, uri: &str) -> Result<Option<CacheEntry>> {
        let data = self.tree(DbKeys::METADATA_CACHE)?.get(DbKeys::metadata_uri(uri))?;
        data.map(|d| decode(&d)).transpose()
    }

    /// Inserts a cache entry, failing with `UniqueViolation` if the URI is
    /// already cached.
    pub fn insert_cache_entry(&self, entry: &CacheEntry) -> Result<()> {
        self.injected(TxOp::CacheInsert)?;
        let tree = self.tree(DbKeys::METADATA_CACHE)?;
        let key = DbKeys::metadata_uri(&entry.metadata_uri);
        let val = encode(entry)?;
        tree.transaction(|tx| {
            if tx.get(&key)?.is_some() {
                return abort(StoreError::UniqueViolation {
                    what: "cache entry",
                    key: entry.metadata_uri.clone(),
                });
            }
            tx.insert(key.as_slice(), val.as_slice())?;
            Ok(())
        })?;
        Ok(())
    }

    pub fn cache_len(&self) -> Result<usize> {
        Ok(self.tree(DbKeys::METADATA_CACHE)?.len())
    }
}

fn write_record<E: Entity>(
    entities: &TransactionalTree,
    metadata: &TransactionalTree,
    raw_key: &[u8],
    key: &E::Key,
    record: &[u8],
) -> ConflictableTransactionResult<E, StoreError> {
    // re-read: the entity may have been removed since the pipeline started
    let mut entity: E = match entities.get(raw_key)? {
        Some(data) => decode(&data).map_err(ConflictableTransactionError::Abort)?,
        None => return abort(not_found("entity", key)),
    };
    check_transition(&entity, MetadataStatus::Valid)?;

    let metadata_key = entity.metadata_key();
    let raw_metadata_key = E::encode_metadata_key(&metadata_key);
    if metadata.get(&raw_metadata_key)?.is_some() {
        return abort(StoreError::UniqueViolation {
            what: "metadata",
            key: metadata_key.to_string(),
        });
    }
    metadata.insert(raw_metadata_key, record)?;

    entity.set_status(MetadataStatus::Valid);
    entity.attach(metadata_key);
    entities.insert(raw_key, encode(&entity).map_err(ConflictableTransactionError::Abort)?)?;
    Ok(entity)
}

fn write_tag<E: Entity>(
    tags: &TransactionalTree,
    tag_map: &TransactionalTree,
    owner: &[u8],
    name: &str,
    entity: &E,
) -> ConflictableTransactionResult<(), StoreError> {
    let tag_key = DbKeys::tag(name);
    if tags.get(&tag_key)?.is_none() {
        let tag = Tag {
            name: name.to_string(),
            provenance: entity.provenance().clone(),
        };
        tags.insert(tag_key, encode(&tag).map_err(ConflictableTransactionError::Abort)?)?;
    }
    let link = TagMapEntry {
        tag: name.to_string(),
        provenance: entity.provenance().clone(),
    };
    tag_map.insert(
        DbKeys::tag_map(owner, name),
        encode(&link).map_err(ConflictableTransactionError::Abort)?,
    )?;
    Ok(())
}

fn check_transition<E: Entity>(entity: &E, to: MetadataStatus) -> ConflictableTransactionResult<(), StoreError> {
    let from = entity.status();
    if from != MetadataStatus::New || to == MetadataStatus::New {
        return abort(StoreError::InvalidTransition {
            kind: E::KIND,
            key: entity.key().to_string(),
            from,
            to,
        });
    }
    Ok(())
}

fn not_found(what: &'static str, key: &impl ToString) -> StoreError {
    StoreError::NotFound {
        what,
        key: key.to_string(),
    }
}

fn abort<T>(e: StoreError) -> ConflictableTransactionResult<T, StoreError> {
    Err(ConflictableTransactionError::Abort(e))
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    Ok(postcard::to_allocvec(value)?)
}

fn decode<T: DeserializeOwned>(data: &[u8]) -> Result<T> {
    Ok(postcard::from_bytes(data)?)
}
