use thiserror::Error;

use crate::models::{EntityKind, MetadataStatus};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] postcard::Error),

    /// The transaction itself could not be carried out (storage failure
    /// during a transactional read, write or commit).
    #[error("transaction management failure: {0}")]
    Transaction(String),

    #[error("{what} already exists: {key}")]
    UniqueViolation { what: &'static str, key: String },

    #[error("{what} not found: {key}")]
    NotFound { what: &'static str, key: String },

    #[error("{kind} {key} cannot move from {from} to {to}")]
    InvalidTransition {
        kind: EntityKind,
        key: String,
        from: MetadataStatus,
        to: MetadataStatus,
    },
}

impl StoreError {
    pub fn is_transaction(&self) -> bool {
        matches!(self, StoreError::Transaction(_))
    }

    pub fn is_unique_violation(&self) -> bool {
        matches!(self, StoreError::UniqueViolation { .. })
    }
}

impl From<sled::transaction::TransactionError<StoreError>> for StoreError {
    fn from(e: sled::transaction::TransactionError<StoreError>) -> Self {
        match e {
            sled::transaction::TransactionError::Abort(e) => e,
            sled::transaction::TransactionError::Storage(e) => StoreError::Transaction(e.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
