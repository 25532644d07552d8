use metaproc_fetch::FetchError;
use metaproc_store::StoreError;
use thiserror::Error;

/// Infrastructure failures inside an entity pipeline. Content problems
/// are not errors; they end the pipeline with an `Invalid` outcome.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("cached manifest for {uri} is not valid JSON: {source}")]
    CorruptCache {
        uri: String,
        #[source]
        source: serde_json::Error,
    },
}

impl PipelineError {
    /// Transaction-management failures leave the entity `New` so the next
    /// pass retries it.
    pub fn is_transaction(&self) -> bool {
        matches!(self, PipelineError::Store(e) if e.is_transaction())
    }

    /// The entity left `New` while this pipeline was running.
    pub fn is_stale_status(&self) -> bool {
        matches!(self, PipelineError::Store(StoreError::InvalidTransition { .. }))
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
