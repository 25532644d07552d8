use thiserror::Error;

/// Why a submitted job produced no value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobError {
    #[error("job cancelled")]
    Cancelled,

    #[error("job panicked: {0}")]
    Panicked(String),

    /// The pool went away without resolving the job.
    #[error("job dropped by pool")]
    Dropped,
}

impl JobError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, JobError::Cancelled)
    }
}

pub type Result<T> = std::result::Result<T, JobError>;
