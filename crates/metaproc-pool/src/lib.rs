//! A fixed set of async worker loops fed from one shared backlog.
//!
//! Every submission returns a [`JobHandle`] that resolves exactly once,
//! with the job's output or a [`JobError`]. Backpressure is left to the
//! caller, who can watch [`WorkerPool::backlog`] and
//! [`WorkerPool::outstanding`].

mod error;
mod pool;

pub use error::{JobError, Result};
pub use pool::{JobHandle, WorkerPool};
