//! One-shot transaction failures for exercising retry paths.

use crate::error::{Result, StoreError};

/// Transactional store operations that can be made to fail once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxOp {
    Transition,
    Attach,
    Commit,
    CacheInsert,
}

#[cfg(any(test, feature = "fault-injection"))]
#[derive(Clone, Default)]
pub(crate) struct Faults {
    armed: std::sync::Arc<std::sync::Mutex<Vec<TxOp>>>,
}

#[cfg(any(test, feature = "fault-injection"))]
impl Faults {
    pub(crate) fn arm(&self, op: TxOp) {
        self.lock().push(op);
    }

    /// Consumes one armed failure for `op`, if any.
    pub(crate) fn check(&self, op: TxOp) -> Result<()> {
        let mut armed = self.lock();
        match armed.iter().position(|armed| *armed == op) {
            Some(pos) => {
                armed.remove(pos);
                Err(StoreError::Transaction(format!("injected {op:?} failure")))
            }
            None => Ok(()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<TxOp>> {
        self.armed.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
