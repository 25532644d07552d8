use std::fmt;

use metaproc_store::{Entity, Result, Store};

/// Walks the `New` entities of one kind in increasing key order,
/// remembering the last key it handed out.
///
/// Entities inserted behind the watermark are not seen until [`reset`].
///
/// [`reset`]: WatermarkCursor::reset
pub struct WatermarkCursor<E: Entity> {
    store: Store,
    last: Option<E::Key>,
}

impl<E: Entity> WatermarkCursor<E> {
    pub fn new(store: Store) -> Self {
        Self { store, last: None }
    }

    pub fn next(&mut self) -> Result<Option<E>> {
        let next = self.store.next_new::<E>(self.last.as_ref())?;
        if let Some(entity) = &next {
            self.last = Some(entity.key());
        }
        Ok(next)
    }

    pub fn reset(&mut self) {
        self.last = None;
    }

    pub fn watermark(&self) -> Option<&E::Key> {
        self.last.as_ref()
    }
}

impl<E: Entity> fmt::Debug for WatermarkCursor<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatermarkCursor")
            .field("kind", &E::KIND)
            .field("last", &self.last)
            .finish()
    }
}
