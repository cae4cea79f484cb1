use crate::index::Index;
use parking_lot::RwLock;
use std::sync::Arc;

/// Shared slot holding the live index. Readers take a snapshot `Arc` and query
/// it without holding the lock; a rebuild swaps in a whole new index.
#[derive(Clone)]
pub struct IndexHandle {
    inner: Arc<RwLock<Arc<Index>>>,
}

impl IndexHandle {
    pub fn new(index: Index) -> Self {
        Self { inner: Arc::new(RwLock::new(Arc::new(index))) }
    }

    pub fn current(&self) -> Arc<Index> {
        self.inner.read().clone()
    }

    /// Replace the live index, returning the previous one. Snapshots already
    /// handed out keep answering from the old index.
    pub fn swap(&self, index: Index) -> Arc<Index> {
        let next = Arc::new(index);
        std::mem::replace(&mut *self.inner.write(), next)
    }
}
