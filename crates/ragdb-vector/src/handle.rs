use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

use ragdb_core::error::Result;

use crate::index::VectorIndex;

/// Shared reference to the active index.
///
/// Readers take an `Arc` snapshot and scan it without holding the lock. A
/// rebuild produces a fresh `VectorIndex` and swaps it in; the index a reader
/// is scanning is never mutated.
#[derive(Debug, Default)]
pub struct IndexHandle {
    active: RwLock<Arc<VectorIndex>>,
}

impl IndexHandle {
    pub fn new(index: VectorIndex) -> Self { Self { active: RwLock::new(Arc::new(index)) } }

    pub fn open(path: &Path) -> Result<Self> { Ok(Self::new(VectorIndex::load(path)?)) }

    pub fn current(&self) -> Arc<VectorIndex> {
        self.active.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Install `index` as the active one and return the previous index.
    pub fn swap(&self, index: VectorIndex) -> Arc<VectorIndex> {
        let mut guard = self.active.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *guard, Arc::new(index))
    }

    /// Load `path` and swap it in. On failure the active index stays in place.
    pub fn reload(&self, path: &Path) -> Result<Arc<VectorIndex>> {
        let fresh = VectorIndex::load(path)?;
        tracing::info!(path = %path.display(), segments = fresh.len(), "swapping active index");
        Ok(self.swap(fresh))
    }
}
