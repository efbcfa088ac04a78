use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;

use ragdb_core::error::{Error, Result};
use ragdb_core::traits::Embedder;
use ragdb_core::types::{ScoredSegment, Segment};
use ragdb_vector::{IndexHandle, VectorIndex};

/// Embeds a query and returns the nearest segments from the active index.
///
/// Read-only: each call scans the snapshot current at the time of the call,
/// so a concurrent [`IndexHandle::swap`] never affects a search in flight.
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    index: Arc<IndexHandle>,
    timeout: Option<Duration>,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn Embedder>, index: VectorIndex) -> Self {
        Self::with_handle(embedder, Arc::new(IndexHandle::new(index)))
    }

    pub fn with_handle(embedder: Arc<dyn Embedder>, index: Arc<IndexHandle>) -> Self {
        let current = index.current();
        if let Some(stored) = current.embedder_id() {
            if stored != embedder.id() {
                tracing::warn!(index_embedder = stored, query_embedder = embedder.id(), "index was built with a different embedder");
            }
        }
        Self { embedder, index, timeout: None }
    }

    /// Bound each query embedding; a slower embedder fails with `UpstreamTimeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn handle(&self) -> &Arc<IndexHandle> { &self.index }

    /// Top-`k` segments, most similar first.
    pub fn retrieve(&self, query: &str, k: usize) -> Result<Vec<Segment>> {
        Ok(self.retrieve_scored(query, k)?.into_iter().map(|hit| hit.segment).collect())
    }

    pub fn retrieve_scored(&self, query: &str, k: usize) -> Result<Vec<ScoredSegment>> {
        if k == 0 { return Err(Error::InvalidArgument("k must be at least 1".to_string())); }
        let index = self.index.current();
        if index.is_empty() {
            tracing::debug!("retrieval against an empty index");
            return Ok(Vec::new());
        }
        let query_vector = self.embed_query(query)?;
        let hits = index.search(&query_vector, k)?;
        tracing::debug!(k, hits = hits.len(), top = hits.first().map(|h| h.score), "retrieved");
        Ok(hits)
    }

    fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        let Some(timeout) = self.timeout else { return self.embedder.embed(query) };
        let embedder = Arc::clone(&self.embedder);
        let text = query.to_string();
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let _ = tx.send(embedder.embed(&text));
        });
        match rx.recv_timeout(timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                Err(Error::UpstreamTimeout(format!("query embedding took longer than {timeout:?}")))
            }
            Err(RecvTimeoutError::Disconnected) => Err(Error::Upstream("query embedding aborted".to_string())),
        }
    }
}
