use std::collections::HashMap;
use std::path::Path;

use ragdb_core::error::{Error, Result};
use ragdb_core::types::{EmbeddedSegment, MetaValue, ScoredSegment, Segment};

use crate::similarity::{dot, l2_normalize};
use crate::topk::{merge_top_k, Candidate, TopK};

/// Exact cosine-similarity index over embedded segments.
///
/// Vectors are kept as inserted in one row-major buffer, with their unit
/// normalized copies in a second buffer used for scoring, so a query costs one
/// pass of `n * D` multiply-adds. The dimensionality is fixed by the first insert (or by
/// [`VectorIndex::with_dimensionality`]) and every later vector must match it.
#[derive(Debug, Clone, Default)]
pub struct VectorIndex {
    dim: Option<usize>,
    segments: Vec<Segment>,
    vectors: Vec<f32>,
    units: Vec<f32>,
    by_id: HashMap<String, usize>,
    embedder_id: Option<String>,
}

impl VectorIndex {
    pub fn new() -> Self { Self::default() }

    pub fn with_dimensionality(dim: usize) -> Result<Self> {
        if dim == 0 { return Err(Error::InvalidArgument("dimensionality must be at least 1".to_string())); }
        Ok(Self { dim: Some(dim), ..Self::default() })
    }

    /// Identifier of the embedder that produced the vectors, recorded on persist.
    pub fn embedder_id(&self) -> Option<&str> { self.embedder_id.as_deref() }

    pub fn set_embedder_id(&mut self, id: impl Into<String>) { self.embedder_id = Some(id.into()); }

    pub fn dimensionality(&self) -> Option<usize> { self.dim }

    pub fn len(&self) -> usize { self.segments.len() }

    pub fn is_empty(&self) -> bool { self.segments.is_empty() }

    /// Add one segment. On error the index is left unchanged.
    pub fn insert(&mut self, segment: Segment, vector: Vec<f32>) -> Result<()> {
        match self.dim {
            Some(expected) if expected != vector.len() => {
                return Err(Error::DimensionMismatch { expected, actual: vector.len() });
            }
            None if vector.is_empty() => {
                return Err(Error::InvalidArgument("cannot insert an empty vector".to_string()));
            }
            _ => {}
        }
        if let Some(pos) = vector.iter().position(|x| !x.is_finite()) {
            return Err(Error::InvalidArgument(format!("vector for '{}' has a non-finite component at {pos}", segment.id)));
        }
        if let Some((key, _)) = segment.metadata.iter().find(|(_, v)| matches!(v, MetaValue::Float(x) if !x.is_finite())) {
            return Err(Error::InvalidArgument(format!("metadata '{key}' of '{}' is not a finite number", segment.id)));
        }
        if self.by_id.contains_key(&segment.id) {
            return Err(Error::InvalidArgument(format!("duplicate segment id '{}'", segment.id)));
        }

        self.dim.get_or_insert(vector.len());
        self.by_id.insert(segment.id.clone(), self.segments.len());
        self.units.extend(l2_normalize(&vector));
        self.vectors.extend_from_slice(&vector);
        self.segments.push(segment);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<EmbeddedSegment> {
        self.by_id.get(id).map(|&i| EmbeddedSegment { segment: self.segments[i].clone(), vector: self.row(i).to_vec() })
    }

    /// Segments with their vectors, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&Segment, &[f32])> + '_ {
        self.segments.iter().enumerate().map(move |(i, s)| (s, self.row(i)))
    }

    /// Top-`k` segments by cosine similarity, best first, ties in insertion order.
    ///
    /// An empty index or `k == 0` yields an empty list. A query whose length
    /// differs from the index dimensionality is a `DimensionMismatch`.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredSegment>> {
        let Some(unit_query) = self.check_query(query, k)? else { return Ok(Vec::new()) };
        let best = self.scan(&unit_query, 0..self.len(), k);
        Ok(self.materialize(best))
    }

    /// Same result as [`search`](Self::search), scanning `shards` contiguous
    /// ranges on scoped threads and k-way merging the per-shard top-k lists.
    pub fn search_sharded(&self, query: &[f32], k: usize, shards: usize) -> Result<Vec<ScoredSegment>> {
        let Some(unit_query) = self.check_query(query, k)? else { return Ok(Vec::new()) };
        let unit_query = unit_query.as_slice();
        let n = self.len();
        let shards = shards.clamp(1, n);
        if shards == 1 { return Ok(self.materialize(self.scan(unit_query, 0..n, k))); }

        let per_shard = n.div_ceil(shards);
        let lists: Vec<Vec<Candidate>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..n)
                .step_by(per_shard)
                .map(|start| {
                    let range = start..(start + per_shard).min(n);
                    scope.spawn(move || self.scan(unit_query, range, k))
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic))).collect()
        });
        tracing::trace!(shards = lists.len(), n, k, "merged sharded scan");
        Ok(self.materialize(merge_top_k(lists, k)))
    }

    pub fn persist(&self, path: &Path) -> Result<()> { crate::store::persist(self, path) }

    pub fn load(path: &Path) -> Result<Self> { crate::store::load(path) }

    /// Validates a query and returns it unit normalized; `None` means the
    /// answer is trivially empty.
    fn check_query(&self, query: &[f32], k: usize) -> Result<Option<Vec<f32>>> {
        let Some(dim) = self.dim else { return Ok(None) };
        if k == 0 || self.is_empty() { return Ok(None); }
        if query.len() != dim { return Err(Error::DimensionMismatch { expected: dim, actual: query.len() }); }
        if query.iter().any(|x| !x.is_finite()) {
            return Err(Error::InvalidArgument("query vector has non-finite components".to_string()));
        }
        Ok(Some(l2_normalize(query)))
    }

    fn scan(&self, unit_query: &[f32], range: std::ops::Range<usize>, k: usize) -> Vec<Candidate> {
        let d = self.dim.unwrap_or(0);
        let mut top = TopK::new(k);
        for ordinal in range {
            let score = dot(unit_query, &self.units[ordinal * d..(ordinal + 1) * d]);
            top.push(Candidate { score, ordinal });
        }
        top.into_sorted_vec()
    }

    fn materialize(&self, best: Vec<Candidate>) -> Vec<ScoredSegment> {
        best.into_iter().map(|c| ScoredSegment { segment: self.segments[c.ordinal].clone(), score: c.score }).collect()
    }

    fn row(&self, i: usize) -> &[f32] {
        let d = self.dim.unwrap_or(0);
        &self.vectors[i * d..(i + 1) * d]
    }
}
