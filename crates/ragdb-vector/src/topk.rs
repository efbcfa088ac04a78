//! Bounded top-k selection and k-way merging of per-shard results.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

/// A scored row of the index. `ordinal` is the insertion position.
///
/// Ordering is "better is greater": higher score first, then lower ordinal,
/// which makes ties resolve in insertion order.
#[derive(Debug, Clone, Copy)]
pub struct Candidate {
    pub score: f32,
    pub ordinal: usize,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool { self.cmp(other) == Ordering::Equal }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score.total_cmp(&other.score).then_with(|| other.ordinal.cmp(&self.ordinal))
    }
}

/// Keeps the best `k` candidates seen so far in a min-heap of size `k`.
pub struct TopK {
    k: usize,
    heap: BinaryHeap<Reverse<Candidate>>,
}

impl TopK {
    pub fn new(k: usize) -> Self {
        Self { k, heap: BinaryHeap::with_capacity(k.saturating_add(1).min(4096)) }
    }

    pub fn push(&mut self, candidate: Candidate) {
        if self.k == 0 { return; }
        if self.heap.len() < self.k {
            self.heap.push(Reverse(candidate));
        } else if let Some(Reverse(worst)) = self.heap.peek() {
            if candidate > *worst {
                self.heap.pop();
                self.heap.push(Reverse(candidate));
            }
        }
    }

    /// Best first.
    pub fn into_sorted_vec(self) -> Vec<Candidate> {
        // ascending order of Reverse<_> is descending order of Candidate
        self.heap.into_sorted_vec().into_iter().map(|Reverse(c)| c).collect()
    }
}

/// Merge best-first candidate lists into a single best-first list of at most `k`.
pub fn merge_top_k(lists: Vec<Vec<Candidate>>, k: usize) -> Vec<Candidate> {
    let mut heads: BinaryHeap<(Candidate, usize, usize)> = lists
        .iter()
        .enumerate()
        .filter_map(|(list, items)| items.first().map(|c| (*c, list, 0)))
        .collect();
    let mut out = Vec::with_capacity(k.min(lists.iter().map(Vec::len).sum()));
    while out.len() < k {
        let Some((candidate, list, pos)) = heads.pop() else { break };
        out.push(candidate);
        if let Some(next) = lists[list].get(pos + 1) {
            heads.push((*next, list, pos + 1));
        }
    }
    out
}
