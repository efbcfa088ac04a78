use ragdb_core::error::Error;
use ragdb_core::types::Segment;
use ragdb_vector::similarity::{cosine, l2_normalize};
use ragdb_vector::topk::{merge_top_k, Candidate, TopK};
use ragdb_vector::VectorIndex;

fn seg(id: &str, text: &str) -> Segment { Segment::new(id, text) }

/// Small deterministic pseudo-random vectors (xorshift) so tests need no rng crate.
fn vectors(n: usize, dim: usize, seed: u64) -> Vec<Vec<f32>> {
    let mut state = seed.max(1);
    (0..n)
        .map(|_| {
            (0..dim)
                .map(|_| {
                    state ^= state << 13;
                    state ^= state >> 7;
                    state ^= state << 17;
                    ((state % 2000) as f32 / 1000.0) - 1.0
                })
                .collect()
        })
        .collect()
}

fn build(n: usize, dim: usize) -> VectorIndex {
    let mut index = VectorIndex::new();
    for (i, v) in vectors(n, dim, 42).into_iter().enumerate() {
        index.insert(seg(&format!("s{i}"), &format!("segment {i}")), v).expect("insert");
    }
    index
}

#[test]
fn cat_and_dog_scenario() {
    let mut index = VectorIndex::new();
    index.insert(seg("a", "cat sat on mat"), vec![1.0, 0.0]).expect("insert cat");
    index.insert(seg("b", "dog ran in park"), vec![0.0, 1.0]).expect("insert dog");

    let hits = index.search(&[0.9, 0.1], 1).expect("search");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].segment.text, "cat sat on mat");
}

#[test]
fn empty_index_returns_empty() {
    let index = VectorIndex::new();
    assert!(index.search(&[1.0, 2.0, 3.0], 5).expect("search").is_empty());
    assert!(index.search(&[], 1).expect("search").is_empty());
    let fixed = VectorIndex::with_dimensionality(3).expect("index");
    assert!(fixed.search(&[1.0, 0.0, 0.0], 5).expect("search").is_empty());
}

#[test]
fn fewer_entries_than_k_returns_all() {
    let index = build(4, 8);
    let hits = index.search(&vectors(1, 8, 7)[0], 10).expect("search");
    assert_eq!(hits.len(), 4);
}

#[test]
fn zero_k_returns_empty() {
    let index = build(4, 8);
    assert!(index.search(&vectors(1, 8, 7)[0], 0).expect("search").is_empty());
}

#[test]
fn scores_are_non_increasing_and_match_cosine() {
    let index = build(200, 16);
    for q in vectors(10, 16, 99) {
        let hits = index.search(&q, 25).expect("search");
        assert_eq!(hits.len(), 25);
        for pair in hits.windows(2) {
            assert!(pair[0].score >= pair[1].score, "{} < {}", pair[0].score, pair[1].score);
        }
        for h in &hits {
            let stored = index.get(&h.segment.id).expect("stored");
            assert!((h.score - cosine(&q, &stored.vector)).abs() < 1e-5);
        }
    }
}

#[test]
fn brute_force_matches_full_sort() {
    let index = build(120, 6);
    let q = vectors(1, 6, 5).remove(0);
    let mut expected: Vec<(usize, f32)> = index.iter().enumerate().map(|(i, (_, v))| (i, cosine(&q, v))).collect();
    expected.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    let hits = index.search(&q, 10).expect("search");
    let got: Vec<String> = hits.iter().map(|h| h.segment.id.clone()).collect();
    let want: Vec<String> = expected.iter().take(10).map(|(i, _)| format!("s{i}")).collect();
    assert_eq!(got, want);
}

#[test]
fn ties_break_by_insertion_order() {
    let mut index = VectorIndex::new();
    for id in ["first", "second", "third"] {
        index.insert(seg(id, id), vec![1.0, 1.0]).expect("insert");
    }
    // magnitude does not matter for cosine
    index.insert(seg("fourth", "fourth"), vec![5.0, 5.0]).expect("insert");
    let ids: Vec<String> = index.search(&[2.0, 2.0], 3).expect("search").into_iter().map(|h| h.segment.id).collect();
    assert_eq!(ids, vec!["first", "second", "third"]);
}

#[test]
fn parallel_vectors_normalize_identically() {
    let unit = l2_normalize(&[1.0, 1.0]);
    assert_eq!(unit, l2_normalize(&[5.0, 5.0]));
    assert_eq!(unit, l2_normalize(&[0.25, 0.25]));
    assert_eq!(l2_normalize(&[3.0, 4.0]), l2_normalize(&[300.0, 400.0]));
    assert_eq!(l2_normalize(&[0.0, 0.0]), vec![0.0, 0.0]);
}

#[test]
fn extreme_magnitudes_keep_cosine_scores() {
    let mut index = VectorIndex::new();
    index.insert(seg("huge", "huge"), vec![1e20, 0.0]).expect("insert");
    index.insert(seg("tiny", "tiny"), vec![1e-25, 0.0]).expect("insert");
    index.insert(seg("other", "other"), vec![0.0, 1e30]).expect("insert");

    let hits = index.search(&[1.0, 0.0], 3).expect("search");
    let ids: Vec<&str> = hits.iter().map(|h| h.segment.id.as_str()).collect();
    assert_eq!(ids, vec!["huge", "tiny", "other"]);
    assert!((hits[0].score - 1.0).abs() < 1e-6);
    assert!((hits[1].score - 1.0).abs() < 1e-6);
    assert!(hits[2].score.abs() < 1e-6);

    let from_huge_query = index.search(&[3e19, 0.0], 1).expect("search");
    assert!((from_huge_query[0].score - 1.0).abs() < 1e-6);
    assert!((cosine(&[1e-30, 1e-30], &[1.0, 1.0]) - 1.0).abs() < 1e-6);
}

#[test]
fn non_finite_metadata_is_rejected() {
    let mut index = VectorIndex::new();
    for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
        let segment = seg("a", "alpha").with_meta("weight", bad);
        assert!(matches!(index.insert(segment, vec![1.0, 0.0]), Err(Error::InvalidArgument(_))));
    }
    assert!(index.is_empty());
    assert_eq!(index.dimensionality(), None);
    index.insert(seg("a", "alpha").with_meta("weight", 0.75), vec![1.0, 0.0]).expect("finite metadata");
}

#[test]
fn wrong_dimension_insert_leaves_index_unchanged() {
    let mut index = VectorIndex::new();
    index.insert(seg("a", "alpha"), vec![1.0, 0.0, 0.0]).expect("insert");
    let err = index.insert(seg("b", "beta"), vec![1.0, 0.0]).expect_err("mismatch");
    assert!(matches!(err, Error::DimensionMismatch { expected: 3, actual: 2 }));
    assert_eq!(index.len(), 1);
    assert!(index.get("b").is_none());
    assert_eq!(index.dimensionality(), Some(3));
}

#[test]
fn fixed_dimensionality_applies_before_first_insert() {
    let mut index = VectorIndex::with_dimensionality(4).expect("index");
    assert!(matches!(index.insert(seg("a", "a"), vec![1.0]), Err(Error::DimensionMismatch { expected: 4, actual: 1 })));
    assert!(index.is_empty());
    assert!(VectorIndex::with_dimensionality(0).is_err());
}

#[test]
fn rejects_duplicates_empty_and_non_finite() {
    let mut index = VectorIndex::new();
    assert!(matches!(index.insert(seg("a", "a"), vec![]), Err(Error::InvalidArgument(_))));
    index.insert(seg("a", "a"), vec![1.0, 2.0]).expect("insert");
    assert!(matches!(index.insert(seg("a", "again"), vec![1.0, 2.0]), Err(Error::InvalidArgument(_))));
    assert!(matches!(index.insert(seg("b", "b"), vec![f32::NAN, 2.0]), Err(Error::InvalidArgument(_))));
    assert_eq!(index.len(), 1);
}

#[test]
fn query_dimension_mismatch_is_reported() {
    let index = build(3, 4);
    assert!(matches!(index.search(&[1.0, 2.0], 1), Err(Error::DimensionMismatch { expected: 4, actual: 2 })));
}

#[test]
fn zero_vectors_score_zero() {
    let mut index = VectorIndex::new();
    index.insert(seg("zero", "zero"), vec![0.0, 0.0]).expect("insert");
    index.insert(seg("x", "x"), vec![1.0, 0.0]).expect("insert");
    let hits = index.search(&[1.0, 0.0], 2).expect("search");
    assert_eq!(hits[0].segment.id, "x");
    assert_eq!(hits[1].score, 0.0);
}

#[test]
fn sharded_search_matches_linear_scan() {
    let index = build(257, 12);
    for q in vectors(5, 12, 1234) {
        let plain = index.search(&q, 17).expect("search");
        for shards in [1, 2, 3, 8, 64, 1000] {
            let sharded = index.search_sharded(&q, 17, shards).expect("sharded");
            let a: Vec<&str> = plain.iter().map(|h| h.segment.id.as_str()).collect();
            let b: Vec<&str> = sharded.iter().map(|h| h.segment.id.as_str()).collect();
            assert_eq!(a, b, "shards={shards}");
        }
    }
    assert!(VectorIndex::new().search_sharded(&[1.0], 3, 4).expect("empty").is_empty());
}

#[test]
fn topk_keeps_best_in_order() {
    let mut top = TopK::new(3);
    for (ordinal, score) in [0.1f32, 0.9, 0.5, 0.9, 0.3].into_iter().enumerate() {
        top.push(Candidate { score, ordinal });
    }
    let got: Vec<usize> = top.into_sorted_vec().into_iter().map(|c| c.ordinal).collect();
    assert_eq!(got, vec![1, 3, 2]);
}

#[test]
fn merge_combines_sorted_lists() {
    let c = |score, ordinal| Candidate { score, ordinal };
    let merged = merge_top_k(vec![vec![c(0.9, 0), c(0.2, 1)], vec![c(0.8, 5), c(0.7, 6)], vec![]], 3);
    let got: Vec<usize> = merged.into_iter().map(|c| c.ordinal).collect();
    assert_eq!(got, vec![0, 5, 6]);
}
