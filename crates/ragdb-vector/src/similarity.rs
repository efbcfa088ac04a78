//! Vector math for cosine scoring.

/// Dot product over the common prefix of `a` and `b`.
#[inline]
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Euclidean length, accumulated in f64 so that it neither overflows nor
/// underflows for any finite f32 input.
pub fn norm(v: &[f32]) -> f64 {
    v.iter().map(|&x| f64::from(x) * f64::from(x)).sum::<f64>().sqrt()
}

/// `v / ||v||`, or all zeros for the zero vector.
///
/// Parallel vectors of any magnitude map to the same unit vector (up to the
/// final f32 rounding), which keeps their scores equal.
pub fn l2_normalize(v: &[f32]) -> Vec<f32> {
    let n = norm(v);
    if n > 0.0 {
        v.iter().map(|&x| (f64::from(x) / n) as f32).collect()
    } else {
        vec![0.0; v.len()]
    }
}

/// Cosine similarity; 0 when either side is the zero vector.
pub fn cosine(a: &[f32], b: &[f32]) -> f32 {
    dot(&l2_normalize(a), &l2_normalize(b))
}
