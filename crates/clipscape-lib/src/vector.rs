//! Small dense-vector helpers shared by the index, diversifier and navigator.
//!
//! Embeddings are plain `Vec<f32>` / `&[f32]` throughout the crate; `ndarray`
//! is only used where a matrix is actually needed (clustering).

use ndarray::ArrayView1;

/// Norms below this are treated as zero (normalisation undefined).
pub const DEGENERATE_NORM: f32 = 1e-6;

/// Allowed deviation from unit norm for vectors in the normalised space.
pub const UNIT_NORM_TOLERANCE: f32 = 1e-3;

/// Dot product of two equal-length slices.
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    ArrayView1::from(a).dot(&ArrayView1::from(b))
}

/// L2 norm of `v`.
pub fn l2_norm(v: &[f32]) -> f32 {
    dot(v, v).sqrt()
}

/// Euclidean distance between `a` and `b`.
pub fn euclidean(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

/// Return `v / ||v||`, or `None` when the norm is zero, tiny or not finite.
pub fn normalized(v: &[f32]) -> Option<Vec<f32>> {
    let norm = l2_norm(v);
    if !norm.is_finite() || norm < DEGENERATE_NORM {
        return None;
    }
    Some(v.iter().map(|x| x / norm).collect())
}

/// Whether `v` has unit norm within [`UNIT_NORM_TOLERANCE`].
pub fn is_unit(v: &[f32]) -> bool {
    (l2_norm(v) - 1.0).abs() <= UNIT_NORM_TOLERANCE
}
