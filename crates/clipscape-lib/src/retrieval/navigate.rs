// Navigator: move a query vector through embedding space.

use crate::config::Metric;
use crate::error::{CoreResult, RetrievalError};
use crate::vector;

/// Step size used when none (or a non-finite one) is supplied.
pub const DEFAULT_STEP_SIZE: f32 = 1.0;

/// `normalize(current + step_size * direction)`.
///
/// `step_size` of `None` or a non-finite value means [`DEFAULT_STEP_SIZE`];
/// `Some(0.0)` is honoured and simply re-normalises `current`.
///
/// # Errors
///
/// - `DimensionMismatch` if `current` or `direction` is not `dimension` long.
/// - `DegenerateVector` if the sum has (near-)zero or non-finite norm.
pub fn step(
    current: &[f32],
    direction: &[f32],
    step_size: Option<f32>,
    dimension: usize,
) -> CoreResult<Vec<f32>> {
    let moved = translate(current, direction, step_size, dimension)?;
    vector::normalized(&moved).ok_or(RetrievalError::DegenerateVector("navigation"))
}

/// Step within the vector space of `metric`.
///
/// The normalised (inner-product) space uses [`step`]. The raw (L2) space is
/// never re-normalised: the result is `current + step_size * direction`, and
/// only a non-finite result is rejected.
pub fn step_in(
    metric: Metric,
    current: &[f32],
    direction: &[f32],
    step_size: Option<f32>,
    dimension: usize,
) -> CoreResult<Vec<f32>> {
    match metric {
        Metric::InnerProduct => step(current, direction, step_size, dimension),
        Metric::L2 => {
            let moved = translate(current, direction, step_size, dimension)?;
            if moved.iter().any(|x| !x.is_finite()) {
                return Err(RetrievalError::DegenerateVector("navigation"));
            }
            Ok(moved)
        }
    }
}

/// `current + step_size * direction` after dimension checks.
fn translate(
    current: &[f32],
    direction: &[f32],
    step_size: Option<f32>,
    dimension: usize,
) -> CoreResult<Vec<f32>> {
    if current.len() != dimension {
        return Err(RetrievalError::DimensionMismatch {
            what: "current embedding",
            expected: dimension,
            actual: current.len(),
        });
    }
    if direction.len() != dimension {
        return Err(RetrievalError::DimensionMismatch {
            what: "direction",
            expected: dimension,
            actual: direction.len(),
        });
    }
    let s = step_size
        .filter(|s| s.is_finite())
        .unwrap_or(DEFAULT_STEP_SIZE);

    Ok(current
        .iter()
        .zip(direction)
        .map(|(c, d)| c + s * d)
        .collect())
}

/// One-hot direction along `axis`, pointing up (`sign >= 0`) or down.
///
/// # Errors
///
/// `InvalidInput` if `axis` is outside `0..dimension`.
pub fn axis_direction(dimension: usize, axis: usize, sign: i8) -> CoreResult<Vec<f32>> {
    if axis >= dimension {
        return Err(RetrievalError::InvalidInput(format!(
            "axis {} out of range for dimension {}",
            axis, dimension
        )));
    }
    let mut d = vec![0.0; dimension];
    d[axis] = if sign < 0 { -1.0 } else { 1.0 };
    Ok(d)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_step_is_unit_norm() {
        let v = vector::normalized(&[1.0, 2.0, 3.0]).expect("unit");
        let d = axis_direction(3, 0, 1).expect("axis");
        let out = step(&v, &d, Some(0.5), 3).expect("step");
        assert_relative_eq!(vector::l2_norm(&out), 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_zero_step_renormalises() {
        let v = [3.0, 4.0];
        let out = step(&v, &[10.0, -7.0], Some(0.0), 2).expect("step");
        assert_relative_eq!(out[0], 0.6, epsilon = 1e-6);
        assert_relative_eq!(out[1], 0.8, epsilon = 1e-6);
    }

    #[test]
    fn test_missing_or_nan_step_defaults_to_one() {
        let v = [1.0, 0.0];
        let d = [0.0, 1.0];
        let a = step(&v, &d, None, 2).expect("step");
        let b = step(&v, &d, Some(f32::NAN), 2).expect("step");
        let c = step(&v, &d, Some(1.0), 2).expect("step");
        assert_eq!(a, c);
        assert_eq!(b, c);
    }

    #[test]
    fn test_opposite_direction_is_degenerate() {
        let v = [0.6, 0.8];
        let d = [-0.6, -0.8];
        let err = step(&v, &d, Some(1.0), 2).unwrap_err();
        assert!(matches!(err, RetrievalError::DegenerateVector(_)));
    }

    #[test]
    fn test_raw_space_step_is_not_normalised() {
        let out = step_in(Metric::L2, &[10.0, 0.0], &[0.0, 2.0], Some(0.5), 2).expect("step");
        assert_eq!(out, vec![10.0, 1.0]);
        let same = step_in(Metric::L2, &[10.0, 0.0], &[0.0, 0.0], Some(0.0), 2).expect("step");
        assert_eq!(same, vec![10.0, 0.0]);
        // The origin is an ordinary point in the raw space.
        let origin = step_in(Metric::L2, &[1.0, 1.0], &[-1.0, -1.0], None, 2).expect("step");
        assert_eq!(origin, vec![0.0, 0.0]);
    }

    #[test]
    fn test_normalised_space_step_in_matches_step() {
        let v = [0.6, 0.8];
        let d = [1.0, 0.0];
        assert_eq!(
            step_in(Metric::InnerProduct, &v, &d, Some(0.3), 2).expect("step"),
            step(&v, &d, Some(0.3), 2).expect("step")
        );
        assert!(step_in(Metric::L2, &v, &[1.0], None, 2).is_err());
    }

    #[test]
    fn test_dimension_checked() {
        let err = step(&[1.0, 0.0], &[1.0], None, 2).unwrap_err();
        assert!(matches!(
            err,
            RetrievalError::DimensionMismatch { what: "direction", .. }
        ));
        assert!(axis_direction(4, 4, 1).is_err());
        assert_eq!(axis_direction(3, 1, -1).expect("axis"), vec![0.0, -1.0, 0.0]);
    }
}
