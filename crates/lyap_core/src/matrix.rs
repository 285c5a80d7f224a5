//! Dense-matrix helpers shared by the solvers.

use crate::error::{LyapunovError, Result};
use nalgebra::DMatrix;

/// Square root of the sum of squared entries, scaled by the largest entry so
/// that finite matrices never overflow. Non-finite entries give a non-finite norm.
pub fn frobenius_norm(matrix: &DMatrix<f64>) -> f64 {
    let scale = max_abs(matrix);
    if scale == 0.0 || !scale.is_finite() {
        return scale;
    }
    let sum = matrix.iter().map(|v| (v / scale).powi(2)).sum::<f64>();
    scale * sum.sqrt()
}

/// Largest absolute entry. NaN entries are skipped; zero for an empty matrix.
pub fn max_abs(matrix: &DMatrix<f64>) -> f64 {
    matrix.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()))
}

/// Q = Σ Σᵀ.
pub fn shock_covariance(sigma: &DMatrix<f64>) -> DMatrix<f64> {
    sigma * sigma.transpose()
}

pub fn all_finite(matrix: &DMatrix<f64>) -> bool {
    matrix.iter().all(|v| v.is_finite())
}

/// Largest `|S_ij - S_ji|` over the leading square block.
pub fn max_asymmetry(matrix: &DMatrix<f64>) -> f64 {
    let n = matrix.nrows().min(matrix.ncols());
    let mut worst = 0.0_f64;
    for i in 0..n {
        for j in (i + 1)..n {
            worst = worst.max((matrix[(i, j)] - matrix[(j, i)]).abs());
        }
    }
    worst
}

pub fn is_symmetric(matrix: &DMatrix<f64>, tolerance: f64) -> bool {
    matrix.is_square() && max_asymmetry(matrix) <= tolerance
}

pub fn from_row_major(values: &[f64], rows: usize, cols: usize) -> Result<DMatrix<f64>> {
    let expected = rows.checked_mul(cols).ok_or_else(|| {
        LyapunovError::invalid(format!("Matrix shape {}x{} is too large.", rows, cols))
    })?;
    if values.len() != expected {
        return Err(LyapunovError::invalid(format!(
            "Matrix data length mismatch. Expected {}x{} = {}, got {}.",
            rows,
            cols,
            expected,
            values.len()
        )));
    }
    Ok(DMatrix::from_row_slice(rows, cols, values))
}

/// nalgebra stores column-major; callers outside the crate expect rows.
pub fn to_row_major(matrix: &DMatrix<f64>) -> Vec<f64> {
    let mut out = Vec::with_capacity(matrix.len());
    for i in 0..matrix.nrows() {
        for j in 0..matrix.ncols() {
            out.push(matrix[(i, j)]);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frobenius_norm_matches_hand_computation() {
        let m = DMatrix::from_row_slice(2, 2, &[3.0, 0.0, 0.0, 4.0]);
        assert!((frobenius_norm(&m) - 5.0).abs() < 1e-15);
    }

    #[test]
    fn frobenius_norm_stays_finite_for_large_entries() {
        let m = DMatrix::from_row_slice(1, 2, &[3e200, 4e200]);
        let norm = frobenius_norm(&m);
        assert!(norm.is_finite());
        assert!((norm / 5e200 - 1.0).abs() < 1e-15);
    }

    #[test]
    fn frobenius_norm_propagates_non_finite_entries() {
        assert!(!frobenius_norm(&DMatrix::from_row_slice(1, 2, &[1.0, f64::NAN])).is_finite());
        assert!(frobenius_norm(&DMatrix::from_row_slice(1, 2, &[f64::INFINITY, 1.0])).is_infinite());
        assert_eq!(frobenius_norm(&DMatrix::<f64>::zeros(2, 2)), 0.0);
    }

    #[test]
    fn max_abs_picks_largest_magnitude() {
        let m = DMatrix::from_row_slice(2, 2, &[1.0, -7.5, 2.0, 3.0]);
        assert_eq!(max_abs(&m), 7.5);
    }

    #[test]
    fn shock_covariance_is_symmetric_and_has_expected_shape() {
        let sigma = DMatrix::from_row_slice(2, 3, &[1.0, 2.0, 0.5, -1.0, 0.0, 3.0]);
        let q = shock_covariance(&sigma);
        assert_eq!(q.shape(), (2, 2));
        assert!(is_symmetric(&q, 0.0));
        assert!((q[(0, 0)] - 5.25).abs() < 1e-12);
        assert!((q[(0, 1)] - 0.5).abs() < 1e-12);
        assert!((q[(1, 1)] - 10.0).abs() < 1e-12);
    }

    #[test]
    fn max_asymmetry_reports_worst_off_diagonal_pair() {
        let m = DMatrix::from_row_slice(3, 3, &[1.0, 2.0, 0.0, 2.5, 1.0, 4.0, 0.0, 3.0, 1.0]);
        assert!((max_asymmetry(&m) - 1.0).abs() < 1e-15);
        assert!(!is_symmetric(&m, 0.5));
        assert!(is_symmetric(&m, 1.0));
    }

    #[test]
    fn row_major_conversion_preserves_layout() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let m = from_row_major(&values, 2, 3).expect("valid shape");
        assert_eq!(m[(0, 2)], 3.0);
        assert_eq!(m[(1, 0)], 4.0);
        assert_eq!(to_row_major(&m), values.to_vec());
    }

    #[test]
    fn from_row_major_rejects_length_mismatch() {
        let err = from_row_major(&[1.0, 2.0, 3.0], 2, 2).expect_err("expected error");
        assert!(format!("{err}").contains("length mismatch"));
    }

    #[test]
    fn from_row_major_rejects_shape_overflow() {
        // On wasm32 a 65536x65536 request would wrap to zero elements.
        let err = from_row_major(&[], usize::MAX, 2).expect_err("expected error");
        assert!(matches!(err, LyapunovError::InvalidArgument(_)));
        assert!(format!("{err}").contains("too large"));
    }

    #[test]
    fn all_finite_detects_nan_and_infinity() {
        assert!(all_finite(&DMatrix::from_element(2, 2, 1.0)));
        assert!(!all_finite(&DMatrix::from_row_slice(1, 2, &[1.0, f64::NAN])));
        assert!(!all_finite(&DMatrix::from_row_slice(1, 2, &[f64::INFINITY, 0.0])));
    }
}
