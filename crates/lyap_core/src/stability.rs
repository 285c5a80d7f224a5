use crate::matrix::all_finite;
use anyhow::{bail, Result};
use nalgebra::DMatrix;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComplexNumber {
    pub re: f64,
    pub im: f64,
}

impl ComplexNumber {
    pub fn modulus(&self) -> f64 {
        self.re.hypot(self.im)
    }
}

impl From<Complex64> for ComplexNumber {
    fn from(value: Complex64) -> Self {
        Self {
            re: value.re,
            im: value.im,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StabilityReport {
    pub eigenvalues: Vec<ComplexNumber>,
    pub spectral_radius: f64,
    /// Spectral radius strictly inside the unit circle.
    pub stable: bool,
}

pub fn eigenvalues(transition: &DMatrix<f64>) -> Result<Vec<ComplexNumber>> {
    if transition.is_empty() {
        bail!("Transition matrix must have positive dimension.");
    }
    if !transition.is_square() {
        bail!(
            "Transition matrix must be square, got {}x{}.",
            transition.nrows(),
            transition.ncols()
        );
    }
    if !all_finite(transition) {
        bail!("Transition matrix contains non-finite entries.");
    }
    let values = transition.complex_eigenvalues();
    Ok(values.iter().map(|&lambda| ComplexNumber::from(lambda)).collect())
}

fn max_modulus(values: &[ComplexNumber]) -> f64 {
    values.iter().map(ComplexNumber::modulus).fold(0.0, f64::max)
}

pub fn spectral_radius(transition: &DMatrix<f64>) -> Result<f64> {
    Ok(max_modulus(&eigenvalues(transition)?))
}

pub fn analyze_stability(transition: &DMatrix<f64>) -> Result<StabilityReport> {
    let eigenvalues = eigenvalues(transition)?;
    let spectral_radius = max_modulus(&eigenvalues);
    Ok(StabilityReport {
        eigenvalues,
        spectral_radius,
        stable: spectral_radius < 1.0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_err_contains<T: std::fmt::Debug>(result: Result<T>, needle: &str) {
        let err = result.expect_err("expected error");
        let message = format!("{err}");
        assert!(
            message.contains(needle),
            "expected error to contain \"{needle}\", got \"{message}\""
        );
    }

    #[test]
    fn spectral_radius_of_triangular_matrix_is_largest_diagonal() {
        let a = DMatrix::from_row_slice(2, 2, &[0.5, 3.0, 0.0, -0.7]);
        let rho = spectral_radius(&a).expect("spectral radius");
        assert!((rho - 0.7).abs() < 1e-12);
    }

    #[test]
    fn spectral_radius_handles_complex_pair() {
        // Rotation scaled by 0.9 has eigenvalues 0.9 e^{±iθ}.
        let theta = 0.3_f64;
        let a = DMatrix::from_row_slice(
            2,
            2,
            &[
                0.9 * theta.cos(),
                -0.9 * theta.sin(),
                0.9 * theta.sin(),
                0.9 * theta.cos(),
            ],
        );
        let values = eigenvalues(&a).expect("eigenvalues");
        assert_eq!(values.len(), 2);
        for value in &values {
            assert!((value.modulus() - 0.9).abs() < 1e-12);
        }
        assert!(values.iter().any(|v| v.im > 0.0));
    }

    #[test]
    fn analyze_stability_flags_unit_root() {
        let identity = DMatrix::<f64>::identity(2, 2);
        let report = analyze_stability(&identity).expect("report");
        assert!(!report.stable);
        assert!((report.spectral_radius - 1.0).abs() < 1e-12);

        let contracting = DMatrix::from_row_slice(2, 2, &[0.8, -0.2, -0.1, 0.7]);
        let report = analyze_stability(&contracting).expect("report");
        assert!(report.stable);
        assert!((report.spectral_radius - 0.9).abs() < 1e-12);
    }

    #[test]
    fn spectral_radius_agrees_with_report() {
        let a = DMatrix::from_row_slice(3, 3, &[0.2, 1.0, 0.0, -1.0, 0.2, 0.0, 0.0, 0.0, 0.5]);
        let rho = spectral_radius(&a).expect("spectral radius");
        let report = analyze_stability(&a).expect("report");
        assert_eq!(rho, report.spectral_radius);
        assert!((rho - 1.04_f64.sqrt()).abs() < 1e-12);
        assert!(!report.stable);
    }

    #[test]
    fn eigenvalues_reject_bad_shapes() {
        assert_err_contains(eigenvalues(&DMatrix::zeros(0, 0)), "positive dimension");
        assert_err_contains(eigenvalues(&DMatrix::zeros(2, 3)), "must be square");
        assert_err_contains(
            eigenvalues(&DMatrix::from_element(1, 1, f64::NAN)),
            "non-finite",
        );
    }
}
