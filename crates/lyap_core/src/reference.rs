//! Independent solvers for the discrete Lyapunov equation S = A S Aᵀ + Q.
//!
//! These take the noise covariance Q directly and are used to cross-check the
//! fixed-point iteration in [`crate::lyapunov`].

use crate::matrix::{all_finite, frobenius_norm};
use anyhow::{anyhow, bail, Result};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DoublingSettings {
    /// Relative size of the last increment at which the series is truncated.
    pub tolerance: f64,
    pub max_doublings: usize,
}

impl Default for DoublingSettings {
    fn default() -> Self {
        Self {
            tolerance: 1e-14,
            max_doublings: 60,
        }
    }
}

fn check_inputs(transition: &DMatrix<f64>, noise: &DMatrix<f64>) -> Result<usize> {
    let dim = transition.nrows();
    if dim == 0 {
        bail!("Transition matrix has zero dimension.");
    }
    if !transition.is_square() {
        bail!(
            "Transition matrix must be square, got {}x{}.",
            transition.nrows(),
            transition.ncols()
        );
    }
    if noise.shape() != (dim, dim) {
        bail!(
            "Noise covariance dimension mismatch. Expected {}x{}, got {}x{}.",
            dim,
            dim,
            noise.nrows(),
            noise.ncols()
        );
    }
    if !all_finite(transition) || !all_finite(noise) {
        bail!("Inputs contain non-finite entries.");
    }
    Ok(dim)
}

/// Smith doubling: X ← X + Aₖ X Aₖᵀ, Aₖ ← Aₖ², summing Σ Aʲ Q (Aᵀ)ʲ in
/// logarithmically many steps.
pub fn solve_discrete_lyapunov_doubling(
    transition: &DMatrix<f64>,
    noise: &DMatrix<f64>,
    settings: DoublingSettings,
) -> Result<DMatrix<f64>> {
    check_inputs(transition, noise)?;
    if !settings.tolerance.is_finite() || settings.tolerance <= 0.0 {
        bail!("tolerance must be positive.");
    }
    if settings.max_doublings == 0 {
        bail!("max_doublings must be greater than zero.");
    }

    let mut solution = noise.clone();
    let mut power = transition.clone();

    for _ in 0..settings.max_doublings {
        let increment = &power * &solution * power.transpose();
        solution += &increment;
        power = &power * &power;

        if !all_finite(&solution) || !all_finite(&power) {
            bail!("Doubling iteration produced non-finite values; is the spectral radius below one?");
        }

        let solution_norm = frobenius_norm(&solution);
        let increment_norm = frobenius_norm(&increment);
        if !solution_norm.is_finite() || !increment_norm.is_finite() {
            bail!("Doubling iteration produced non-finite values; is the spectral radius below one?");
        }
        if increment_norm <= settings.tolerance * solution_norm.max(1.0) {
            return Ok(solution);
        }
    }

    bail!(
        "Doubling iteration failed to converge in {} doublings.",
        settings.max_doublings
    )
}

/// Solves (I − A⊗A) vec(S) = vec(Q) with an LU factorisation.
///
/// Costs O(n⁶); only meant for small systems.
pub fn solve_discrete_lyapunov_direct(
    transition: &DMatrix<f64>,
    noise: &DMatrix<f64>,
) -> Result<DMatrix<f64>> {
    let dim = check_inputs(transition, noise)?;
    let vec_dim = dim * dim;

    // vec() stacks columns, which is nalgebra's storage order.
    let lhs = DMatrix::<f64>::identity(vec_dim, vec_dim) - transition.kronecker(transition);
    let rhs = DVector::from_column_slice(noise.as_slice());

    let solution = lhs
        .lu()
        .solve(&rhs)
        .ok_or_else(|| anyhow!("Kronecker system is singular (eigenvalue pair with λᵢλⱼ = 1)."))?;

    Ok(DMatrix::from_column_slice(dim, dim, solution.as_slice()))
}
