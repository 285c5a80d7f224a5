use crate::error::{LyapunovError, Result};
use crate::matrix::{all_finite, frobenius_norm, max_abs, shock_covariance, to_row_major};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Entries past this magnitude can no longer be squared in `f64`.
const BLOW_UP_MAGNITUDE: f64 = 1.3407807929942596e154;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LyapunovSettings {
    pub tolerance: f64,
    pub max_iterations: usize,
}

impl Default for LyapunovSettings {
    fn default() -> Self {
        Self {
            tolerance: 1e-6,
            max_iterations: 500,
        }
    }
}

impl LyapunovSettings {
    pub fn validate(&self) -> Result<()> {
        if !self.tolerance.is_finite() || self.tolerance <= 0.0 {
            return Err(LyapunovError::invalid(format!(
                "tolerance must be positive and finite, got {}.",
                self.tolerance
            )));
        }
        if self.max_iterations == 0 {
            return Err(LyapunovError::invalid(
                "max_iterations must be greater than zero.",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Termination {
    Converged,
    BudgetExhausted,
}

/// The pair (A, Q = Σ Σᵀ) defining the map S ↦ A S Aᵀ + Q.
#[derive(Debug, Clone)]
pub struct LyapunovProblem {
    transition: DMatrix<f64>,
    noise: DMatrix<f64>,
}

impl LyapunovProblem {
    /// Validates shapes and computes the noise covariance from the shock loadings.
    pub fn new(transition: DMatrix<f64>, shocks: &DMatrix<f64>) -> Result<Self> {
        let dim = transition.nrows();
        if dim == 0 {
            return Err(LyapunovError::invalid(
                "Transition matrix has zero dimension.",
            ));
        }
        if !transition.is_square() {
            return Err(LyapunovError::invalid(format!(
                "Transition matrix must be square, got {}x{}.",
                transition.nrows(),
                transition.ncols()
            )));
        }
        if shocks.nrows() != dim {
            return Err(LyapunovError::invalid(format!(
                "Shock matrix row count mismatch. Expected {}, got {}.",
                dim,
                shocks.nrows()
            )));
        }
        if !all_finite(&transition) {
            return Err(LyapunovError::invalid(
                "Transition matrix contains non-finite entries.",
            ));
        }
        if !all_finite(shocks) {
            return Err(LyapunovError::invalid(
                "Shock matrix contains non-finite entries.",
            ));
        }

        Ok(Self {
            noise: shock_covariance(shocks),
            transition,
        })
    }

    pub fn dimension(&self) -> usize {
        self.transition.nrows()
    }

    pub fn transition(&self) -> &DMatrix<f64> {
        &self.transition
    }

    pub fn noise_covariance(&self) -> &DMatrix<f64> {
        &self.noise
    }

    /// One application of the recurrence: A S Aᵀ + Q.
    pub fn apply(&self, covariance: &DMatrix<f64>) -> DMatrix<f64> {
        &self.transition * covariance * self.transition.transpose() + &self.noise
    }

    /// ‖S − (A S Aᵀ + Q)‖_F. Zero exactly at the fixed point.
    pub fn fixed_point_residual(&self, covariance: &DMatrix<f64>) -> f64 {
        frobenius_norm(&(covariance - self.apply(covariance)))
    }
}

#[derive(Debug, Clone)]
pub struct LyapunovSolution {
    pub covariance: DMatrix<f64>,
    pub iterations: usize,
    /// Frobenius norm of the change made by the last step.
    pub residual: f64,
    pub termination: Termination,
}

impl LyapunovSolution {
    pub fn converged(&self) -> bool {
        self.termination == Termination::Converged
    }

    pub fn report(&self) -> LyapunovReport {
        LyapunovReport {
            dimension: self.covariance.nrows(),
            covariance: to_row_major(&self.covariance),
            iterations: self.iterations,
            residual: self.residual,
            converged: self.converged(),
            termination: self.termination,
        }
    }
}

/// Serializable view of a solution with the covariance flattened row-major.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LyapunovReport {
    pub dimension: usize,
    pub covariance: Vec<f64>,
    pub iterations: usize,
    pub residual: f64,
    pub converged: bool,
    pub termination: Termination,
}

/// Loop state of the fixed-point iteration, advanced one step at a time.
#[derive(Debug, Clone)]
pub struct LyapunovIteration {
    problem: LyapunovProblem,
    settings: LyapunovSettings,
    covariance: DMatrix<f64>,
    iterations: usize,
    residual: f64,
    termination: Option<Termination>,
}

impl LyapunovIteration {
    /// Seeds the iterate with `initial`, or with Q when none is given.
    pub fn new(
        problem: LyapunovProblem,
        initial: Option<DMatrix<f64>>,
        settings: LyapunovSettings,
    ) -> Result<Self> {
        settings.validate()?;
        let dim = problem.dimension();
        let covariance = match initial {
            Some(seed) => {
                if seed.shape() != (dim, dim) {
                    return Err(LyapunovError::invalid(format!(
                        "Initial covariance dimension mismatch. Expected {}x{}, got {}x{}.",
                        dim,
                        dim,
                        seed.nrows(),
                        seed.ncols()
                    )));
                }
                if !all_finite(&seed) {
                    return Err(LyapunovError::invalid(
                        "Initial covariance contains non-finite entries.",
                    ));
                }
                seed
            }
            None => problem.noise_covariance().clone(),
        };

        Ok(Self {
            problem,
            settings,
            covariance,
            iterations: 0,
            residual: f64::INFINITY,
            termination: None,
        })
    }

    /// Continues from `previous`, keeping its iteration count. The budget of
    /// `settings.max_iterations` steps is counted on top of the steps already taken.
    pub fn resume(
        problem: LyapunovProblem,
        previous: LyapunovSolution,
        settings: LyapunovSettings,
    ) -> Result<Self> {
        settings.validate()?;
        let extended = LyapunovSettings {
            max_iterations: previous.iterations + settings.max_iterations,
            ..settings
        };
        let mut iteration = Self::new(problem, Some(previous.covariance), extended)?;
        iteration.iterations = previous.iterations;
        iteration.residual = previous.residual;
        Ok(iteration)
    }

    pub fn problem(&self) -> &LyapunovProblem {
        &self.problem
    }

    pub fn settings(&self) -> LyapunovSettings {
        self.settings
    }

    pub fn covariance(&self) -> &DMatrix<f64> {
        &self.covariance
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Infinity until the first step has run.
    pub fn residual(&self) -> f64 {
        self.residual
    }

    pub fn termination(&self) -> Option<Termination> {
        self.termination
    }

    pub fn is_done(&self) -> bool {
        self.termination.is_some()
    }

    /// Performs one update. Returns the terminal state once reached; further
    /// calls leave the iterate untouched.
    pub fn step(&mut self) -> Result<Option<Termination>> {
        if self.termination.is_some() {
            return Ok(self.termination);
        }

        let next = self.problem.apply(&self.covariance);
        let residual = frobenius_norm(&(&self.covariance - &next));
        let non_finite = !all_finite(&next) || !residual.is_finite();
        // Huge entries alone are fine while the steps shrink. Growing steps well
        // above rounding noise on top of huge entries only end in overflow.
        let magnitude = max_abs(&next);
        let blowing_up = magnitude > BLOW_UP_MAGNITUDE
            && residual > self.residual
            && residual > magnitude * f64::EPSILON.sqrt();
        if non_finite || blowing_up {
            warn!(
                iterations = self.iterations,
                residual,
                "Lyapunov iteration diverged"
            );
            return Err(LyapunovError::Diverged {
                iterations: self.iterations,
                last_finite: self.covariance.clone(),
            });
        }

        self.covariance = next;
        self.residual = residual;
        self.iterations += 1;

        if residual <= self.settings.tolerance {
            debug!(
                iterations = self.iterations,
                residual, "Lyapunov iteration converged"
            );
            self.termination = Some(Termination::Converged);
        } else if self.iterations >= self.settings.max_iterations {
            warn!(
                iterations = self.iterations,
                residual,
                tolerance = self.settings.tolerance,
                "Lyapunov iteration exhausted its budget"
            );
            self.termination = Some(Termination::BudgetExhausted);
        }

        Ok(self.termination)
    }

    /// Steps until a terminal state and returns the result.
    pub fn run(mut self) -> Result<LyapunovSolution> {
        let termination = loop {
            if let Some(termination) = self.step()? {
                break termination;
            }
        };
        Ok(LyapunovSolution {
            covariance: self.covariance,
            iterations: self.iterations,
            residual: self.residual,
            termination,
        })
    }
}

/// Iterates S ← A S Aᵀ + Σ Σᵀ from `initial` (default Σ Σᵀ) until the step
/// size drops to `settings.tolerance` or the iteration budget runs out.
///
/// Budget exhaustion is reported through [`LyapunovSolution::termination`];
/// a non-finite iterate fails with [`LyapunovError::Diverged`].
pub fn solve_discrete_lyapunov_iterative(
    transition: &DMatrix<f64>,
    shocks: &DMatrix<f64>,
    initial: Option<&DMatrix<f64>>,
    settings: LyapunovSettings,
) -> Result<LyapunovSolution> {
    let problem = LyapunovProblem::new(transition.clone(), shocks)?;
    LyapunovIteration::new(problem, initial.cloned(), settings)?.run()
}
