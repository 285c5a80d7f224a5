pub mod error;
pub mod lyapunov;
pub mod matrix;
pub mod reference;
/// The `lyap_core` crate computes steady-state covariances of linear stochastic
/// recurrences `x_{t+1} = A x_t + Σ w_t` by iterating the discrete Lyapunov map
/// `S ↦ A S Aᵀ + Σ Σᵀ` to its fixed point.
///
/// Key components:
/// - **Lyapunov**: `LyapunovProblem`, the stepped `LyapunovIteration`, and the
///   one-shot `solve_discrete_lyapunov_iterative`.
/// - **Reference**: independent doubling and Kronecker solvers for cross-checks.
/// - **Stability**: eigenvalues and spectral radius of the transition matrix.
/// - **Matrix**: norms, symmetry checks and row-major conversions.
pub mod stability;

pub use error::LyapunovError;
pub use lyapunov::{
    solve_discrete_lyapunov_iterative, LyapunovIteration, LyapunovProblem, LyapunovReport,
    LyapunovSettings, LyapunovSolution, Termination,
};
