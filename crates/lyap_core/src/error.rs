use nalgebra::DMatrix;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LyapunovError>;

#[derive(Debug, Clone, Error)]
pub enum LyapunovError {
    /// Malformed shapes, non-finite inputs or an unusable settings value.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The iterate blew up. `last_finite` is the iterate after `iterations` steps.
    #[error("Lyapunov iteration diverged after {iterations} steps (non-finite covariance).")]
    Diverged {
        iterations: usize,
        last_finite: DMatrix<f64>,
    },
}

impl LyapunovError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        LyapunovError::InvalidArgument(message.into())
    }
}
