//! Error types for hydraulic solves.

use thiserror::Error;

/// Errors that can occur while assembling or solving the hydraulic system.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    #[error("Problem setup error: {what}")]
    Setup { what: String },

    #[error("Degenerate system: equation for {entity} has no coupling to any unknown")]
    Degenerate { entity: String },

    #[error("Jacobian is singular")]
    Singular,

    #[error("Convergence failed after {iterations} iterations (residual {residual_norm:.3e})")]
    ConvergenceFailed {
        iterations: usize,
        residual_norm: f64,
    },

    #[error("Non-finite value in {what}")]
    NonFinite { what: &'static str },
}

pub type SolverResult<T> = Result<T, SolverError>;
