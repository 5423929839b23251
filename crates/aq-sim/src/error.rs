//! Error types for simulation runs.

use thiserror::Error;

/// Errors encountered while running a simulation.
#[derive(Error, Debug)]
pub enum SimError {
    #[error("Invalid options: {what}")]
    InvalidOptions { what: &'static str },

    #[error("Hydraulic solve failed at t = {time} s: {source}")]
    SolveFailed {
        time: f64,
        source: aq_solver::SolverError,
    },

    #[error("Control rules kept re-firing at t = {time} s without settling")]
    ControlsUnsettled { time: f64 },

    #[error(transparent)]
    Network(#[from] aq_network::NetworkError),

    #[error(transparent)]
    Control(#[from] aq_controls::ControlError),

    #[error(transparent)]
    Results(#[from] aq_results::ResultsError),

    #[error("Snapshot error: {0}")]
    Snapshot(#[from] serde_json::Error),

    #[error("Snapshot does not match the network ({what})")]
    SnapshotMismatch { what: &'static str },
}

pub type SimResult<T> = Result<T, SimError>;
