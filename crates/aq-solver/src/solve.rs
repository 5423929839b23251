//! High-level hydraulic solve interface.

use crate::assemble::HydraulicProblem;
use crate::error::{SolverError, SolverResult};
use crate::newton::{newton_solve, NewtonConfig};
use aq_core::Real;
use nalgebra::DVector;
use tracing::debug;

/// A converged hydraulic state at one instant.
#[derive(Debug, Clone, PartialEq)]
pub struct HydraulicSolution {
    /// Head per node (m).
    pub heads: Vec<Real>,
    /// Signed flow per link (m^3/s), positive start -> end.
    pub flows: Vec<Real>,
    /// Delivered demand per node (m^3/s).
    pub demands: Vec<Real>,
    /// Final residual norm.
    pub residual_norm: f64,
    /// Newton iterations taken.
    pub iterations: usize,
}

impl HydraulicSolution {
    /// Repack into an unknown vector, for warm-starting the next solve.
    pub fn to_guess_vector(&self) -> DVector<f64> {
        let mut x = DVector::zeros(self.heads.len() + self.flows.len());
        for (i, &h) in self.heads.iter().enumerate() {
            x[i] = h;
        }
        for (j, &q) in self.flows.iter().enumerate() {
            x[self.heads.len() + j] = q;
        }
        x
    }
}

/// Solve one instant's hydraulics.
///
/// Runs damped Newton on the assembled system, starting from `warm_start`
/// when given (the previous interval's solution vector) and a cold guess
/// otherwise. Warm starting does not change what the solve converges to,
/// only how fast it gets there.
pub fn solve_hydraulics(
    problem: &HydraulicProblem<'_>,
    config: &NewtonConfig,
    warm_start: Option<&DVector<f64>>,
) -> SolverResult<HydraulicSolution> {
    let x0 = match warm_start {
        Some(x) => {
            if x.len() != problem.dim() {
                return Err(SolverError::Setup {
                    what: format!(
                        "warm start has {} unknowns, system has {}",
                        x.len(),
                        problem.dim()
                    ),
                });
            }
            x.clone()
        }
        None => problem.initial_guess(),
    };

    let result = newton_solve(
        x0,
        |x| problem.residual(x),
        |x| problem.jacobian(x),
        config,
    )?;

    debug!(
        iterations = result.iterations,
        residual = result.residual_norm,
        "hydraulic solve converged"
    );

    let n = problem.n_nodes();
    let heads: Vec<Real> = (0..n).map(|i| result.x[i]).collect();
    let flows: Vec<Real> = (0..problem.n_links()).map(|j| result.x[n + j]).collect();
    let demands = heads
        .iter()
        .enumerate()
        .map(|(i, &h)| problem.actual_demand(i, h).0)
        .collect();

    Ok(HydraulicSolution {
        heads,
        flows,
        demands,
        residual_norm: result.residual_norm,
        iterations: result.iterations,
    })
}
