//! aq-solver: single-instant hydraulic solves.
//!
//! Assembles mass balance and energy conservation into one square nonlinear
//! system (heads and flows as unknowns) and solves it with damped Newton
//! iteration over an analytic Jacobian. Tank levels are boundary conditions
//! here; integrating them over time is the engine's job (aq-sim).
//!
//! Headloss laws (Hazen-Williams, Darcy-Weisbach, pump curves, valve modes)
//! live in [`headloss`], smoothed around zero flow so reversals stay
//! differentiable.

pub mod assemble;
pub mod demand;
pub mod error;
pub mod headloss;
pub mod jacobian;
pub mod newton;
pub mod solve;

pub use assemble::HydraulicProblem;
pub use demand::DemandModel;
pub use error::{SolverError, SolverResult};
pub use newton::{NewtonConfig, NewtonResult};
pub use solve::{solve_hydraulics, HydraulicSolution};
