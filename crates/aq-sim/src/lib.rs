//! aq-sim: extended-period simulation of water distribution networks.
//!
//! Couples the single-instant hydraulic solver (aq-solver) with a
//! discrete-event time loop: tank levels integrate between solves, control
//! rules and pattern steps shorten intervals so nothing is stepped over,
//! and converged states land in result tables (aq-results). Runs can be
//! paused into a serializable snapshot and resumed bit-for-bit.

pub mod engine;
pub mod error;
pub mod options;
pub mod snapshot;

pub use engine::Simulator;
pub use error::{SimError, SimResult};
pub use options::SimOptions;
pub use snapshot::SimulationState;
