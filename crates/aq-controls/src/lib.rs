//! aq-controls: time- and condition-based operating rules.
//!
//! Rules change link statuses and settings during a simulation. Time-based
//! rules (simulated time, clock time) are scheduled so the engine can land a
//! timestep exactly on them; condition-based rules (tank level, link status)
//! are edge-triggered from solved state.

pub mod control;
pub mod error;
pub mod evaluate;

pub use control::{Control, ControlAction, ControlCondition, Relation, SECONDS_PER_DAY};
pub use error::{ControlError, ControlResult};
pub use evaluate::{ControlSet, ControlSetState};
