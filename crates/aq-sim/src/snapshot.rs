//! Pause/resume snapshots.

use crate::error::SimResult;
use crate::options::SimOptions;
use aq_controls::{Control, ControlSetState};
use aq_core::Real;
use aq_network::NetworkState;
use aq_results::SimulationResults;
use serde::{Deserialize, Serialize};

/// Everything needed to resume a paused run and reproduce the remainder
/// bit-for-bit: hydraulic state, firing bookkeeping, the warm-start vector
/// and the rows already recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationState {
    pub options: SimOptions,
    pub controls: Vec<Control>,
    pub control_state: ControlSetState,
    pub network_state: NetworkState,
    pub warm_start: Option<Vec<f64>>,
    pub next_report: Real,
    pub last_dt: Option<Real>,
    pub auto_closed: Vec<bool>,
    pub results: SimulationResults,
}

impl SimulationState {
    pub fn to_json(&self) -> SimResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> SimResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
