//! Options for extended-period simulation runs.

use crate::error::{SimError, SimResult};
use aq_core::Real;
use aq_solver::{DemandModel, NewtonConfig};
use serde::{Deserialize, Serialize};

/// Options for a simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimOptions {
    /// Total simulated duration (s). Zero runs a single steady solve.
    pub duration: Real,
    /// Nominal interval between hydraulic solves (s). Events and boundaries
    /// may shorten individual intervals.
    pub hydraulic_timestep: Real,
    /// Interval between reported rows (s).
    pub report_timestep: Real,
    /// Wall-clock time at simulated t = 0 (s past midnight).
    pub start_clocktime: Real,
    /// Demand-driven or pressure-driven analysis.
    pub demand_model: DemandModel,
    /// Newton residual tolerance.
    pub tolerance: f64,
    /// Newton iteration budget per solve.
    pub max_iterations: usize,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            duration: 24.0 * 3600.0,
            hydraulic_timestep: 3600.0,
            report_timestep: 3600.0,
            start_clocktime: 0.0,
            demand_model: DemandModel::Demand,
            tolerance: 1e-8,
            max_iterations: 50,
        }
    }
}

impl SimOptions {
    pub fn validate(&self) -> SimResult<()> {
        if !(self.duration >= 0.0 && self.duration.is_finite()) {
            return Err(SimError::InvalidOptions {
                what: "duration must be finite and non-negative",
            });
        }
        if self.hydraulic_timestep <= 0.0 {
            return Err(SimError::InvalidOptions {
                what: "hydraulic_timestep must be positive",
            });
        }
        if self.report_timestep <= 0.0 {
            return Err(SimError::InvalidOptions {
                what: "report_timestep must be positive",
            });
        }
        if !(0.0..86_400.0).contains(&self.start_clocktime) {
            return Err(SimError::InvalidOptions {
                what: "start_clocktime must lie within one day",
            });
        }
        if self.tolerance <= 0.0 {
            return Err(SimError::InvalidOptions {
                what: "tolerance must be positive",
            });
        }
        if self.max_iterations == 0 {
            return Err(SimError::InvalidOptions {
                what: "max_iterations must be positive",
            });
        }
        if let DemandModel::PressureDriven {
            minimum_pressure,
            required_pressure,
        } = self.demand_model
        {
            if required_pressure <= minimum_pressure {
                return Err(SimError::InvalidOptions {
                    what: "required_pressure must exceed minimum_pressure",
                });
            }
        }
        Ok(())
    }

    pub(crate) fn newton_config(&self) -> NewtonConfig {
        NewtonConfig {
            max_iterations: self.max_iterations,
            abs_tol: self.tolerance,
            rel_tol: self.tolerance,
            ..NewtonConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(SimOptions::default().validate().is_ok());
    }

    #[test]
    fn rejects_bad_values() {
        let mut opts = SimOptions::default();
        opts.hydraulic_timestep = 0.0;
        assert!(matches!(
            opts.validate(),
            Err(SimError::InvalidOptions { .. })
        ));

        let mut opts = SimOptions::default();
        opts.demand_model = DemandModel::PressureDriven {
            minimum_pressure: 20.0,
            required_pressure: 10.0,
        };
        assert!(opts.validate().is_err());

        let mut opts = SimOptions::default();
        opts.start_clocktime = 86_400.0;
        assert!(opts.validate().is_err());
    }
}
