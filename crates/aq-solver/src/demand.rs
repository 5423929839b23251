//! Demand models.

use aq_core::{hermite_cubic, Real};
use serde::{Deserialize, Serialize};

/// How junction demand responds to pressure.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DemandModel {
    /// Demand-driven: the full expected demand is withdrawn regardless of
    /// pressure.
    Demand,
    /// Pressure-driven: delivered demand scales with available pressure,
    /// zero at or below `minimum_pressure` and full at or above
    /// `required_pressure` (both in m of head above the junction elevation).
    PressureDriven {
        minimum_pressure: Real,
        required_pressure: Real,
    },
}

impl Default for DemandModel {
    fn default() -> Self {
        DemandModel::Demand
    }
}

/// Width of the smoothed transition at each knee of the pressure-demand
/// relationship (m).
const KNEE_WIDTH: Real = 0.2;

/// Fraction of expected demand delivered at pressure p, and its derivative
/// with respect to p.
///
/// The core relationship is sqrt((p - p0)/(pf - p0)) clamped to [0, 1]; the
/// knees at p0 and pf are replaced by Hermite cubics over a narrow band so
/// the function is C1 everywhere (the raw sqrt has an infinite slope at p0).
pub fn pdd_fraction(p: Real, p0: Real, pf: Real) -> (Real, Real) {
    let span = pf - p0;
    let delta = KNEE_WIDTH.min(span / 4.0);

    let sqrt_frac = |p: Real| -> (Real, Real) {
        let u = (p - p0) / span;
        let f = u.sqrt();
        (f, 1.0 / (2.0 * f * span))
    };

    if p <= p0 {
        (0.0, 0.0)
    } else if p < p0 + delta {
        let (f1, d1) = sqrt_frac(p0 + delta);
        hermite_cubic(p, p0, 0.0, 0.0, p0 + delta, f1, d1)
    } else if p <= pf - delta {
        sqrt_frac(p)
    } else if p < pf {
        let (f0, d0) = sqrt_frac(pf - delta);
        hermite_cubic(p, pf - delta, f0, d0, pf, 1.0, 0.0)
    } else {
        (1.0, 0.0)
    }
}
