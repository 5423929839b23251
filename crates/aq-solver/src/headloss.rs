//! Per-element headloss laws and their flow derivatives.
//!
//! All laws are smoothed around zero flow with a small regularization so
//! that residuals stay continuously differentiable through flow reversals.
//! The smoothing scale is far below any flow of engineering interest, so
//! away from zero the laws match their textbook power forms to within
//! O((eps/q)^2).

use aq_core::{Real, GRAVITY};
use aq_network::{HeadlossModel, Pipe, PumpCurve};

/// Hazen-Williams exponent.
pub const HW_EXPONENT: Real = 1.852;

/// Hazen-Williams resistance constant for SI units (m, m^3/s).
const HW_COEFF: Real = 10.667;

/// Flow regularization scale (m^3/s).
pub const FLOW_SMOOTHING: Real = 1e-6;

/// Kinematic viscosity of water at 20 C (m^2/s), used by Darcy-Weisbach.
const KINEMATIC_VISCOSITY: Real = 1.004e-6;

fn circle_area(diameter: Real) -> Real {
    core::f64::consts::PI * diameter * diameter / 4.0
}

/// Smoothed signed power loss hl = k * q * (q^2 + eps^2)^((n-1)/2).
///
/// Returns (hl, d hl/dq). Odd in q, so reversal flips the sign; at q = 0 the
/// derivative is k * eps^(n-1), small but nonzero, which keeps the Jacobian
/// well conditioned.
pub fn smoothed_power_loss(k: Real, q: Real, n: Real) -> (Real, Real) {
    let s = q * q + FLOW_SMOOTHING * FLOW_SMOOTHING;
    let hl = k * q * s.powf((n - 1.0) / 2.0);
    let d = k * s.powf((n - 3.0) / 2.0) * (n * q * q + FLOW_SMOOTHING * FLOW_SMOOTHING);
    (hl, d)
}

/// Hazen-Williams resistance K such that hl = K * q^1.852 at positive flow.
pub fn hazen_williams_k(length: Real, diameter: Real, roughness: Real) -> Real {
    HW_COEFF * length / (roughness.powf(HW_EXPONENT) * diameter.powf(4.871))
}

/// Darcy-Weisbach resistance K such that hl = K * q^2, with the friction
/// factor evaluated at the given flow (Swamee-Jain in the turbulent range,
/// 64/Re laminar). The factor is held fixed when differentiating.
pub fn darcy_weisbach_k(length: Real, diameter: Real, roughness: Real, q: Real) -> Real {
    let area = circle_area(diameter);
    let re = (q.abs().max(1e-8)) * diameter / (KINEMATIC_VISCOSITY * area);
    let f = if re < 2000.0 {
        64.0 / re
    } else {
        let arg = roughness / (3.7 * diameter) + 5.74 / re.powf(0.9);
        0.25 / arg.log10().powi(2)
    };
    f * length / (2.0 * GRAVITY * diameter * area * area)
}

/// Minor loss resistance K_m such that hl = K_m * q^2, from a dimensionless
/// K factor and a diameter.
pub fn minor_loss_k(k_factor: Real, diameter: Real) -> Real {
    let area = circle_area(diameter);
    k_factor / (2.0 * GRAVITY * area * area)
}

/// Total headloss and derivative for an open pipe at flow q.
pub fn pipe_headloss(pipe: &Pipe, q: Real) -> (Real, Real) {
    let (friction_k, exponent) = match pipe.headloss {
        HeadlossModel::HazenWilliams => (
            hazen_williams_k(pipe.length, pipe.diameter, pipe.roughness),
            HW_EXPONENT,
        ),
        HeadlossModel::DarcyWeisbach => (
            darcy_weisbach_k(pipe.length, pipe.diameter, pipe.roughness, q),
            2.0,
        ),
    };
    let (mut hl, mut d) = smoothed_power_loss(friction_k, q, exponent);
    if pipe.minor_loss > 0.0 {
        let (m_hl, m_d) = smoothed_power_loss(minor_loss_k(pipe.minor_loss, pipe.diameter), q, 2.0);
        hl += m_hl;
        d += m_d;
    }
    (hl, d)
}

/// Pump head gain and derivative at flow q and relative speed.
///
/// gain(q) = speed^2 * (H0 - B * (q/speed)^C), with the flow magnitude
/// smoothed like the pipe laws so the gain stays differentiable at q = 0.
pub fn pump_head_gain(curve: &PumpCurve, speed: Real, q: Real) -> (Real, Real) {
    let qr = q / speed;
    let s = qr * qr + FLOW_SMOOTHING * FLOW_SMOOTHING;
    let mag = s.powf(curve.exponent / 2.0);
    let gain = speed * speed * (curve.shutoff_head - curve.coeff * mag);
    let dgain = -speed * curve.coeff * curve.exponent * qr * s.powf(curve.exponent / 2.0 - 1.0);
    (gain, dgain)
}
