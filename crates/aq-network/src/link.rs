//! Link arena element types.

use crate::error::NetworkError;
use aq_core::{LinkId, NodeId, Real};
use serde::{Deserialize, Serialize};

/// Operating status of a link.
///
/// `Active` only applies to regulating valves (holding their setpoint);
/// pipes and pumps are either `Open` or `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkStatus {
    Open,
    Closed,
    Active,
}

impl LinkStatus {
    /// Stable numeric code used in result tables (0=Closed, 1=Open, 2=Active).
    pub fn code(self) -> u8 {
        match self {
            LinkStatus::Closed => 0,
            LinkStatus::Open => 1,
            LinkStatus::Active => 2,
        }
    }
}

/// Headloss law applied to a pipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HeadlossModel {
    /// Roughness is the Hazen-Williams C factor (dimensionless).
    HazenWilliams,
    /// Roughness is the absolute roughness height (m).
    DarcyWeisbach,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipe {
    /// Length (m)
    pub length: Real,
    /// Inner diameter (m)
    pub diameter: Real,
    /// Roughness; meaning depends on `headloss`.
    pub roughness: Real,
    /// Minor loss coefficient (sum of K factors).
    pub minor_loss: Real,
    /// Check valve: flow may not reverse; the engine closes the pipe instead.
    pub check_valve: bool,
    pub headloss: HeadlossModel,
}

/// Pump head-gain curve h_gain(q) = shutoff_head - coeff * q^exponent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PumpCurve {
    /// Head gain at zero flow (m)
    pub shutoff_head: Real,
    /// Curve coefficient (m / (m^3/s)^exponent)
    pub coeff: Real,
    /// Curve exponent (dimensionless, > 0)
    pub exponent: Real,
}

impl PumpCurve {
    /// Fit from a single design point (q, h): shutoff head 4/3 h, quadratic drop.
    pub fn single_point(q: Real, h: Real) -> Result<Self, NetworkError> {
        if q <= 0.0 || h <= 0.0 {
            return Err(NetworkError::NonPositive {
                what: "pump design point",
                entity: format!("(q={q}, h={h})"),
            });
        }
        let shutoff_head = 4.0 * h / 3.0;
        Ok(Self {
            shutoff_head,
            coeff: (shutoff_head - h) / (q * q),
            exponent: 2.0,
        })
    }

    /// Fit from three points: shutoff (0, h0), design (q1, h1), max (q2, h2).
    ///
    /// Requires h0 > h1 > h2 and 0 < q1 < q2.
    pub fn three_point(h0: Real, q1: Real, h1: Real, q2: Real, h2: Real) -> Result<Self, NetworkError> {
        if !(h0 > h1 && h1 > h2 && q1 > 0.0 && q2 > q1) {
            return Err(NetworkError::BadPumpCurve {
                what: "points must satisfy h0 > h1 > h2 and 0 < q1 < q2",
            });
        }
        let exponent = ((h0 - h1) / (h0 - h2)).ln() / (q1 / q2).ln();
        if !(exponent > 0.0 && exponent.is_finite()) {
            return Err(NetworkError::BadPumpCurve {
                what: "fit produced a non-positive exponent",
            });
        }
        Ok(Self {
            shutoff_head: h0,
            coeff: (h0 - h1) / q1.powf(exponent),
            exponent,
        })
    }

    /// Head gain at flow q (>= 0), ignoring speed scaling.
    pub fn head_gain(&self, q: Real) -> Real {
        self.shutoff_head - self.coeff * q.powf(self.exponent)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pump {
    pub curve: PumpCurve,
    /// Relative speed; 1.0 is rated speed.
    pub speed: Real,
}

/// Regulating valve kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValveKind {
    /// Pressure reducing: holds downstream head at elevation + setting.
    Prv,
    /// Flow control: holds flow at the setting (m^3/s).
    Fcv,
    /// Throttle control: applies a setting-scaled minor loss.
    Tcv,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Valve {
    pub kind: ValveKind,
    /// Inner diameter (m), used for the open-valve minor loss and velocity.
    pub diameter: Real,
    /// Mode-dependent setpoint (m for PRV, m^3/s for FCV, K factor for TCV).
    pub setting: Real,
}

/// Link variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LinkKind {
    Pipe(Pipe),
    Pump(Pump),
    Valve(Valve),
}

/// A link in the network arena, directed from `start` to `end`.
///
/// Positive flow runs start -> end; negative flow is allowed where the
/// component supports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub id: LinkId,
    pub name: String,
    pub start: NodeId,
    pub end: NodeId,
    pub kind: LinkKind,
    pub initial_status: LinkStatus,
    /// Initial setting (valve setpoint or pump speed); NaN-free copy of the kind's value.
    pub initial_setting: Real,
}

impl Link {
    /// Flow area (m^2) where a diameter is defined; pumps report None.
    pub fn flow_area(&self) -> Option<Real> {
        let d = match &self.kind {
            LinkKind::Pipe(p) => p.diameter,
            LinkKind::Valve(v) => v.diameter,
            LinkKind::Pump(_) => return None,
        };
        Some(core::f64::consts::PI * d * d / 4.0)
    }

    pub fn is_check_valve(&self) -> bool {
        matches!(&self.kind, LinkKind::Pipe(p) if p.check_valve)
    }
}
