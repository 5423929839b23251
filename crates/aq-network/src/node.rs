//! Node arena element types.

use aq_core::{NodeId, PatternId, Real};
use serde::{Deserialize, Serialize};

/// One demand category at a junction: base demand scaled by an optional pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemandEntry {
    /// Base demand (m^3/s)
    pub base: Real,
    /// Multiplier pattern; None means the base applies at all times.
    pub pattern: Option<PatternId>,
}

/// A demand node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Junction {
    /// Elevation (m)
    pub elevation: Real,
    /// Demand categories, summed for the expected demand.
    pub demands: Vec<DemandEntry>,
}

/// A storage node with bounded water level.
///
/// The tank is cylindrical; its head is elevation + level, and the level is
/// integrated explicitly by the engine from the net inflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tank {
    /// Bottom elevation (m)
    pub elevation: Real,
    /// Initial water level above the bottom (m)
    pub init_level: Real,
    /// Minimum operating level (m)
    pub min_level: Real,
    /// Maximum operating level (m)
    pub max_level: Real,
    /// Inner diameter (m)
    pub diameter: Real,
}

impl Tank {
    /// Horizontal cross-section area (m^2).
    pub fn area(&self) -> Real {
        core::f64::consts::PI * self.diameter * self.diameter / 4.0
    }
}

/// An infinite source/sink with fixed (optionally patterned) head.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reservoir {
    /// Base hydraulic head (m)
    pub base_head: Real,
    /// Multiplier pattern applied to the base head.
    pub head_pattern: Option<PatternId>,
}

/// Node variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    Junction(Junction),
    Tank(Tank),
    Reservoir(Reservoir),
}

/// A node in the network arena.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    pub kind: NodeKind,
}

impl Node {
    /// Elevation used for pressure reporting (reservoirs report zero pressure).
    pub fn elevation(&self) -> Real {
        match &self.kind {
            NodeKind::Junction(j) => j.elevation,
            NodeKind::Tank(t) => t.elevation,
            NodeKind::Reservoir(r) => r.base_head,
        }
    }

    /// Fixed-head nodes act as boundary conditions within a single solve.
    pub fn is_fixed_head(&self) -> bool {
        matches!(self.kind, NodeKind::Tank(_) | NodeKind::Reservoir(_))
    }

    pub fn as_junction(&self) -> Option<&Junction> {
        match &self.kind {
            NodeKind::Junction(j) => Some(j),
            _ => None,
        }
    }

    pub fn as_tank(&self) -> Option<&Tank> {
        match &self.kind {
            NodeKind::Tank(t) => Some(t),
            _ => None,
        }
    }
}
