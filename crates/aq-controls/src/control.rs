//! Control rule definitions.

use crate::error::{ControlError, ControlResult};
use aq_core::{LinkId, NodeId, Real};
use aq_network::{LinkStatus, Network, NodeKind};
use serde::{Deserialize, Serialize};

/// Seconds in a day, for clock-time recurrence.
pub const SECONDS_PER_DAY: Real = 86_400.0;

/// Comparison direction for level conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Relation {
    Above,
    Below,
}

/// When a rule fires.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ControlCondition {
    /// At a single simulated time (s from simulation start). One-shot.
    SimTime { at: Real },
    /// At a clock time (s past midnight), every day.
    TimeOfDay { clock: Real },
    /// When a tank's level crosses a threshold in the given direction.
    TankLevel {
        tank: NodeId,
        relation: Relation,
        level: Real,
    },
    /// When a link's status becomes the given value.
    LinkStatus { link: LinkId, status: LinkStatus },
}

impl ControlCondition {
    /// Time-based conditions are scheduled ahead of time; condition-based
    /// ones are observed from solved state.
    pub fn is_time_based(&self) -> bool {
        matches!(
            self,
            ControlCondition::SimTime { .. } | ControlCondition::TimeOfDay { .. }
        )
    }
}

/// What a rule does when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ControlAction {
    SetStatus { link: LinkId, status: LinkStatus },
    SetSetting { link: LinkId, setting: Real },
}

impl ControlAction {
    pub fn link(&self) -> LinkId {
        match self {
            ControlAction::SetStatus { link, .. } => *link,
            ControlAction::SetSetting { link, .. } => *link,
        }
    }
}

/// A named rule: condition plus action.
///
/// When several rules fire at the same instant, time-based rules apply
/// before condition-based ones; within a class, declaration order decides,
/// and the last action applied to a link wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Control {
    pub name: String,
    pub condition: ControlCondition,
    pub action: ControlAction,
}

impl Control {
    /// Check the rule against a network's entities and parameter ranges.
    pub fn validate(&self, network: &Network) -> ControlResult<()> {
        match self.condition {
            ControlCondition::SimTime { at } => {
                if at < 0.0 || !at.is_finite() {
                    return Err(ControlError::InvalidRule {
                        what: "SimTime must be finite and non-negative",
                    });
                }
            }
            ControlCondition::TimeOfDay { clock } => {
                if !(0.0..SECONDS_PER_DAY).contains(&clock) {
                    return Err(ControlError::InvalidRule {
                        what: "TimeOfDay must lie within one day",
                    });
                }
            }
            ControlCondition::TankLevel { tank, .. } => {
                let is_tank = network
                    .node(tank)
                    .map(|n| matches!(n.kind, NodeKind::Tank(_)))
                    .unwrap_or(false);
                if !is_tank {
                    return Err(ControlError::UnknownReference {
                        control: self.name.clone(),
                        what: "tank",
                    });
                }
            }
            ControlCondition::LinkStatus { link, .. } => {
                if network.link(link).is_none() {
                    return Err(ControlError::UnknownReference {
                        control: self.name.clone(),
                        what: "link",
                    });
                }
            }
        }
        if network.link(self.action.link()).is_none() {
            return Err(ControlError::UnknownReference {
                control: self.name.clone(),
                what: "action link",
            });
        }
        Ok(())
    }
}
