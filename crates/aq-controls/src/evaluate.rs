//! Rule scheduling and evaluation.

use crate::control::{
    Control, ControlAction, ControlCondition, Relation, SECONDS_PER_DAY,
};
use crate::error::ControlResult;
use aq_core::Real;
use aq_network::{Network, NetworkState};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Slack when comparing simulated times (s).
const TIME_EPS: Real = 1e-6;

/// A validated set of rules with firing bookkeeping.
///
/// Time-based rules are scheduled: [`ControlSet::next_scheduled_after`] tells
/// the engine where to stop. Condition-based rules are edge-triggered from
/// solved state: they fire when their condition turns true, not while it
/// stays true.
#[derive(Debug, Clone)]
pub struct ControlSet {
    controls: Vec<Control>,
    start_clocktime: Real,
    fired: Vec<bool>,
    was_true: Vec<bool>,
}

/// Serializable firing bookkeeping, for simulation snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlSetState {
    pub fired: Vec<bool>,
    pub was_true: Vec<bool>,
}

impl ControlSet {
    /// Validate every rule against the network and build the set.
    ///
    /// `start_clocktime` is the wall-clock time (s past midnight) at
    /// simulated t = 0, used by `TimeOfDay` recurrence.
    pub fn new(
        network: &Network,
        controls: Vec<Control>,
        start_clocktime: Real,
    ) -> ControlResult<Self> {
        for control in &controls {
            control.validate(network)?;
        }
        let n = controls.len();
        Ok(Self {
            controls,
            start_clocktime,
            fired: vec![false; n],
            was_true: vec![false; n],
        })
    }

    pub fn controls(&self) -> &[Control] {
        &self.controls
    }

    /// Forget all firing history (for a fresh run of the same rules).
    pub fn reset(&mut self) {
        self.fired.iter_mut().for_each(|f| *f = false);
        self.was_true.iter_mut().for_each(|f| *f = false);
    }

    pub fn snapshot(&self) -> ControlSetState {
        ControlSetState {
            fired: self.fired.clone(),
            was_true: self.was_true.clone(),
        }
    }

    pub fn restore(&mut self, state: ControlSetState) {
        self.fired = state.fired;
        self.was_true = state.was_true;
    }

    /// Earliest time-based activation strictly after t, if any.
    pub fn next_scheduled_after(&self, t: Real) -> Option<Real> {
        let mut earliest: Option<Real> = None;
        for (i, control) in self.controls.iter().enumerate() {
            let candidate = match control.condition {
                ControlCondition::SimTime { at } => {
                    if self.fired[i] || at <= t + TIME_EPS {
                        continue;
                    }
                    at
                }
                ControlCondition::TimeOfDay { clock } => {
                    let current = (self.start_clocktime + t).rem_euclid(SECONDS_PER_DAY);
                    let mut delta = (clock - current).rem_euclid(SECONDS_PER_DAY);
                    if delta <= TIME_EPS {
                        delta += SECONDS_PER_DAY;
                    }
                    t + delta
                }
                _ => continue,
            };
            earliest = Some(earliest.map_or(candidate, |e: Real| e.min(candidate)));
        }
        earliest
    }

    /// Rules due at time t against the given solved state, in application
    /// order: time-based rules first, then condition-based, each in
    /// declaration order. Each entry pairs the rule's index into
    /// [`ControlSet::controls`] with its action. Updates firing bookkeeping,
    /// so a repeated call at the same instant returns nothing new.
    pub fn due_actions(&mut self, t: Real, state: &NetworkState) -> Vec<(usize, ControlAction)> {
        let mut timed = Vec::new();
        let mut conditional = Vec::new();

        for (i, control) in self.controls.iter().enumerate() {
            match control.condition {
                ControlCondition::SimTime { at } => {
                    if !self.fired[i] && t >= at - TIME_EPS {
                        self.fired[i] = true;
                        timed.push((i, control.action));
                    }
                }
                ControlCondition::TimeOfDay { clock } => {
                    let current = (self.start_clocktime + t).rem_euclid(SECONDS_PER_DAY);
                    let offset = (current - clock).rem_euclid(SECONDS_PER_DAY);
                    let now_true = offset < TIME_EPS || offset > SECONDS_PER_DAY - TIME_EPS;
                    if now_true && !self.was_true[i] {
                        timed.push((i, control.action));
                    }
                    self.was_true[i] = now_true;
                }
                ControlCondition::TankLevel {
                    tank,
                    relation,
                    level,
                } => {
                    let current = state.tank_level[tank.idx()];
                    let now_true = match relation {
                        Relation::Above => current >= level - 1e-9,
                        Relation::Below => current <= level + 1e-9,
                    };
                    if now_true && !self.was_true[i] {
                        conditional.push((i, control.action));
                    }
                    self.was_true[i] = now_true;
                }
                ControlCondition::LinkStatus { link, status } => {
                    let now_true = state.status[link.idx()] == status;
                    if now_true && !self.was_true[i] {
                        conditional.push((i, control.action));
                    }
                    self.was_true[i] = now_true;
                }
            }
        }

        let due: Vec<(usize, ControlAction)> = timed.into_iter().chain(conditional).collect();
        for &(i, _) in &due {
            debug!(control = %self.controls[i].name, time = t, "control fired");
        }
        due
    }
}
