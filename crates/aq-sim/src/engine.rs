//! Extended-period simulation engine.
//!
//! The engine owns the time loop: it solves the network at an instant,
//! records results, applies control rules, picks the next interval length
//! (shortened by pattern steps, report times, scheduled rules and tank
//! limits), integrates tank levels across it, and repeats. Hydraulics
//! within an interval come from aq-solver; the engine treats tank levels
//! as boundary conditions that only move between solves.

use crate::error::{SimError, SimResult};
use crate::options::SimOptions;
use crate::snapshot::SimulationState;
use aq_controls::{Control, ControlAction, ControlCondition, ControlSet, Relation};
use aq_core::Real;
use aq_network::{
    LinkKind, LinkStatus, Network, NetworkState, NodeKind, ValveKind,
};
use aq_results::{BoundaryEvent, BoundaryEventKind, SimulationResults, TimeseriesRecord};
use aq_solver::{solve_hydraulics, HydraulicProblem};
use nalgebra::DVector;
use tracing::{info, warn};

/// Slack when comparing simulated times (s).
const TIME_EPS: Real = 1e-6;
/// Flow threshold for reversal detection (m^3/s).
const FLOW_EPS: Real = 1e-8;
/// Head threshold for reopening decisions (m).
const HEAD_EPS: Real = 1e-6;
/// Smallest interval the convergence-failure fallback will try (s).
const MIN_TIMESTEP: Real = 1e-3;
/// Halving attempts before a failed solve is fatal.
const MAX_DT_RETRIES: usize = 10;
/// Rule-driven re-solve passes allowed at a single instant.
const MAX_RULE_PASSES: usize = 10;

/// Extended-period simulator for one network.
pub struct Simulator<'a> {
    network: &'a Network,
    options: SimOptions,
    control_defs: Vec<Control>,
    controls: ControlSet,
    state: NetworkState,
    warm: Option<DVector<f64>>,
    results: SimulationResults,
    next_report: Real,
    last_dt: Option<Real>,
    /// Links closed by the automatic status machine (not by rule or input);
    /// only these may reopen automatically.
    auto_closed: Vec<bool>,
}

impl<'a> Simulator<'a> {
    pub fn new(
        network: &'a Network,
        options: SimOptions,
        controls: Vec<Control>,
    ) -> SimResult<Self> {
        options.validate()?;
        let control_set = ControlSet::new(network, controls.clone(), options.start_clocktime)?;
        let node_names = network.nodes().iter().map(|n| n.name.clone()).collect();
        let link_names = network.links().iter().map(|l| l.name.clone()).collect();
        Ok(Self {
            network,
            options,
            control_defs: controls,
            controls: control_set,
            state: NetworkState::new(network),
            warm: None,
            results: SimulationResults::new(node_names, link_names),
            next_report: 0.0,
            last_dt: None,
            auto_closed: vec![false; network.links().len()],
        })
    }

    pub fn options(&self) -> &SimOptions {
        &self.options
    }

    pub fn state(&self) -> &NetworkState {
        &self.state
    }

    pub fn results(&self) -> &SimulationResults {
        &self.results
    }

    pub fn into_results(self) -> SimulationResults {
        self.results
    }

    /// Run from the current time to the configured duration.
    pub fn run(&mut self) -> SimResult<()> {
        self.run_until(self.options.duration)
    }

    /// Run from the current time until the clock reaches `stop` (clamped to
    /// the duration), leaving the simulator resumable from there.
    ///
    /// The step grid never depends on `stop`: a segment runs through the
    /// first committed instant at or beyond it, so a paused-and-resumed run
    /// integrates exactly the intervals an uninterrupted one would.
    pub fn run_until(&mut self, stop: Real) -> SimResult<()> {
        let stop = stop.min(self.options.duration);
        info!(stop, "starting simulation segment");
        let mut rule_passes = 0;
        loop {
            self.solve_with_retry()?;
            // The retry path may have accepted a shorter interval; the
            // solved instant is wherever the clock actually is.
            let t = self.state.sim_time;
            self.record_if_due(t)?;
            if t + TIME_EPS >= stop {
                break;
            }
            if self.apply_due_controls(t) {
                // A rule changed the network: re-solve this instant so tank
                // integration sees post-rule flows.
                rule_passes += 1;
                if rule_passes > MAX_RULE_PASSES {
                    return Err(SimError::ControlsUnsettled { time: t });
                }
                continue;
            }
            rule_passes = 0;
            let dt = self.choose_dt(t);
            self.advance_tanks(dt);
        }
        Ok(())
    }

    /// Return the simulator to its pre-run state so the same scenario can
    /// be run again from scratch.
    pub fn reset_initial_values(&mut self) {
        self.state = NetworkState::new(self.network);
        self.controls.reset();
        self.warm = None;
        let node_names = self.results.node_names.clone();
        let link_names = self.results.link_names.clone();
        self.results = SimulationResults::new(node_names, link_names);
        self.next_report = 0.0;
        self.last_dt = None;
        self.auto_closed.iter_mut().for_each(|f| *f = false);
    }

    /// Capture everything needed to resume this run elsewhere.
    pub fn snapshot(&self) -> SimulationState {
        SimulationState {
            options: self.options.clone(),
            controls: self.control_defs.clone(),
            control_state: self.controls.snapshot(),
            network_state: self.state.clone(),
            warm_start: self.warm.as_ref().map(|v| v.iter().copied().collect()),
            next_report: self.next_report,
            last_dt: self.last_dt,
            auto_closed: self.auto_closed.clone(),
            results: self.results.clone(),
        }
    }

    /// Rebuild a simulator from a snapshot taken against the same network.
    pub fn resume(network: &'a Network, snapshot: SimulationState) -> SimResult<Self> {
        if snapshot.network_state.head.len() != network.nodes().len()
            || snapshot.network_state.flow.len() != network.links().len()
        {
            return Err(SimError::SnapshotMismatch {
                what: "node/link counts",
            });
        }
        let mut control_set = ControlSet::new(
            network,
            snapshot.controls.clone(),
            snapshot.options.start_clocktime,
        )?;
        control_set.restore(snapshot.control_state);
        Ok(Self {
            network,
            options: snapshot.options,
            control_defs: snapshot.controls,
            controls: control_set,
            state: snapshot.network_state,
            warm: snapshot.warm_start.map(DVector::from_vec),
            results: snapshot.results,
            next_report: snapshot.next_report,
            last_dt: snapshot.last_dt,
            auto_closed: snapshot.auto_closed,
        })
    }

    /// Solve the current instant, halving the last tank interval and
    /// retrying when the solve does not converge.
    fn solve_with_retry(&mut self) -> SimResult<()> {
        let mut attempts = 0;
        loop {
            match self.solve_current() {
                Ok(()) => return Ok(()),
                Err(err @ SimError::SolveFailed { .. }) => {
                    let Some(dt) = self.last_dt else {
                        return Err(err);
                    };
                    let halved = dt / 2.0;
                    if attempts >= MAX_DT_RETRIES || halved < MIN_TIMESTEP {
                        return Err(err);
                    }
                    warn!(
                        time = self.state.sim_time,
                        retry_dt = halved,
                        "solve failed, retrying with a shorter interval"
                    );
                    self.state.rollback();
                    self.advance_tanks(halved);
                    attempts += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// One hydraulic solve at the current time, with the automatic status
    /// machine: re-solve after each batch of transitions, at most one
    /// transition per link per accepted instant.
    fn solve_current(&mut self) -> SimResult<()> {
        let t = self.state.sim_time;

        self.update_expected_demands(t);

        let mut problem = HydraulicProblem::new(self.network);
        problem.demand_model = self.options.demand_model;
        problem.statuses = self.state.status.clone();
        problem.settings = self.state.setting.clone();
        problem.expected_demands = self.state.expected_demand.clone();
        for (i, node) in self.network.nodes().iter().enumerate() {
            problem.fixed_heads[i] = match &node.kind {
                NodeKind::Junction(_) => None,
                NodeKind::Tank(tank) => Some(tank.elevation + self.state.tank_level[i]),
                NodeKind::Reservoir(res) => {
                    Some(res.base_head * self.network.pattern_value(res.head_pattern, t))
                }
            };
        }

        let config = self.options.newton_config();
        let mut transitioned = vec![false; self.network.links().len()];

        loop {
            let sol = solve_hydraulics(&problem, &config, self.warm.as_ref())
                .map_err(|source| SimError::SolveFailed { time: t, source })?;
            self.warm = Some(sol.to_guess_vector());

            let changes = self.detect_transitions(&problem, &sol.heads, &sol.flows, &transitioned);
            if changes.is_empty() {
                self.state.head = sol.heads;
                self.state.flow = sol.flows;
                self.state.demand = sol.demands;
                self.state.status = problem.statuses.clone();
                return Ok(());
            }
            for (j, status) in changes {
                transitioned[j] = true;
                problem.statuses[j] = status;
                self.auto_closed[j] = status == LinkStatus::Closed;
                self.record_status_event(t, j, status);
            }
        }
    }

    /// Pattern-scaled expected demand per node at time t.
    fn update_expected_demands(&mut self, t: Real) {
        for (i, node) in self.network.nodes().iter().enumerate() {
            self.state.expected_demand[i] = match node.as_junction() {
                Some(junction) => junction
                    .demands
                    .iter()
                    .map(|d| d.base * self.network.pattern_value(d.pattern, t))
                    .sum(),
                None => 0.0,
            };
        }
    }

    /// Automatic transitions a solved state demands: check valve closure
    /// and reopening, pump shutoff on reversal, PRV mode changes.
    fn detect_transitions(
        &self,
        problem: &HydraulicProblem<'_>,
        heads: &[Real],
        flows: &[Real],
        transitioned: &[bool],
    ) -> Vec<(usize, LinkStatus)> {
        let mut changes = Vec::new();
        for (j, link) in self.network.links().iter().enumerate() {
            if transitioned[j] {
                continue;
            }
            let status = problem.statuses[j];
            let hs = heads[link.start.idx()];
            let he = heads[link.end.idx()];
            let q = flows[j];

            let next = match &link.kind {
                LinkKind::Pipe(pipe) if pipe.check_valve => match status {
                    LinkStatus::Open if q < -FLOW_EPS => Some(LinkStatus::Closed),
                    LinkStatus::Closed if hs - he > HEAD_EPS => Some(LinkStatus::Open),
                    _ => None,
                },
                LinkKind::Pump(pump) => {
                    let speed = problem.settings[j].max(1e-6);
                    match status {
                        LinkStatus::Open if q < -FLOW_EPS => Some(LinkStatus::Closed),
                        LinkStatus::Closed
                            if self.auto_closed[j]
                                && hs + speed * speed * pump.curve.shutoff_head - he
                                    > HEAD_EPS =>
                        {
                            Some(LinkStatus::Open)
                        }
                        _ => None,
                    }
                }
                LinkKind::Valve(valve) if valve.kind == ValveKind::Prv => {
                    let target =
                        self.network.nodes()[link.end.idx()].elevation() + problem.settings[j];
                    match status {
                        // Cannot hold the setpoint: upstream is too low.
                        LinkStatus::Active if hs < target - HEAD_EPS => Some(LinkStatus::Open),
                        // Fully open would overshoot the setpoint again.
                        LinkStatus::Open if he > target + HEAD_EPS => Some(LinkStatus::Active),
                        _ => None,
                    }
                }
                _ => None,
            };
            if let Some(next) = next {
                changes.push((j, next));
            }
        }
        changes
    }

    fn record_if_due(&mut self, t: Real) -> SimResult<()> {
        if t + TIME_EPS < self.next_report {
            return Ok(());
        }
        let record = self.build_record(t);
        self.results.append_step(record)?;
        while self.next_report <= t + TIME_EPS {
            self.next_report += self.options.report_timestep;
        }
        Ok(())
    }

    fn build_record(&self, t: Real) -> TimeseriesRecord {
        let nodes = self.network.nodes();
        let pressure = nodes
            .iter()
            .enumerate()
            .map(|(i, node)| match &node.kind {
                NodeKind::Reservoir(_) => 0.0,
                _ => self.state.head[i] - node.elevation(),
            })
            .collect();
        let velocity = self
            .network
            .links()
            .iter()
            .enumerate()
            .map(|(j, link)| match link.flow_area() {
                Some(area) => self.state.flow[j].abs() / area,
                None => 0.0,
            })
            .collect();
        TimeseriesRecord {
            time_s: t,
            head: self.state.head.clone(),
            pressure,
            demand: self.state.demand.clone(),
            expected_demand: self.state.expected_demand.clone(),
            flowrate: self.state.flow.clone(),
            velocity,
            status: self.state.status.iter().map(|s| s.code()).collect(),
        }
    }

    /// Fire rules due at t against the solved state. Later actions win on
    /// the same link. Returns whether anything actually changed, in which
    /// case the caller re-solves the instant.
    fn apply_due_controls(&mut self, t: Real) -> bool {
        let mut changed = false;
        let due = self.controls.due_actions(t, &self.state);
        for (i, action) in due {
            let name = self.controls.controls()[i].name.clone();
            self.results.record_event(BoundaryEvent {
                time: t,
                kind: BoundaryEventKind::ControlFired { control: name },
            });
            match action {
                ControlAction::SetStatus { link, status } => {
                    let j = link.idx();
                    if self.state.status[j] != status {
                        self.state.status[j] = status;
                        self.auto_closed[j] = false;
                        self.record_status_event(t, j, status);
                        changed = true;
                    }
                }
                ControlAction::SetSetting { link, setting } => {
                    let j = link.idx();
                    if self.state.setting[j] != setting {
                        self.state.setting[j] = setting;
                        changed = true;
                    }
                }
            }
        }
        changed
    }

    /// Longest interval from t that does not step over a hydraulic or
    /// report boundary, a pattern step, a scheduled rule, a tank limit or
    /// a rule's tank-level threshold.
    fn choose_dt(&self, t: Real) -> Real {
        let h = self.options.hydraulic_timestep;
        let next_hydraulic = (((t + TIME_EPS) / h).floor() + 1.0) * h;

        let mut t_next = next_hydraulic
            .min(self.next_report)
            .min(self.options.duration);
        if let Some(boundary) = self.network.next_pattern_boundary(t + TIME_EPS) {
            t_next = t_next.min(boundary);
        }
        if let Some(scheduled) = self.controls.next_scheduled_after(t) {
            t_next = t_next.min(scheduled);
        }

        // Truncate at the first tank level crossing within the interval.
        for (i, node) in self.network.nodes().iter().enumerate() {
            let Some(tank) = node.as_tank() else { continue };
            let rate = self.state.net_inflow(self.network, node.id) / tank.area();
            if rate.abs() < 1e-12 {
                continue;
            }
            let level = self.state.tank_level[i];

            let mut thresholds = vec![tank.min_level, tank.max_level];
            for control in self.controls.controls() {
                if let ControlCondition::TankLevel {
                    tank: tank_id,
                    level: threshold,
                    relation,
                } = control.condition
                {
                    if tank_id.idx() == i {
                        // Only crossings in the firing direction matter.
                        let toward = match relation {
                            Relation::Above => rate > 0.0 && level < threshold,
                            Relation::Below => rate < 0.0 && level > threshold,
                        };
                        if toward {
                            thresholds.push(threshold);
                        }
                    }
                }
            }

            for threshold in thresholds {
                let dt_hit = (threshold - level) / rate;
                if dt_hit > TIME_EPS && t + dt_hit < t_next - TIME_EPS {
                    t_next = t + dt_hit;
                }
            }
        }

        (t_next - t).max(MIN_TIMESTEP)
    }

    /// Integrate tank levels across the interval and advance the clock.
    /// Checkpoints the state first so a failed solve at the new time can
    /// rewind and try a shorter interval.
    fn advance_tanks(&mut self, dt: Real) {
        self.state.checkpoint();
        let t_new = self.state.sim_time + dt;

        for (i, node) in self.network.nodes().iter().enumerate() {
            let Some(tank) = node.as_tank() else { continue };
            let rate = self.state.net_inflow(self.network, node.id) / tank.area();
            let before = self.state.tank_level[i];
            let mut level = before + rate * dt;

            if level >= tank.max_level - 1e-9 {
                if before < tank.max_level - 1e-9 {
                    self.results.record_event(BoundaryEvent {
                        time: t_new,
                        kind: BoundaryEventKind::TankFull {
                            tank: node.name.clone(),
                        },
                    });
                }
                level = level.min(tank.max_level);
            } else if level <= tank.min_level + 1e-9 {
                if before > tank.min_level + 1e-9 {
                    self.results.record_event(BoundaryEvent {
                        time: t_new,
                        kind: BoundaryEventKind::TankEmpty {
                            tank: node.name.clone(),
                        },
                    });
                }
                level = level.max(tank.min_level);
            }

            self.state.tank_level[i] = level;
            self.state.head[i] = tank.elevation + level;
        }

        self.state.sim_time = t_new;
        self.last_dt = Some(dt);
    }

    fn record_status_event(&mut self, t: Real, link_idx: usize, status: LinkStatus) {
        self.results.record_event(BoundaryEvent {
            time: t,
            kind: BoundaryEventKind::StatusChanged {
                link: self.network.links()[link_idx].name.clone(),
                status: status.code(),
            },
        });
    }
}
