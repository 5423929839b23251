//! Assembly of the hydraulic equation system.
//!
//! Unknown vector layout: `x = [heads (one per node) | flows (one per link)]`.
//! Rows follow the same order: one balance or head-identity equation per
//! node, then one energy or status equation per link. The system is square
//! and its Jacobian is assembled analytically.

use crate::demand::{pdd_fraction, DemandModel};
use crate::error::{SolverError, SolverResult};
use crate::headloss::{minor_loss_k, pipe_headloss, pump_head_gain, smoothed_power_loss};
use aq_network::{Link, LinkKind, LinkStatus, Network, NodeKind, ValveKind};
use aq_core::Real;
use nalgebra::{DMatrix, DVector};

/// Dimensionless K factor used for a fully open regulating valve.
const OPEN_VALVE_K: Real = 0.1;

/// One hydraulic solve's inputs: the network plus everything that varies
/// between solves (statuses, settings, boundary heads, demands).
///
/// The engine owns the time loop; it fills these fields for the current
/// instant and hands the problem to [`crate::solve::solve_hydraulics`].
#[derive(Debug, Clone)]
pub struct HydraulicProblem<'a> {
    network: &'a Network,
    /// Operating status per link.
    pub statuses: Vec<LinkStatus>,
    /// Active setting per link (valve setpoint or pump speed).
    pub settings: Vec<Real>,
    /// Boundary head per node; `Some` for tanks and reservoirs.
    pub fixed_heads: Vec<Option<Real>>,
    /// Pattern-scaled expected demand per node (m^3/s).
    pub expected_demands: Vec<Real>,
    pub demand_model: DemandModel,
}

impl<'a> HydraulicProblem<'a> {
    /// Problem with initial statuses/settings, base boundary heads and zero
    /// demands. The engine overwrites the time-varying fields each step.
    pub fn new(network: &'a Network) -> Self {
        let fixed_heads = network
            .nodes()
            .iter()
            .map(|node| match &node.kind {
                NodeKind::Junction(_) => None,
                NodeKind::Tank(t) => Some(t.elevation + t.init_level),
                NodeKind::Reservoir(r) => Some(r.base_head),
            })
            .collect();
        Self {
            network,
            statuses: network.links().iter().map(|l| l.initial_status).collect(),
            settings: network.links().iter().map(|l| l.initial_setting).collect(),
            fixed_heads,
            expected_demands: vec![0.0; network.nodes().len()],
            demand_model: DemandModel::Demand,
        }
    }

    pub fn network(&self) -> &Network {
        self.network
    }

    pub fn n_nodes(&self) -> usize {
        self.network.nodes().len()
    }

    pub fn n_links(&self) -> usize {
        self.network.links().len()
    }

    /// System dimension: one head per node plus one flow per link.
    pub fn dim(&self) -> usize {
        self.n_nodes() + self.n_links()
    }

    /// Cold-start guess: boundary heads where fixed, elevation elsewhere;
    /// a nominal 0.3 m/s of flow through anything with a cross-section.
    pub fn initial_guess(&self) -> DVector<f64> {
        let n = self.n_nodes();
        let mut x = DVector::zeros(self.dim());
        for (i, node) in self.network.nodes().iter().enumerate() {
            x[i] = self.fixed_heads[i].unwrap_or_else(|| node.elevation());
        }
        for (j, link) in self.network.links().iter().enumerate() {
            x[n + j] = match link.flow_area() {
                Some(area) => 0.3 * area,
                None => 0.01, // pump
            };
        }
        x
    }

    /// Delivered demand at a node and its derivative with respect to head.
    pub fn actual_demand(&self, node_idx: usize, head: Real) -> (Real, Real) {
        let expected = self.expected_demands[node_idx];
        match self.demand_model {
            DemandModel::Demand => (expected, 0.0),
            DemandModel::PressureDriven {
                minimum_pressure,
                required_pressure,
            } => {
                // Injections (negative demand) are not pressure-limited.
                if expected <= 0.0 {
                    return (expected, 0.0);
                }
                let node = &self.network.nodes()[node_idx];
                let pressure = head - node.elevation();
                let (frac, dfrac) = pdd_fraction(pressure, minimum_pressure, required_pressure);
                (expected * frac, expected * dfrac)
            }
        }
    }

    /// Residual r(x) for the full system.
    pub fn residual(&self, x: &DVector<f64>) -> SolverResult<DVector<f64>> {
        let n = self.n_nodes();
        let mut r = DVector::zeros(self.dim());

        for (i, node) in self.network.nodes().iter().enumerate() {
            r[i] = match self.fixed_heads[i] {
                Some(h_fix) => x[i] - h_fix,
                None => {
                    let mut balance = 0.0;
                    for inc in self.network.incident(node.id) {
                        let q = x[n + inc.link.idx()];
                        balance += if inc.outgoing { -q } else { q };
                    }
                    let (demand, _) = self.actual_demand(i, x[i]);
                    balance - demand
                }
            };
        }

        for (j, link) in self.network.links().iter().enumerate() {
            let (res, _, _, _) = self.link_equation(link, j, x);
            r[n + j] = res;
        }

        if r.iter().any(|v| !v.is_finite()) {
            return Err(SolverError::NonFinite { what: "residual" });
        }
        Ok(r)
    }

    /// Analytic Jacobian dr/dx, with a scan for decoupled equations.
    pub fn jacobian(&self, x: &DVector<f64>) -> SolverResult<DMatrix<f64>> {
        let n = self.n_nodes();
        let mut jac = DMatrix::zeros(self.dim(), self.dim());

        for (i, node) in self.network.nodes().iter().enumerate() {
            match self.fixed_heads[i] {
                Some(_) => jac[(i, i)] = 1.0,
                None => {
                    for inc in self.network.incident(node.id) {
                        jac[(i, n + inc.link.idx())] = if inc.outgoing { -1.0 } else { 1.0 };
                    }
                    let (_, ddemand) = self.actual_demand(i, x[i]);
                    jac[(i, i)] = -ddemand;
                }
            }
        }

        for (j, link) in self.network.links().iter().enumerate() {
            let (_, d_hs, d_he, d_q) = self.link_equation(link, j, x);
            let row = n + j;
            jac[(row, link.start.idx())] += d_hs;
            jac[(row, link.end.idx())] += d_he;
            jac[(row, n + j)] += d_q;
        }

        self.check_rows(&jac)?;
        Ok(jac)
    }

    /// Energy/status equation for one link: residual and partials with
    /// respect to (start head, end head, flow).
    fn link_equation(&self, link: &Link, j: usize, x: &DVector<f64>) -> (Real, Real, Real, Real) {
        let n = self.n_nodes();
        let hs = x[link.start.idx()];
        let he = x[link.end.idx()];
        let q = x[n + j];
        let status = self.statuses[j];

        if status == LinkStatus::Closed {
            return (q, 0.0, 0.0, 1.0);
        }

        match &link.kind {
            LinkKind::Pipe(pipe) => {
                let (hl, d) = pipe_headloss(pipe, q);
                (hs - he - hl, 1.0, -1.0, -d)
            }
            LinkKind::Pump(pump) => {
                // Setting carries the live speed; falls back to the declared one.
                let speed = self.settings[j].max(1e-6);
                let (gain, dgain) = pump_head_gain(&pump.curve, speed, q);
                (hs + gain - he, 1.0, -1.0, dgain)
            }
            LinkKind::Valve(valve) => {
                let setting = self.settings[j];
                match (valve.kind, status) {
                    (ValveKind::Prv, LinkStatus::Active) => {
                        let end = &self.network.nodes()[link.end.idx()];
                        (he - (end.elevation() + setting), 0.0, 1.0, 0.0)
                    }
                    (ValveKind::Fcv, LinkStatus::Active) => (q - setting, 0.0, 0.0, 1.0),
                    (ValveKind::Tcv, LinkStatus::Active) => {
                        let k = minor_loss_k(setting.max(0.0), valve.diameter);
                        let (hl, d) = smoothed_power_loss(k, q, 2.0);
                        (hs - he - hl, 1.0, -1.0, -d)
                    }
                    // Open (or any non-active) regulating valve: a short
                    // fitting with a small fixed loss.
                    _ => {
                        let k = minor_loss_k(OPEN_VALVE_K, valve.diameter);
                        let (hl, d) = smoothed_power_loss(k, q, 2.0);
                        (hs - he - hl, 1.0, -1.0, -d)
                    }
                }
            }
        }
    }

    /// Reject systems where an equation lost all coupling (e.g. a junction
    /// whose incident links are all closed under demand-driven analysis).
    fn check_rows(&self, jac: &DMatrix<f64>) -> SolverResult<()> {
        let n = self.n_nodes();
        for row in 0..jac.nrows() {
            let coupled = (0..jac.ncols()).any(|col| jac[(row, col)].abs() > 1e-14);
            if !coupled {
                let entity = if row < n {
                    format!("node {}", self.network.nodes()[row].name)
                } else {
                    format!("link {}", self.network.links()[row - n].name)
                };
                return Err(SolverError::Degenerate { entity });
            }
        }
        Ok(())
    }
}
