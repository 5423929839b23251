//! Mutable hydraulic state carried between solves.

use crate::link::LinkStatus;
use crate::network::Network;
use crate::node::NodeKind;
use aq_core::{LinkId, NodeId, Real};
use serde::{Deserialize, Serialize};

/// The full time-varying state of a network during simulation.
///
/// All vectors are parallel to the network's node/link arenas. The engine
/// mutates this between solves; `checkpoint`/`rollback` let a speculative
/// status re-solve be abandoned without copying the network itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkState {
    /// Simulated time (s) this state is valid at.
    pub sim_time: Real,

    /// Hydraulic head per node (m).
    pub head: Vec<Real>,
    /// Actual delivered demand per node (m^3/s); zero for non-junctions.
    pub demand: Vec<Real>,
    /// Pattern-scaled requested demand per node (m^3/s).
    pub expected_demand: Vec<Real>,
    /// Water level above the tank bottom (m); zero for non-tanks.
    pub tank_level: Vec<Real>,

    /// Signed flow per link (m^3/s), positive start -> end.
    pub flow: Vec<Real>,
    /// Operating status per link.
    pub status: Vec<LinkStatus>,
    /// Active setting per link (valve setpoint or pump speed).
    pub setting: Vec<Real>,

    #[serde(skip)]
    saved: Option<Box<Checkpoint>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Checkpoint {
    sim_time: Real,
    head: Vec<Real>,
    demand: Vec<Real>,
    expected_demand: Vec<Real>,
    tank_level: Vec<Real>,
    flow: Vec<Real>,
    status: Vec<LinkStatus>,
    setting: Vec<Real>,
}

impl NetworkState {
    /// Initial state at t = 0: heads at elevation (or fixed head), zero flows,
    /// statuses and settings as declared on the links.
    pub fn new(network: &Network) -> Self {
        let n_nodes = network.nodes().len();
        let n_links = network.links().len();

        let mut head = vec![0.0; n_nodes];
        let mut tank_level = vec![0.0; n_nodes];
        for (i, node) in network.nodes().iter().enumerate() {
            head[i] = match &node.kind {
                NodeKind::Junction(j) => j.elevation,
                NodeKind::Reservoir(r) => r.base_head,
                NodeKind::Tank(t) => {
                    tank_level[i] = t.init_level;
                    t.elevation + t.init_level
                }
            };
        }

        let status = network.links().iter().map(|l| l.initial_status).collect();
        let setting = network.links().iter().map(|l| l.initial_setting).collect();

        Self {
            sim_time: 0.0,
            head,
            demand: vec![0.0; n_nodes],
            expected_demand: vec![0.0; n_nodes],
            tank_level,
            flow: vec![0.0; n_links],
            status,
            setting,
            saved: None,
        }
    }

    pub fn head_at(&self, node: NodeId) -> Real {
        self.head[node.idx()]
    }

    pub fn flow_in(&self, link: LinkId) -> Real {
        self.flow[link.idx()]
    }

    pub fn status_of(&self, link: LinkId) -> LinkStatus {
        self.status[link.idx()]
    }

    /// Save a copy of the current values for a later `rollback`.
    pub fn checkpoint(&mut self) {
        self.saved = Some(Box::new(Checkpoint {
            sim_time: self.sim_time,
            head: self.head.clone(),
            demand: self.demand.clone(),
            expected_demand: self.expected_demand.clone(),
            tank_level: self.tank_level.clone(),
            flow: self.flow.clone(),
            status: self.status.clone(),
            setting: self.setting.clone(),
        }));
    }

    /// Restore the last checkpoint, if any, and clear it.
    pub fn rollback(&mut self) {
        if let Some(saved) = self.saved.take() {
            self.sim_time = saved.sim_time;
            self.head = saved.head;
            self.demand = saved.demand;
            self.expected_demand = saved.expected_demand;
            self.tank_level = saved.tank_level;
            self.flow = saved.flow;
            self.status = saved.status;
            self.setting = saved.setting;
        }
    }

    /// Drop the last checkpoint, keeping the current values.
    pub fn commit(&mut self) {
        self.saved = None;
    }

    /// Net inflow (m^3/s) into a node at the current flows.
    pub fn net_inflow(&self, network: &Network, node: NodeId) -> Real {
        network
            .incident(node)
            .iter()
            .map(|inc| {
                let q = self.flow[inc.link.idx()];
                if inc.outgoing {
                    -q
                } else {
                    q
                }
            })
            .sum()
    }
}
