//! Result tables and run metadata.

use crate::{ResultsError, ResultsResult};
use aq_core::Real;
use serde::{Deserialize, Serialize};

pub type RunId = String;

/// Metadata for one stored run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub run_id: RunId,
    pub network_name: String,
    /// RFC 3339 wall-clock timestamp of when the run was saved.
    pub timestamp: String,
    pub duration_s: f64,
    pub hydraulic_timestep_s: f64,
    pub report_timestep_s: f64,
    pub solver_version: String,
    pub node_names: Vec<String>,
    pub link_names: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<BoundaryEvent>,
}

/// Something the engine had to react to mid-run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundaryEvent {
    /// Simulated time (s).
    pub time: Real,
    pub kind: BoundaryEventKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum BoundaryEventKind {
    /// A tank hit its maximum level and was clamped there.
    TankFull { tank: String },
    /// A tank hit its minimum level and was clamped there.
    TankEmpty { tank: String },
    /// A link's status changed (control action or automatic transition).
    StatusChanged { link: String, status: u8 },
    /// A control rule fired.
    ControlFired { control: String },
}

/// One reported instant, flat across all nodes and links.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeseriesRecord {
    pub time_s: Real,
    pub head: Vec<Real>,
    pub pressure: Vec<Real>,
    pub demand: Vec<Real>,
    pub expected_demand: Vec<Real>,
    pub flowrate: Vec<Real>,
    pub velocity: Vec<Real>,
    /// Status codes (0=Closed, 1=Open, 2=Active).
    pub status: Vec<u8>,
}

/// In-memory result tables: one row per reported instant.
///
/// Node quantities are head, pressure, delivered demand and expected
/// demand; link quantities are flowrate, velocity and status code. Row
/// times are strictly increasing, enforced on append.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SimulationResults {
    pub node_names: Vec<String>,
    pub link_names: Vec<String>,
    pub records: Vec<TimeseriesRecord>,
    pub events: Vec<BoundaryEvent>,
}

impl SimulationResults {
    pub fn new(node_names: Vec<String>, link_names: Vec<String>) -> Self {
        Self {
            node_names,
            link_names,
            records: Vec::new(),
            events: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn times(&self) -> Vec<Real> {
        self.records.iter().map(|r| r.time_s).collect()
    }

    /// Append one instant. Fails when row widths disagree with the column
    /// sets or time does not strictly increase.
    pub fn append_step(&mut self, record: TimeseriesRecord) -> ResultsResult<()> {
        let n_nodes = self.node_names.len();
        let n_links = self.link_names.len();
        if record.head.len() != n_nodes
            || record.pressure.len() != n_nodes
            || record.demand.len() != n_nodes
            || record.expected_demand.len() != n_nodes
        {
            return Err(ResultsError::ShapeMismatch { what: "node row" });
        }
        if record.flowrate.len() != n_links
            || record.velocity.len() != n_links
            || record.status.len() != n_links
        {
            return Err(ResultsError::ShapeMismatch { what: "link row" });
        }
        if let Some(last) = self.records.last() {
            if record.time_s <= last.time_s {
                return Err(ResultsError::NonMonotonicTime {
                    prev: last.time_s,
                    next: record.time_s,
                });
            }
        }
        self.records.push(record);
        Ok(())
    }

    pub fn record_event(&mut self, event: BoundaryEvent) {
        self.events.push(event);
    }

    fn node_index(&self, name: &str) -> Option<usize> {
        self.node_names.iter().position(|n| n == name)
    }

    fn link_index(&self, name: &str) -> Option<usize> {
        self.link_names.iter().position(|n| n == name)
    }

    pub fn head_series(&self, node: &str) -> Option<Vec<Real>> {
        let i = self.node_index(node)?;
        Some(self.records.iter().map(|r| r.head[i]).collect())
    }

    pub fn pressure_series(&self, node: &str) -> Option<Vec<Real>> {
        let i = self.node_index(node)?;
        Some(self.records.iter().map(|r| r.pressure[i]).collect())
    }

    pub fn demand_series(&self, node: &str) -> Option<Vec<Real>> {
        let i = self.node_index(node)?;
        Some(self.records.iter().map(|r| r.demand[i]).collect())
    }

    pub fn expected_demand_series(&self, node: &str) -> Option<Vec<Real>> {
        let i = self.node_index(node)?;
        Some(self.records.iter().map(|r| r.expected_demand[i]).collect())
    }

    pub fn flowrate_series(&self, link: &str) -> Option<Vec<Real>> {
        let i = self.link_index(link)?;
        Some(self.records.iter().map(|r| r.flowrate[i]).collect())
    }

    pub fn velocity_series(&self, link: &str) -> Option<Vec<Real>> {
        let i = self.link_index(link)?;
        Some(self.records.iter().map(|r| r.velocity[i]).collect())
    }

    pub fn status_series(&self, link: &str) -> Option<Vec<u8>> {
        let i = self.link_index(link)?;
        Some(self.records.iter().map(|r| r.status[i]).collect())
    }

    /// Largest absolute difference across all continuous quantities of two
    /// result sets with identical shape. Used to compare repeated runs.
    pub fn max_abs_diff(&self, other: &Self) -> ResultsResult<Real> {
        if self.node_names != other.node_names
            || self.link_names != other.link_names
            || self.records.len() != other.records.len()
        {
            return Err(ResultsError::ShapeMismatch { what: "result sets" });
        }
        let mut max = 0.0_f64;
        for (a, b) in self.records.iter().zip(&other.records) {
            max = max.max((a.time_s - b.time_s).abs());
            let pairs = [
                (&a.head, &b.head),
                (&a.pressure, &b.pressure),
                (&a.demand, &b.demand),
                (&a.expected_demand, &b.expected_demand),
                (&a.flowrate, &b.flowrate),
                (&a.velocity, &b.velocity),
            ];
            for (va, vb) in pairs {
                for (x, y) in va.iter().zip(vb) {
                    max = max.max((x - y).abs());
                }
            }
        }
        Ok(max)
    }
}
