//! Incremental network builder.

use std::collections::HashMap;

use crate::error::NetworkError;
use crate::link::{HeadlossModel, Link, LinkKind, LinkStatus, Pipe, Pump, PumpCurve, Valve, ValveKind};
use crate::network::{Incident, Network};
use crate::node::{DemandEntry, Junction, Node, NodeKind, Reservoir, Tank};
use crate::pattern::{Curve, Pattern};
use aq_core::{CurveId, LinkId, NodeId, PatternId, Real};

/// Builder for constructing a network incrementally.
///
/// Use the `add_*` methods to build up nodes, links, patterns and curves,
/// then call `build()` to validate and freeze an immutable `Network`.
/// Validation enforces the input contract: unique names, resolvable
/// references, physically sensible parameters, and at least one fixed-head
/// node.
#[derive(Debug, Default)]
pub struct NetworkBuilder {
    name: String,
    nodes: Vec<Node>,
    links: Vec<Link>,
    patterns: Vec<Pattern>,
    curves: Vec<Curve>,
}

impl NetworkBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    fn push_node(&mut self, name: impl Into<String>, kind: NodeKind) -> NodeId {
        let id = NodeId::from_index(self.nodes.len() as u32);
        self.nodes.push(Node {
            id,
            name: name.into(),
            kind,
        });
        id
    }

    /// Add a junction with a single demand category.
    pub fn add_junction(
        &mut self,
        name: impl Into<String>,
        elevation: Real,
        base_demand: Real,
        pattern: Option<PatternId>,
    ) -> NodeId {
        self.push_node(
            name,
            NodeKind::Junction(Junction {
                elevation,
                demands: vec![DemandEntry {
                    base: base_demand,
                    pattern,
                }],
            }),
        )
    }

    /// Append an extra demand category to an existing junction.
    pub fn add_demand(&mut self, node: NodeId, base: Real, pattern: Option<PatternId>) {
        if let Some(Node {
            kind: NodeKind::Junction(j),
            ..
        }) = self.nodes.get_mut(node.idx())
        {
            j.demands.push(DemandEntry { base, pattern });
        }
    }

    pub fn add_tank(
        &mut self,
        name: impl Into<String>,
        elevation: Real,
        init_level: Real,
        min_level: Real,
        max_level: Real,
        diameter: Real,
    ) -> NodeId {
        self.push_node(
            name,
            NodeKind::Tank(Tank {
                elevation,
                init_level,
                min_level,
                max_level,
                diameter,
            }),
        )
    }

    pub fn add_reservoir(
        &mut self,
        name: impl Into<String>,
        base_head: Real,
        head_pattern: Option<PatternId>,
    ) -> NodeId {
        self.push_node(
            name,
            NodeKind::Reservoir(Reservoir {
                base_head,
                head_pattern,
            }),
        )
    }

    fn push_link(
        &mut self,
        name: impl Into<String>,
        start: NodeId,
        end: NodeId,
        kind: LinkKind,
        initial_status: LinkStatus,
        initial_setting: Real,
    ) -> LinkId {
        let id = LinkId::from_index(self.links.len() as u32);
        self.links.push(Link {
            id,
            name: name.into(),
            start,
            end,
            kind,
            initial_status,
            initial_setting,
        });
        id
    }

    /// Add a Hazen-Williams pipe with no minor loss and no check valve.
    pub fn add_pipe(
        &mut self,
        name: impl Into<String>,
        start: NodeId,
        end: NodeId,
        length: Real,
        diameter: Real,
        roughness: Real,
    ) -> LinkId {
        self.push_link(
            name,
            start,
            end,
            LinkKind::Pipe(Pipe {
                length,
                diameter,
                roughness,
                minor_loss: 0.0,
                check_valve: false,
                headloss: HeadlossModel::HazenWilliams,
            }),
            LinkStatus::Open,
            0.0,
        )
    }

    pub fn add_pump(
        &mut self,
        name: impl Into<String>,
        start: NodeId,
        end: NodeId,
        curve: PumpCurve,
    ) -> LinkId {
        self.push_link(
            name,
            start,
            end,
            LinkKind::Pump(Pump { curve, speed: 1.0 }),
            LinkStatus::Open,
            1.0,
        )
    }

    /// Add a pump whose head curve is fit from a data curve of (flow, head)
    /// test points: one point gives the standard single-point fit, three or
    /// more (starting at zero flow) the three-point fit over the first,
    /// middle and last points.
    pub fn add_pump_from_curve(
        &mut self,
        name: impl Into<String>,
        start: NodeId,
        end: NodeId,
        curve: CurveId,
    ) -> Result<LinkId, NetworkError> {
        let name = name.into();
        let data = self
            .curves
            .get(curve.idx())
            .ok_or_else(|| NetworkError::UnknownCurve {
                entity: format!("pump {name}"),
            })?;
        let fitted = match data.x.len() {
            1 => PumpCurve::single_point(data.x[0], data.y[0])?,
            n if n >= 3 && data.x[0] == 0.0 => {
                let mid = n / 2;
                PumpCurve::three_point(
                    data.y[0],
                    data.x[mid],
                    data.y[mid],
                    data.x[n - 1],
                    data.y[n - 1],
                )?
            }
            _ => {
                return Err(NetworkError::BadPumpCurve {
                    what: "need one test point, or three or more starting at zero flow",
                })
            }
        };
        Ok(self.add_pump(name, start, end, fitted))
    }

    pub fn add_valve(
        &mut self,
        name: impl Into<String>,
        start: NodeId,
        end: NodeId,
        kind: ValveKind,
        diameter: Real,
        setting: Real,
    ) -> LinkId {
        self.push_link(
            name,
            start,
            end,
            LinkKind::Valve(Valve {
                kind,
                diameter,
                setting,
            }),
            LinkStatus::Active,
            setting,
        )
    }

    pub fn add_pattern(
        &mut self,
        name: impl Into<String>,
        interval: Real,
        multipliers: Vec<Real>,
    ) -> PatternId {
        let id = PatternId::from_index(self.patterns.len() as u32);
        self.patterns.push(Pattern {
            id,
            name: name.into(),
            interval,
            multipliers,
        });
        id
    }

    pub fn add_curve(&mut self, name: impl Into<String>, x: Vec<Real>, y: Vec<Real>) -> CurveId {
        let id = CurveId::from_index(self.curves.len() as u32);
        self.curves.push(Curve {
            id,
            name: name.into(),
            x,
            y,
        });
        id
    }

    /// Mark a pipe as a check valve.
    pub fn set_check_valve(&mut self, link: LinkId) {
        if let Some(Link {
            kind: LinkKind::Pipe(p),
            ..
        }) = self.links.get_mut(link.idx())
        {
            p.check_valve = true;
        }
    }

    /// Set the minor-loss K factor of a pipe.
    pub fn set_minor_loss(&mut self, link: LinkId, k: Real) {
        if let Some(Link {
            kind: LinkKind::Pipe(p),
            ..
        }) = self.links.get_mut(link.idx())
        {
            p.minor_loss = k;
        }
    }

    /// Switch a pipe to the Darcy-Weisbach law (roughness becomes a height in m).
    pub fn set_darcy_weisbach(&mut self, link: LinkId, roughness_height: Real) {
        if let Some(Link {
            kind: LinkKind::Pipe(p),
            ..
        }) = self.links.get_mut(link.idx())
        {
            p.headloss = HeadlossModel::DarcyWeisbach;
            p.roughness = roughness_height;
        }
    }

    /// Override a link's initial operating status.
    pub fn set_initial_status(&mut self, link: LinkId, status: LinkStatus) {
        if let Some(l) = self.links.get_mut(link.idx()) {
            l.initial_status = status;
        }
    }

    /// Validate and freeze the network.
    pub fn build(self) -> Result<Network, NetworkError> {
        validate(&self.name, &self.nodes, &self.links, &self.patterns, &self.curves)?;

        let (node_link_offsets, node_links) = build_adjacency(&self.nodes, &self.links);

        let node_names = self
            .nodes
            .iter()
            .map(|n| (n.name.clone(), n.id))
            .collect::<HashMap<_, _>>();
        let link_names = self
            .links
            .iter()
            .map(|l| (l.name.clone(), l.id))
            .collect::<HashMap<_, _>>();

        Ok(Network {
            name: self.name,
            nodes: self.nodes,
            links: self.links,
            patterns: self.patterns,
            curves: self.curves,
            node_link_offsets,
            node_links,
            node_names,
            link_names,
        })
    }
}

/// Build compact adjacency: for each node, collect incident links with
/// orientation, sorted by link ID for determinism.
fn build_adjacency(nodes: &[Node], links: &[Link]) -> (Vec<usize>, Vec<Incident>) {
    let mut per_node: HashMap<NodeId, Vec<Incident>> = HashMap::new();
    for link in links {
        per_node.entry(link.start).or_default().push(Incident {
            link: link.id,
            outgoing: true,
        });
        per_node.entry(link.end).or_default().push(Incident {
            link: link.id,
            outgoing: false,
        });
    }
    for list in per_node.values_mut() {
        list.sort_by_key(|i| i.link.index());
    }

    let mut offsets = Vec::with_capacity(nodes.len() + 1);
    let mut flat = Vec::new();
    offsets.push(0);
    for node in nodes {
        if let Some(list) = per_node.get(&node.id) {
            flat.extend_from_slice(list);
        }
        offsets.push(flat.len());
    }
    (offsets, flat)
}

fn validate(
    _name: &str,
    nodes: &[Node],
    links: &[Link],
    patterns: &[Pattern],
    curves: &[Curve],
) -> Result<(), NetworkError> {
    if nodes.is_empty() {
        return Err(NetworkError::Empty);
    }

    let mut seen = HashMap::new();
    for node in nodes {
        if seen.insert(node.name.as_str(), ()).is_some() {
            return Err(NetworkError::DuplicateName {
                kind: "node",
                name: node.name.clone(),
            });
        }
    }
    let mut seen = HashMap::new();
    for link in links {
        if seen.insert(link.name.as_str(), ()).is_some() {
            return Err(NetworkError::DuplicateName {
                kind: "link",
                name: link.name.clone(),
            });
        }
    }

    let pattern_ok = |p: &Option<PatternId>| match p {
        Some(id) => id.idx() < patterns.len(),
        None => true,
    };

    if !nodes.iter().any(|n| n.is_fixed_head()) {
        return Err(NetworkError::NoFixedHead);
    }

    for node in nodes {
        match &node.kind {
            NodeKind::Junction(j) => {
                for d in &j.demands {
                    if !pattern_ok(&d.pattern) {
                        return Err(NetworkError::UnknownPattern {
                            entity: format!("junction {}", node.name),
                        });
                    }
                }
            }
            NodeKind::Tank(t) => {
                if t.diameter <= 0.0 {
                    return Err(NetworkError::NonPositive {
                        what: "tank diameter",
                        entity: node.name.clone(),
                    });
                }
                if !(t.min_level < t.max_level
                    && t.init_level >= t.min_level
                    && t.init_level <= t.max_level)
                {
                    return Err(NetworkError::TankBounds {
                        name: node.name.clone(),
                    });
                }
            }
            NodeKind::Reservoir(r) => {
                if !pattern_ok(&r.head_pattern) {
                    return Err(NetworkError::UnknownPattern {
                        entity: format!("reservoir {}", node.name),
                    });
                }
            }
        }
    }

    for link in links {
        if link.start.idx() >= nodes.len() || link.end.idx() >= nodes.len() {
            return Err(NetworkError::UnknownEndpoint {
                link: link.name.clone(),
            });
        }
        if link.start == link.end {
            return Err(NetworkError::SelfLoop {
                link: link.name.clone(),
            });
        }
        match &link.kind {
            LinkKind::Pipe(p) => {
                if p.length <= 0.0 {
                    return Err(NetworkError::NonPositive {
                        what: "pipe length",
                        entity: link.name.clone(),
                    });
                }
                if p.diameter <= 0.0 {
                    return Err(NetworkError::NonPositive {
                        what: "pipe diameter",
                        entity: link.name.clone(),
                    });
                }
                if p.roughness <= 0.0 {
                    return Err(NetworkError::NonPositive {
                        what: "pipe roughness",
                        entity: link.name.clone(),
                    });
                }
            }
            LinkKind::Pump(p) => {
                if p.curve.shutoff_head <= 0.0 || p.curve.exponent <= 0.0 || p.curve.coeff < 0.0 {
                    return Err(NetworkError::BadPumpCurve {
                        what: "need shutoff_head > 0, coeff >= 0, exponent > 0",
                    });
                }
                if p.speed <= 0.0 {
                    return Err(NetworkError::NonPositive {
                        what: "pump speed",
                        entity: link.name.clone(),
                    });
                }
            }
            LinkKind::Valve(v) => {
                if v.diameter <= 0.0 {
                    return Err(NetworkError::NonPositive {
                        what: "valve diameter",
                        entity: link.name.clone(),
                    });
                }
            }
        }
    }

    for p in patterns {
        if p.multipliers.is_empty() {
            return Err(NetworkError::EmptyPattern {
                name: p.name.clone(),
            });
        }
        if p.interval <= 0.0 {
            return Err(NetworkError::NonPositive {
                what: "pattern interval",
                entity: p.name.clone(),
            });
        }
    }

    for c in curves {
        if c.x.is_empty() || c.x.len() != c.y.len() || c.x.windows(2).any(|w| w[0] >= w[1]) {
            return Err(NetworkError::CurveNotAscending {
                name: c.name.clone(),
            });
        }
    }

    Ok(())
}
