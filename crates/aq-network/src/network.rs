//! Immutable, validated network topology.

use crate::link::Link;
use crate::node::Node;
use crate::pattern::{Curve, Pattern};
use aq_core::{LinkId, NodeId, Real};
use std::collections::HashMap;

/// A link incident to a node, with its orientation at that node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Incident {
    pub link: LinkId,
    /// True when the node is the link's start (flow leaves the node when positive).
    pub outgoing: bool,
}

/// The network: a validated, immutable collection of nodes, links, patterns
/// and curves.
///
/// All collections are index-addressable arenas keyed by their IDs. Adjacency
/// is stored compactly: node i's incident links live in
/// `node_links[node_link_offsets[i]..node_link_offsets[i+1]]`, sorted by link
/// ID for determinism.
#[derive(Debug, Clone)]
pub struct Network {
    pub(crate) name: String,
    pub(crate) nodes: Vec<Node>,
    pub(crate) links: Vec<Link>,
    pub(crate) patterns: Vec<Pattern>,
    pub(crate) curves: Vec<Curve>,

    pub(crate) node_link_offsets: Vec<usize>,
    pub(crate) node_links: Vec<Incident>,

    pub(crate) node_names: HashMap<String, NodeId>,
    pub(crate) link_names: HashMap<String, LinkId>,
}

impl Network {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }

    pub fn curves(&self) -> &[Curve] {
        &self.curves
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.idx())
    }

    pub fn link(&self, id: LinkId) -> Option<&Link> {
        self.links.get(id.idx())
    }

    pub fn pattern(&self, id: aq_core::PatternId) -> Option<&Pattern> {
        self.patterns.get(id.idx())
    }

    pub fn node_by_name(&self, name: &str) -> Option<NodeId> {
        self.node_names.get(name).copied()
    }

    pub fn link_by_name(&self, name: &str) -> Option<LinkId> {
        self.link_names.get(name).copied()
    }

    /// Links incident to a node, with orientation.
    pub fn incident(&self, node: NodeId) -> &[Incident] {
        let idx = node.idx();
        if idx >= self.nodes.len() {
            return &[];
        }
        let start = self.node_link_offsets[idx];
        let end = self.node_link_offsets[idx + 1];
        &self.node_links[start..end]
    }

    /// Evaluate a pattern multiplier, treating a missing reference as 1.0.
    ///
    /// Dangling references are rejected at build time, so `None` here means
    /// "no pattern assigned".
    pub fn pattern_value(&self, pattern: Option<aq_core::PatternId>, t: Real) -> Real {
        match pattern {
            Some(id) => self.patterns[id.idx()].value_at(t),
            None => 1.0,
        }
    }

    /// Earliest pattern step boundary strictly after t across all patterns,
    /// or None when the network has no patterns.
    pub fn next_pattern_boundary(&self, t: Real) -> Option<Real> {
        self.patterns
            .iter()
            .map(|p| p.next_boundary_after(t))
            .fold(None, |acc, b| match acc {
                None => Some(b),
                Some(a) => Some(a.min(b)),
            })
    }
}

#[cfg(test)]
mod tests {
    use crate::builder::NetworkBuilder;

    #[test]
    fn adjacency_orientation() {
        let mut b = NetworkBuilder::new("t");
        let r = b.add_reservoir("r", 50.0, None);
        let j1 = b.add_junction("j1", 10.0, 0.01, None);
        let j2 = b.add_junction("j2", 10.0, 0.01, None);
        let p1 = b.add_pipe("p1", r, j1, 100.0, 0.3, 130.0);
        let p2 = b.add_pipe("p2", j1, j2, 100.0, 0.3, 130.0);
        let network = b.build().unwrap();

        let inc = network.incident(j1);
        assert_eq!(inc.len(), 2);
        assert!(inc.iter().any(|i| i.link == p1 && !i.outgoing));
        assert!(inc.iter().any(|i| i.link == p2 && i.outgoing));

        assert_eq!(network.incident(j2).len(), 1);
        assert_eq!(network.node_by_name("r"), Some(r));
        assert_eq!(network.link_by_name("p2"), Some(p2));
    }

    #[test]
    fn next_pattern_boundary_across_patterns() {
        let mut b = NetworkBuilder::new("t");
        let r = b.add_reservoir("r", 50.0, None);
        let pat_a = b.add_pattern("a", 3600.0, vec![1.0, 2.0]);
        let pat_b = b.add_pattern("b", 1800.0, vec![1.0, 0.5]);
        let j = b.add_junction("j", 0.0, 0.01, Some(pat_a));
        let _ = (r, j, pat_b);
        b.add_pipe("p", r, j, 10.0, 0.3, 130.0);
        let network = b.build().unwrap();

        assert_eq!(network.next_pattern_boundary(0.0), Some(1800.0));
        assert_eq!(network.next_pattern_boundary(1800.0), Some(3600.0));
    }
}
