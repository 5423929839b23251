//! aq-network: data model for water distribution networks.
//!
//! Provides:
//! - Node/link arenas (junctions, tanks, reservoirs; pipes, pumps, valves)
//! - Demand patterns and piecewise-linear curves
//! - Incremental builder with input-contract validation
//! - Compact node->link adjacency for solver indexing
//! - Mutable `NetworkState` with checkpoint/commit/rollback semantics
//!
//! # Example
//!
//! ```
//! use aq_network::NetworkBuilder;
//!
//! let mut builder = NetworkBuilder::new("two_node");
//! let src = builder.add_reservoir("src", 50.0, None);
//! let j = builder.add_junction("j", 10.0, 0.01, None);
//! builder.add_pipe("p", src, j, 100.0, 0.3, 130.0);
//! let network = builder.build().unwrap();
//!
//! assert_eq!(network.nodes().len(), 2);
//! assert_eq!(network.links().len(), 1);
//! ```

pub mod builder;
pub mod error;
pub mod link;
pub mod network;
pub mod node;
pub mod pattern;
pub mod state;

// Re-exports for ergonomics
pub use builder::NetworkBuilder;
pub use error::NetworkError;
pub use link::{HeadlossModel, Link, LinkKind, LinkStatus, Pipe, Pump, PumpCurve, Valve, ValveKind};
pub use network::{Incident, Network};
pub use node::{DemandEntry, Junction, Node, NodeKind, Reservoir, Tank};
pub use pattern::{Curve, Pattern};
pub use state::NetworkState;
