use crate::topology::Topology;
use std::collections::HashSet;
use std::sync::Arc;
use strand_types::{Node, PortRole};

/// A resolved destination together with the edge label that reached it
#[derive(Debug, Clone, PartialEq)]
pub struct RouteTarget {
    pub node: Node,
    pub via: String,
}

/// Finds the distinct destinations reachable from a node in one hop
#[derive(Clone)]
pub struct GraphRouter {
    topology: Arc<Topology>,
}

impl GraphRouter {
    pub fn new(topology: Arc<Topology>) -> Self {
        Self { topology }
    }

    /// Destinations of `source_id`, first matching edge wins per target
    ///
    /// An edge is usable from either end. The side the message leaves from
    /// must not be an `In` port and the side it enters must not be an `Out`
    /// port.
    pub fn targets(&self, source_id: &str) -> Vec<RouteTarget> {
        let Some(source) = self.topology.node(source_id) else {
            return Vec::new();
        };

        let mut seen = HashSet::new();
        let mut targets = Vec::new();

        for edge in self.topology.edges_touching(source_id) {
            let (source_port, target_id, target_port) = if edge.from_node_id == source_id {
                (edge.from_port, &edge.to_node_id, edge.to_port)
            } else {
                (edge.to_port, &edge.from_node_id, edge.from_port)
            };

            if target_id == source_id || seen.contains(target_id) {
                continue;
            }
            if source.port_role(source_port) == PortRole::In {
                continue;
            }
            let Some(target) = self.topology.node(target_id) else {
                continue;
            };
            if target.port_role(target_port) == PortRole::Out {
                continue;
            }

            seen.insert(target_id.clone());
            targets.push(RouteTarget {
                node: target,
                via: edge.via(),
            });
        }

        targets
    }
}
