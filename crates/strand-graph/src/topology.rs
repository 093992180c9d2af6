use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use strand_types::{Edge, Node};

/// Serializable form of a graph, as loaded from disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TopologySnapshot {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

/// Live node and edge set shared by the router and the relay
///
/// Edges may outlive the nodes they name; lookups treat a missing endpoint
/// as absent rather than as an error.
#[derive(Default)]
pub struct Topology {
    nodes: RwLock<HashMap<String, Node>>,
    edges: RwLock<Vec<Edge>>,
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: TopologySnapshot) -> Self {
        let topology = Self::new();
        for node in snapshot.nodes {
            topology.add_node(node);
        }
        for edge in snapshot.edges {
            topology.connect(edge);
        }
        topology
    }

    pub fn snapshot(&self) -> TopologySnapshot {
        let mut nodes: Vec<Node> = read(&self.nodes).values().cloned().collect();
        nodes.sort_by(|a, b| a.id.cmp(&b.id));
        TopologySnapshot {
            nodes,
            edges: self.edges(),
        }
    }

    /// Insert or replace a node
    pub fn add_node(&self, node: Node) -> Option<Node> {
        write(&self.nodes).insert(node.id.clone(), node)
    }

    pub fn remove_node(&self, node_id: &str) -> Option<Node> {
        write(&self.nodes).remove(node_id)
    }

    pub fn node(&self, node_id: &str) -> Option<Node> {
        read(&self.nodes).get(node_id).cloned()
    }

    pub fn contains(&self, node_id: &str) -> bool {
        read(&self.nodes).contains_key(node_id)
    }

    /// Add an edge; an identical edge is not duplicated
    pub fn connect(&self, edge: Edge) -> bool {
        let mut edges = write(&self.edges);
        if edges.contains(&edge) {
            return false;
        }
        edges.push(edge);
        true
    }

    /// Remove every edge from `from` to `to`, returning how many went
    pub fn disconnect(&self, from: &str, to: &str) -> usize {
        let mut edges = write(&self.edges);
        let before = edges.len();
        edges.retain(|e| !(e.from_node_id == from && e.to_node_id == to));
        before - edges.len()
    }

    /// Edges in insertion order
    pub fn edges(&self) -> Vec<Edge> {
        read(&self.edges).clone()
    }

    pub fn edges_touching(&self, node_id: &str) -> Vec<Edge> {
        read(&self.edges)
            .iter()
            .filter(|e| e.touches(node_id))
            .cloned()
            .collect()
    }
}
