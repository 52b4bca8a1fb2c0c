//! Semantic network over language objects
//!
//! An undirected graph whose nodes are language objects and whose edges
//! carry collocational or semantic association weights. Nodes live in an
//! arena indexed by position; edges reference nodes by index, so peers
//! never own each other and cycles are harmless. Traversal is
//! breadth-limited expansion with a visited set.

use logos_types::{LinguisticComponent, LogosError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use uuid::Uuid;

/// A node in the semantic network arena
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkNode {
    pub object_id: Uuid,
    pub content: String,
    pub component: LinguisticComponent,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct NetworkEdge {
    a: usize,
    b: usize,
    weight: f64,
}

/// A neighbor reached during expansion
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkNeighbor {
    pub object_id: Uuid,
    /// Hops from the start node
    pub depth: usize,
    /// Weight of the edge that first reached this node
    pub weight: f64,
}

/// Arena-allocated undirected semantic network
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SemanticNetwork {
    nodes: Vec<NetworkNode>,
    edges: Vec<NetworkEdge>,
    /// Adjacency lists by node index, entries are edge indices
    adjacency: Vec<Vec<usize>>,
    index_by_object: HashMap<Uuid, usize>,
}

impl SemanticNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Insert a node, returning its index; re-inserting an object returns
    /// the existing index
    pub fn add_node(
        &mut self,
        object_id: Uuid,
        content: impl Into<String>,
        component: LinguisticComponent,
    ) -> usize {
        if let Some(&index) = self.index_by_object.get(&object_id) {
            return index;
        }
        let index = self.nodes.len();
        self.nodes.push(NetworkNode {
            object_id,
            content: content.into(),
            component,
        });
        self.adjacency.push(Vec::new());
        self.index_by_object.insert(object_id, index);
        index
    }

    /// Connect two distinct objects with an association weight
    pub fn add_edge(&mut self, a: Uuid, b: Uuid, weight: f64) -> Result<()> {
        if a == b {
            return Err(LogosError::InvalidInput(
                "semantic edge endpoints must be distinct".to_string(),
            ));
        }
        let ia = *self
            .index_by_object
            .get(&a)
            .ok_or_else(|| LogosError::NotFound(format!("network node {}", a)))?;
        let ib = *self
            .index_by_object
            .get(&b)
            .ok_or_else(|| LogosError::NotFound(format!("network node {}", b)))?;
        let edge_index = self.edges.len();
        self.edges.push(NetworkEdge {
            a: ia,
            b: ib,
            weight,
        });
        self.adjacency[ia].push(edge_index);
        self.adjacency[ib].push(edge_index);
        Ok(())
    }

    pub fn node(&self, object_id: &Uuid) -> Option<&NetworkNode> {
        self.index_by_object
            .get(object_id)
            .map(|&index| &self.nodes[index])
    }

    /// Direct neighbors of an object with edge weights
    pub fn neighbors(&self, object_id: &Uuid) -> Vec<(Uuid, f64)> {
        let Some(&index) = self.index_by_object.get(object_id) else {
            return Vec::new();
        };
        self.adjacency[index]
            .iter()
            .map(|&edge_index| {
                let edge = self.edges[edge_index];
                let other = if edge.a == index { edge.b } else { edge.a };
                (self.nodes[other].object_id, edge.weight)
            })
            .collect()
    }

    /// Breadth-limited expansion from a start object: at most `max_depth`
    /// hops and `max_nodes` results, visiting each node once. Results are
    /// in breadth-first order and exclude the start node.
    pub fn expand(
        &self,
        start: &Uuid,
        max_depth: usize,
        max_nodes: usize,
    ) -> Vec<NetworkNeighbor> {
        let Some(&start_index) = self.index_by_object.get(start) else {
            return Vec::new();
        };
        let mut visited: HashSet<usize> = HashSet::new();
        visited.insert(start_index);
        let mut queue = VecDeque::new();
        queue.push_back((start_index, 0usize));
        let mut results = Vec::new();

        while let Some((current, depth)) = queue.pop_front() {
            if depth >= max_depth {
                continue;
            }
            for &edge_index in &self.adjacency[current] {
                let edge = self.edges[edge_index];
                let other = if edge.a == current { edge.b } else { edge.a };
                if visited.insert(other) {
                    results.push(NetworkNeighbor {
                        object_id: self.nodes[other].object_id,
                        depth: depth + 1,
                        weight: edge.weight,
                    });
                    if results.len() >= max_nodes {
                        return results;
                    }
                    queue.push_back((other, depth + 1));
                }
            }
        }
        results
    }

    /// Relational density of an object in [0, 1]: its positive edge-weight
    /// mass normalized by the densest node in the network
    pub fn relational_density(&self, object_id: &Uuid) -> f64 {
        let mass = |index: usize| -> f64 {
            self.adjacency[index]
                .iter()
                .map(|&e| self.edges[e].weight.max(0.0))
                .sum()
        };
        let Some(&index) = self.index_by_object.get(object_id) else {
            return 0.0;
        };
        let own = mass(index);
        let max = (0..self.nodes.len())
            .map(mass)
            .fold(0.0_f64, f64::max);
        if max <= 0.0 {
            0.0
        } else {
            (own / max).clamp(0.0, 1.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn network_with_chain() -> (SemanticNetwork, Vec<Uuid>) {
        let mut network = SemanticNetwork::new();
        let ids: Vec<Uuid> = (0..5).map(|_| Uuid::new_v4()).collect();
        for (i, id) in ids.iter().enumerate() {
            network.add_node(*id, format!("word{}", i), LinguisticComponent::Lexis);
        }
        // Chain 0-1-2-3-4 plus a cycle edge 0-2
        network.add_edge(ids[0], ids[1], 0.8).unwrap();
        network.add_edge(ids[1], ids[2], 0.6).unwrap();
        network.add_edge(ids[2], ids[3], 0.5).unwrap();
        network.add_edge(ids[3], ids[4], 0.4).unwrap();
        network.add_edge(ids[0], ids[2], 0.3).unwrap();
        (network, ids)
    }

    #[test]
    fn test_add_node_is_idempotent() {
        let mut network = SemanticNetwork::new();
        let id = Uuid::new_v4();
        let first = network.add_node(id, "term", LinguisticComponent::Lexis);
        let second = network.add_node(id, "term", LinguisticComponent::Lexis);
        assert_eq!(first, second);
        assert_eq!(network.node_count(), 1);
    }

    #[test]
    fn test_self_edge_rejected() {
        let mut network = SemanticNetwork::new();
        let id = Uuid::new_v4();
        network.add_node(id, "term", LinguisticComponent::Lexis);
        assert!(network.add_edge(id, id, 1.0).is_err());
    }

    #[test]
    fn test_expansion_depth_limit() {
        let (network, ids) = network_with_chain();
        let one_hop = network.expand(&ids[0], 1, 10);
        let hops: Vec<Uuid> = one_hop.iter().map(|n| n.object_id).collect();
        assert!(hops.contains(&ids[1]) && hops.contains(&ids[2]));
        assert!(!hops.contains(&ids[3]));

        let two_hops = network.expand(&ids[0], 2, 10);
        assert!(two_hops.iter().any(|n| n.object_id == ids[3]));
        assert!(!two_hops.iter().any(|n| n.object_id == ids[4]));
    }

    #[test]
    fn test_expansion_visits_cycle_once() {
        let (network, ids) = network_with_chain();
        let all = network.expand(&ids[0], 4, 100);
        let mut seen = HashSet::new();
        for neighbor in &all {
            assert!(seen.insert(neighbor.object_id), "node visited twice");
        }
        assert_eq!(all.len(), 4);
    }

    #[test]
    fn test_expansion_node_cap() {
        let (network, ids) = network_with_chain();
        let capped = network.expand(&ids[0], 4, 2);
        assert_eq!(capped.len(), 2);
    }

    #[test]
    fn test_relational_density_normalized() {
        let (network, ids) = network_with_chain();
        for id in &ids {
            let density = network.relational_density(id);
            assert!((0.0..=1.0).contains(&density));
        }
        // Node 2 carries the largest weight mass (0.6 + 0.5 + 0.3)
        assert_eq!(network.relational_density(&ids[2]), 1.0);
    }

    #[test]
    fn test_unknown_node_queries_are_empty() {
        let (network, _) = network_with_chain();
        let ghost = Uuid::new_v4();
        assert!(network.expand(&ghost, 3, 10).is_empty());
        assert_eq!(network.relational_density(&ghost), 0.0);
        assert!(network.neighbors(&ghost).is_empty());
    }
}
