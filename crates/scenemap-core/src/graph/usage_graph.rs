//! Project-wide usage graph backed by petgraph::DiGraph.
//!
//! Nodes are file paths (or opaque identifier strings), edges are
//! [`UsageEdge`]s. All query results are sorted so callers never see
//! petgraph's insertion order.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use crate::config::{EdgeKind, Resolution, UsageEdge};

/// Edge data stored in the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeData {
    pub kind: EdgeKind,
    pub resolution: Resolution,
}

/// Directed `source → target` reference graph.
#[derive(Debug, Default)]
pub struct UsageGraph {
    graph: DiGraph<String, EdgeData>,
    /// O(1) path → NodeIndex lookup.
    id_index: HashMap<String, NodeIndex>,
}

impl UsageGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_edges<'a>(edges: impl IntoIterator<Item = &'a UsageEdge>) -> Self {
        let mut graph = Self::new();
        for edge in edges {
            graph.add_edge(edge);
        }
        graph
    }

    /// Get or create a node by path.
    fn ensure_node(&mut self, id: &str) -> NodeIndex {
        if let Some(&idx) = self.id_index.get(id) {
            idx
        } else {
            let idx = self.graph.add_node(id.to_string());
            self.id_index.insert(id.to_string(), idx);
            idx
        }
    }

    /// Add an edge. A second edge between the same pair is ignored.
    pub fn add_edge(&mut self, edge: &UsageEdge) {
        let from = self.ensure_node(&edge.source);
        let to = self.ensure_node(&edge.target);
        if self.graph.find_edge(from, to).is_none() {
            self.graph.add_edge(
                from,
                to,
                EdgeData {
                    kind: edge.kind,
                    resolution: edge.resolution,
                },
            );
        }
    }

    pub fn has_node(&self, id: &str) -> bool {
        self.id_index.contains_key(id)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Every edge, sorted by (source, target).
    pub fn edges(&self) -> Vec<UsageEdge> {
        let mut edges: Vec<UsageEdge> = self
            .graph
            .edge_references()
            .map(|e| UsageEdge {
                source: self.graph[e.source()].clone(),
                target: self.graph[e.target()].clone(),
                kind: e.weight().kind,
                resolution: e.weight().resolution,
            })
            .collect();
        edges.sort();
        edges
    }

    fn neighbours(&self, id: &str, direction: Direction) -> BTreeSet<String> {
        let Some(&idx) = self.id_index.get(id) else {
            return BTreeSet::new();
        };
        self.graph
            .edges_directed(idx, direction)
            .map(|e| {
                let other = match direction {
                    Direction::Incoming => e.source(),
                    Direction::Outgoing => e.target(),
                };
                self.graph[other].clone()
            })
            .collect()
    }

    /// Files referencing `target`.
    pub fn used_by(&self, target: &str) -> BTreeSet<String> {
        self.neighbours(target, Direction::Incoming)
    }

    /// Everything `source` references.
    pub fn dependencies(&self, source: &str) -> BTreeSet<String> {
        self.neighbours(source, Direction::Outgoing)
    }

    /// target → sorted set of sources, for every node with at least one inbound edge.
    pub fn reverse_index(&self) -> BTreeMap<String, BTreeSet<String>> {
        self.graph
            .node_indices()
            .filter_map(|idx| {
                let sources: BTreeSet<String> = self
                    .graph
                    .edges_directed(idx, Direction::Incoming)
                    .map(|e| self.graph[e.source()].clone())
                    .collect();
                (!sources.is_empty()).then(|| (self.graph[idx].clone(), sources))
            })
            .collect()
    }

    /// Every path that is the target of some edge.
    pub fn targets(&self) -> BTreeSet<String> {
        self.graph
            .edge_references()
            .map(|e| self.graph[e.target()].clone())
            .collect()
    }

    /// Sorted (source, target) pairs where both ends satisfy `keep`.
    pub fn edges_between(&self, keep: impl Fn(&str) -> bool) -> Vec<(String, String)> {
        let pairs: BTreeSet<(String, String)> = self
            .graph
            .edge_references()
            .map(|e| (&self.graph[e.source()], &self.graph[e.target()]))
            .filter(|(s, t)| keep(s) && keep(t))
            .map(|(s, t)| (s.clone(), t.clone()))
            .collect();
        pairs.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(source: &str, target: &str, kind: EdgeKind) -> UsageEdge {
        UsageEdge {
            source: source.to_string(),
            target: target.to_string(),
            kind,
            resolution: Resolution::Resolved,
        }
    }

    fn sample() -> UsageGraph {
        UsageGraph::from_edges(&[
            edge("res://main.tscn", "res://main.gd", EdgeKind::NodeScript),
            edge("res://main.tscn", "res://b.gd", EdgeKind::NodeScript),
            edge("res://main.gd", "res://b.gd", EdgeKind::ScriptLiteral),
            edge("res://main.gd", "res://b.gd", EdgeKind::ClassReference),
            edge("res://b.gd", "res://icon.svg", EdgeKind::ScriptLiteral),
        ])
    }

    #[test]
    fn duplicate_pairs_collapse_to_first_kind() {
        let g = sample();
        assert_eq!(g.edge_count(), 4);
        assert_eq!(g.node_count(), 4);
        let edges = g.edges();
        let main_to_b = edges
            .iter()
            .find(|e| e.source == "res://main.gd" && e.target == "res://b.gd")
            .unwrap();
        assert_eq!(main_to_b.kind, EdgeKind::ScriptLiteral);
    }

    #[test]
    fn edges_are_sorted() {
        let edges = sample().edges();
        let pairs: Vec<(&str, &str)> = edges
            .iter()
            .map(|e| (e.source.as_str(), e.target.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("res://b.gd", "res://icon.svg"),
                ("res://main.gd", "res://b.gd"),
                ("res://main.tscn", "res://b.gd"),
                ("res://main.tscn", "res://main.gd"),
            ]
        );
    }

    #[test]
    fn reverse_index_and_neighbour_queries() {
        let g = sample();
        let rev = g.reverse_index();
        assert_eq!(rev.len(), 3);
        assert_eq!(
            rev["res://b.gd"].iter().map(|s| s.as_str()).collect::<Vec<_>>(),
            vec!["res://main.gd", "res://main.tscn"]
        );
        assert!(!rev.contains_key("res://main.tscn"));
        assert_eq!(g.used_by("res://main.gd").len(), 1);
        assert_eq!(g.dependencies("res://main.tscn").len(), 2);
        assert!(g.used_by("res://nope").is_empty());
    }

    #[test]
    fn edges_between_filters_both_ends() {
        let g = sample();
        let scripts = g.edges_between(|p| p.ends_with(".gd"));
        assert_eq!(
            scripts,
            vec![("res://main.gd".to_string(), "res://b.gd".to_string())]
        );
        assert!(g.targets().contains("res://icon.svg"));
    }
}
