//! Cross-file structures: per-scene node trees and the project-wide usage graph.

pub mod scene_tree;
pub mod usage_graph;
