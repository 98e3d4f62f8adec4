//! `.tscn` reader. Produces flat node headers; tree linking happens in
//! `graph::scene_tree` once every header is known.

use std::collections::BTreeSet;

use super::block::{body_text, parse_blocks, ExtResourceTable};
use super::Parsed;
use crate::config::{ResourceLink, SceneConnection};
use crate::paths;

/// A `[node ...]` header with its script property.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeHeader {
    pub name: String,
    pub node_type: String,
    /// Raw `parent` attribute: `None` for the root, `"."` for root children.
    pub parent: Option<String>,
    pub script: Option<ResourceLink>,
    pub instance: Option<ResourceLink>,
    /// Position among node headers in file order.
    pub order: usize,
    pub line: usize,
}

/// Everything read from one scene file, before tree building.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawScene {
    pub uid: Option<String>,
    pub nodes: Vec<NodeHeader>,
    pub connections: Vec<SceneConnection>,
    pub references: BTreeSet<String>,
}

/// Parse a scene file located at `scene_path`.
pub fn parse_scene(text: &str, scene_path: &str) -> Parsed<RawScene> {
    let base_dir = paths::parent_dir(scene_path);
    let mut warnings = Vec::new();
    let blocks = parse_blocks(text);
    let ext = ExtResourceTable::from_blocks(&blocks, base_dir, &mut warnings);
    let mut scene = RawScene::default();

    for block in &blocks {
        match block.tag.as_str() {
            "gd_scene" => {
                scene.uid = block.attr("uid").map(str::to_string);
            }
            "node" => {
                let Some(name) = block.attr("name").filter(|n| !n.is_empty()) else {
                    warnings.push(format!(
                        "line {}: [node] without a name skipped",
                        block.line
                    ));
                    continue;
                };
                let instance = block.attr("instance").and_then(|v| ext.resolve_link(v));
                let node_type = match (block.attr("type"), &instance) {
                    (Some(t), _) => t.to_string(),
                    (None, Some(_)) => "Instance".to_string(),
                    (None, None) => "Node".to_string(),
                };
                let script = block.property("script").and_then(|v| ext.resolve_link(v));
                scene.nodes.push(NodeHeader {
                    name: name.to_string(),
                    node_type,
                    parent: block.attr("parent").map(str::to_string),
                    script,
                    instance,
                    order: scene.nodes.len(),
                    line: block.line,
                });
            }
            "connection" => {
                let required = ["signal", "from", "to"];
                let missing: Vec<&str> = required
                    .iter()
                    .copied()
                    .filter(|k| block.attr(k).map_or(true, str::is_empty))
                    .collect();
                if !missing.is_empty() {
                    warnings.push(format!(
                        "line {}: [connection] missing {} skipped",
                        block.line,
                        missing.join(", ")
                    ));
                    continue;
                }
                scene.connections.push(SceneConnection {
                    signal: block.attr("signal").unwrap_or_default().to_string(),
                    from: block.attr("from").unwrap_or_default().to_string(),
                    to: block.attr("to").unwrap_or_default().to_string(),
                    method: block
                        .attr("method")
                        .filter(|m| !m.is_empty())
                        .map(str::to_string),
                    flags: block.attr("flags").map(str::to_string),
                });
            }
            _ => {}
        }
    }

    if scene.nodes.is_empty() {
        warnings.push(
            "no [node] blocks found; not a text scene or the format is unexpected".to_string(),
        );
    }

    scene.references = ext.paths();
    scene.references.extend(paths::scheme_literals(&body_text(text), base_dir));

    Parsed::new(scene, warnings)
}
