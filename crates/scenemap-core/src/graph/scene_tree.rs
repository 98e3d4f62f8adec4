//! Scene tree assembly from flat node headers.
//!
//! Headers may arrive in any order, so building is two passes over an arena:
//! the first assigns every node its identity path, the second links each node
//! to its parent by path. Problems never abort the build; a node whose parent
//! cannot be found is hung off the root and a warning is recorded.

use std::collections::HashMap;

use crate::config::SceneNode;
use crate::formats::scene::NodeHeader;
use crate::formats::Parsed;

/// Name given to the root created when no header lacks a `parent`.
pub const SYNTHETIC_ROOT: &str = "<root>";

struct Slot<'a> {
    header: Option<&'a NodeHeader>,
    path: String,
    children: Vec<usize>,
}

/// Build the tree for one scene. Returns `None` only when there are no headers.
pub fn build_scene_tree(headers: &[NodeHeader]) -> Parsed<Option<SceneNode>> {
    let mut warnings = Vec::new();
    if headers.is_empty() {
        return Parsed::new(None, warnings);
    }

    let mut ordered: Vec<&NodeHeader> = headers.iter().collect();
    ordered.sort_by_key(|h| h.order);

    let root_header = ordered.iter().copied().find(|h| h.parent.is_none());
    let root_name = match root_header {
        Some(h) => h.name.clone(),
        None => {
            warnings.push(format!(
                "no node without a parent; synthetic root `{SYNTHETIC_ROOT}` created"
            ));
            SYNTHETIC_ROOT.to_string()
        }
    };

    // Pass 1: identity paths.
    let mut arena: Vec<Slot> = vec![Slot {
        header: root_header,
        path: root_name.clone(),
        children: Vec::new(),
    }];
    let mut by_path: HashMap<String, usize> = HashMap::from([(root_name.clone(), 0)]);
    let mut parents: Vec<(usize, Option<String>)> = Vec::new();

    for header in ordered {
        if root_header.is_some_and(|r| std::ptr::eq(r, header)) {
            continue;
        }
        let parent_path = match header.parent.as_deref() {
            None => {
                warnings.push(format!(
                    "line {}: node `{}` has no parent; attached to root",
                    header.line, header.name
                ));
                None
            }
            Some(".") | Some("") => Some(root_name.clone()),
            Some(p) => Some(format!("{root_name}/{}", p.trim_matches('/'))),
        };
        let declared = format!(
            "{}/{}",
            parent_path.as_deref().unwrap_or(&root_name),
            header.name
        );

        let mut path = declared.clone();
        let mut n = 2;
        while by_path.contains_key(&path) {
            path = format!("{declared}@{n}");
            n += 1;
        }
        if path != declared {
            warnings.push(format!(
                "line {}: duplicate node path `{declared}` renamed to `{path}`",
                header.line
            ));
        }

        let idx = arena.len();
        by_path.insert(path.clone(), idx);
        arena.push(Slot {
            header: Some(header),
            path,
            children: Vec::new(),
        });
        parents.push((idx, parent_path));
    }

    // Pass 2: link children to parents, in file order.
    for (idx, parent_path) in parents {
        let parent = match parent_path {
            None => 0,
            Some(p) => match by_path.get(&p) {
                Some(&parent) if parent != idx => parent,
                _ => {
                    if let Some(h) = arena[idx].header {
                        let raw = h.parent.as_deref().unwrap_or_default();
                        warnings.push(format!(
                            "line {}: missing parent `{raw}` for node `{}`; attached to root",
                            h.line, h.name
                        ));
                    }
                    0
                }
            },
        };
        arena[parent].children.push(idx);
    }

    Parsed::new(Some(materialize(&arena, 0)), warnings)
}

fn materialize(arena: &[Slot], idx: usize) -> SceneNode {
    let slot = &arena[idx];
    let (name, node_type, script, instance) = match slot.header {
        Some(h) => (
            h.name.clone(),
            h.node_type.clone(),
            h.script.clone(),
            h.instance.clone(),
        ),
        None => (SYNTHETIC_ROOT.to_string(), "Node".to_string(), None, None),
    };
    SceneNode {
        name,
        path: slot.path.clone(),
        node_type,
        script,
        instance,
        children: slot
            .children
            .iter()
            .map(|&child| materialize(arena, child))
            .collect(),
    }
}
