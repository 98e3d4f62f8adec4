//! The `[tag key=value ...]` block grammar shared by `.tscn` and `.tres` files.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use regex::Regex;

use crate::config::ResourceLink;
use crate::paths;

static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[([A-Za-z_]\w*)(?:\s+(.*))?\]\s*$").unwrap());

static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(\w+)\s*=\s*("(?:[^"\\]|\\.)*"|[A-Za-z_]\w*\([^)]*\)|\[[^\]]*\]|\S+)"#).unwrap()
});

static PROPERTY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z_][\w/:.\-]*)\s*=\s*(.*)$").unwrap());

static EXT_REF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"ExtResource\(\s*(?:"([^"]*)"|([^)]*?))\s*\)"#).unwrap()
});

/// One header line plus the `key = value` lines that follow it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Block {
    pub tag: String,
    pub attrs: BTreeMap<String, String>,
    pub properties: Vec<(String, String)>,
    /// 1-based line of the header.
    pub line: usize,
}

impl Block {
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).map(|s| s.as_str())
    }

    /// Last assignment wins, as in the engine.
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Strip one pair of surrounding double quotes.
pub fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

fn parse_attrs(header: &str) -> BTreeMap<String, String> {
    ATTR_RE
        .captures_iter(header)
        .map(|cap| (cap[1].to_string(), unquote(&cap[2]).to_string()))
        .collect()
}

/// Split text into blocks. Lines before the first header, comments and
/// continuation lines of multi-line values are ignored.
pub fn parse_blocks(text: &str) -> Vec<Block> {
    let mut blocks: Vec<Block> = Vec::new();

    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with(';') {
            continue;
        }

        if let Some(cap) = HEADING_RE.captures(line) {
            blocks.push(Block {
                tag: cap[1].to_string(),
                attrs: cap.get(2).map(|m| parse_attrs(m.as_str())).unwrap_or_default(),
                properties: Vec::new(),
                line: idx + 1,
            });
            continue;
        }

        if let (Some(block), Some(cap)) = (blocks.last_mut(), PROPERTY_RE.captures(line)) {
            block
                .properties
                .push((cap[1].to_string(), cap[2].trim().to_string()));
        }
    }

    blocks
}

/// The text with every header line removed. Literal scans run over this so a
/// file's own `uid` and the ext_resource `uid` attributes are not picked up.
pub fn body_text(text: &str) -> String {
    text.lines()
        .filter(|line| !HEADING_RE.is_match(line.trim()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// An `[ext_resource]` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtResource {
    pub id: String,
    /// Normalised `res://` path, or the uid when no path was given.
    pub path: String,
    pub resource_type: Option<String>,
    pub uid: Option<String>,
}

/// id → ext_resource lookup for one file.
#[derive(Debug, Clone, Default)]
pub struct ExtResourceTable {
    base_dir: String,
    by_id: BTreeMap<String, ExtResource>,
}

impl ExtResourceTable {
    /// Collect every `[ext_resource]` block; malformed ones are reported and skipped.
    pub fn from_blocks(blocks: &[Block], base_dir: &str, warnings: &mut Vec<String>) -> Self {
        let mut by_id = BTreeMap::new();
        for block in blocks.iter().filter(|b| b.tag == "ext_resource") {
            let id = block.attr("id").map(str::trim).filter(|s| !s.is_empty());
            let uid = block.attr("uid").map(str::to_string);
            let path = block
                .attr("path")
                .and_then(|p| paths::normalize_reference(p, base_dir))
                .or_else(|| uid.clone());

            match (id, path) {
                (Some(id), Some(path)) => {
                    by_id.insert(
                        id.to_string(),
                        ExtResource {
                            id: id.to_string(),
                            path,
                            resource_type: block.attr("type").map(str::to_string),
                            uid,
                        },
                    );
                }
                _ => warnings.push(format!(
                    "line {}: [ext_resource] without id or path skipped",
                    block.line
                )),
            }
        }
        Self {
            base_dir: base_dir.to_string(),
            by_id,
        }
    }

    pub fn get(&self, id: &str) -> Option<&ExtResource> {
        self.by_id.get(id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn paths(&self) -> BTreeSet<String> {
        self.by_id.values().map(|e| e.path.clone()).collect()
    }

    /// Interpret an attribute/property value such as `ExtResource("1_x")`,
    /// `"res://a.gd"` or `SubResource("2")`. `null` and unrelated values give `None`.
    pub fn resolve_link(&self, raw: &str) -> Option<ResourceLink> {
        let value = raw.trim();
        if value.is_empty() || value == "null" {
            return None;
        }

        if let Some(cap) = EXT_REF_RE.captures(value) {
            let id = cap
                .get(1)
                .or_else(|| cap.get(2))
                .map(|m| m.as_str().trim())
                .unwrap_or("");
            if id.is_empty() {
                return None;
            }
            return Some(match self.by_id.get(id) {
                Some(ext) if paths::is_identifier_scheme(&ext.path) => {
                    ResourceLink::Opaque(ext.path.clone())
                }
                Some(ext) => ResourceLink::Path(ext.path.clone()),
                None => ResourceLink::Unresolved(format!("ExtResource(\"{id}\")")),
            });
        }

        if let Some(found) = paths::scheme_literals(value, &self.base_dir).into_iter().next() {
            return Some(if paths::is_identifier_scheme(&found) {
                ResourceLink::Opaque(found)
            } else {
                ResourceLink::Path(found)
            });
        }

        if value.contains("SubResource") {
            return Some(ResourceLink::Unresolved(value.to_string()));
        }

        None
    }
}
