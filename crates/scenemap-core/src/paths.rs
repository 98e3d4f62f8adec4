//! `res://` path handling and reference classification.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

pub const RES_SCHEME: &str = "res://";
pub const UID_SCHEME: &str = "uid://";

static RES_LITERAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""(res://[^"]+)"|'(res://[^']+)'"#).unwrap());

static UID_LITERAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""(uid://[^"]+)"|'(uid://[^']+)'"#).unwrap());

static SCHEME_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.-]*://").unwrap());

/// How editor exclusion entries are matched against resource paths.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExclusionMatch {
    /// The resource path must equal the entry.
    #[default]
    Exact,
    /// The resource path must equal the entry or live underneath it.
    Prefix,
}

/// Turn a root-relative filesystem path (`levels/one.tscn`) into `res://levels/one.tscn`.
pub fn to_res_path(relative: &str) -> String {
    let rel = relative.replace('\\', "/");
    let rel = rel.trim_start_matches("./").trim_start_matches('/');
    format!("{RES_SCHEME}{}", normalize_segments(rel))
}

/// Whether the string is an opaque `scheme://id` reference (anything but `res://`).
pub fn is_identifier_scheme(s: &str) -> bool {
    !s.starts_with(RES_SCHEME) && SCHEME_PREFIX_RE.is_match(s)
}

/// Directory part of a `res://` path, itself as a `res://` path.
pub fn parent_dir(res_path: &str) -> &str {
    let tail = res_path.strip_prefix(RES_SCHEME).unwrap_or(res_path);
    match tail.rfind('/') {
        Some(idx) => &res_path[..res_path.len() - tail.len() + idx],
        None => RES_SCHEME,
    }
}

/// Final path segment.
pub fn file_name(res_path: &str) -> &str {
    let tail = res_path.strip_prefix(RES_SCHEME).unwrap_or(res_path);
    tail.rsplit('/').next().unwrap_or(tail)
}

/// Lowercased extension without the dot.
pub fn extension(path: &str) -> Option<String> {
    let name = file_name(path);
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Normalise a raw reference found in a file located in `base_dir`.
///
/// `res://` paths are cleaned, identifier schemes are returned verbatim, and
/// anything else is treated as relative to `base_dir`. Returns `None` for
/// empty input.
pub fn normalize_reference(raw: &str, base_dir: &str) -> Option<String> {
    let s = raw.trim().trim_matches('"').trim_matches('\'').trim();
    if s.is_empty() {
        return None;
    }
    if let Some(tail) = s.strip_prefix(RES_SCHEME) {
        return Some(format!("{RES_SCHEME}{}", normalize_segments(tail)));
    }
    if is_identifier_scheme(s) {
        return Some(s.to_string());
    }
    let base = base_dir.strip_prefix(RES_SCHEME).unwrap_or(base_dir);
    let joined = if s.starts_with('/') || base.is_empty() {
        s.trim_start_matches('/').to_string()
    } else {
        format!("{base}/{s}")
    };
    Some(format!("{RES_SCHEME}{}", normalize_segments(&joined)))
}

/// Collapse `.` / `..` / empty segments. `..` at the project root is dropped.
fn normalize_segments(path: &str) -> String {
    let path = path.replace('\\', "/");
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "." | "" => {}
            ".." => {
                parts.pop();
            }
            _ => parts.push(segment),
        }
    }
    parts.join("/")
}

/// Every quoted `res://` or `uid://` literal in `text`, normalised against `base_dir`.
pub fn scheme_literals(text: &str, base_dir: &str) -> BTreeSet<String> {
    let mut refs = BTreeSet::new();
    for cap in RES_LITERAL_RE.captures_iter(text) {
        if let Some(m) = cap.get(1).or_else(|| cap.get(2)) {
            if let Some(p) = normalize_reference(m.as_str(), base_dir) {
                refs.insert(p);
            }
        }
    }
    for cap in UID_LITERAL_RE.captures_iter(text) {
        if let Some(m) = cap.get(1).or_else(|| cap.get(2)) {
            refs.insert(m.as_str().trim().to_string());
        }
    }
    refs
}

/// Whether `path` is covered by the editor exclusion `entry`.
pub fn matches_exclusion(path: &str, entry: &str, mode: ExclusionMatch) -> bool {
    match mode {
        ExclusionMatch::Exact => path == entry,
        ExclusionMatch::Prefix => {
            if path == entry {
                return true;
            }
            let dir = entry.trim_end_matches('/');
            // "res://" itself trims to "res:" and would otherwise never match
            if dir == "res:" {
                return path.starts_with(RES_SCHEME);
            }
            path.strip_prefix(dir)
                .is_some_and(|rest| rest.starts_with('/'))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn res_path_from_relative() {
        assert_eq!(to_res_path("levels/one.tscn"), "res://levels/one.tscn");
        assert_eq!(to_res_path("levels\\one.tscn"), "res://levels/one.tscn");
        assert_eq!(to_res_path("./main.gd"), "res://main.gd");
    }

    #[test]
    fn normalizes_res_paths() {
        assert_eq!(
            normalize_reference("res://a/./b/../c.png", "res://"),
            Some("res://a/c.png".to_string())
        );
        assert_eq!(
            normalize_reference("res:///main.tscn", "res://"),
            Some("res://main.tscn".to_string())
        );
    }

    #[test]
    fn relative_references_resolve_against_base() {
        assert_eq!(
            normalize_reference("../art/hero.png", "res://levels/forest"),
            Some("res://levels/art/hero.png".to_string())
        );
        assert_eq!(
            normalize_reference("hero.png", "res://"),
            Some("res://hero.png".to_string())
        );
        assert_eq!(
            normalize_reference("../../../x.png", "res://a"),
            Some("res://x.png".to_string())
        );
    }

    #[test]
    fn identifier_schemes_are_opaque() {
        assert!(is_identifier_scheme("uid://b8x7k2"));
        assert!(!is_identifier_scheme("res://main.gd"));
        assert!(!is_identifier_scheme("main.gd"));
        assert_eq!(
            normalize_reference("\"uid://b8x7k2\"", "res://levels"),
            Some("uid://b8x7k2".to_string())
        );
    }

    #[test]
    fn empty_reference_is_none() {
        assert_eq!(normalize_reference("  \"\" ", "res://"), None);
    }

    #[test]
    fn dir_name_and_extension() {
        assert_eq!(parent_dir("res://levels/one.tscn"), "res://levels");
        assert_eq!(parent_dir("res://main.gd"), "res://");
        assert_eq!(file_name("res://levels/one.tscn"), "one.tscn");
        assert_eq!(extension("res://art/Hero.PNG").as_deref(), Some("png"));
        assert_eq!(extension("res://.gitignore"), None);
        assert_eq!(extension("res://LICENSE"), None);
    }

    #[test]
    fn scheme_literals_collects_res_and_uid() {
        let text = r#"var a = preload("res://a.gd")
var b = load('res://sub/../b.tscn')
var c = "uid://abc123"
var d = "plain string"
"#;
        let refs = scheme_literals(text, "res://");
        let expected: BTreeSet<String> = ["res://a.gd", "res://b.tscn", "uid://abc123"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(refs, expected);
    }

    #[test]
    fn exclusion_matching_modes() {
        assert!(matches_exclusion("res://a.png", "res://a.png", ExclusionMatch::Exact));
        assert!(!matches_exclusion("res://art/a.png", "res://art", ExclusionMatch::Exact));
        assert!(matches_exclusion("res://art/a.png", "res://art", ExclusionMatch::Prefix));
        assert!(matches_exclusion("res://art/a.png", "res://art/", ExclusionMatch::Prefix));
        assert!(!matches_exclusion("res://artwork/a.png", "res://art", ExclusionMatch::Prefix));
        assert!(matches_exclusion("res://x.png", "res://", ExclusionMatch::Prefix));
    }
}
