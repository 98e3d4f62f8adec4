//! GDScript analyzer.
//!
//! Every field of [`ScriptInfo`] comes from an independent line scan. Nothing
//! here parses the language: each scan is a conservative pattern match, and
//! anything it does not recognise is skipped rather than guessed.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use super::Parsed;
use crate::config::{ConnectCall, ConnectPattern, DeclaredSignal, ExportedField, ScriptInfo};
use crate::paths::{self, UID_SCHEME};

static CLASS_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*class_name\s+([A-Za-z_]\w*)").unwrap());

static EXTENDS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*(?:class_name\s+[A-Za-z_]\w*\s*,?\s*)?extends\s+("[^"]*"|'[^']*'|[^\s:]+)"#)
        .unwrap()
});

static SIGNAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*signal\s+([A-Za-z_]\w*)\s*(?:\(([^)]*)\))?").unwrap()
});

static VAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:static\s+)?var\s+([A-Za-z_]\w*)\s*(.*)$").unwrap());

static ANNOTATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^@([A-Za-z_]\w*)\s*(\([^)]*\))?\s*").unwrap());

static TYPE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][\w.]*(?:\[[\w., \[\]]*\])?$").unwrap()
});

static QUOTED_ARG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^\(\s*["']([^"']*)["']"#).unwrap());

/// Optional `^` / `&` prefix, then a single- or double-quoted literal.
static STRING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([\^&]?)(?:"((?:[^"\\]|\\.)*)"|'((?:[^'\\]|\\.)*)')"#).unwrap()
});

static PLAIN_PATH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w.\-/]+$").unwrap());

/// `[recv.]connect("signal"[, handler])`
static QUOTED_CONNECT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?:([$%]?[A-Za-z_]\w*(?:\([^()]*\))?(?:\s*\.\s*[A-Za-z_]\w*(?:\([^()]*\))?)*)\s*\.\s*)?\bconnect\s*\(\s*&?["']([^"']+)["']\s*(?:,\s*([A-Za-z_][\w.]*(?:\([^()]*\))?))?"#,
    )
    .unwrap()
});

/// `[recv.]signal.connect(handler)`
static PROPERTY_CONNECT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"([$%]?[A-Za-z_]\w*(?:\([^()]*\))?(?:\s*\.\s*[A-Za-z_]\w*(?:\([^()]*\))?)*)\s*\.\s*connect\s*\(\s*([&"']?)([A-Za-z_][\w.]*(?:\([^()]*\))?)?"#,
    )
    .unwrap()
});

/// Second argument of a call, captured after the first one.
static NEXT_ARG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*,\s*([A-Za-z_][\w.]*(?:\([^()]*\))?)").unwrap()
});

/// Extensions a bare (scheme-less) literal must end in to count as a reference.
const KNOWN_EXTENSIONS: &[&str] = &[
    "gd", "tscn", "scn", "tres", "res", "gdshader", "gdshaderinc", "png", "jpg", "jpeg", "webp",
    "bmp", "tga", "svg", "wav", "ogg", "mp3", "ttf", "otf", "json", "cfg", "csv",
];

const GROUP_ANNOTATIONS: &[&str] = &["export_category", "export_group", "export_subgroup"];

/// Text of `line` before any `#` comment that is not inside a string literal.
pub fn strip_comment(line: &str) -> &str {
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (idx, ch) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match (quote, ch) {
            (Some(_), '\\') => escaped = true,
            (Some(q), c) if c == q => quote = None,
            (None, '"') | (None, '\'') => quote = Some(ch),
            (None, '#') => return &line[..idx],
            _ => {}
        }
    }
    line
}

/// Analyse the script at `script_path`.
pub fn analyze_script(text: &str, script_path: &str) -> Parsed<ScriptInfo> {
    let base_dir = paths::parent_dir(script_path);
    let mut warnings = Vec::new();
    let code: Vec<(usize, &str)> = text
        .lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, strip_comment(line)))
        .filter(|(_, line)| !line.trim().is_empty())
        .collect();

    let (class_name, extends) = scan_declarations(&code);
    let exports = scan_exports(&code, &mut warnings);
    let info = ScriptInfo {
        path: script_path.to_string(),
        class_name,
        extends,
        exports,
        signals: scan_signals(&code),
        references: scan_literals(&code, base_dir),
        heuristic_connections: scan_connect_calls(&code),
        source: text.to_string(),
    };
    Parsed::new(info, warnings)
}

fn scan_declarations(code: &[(usize, &str)]) -> (Option<String>, Option<String>) {
    let class_name = code
        .iter()
        .find_map(|(_, line)| CLASS_NAME_RE.captures(line))
        .map(|cap| cap[1].to_string());
    let extends = code
        .iter()
        .find_map(|(_, line)| EXTENDS_RE.captures(line))
        .map(|cap| cap[1].trim_matches(|c| c == '"' || c == '\'').to_string());
    (class_name, extends)
}

fn scan_signals(code: &[(usize, &str)]) -> Vec<DeclaredSignal> {
    code.iter()
        .filter_map(|(line_no, line)| {
            let cap = SIGNAL_RE.captures(line)?;
            Some(DeclaredSignal {
                name: cap[1].to_string(),
                params: cap.get(2).map(|m| m.as_str().trim().to_string()),
                line: *line_no,
            })
        })
        .collect()
}

/// Running `@export_category` / `@export_group` / `@export_subgroup` labels.
#[derive(Default)]
struct GroupState {
    category: Option<String>,
    group: Option<String>,
    subgroup: Option<String>,
}

impl GroupState {
    fn apply(&mut self, annotation: &str, args: Option<&str>) {
        let label = args
            .and_then(|a| QUOTED_ARG_RE.captures(a))
            .map(|cap| cap[1].to_string())
            .filter(|s| !s.is_empty());
        match annotation {
            "export_category" => {
                self.category = label;
                self.group = None;
                self.subgroup = None;
            }
            "export_group" => {
                self.group = label;
                self.subgroup = None;
            }
            _ => self.subgroup = label,
        }
    }

    fn label(&self) -> Option<String> {
        let parts: Vec<&str> = [&self.category, &self.group, &self.subgroup]
            .into_iter()
            .filter_map(|p| p.as_deref())
            .collect();
        (!parts.is_empty()).then(|| parts.join(" / "))
    }
}

/// Split leading annotations off a stripped line.
fn take_annotations(line: &str) -> (Vec<(String, Option<String>)>, &str) {
    let mut rest = line;
    let mut found = Vec::new();
    while let Some(cap) = ANNOTATION_RE.captures(rest) {
        found.push((cap[1].to_string(), cap.get(2).map(|m| m.as_str().to_string())));
        rest = &rest[cap[0].len()..];
    }
    (found, rest)
}

fn scan_exports(code: &[(usize, &str)], warnings: &mut Vec<String>) -> Vec<ExportedField> {
    let mut exports: Vec<ExportedField> = Vec::new();
    let mut pending: Vec<String> = Vec::new();
    let mut pending_line = 0;
    let mut groups = GroupState::default();

    for (line_no, raw) in code {
        let line = raw.trim();
        let (annotations, rest) = take_annotations(line);

        let mut this_line = Vec::new();
        for (name, args) in annotations {
            if GROUP_ANNOTATIONS.contains(&name.as_str()) {
                groups.apply(&name, args.as_deref());
            } else {
                this_line.push(format!("@{name}{}", args.unwrap_or_default()));
            }
        }

        if rest.is_empty() {
            if pending.is_empty() && !this_line.is_empty() {
                pending_line = *line_no;
            }
            pending.extend(this_line);
            continue;
        }

        let mut attached = std::mem::take(&mut pending);
        attached.extend(this_line);
        let is_export = attached.iter().any(|a| a.starts_with("@export"));

        let Some(cap) = VAR_RE.captures(rest) else {
            if is_export {
                warnings.push(format!(
                    "line {pending_line}: export annotation not followed by a var"
                ));
            }
            continue;
        };
        if !is_export {
            continue;
        }

        let name = cap[1].to_string();
        let (type_hint, default) = split_declaration(&cap[2]);
        if let Some(pos) = exports.iter().position(|e| e.name == name) {
            let earlier = exports.remove(pos);
            warnings.push(format!(
                "line {line_no}: `{name}` exported again; declaration at line {} replaced",
                earlier.line
            ));
        }
        exports.push(ExportedField {
            name,
            type_hint,
            default,
            annotations: attached,
            group: groups.label(),
            line: *line_no,
        });
    }

    if pending.iter().any(|a| a.starts_with("@export")) {
        warnings.push(format!(
            "line {pending_line}: export annotation not followed by a var"
        ));
    }

    exports
}

/// Split what follows `var name` into type hint and default value.
fn split_declaration(rest: &str) -> (Option<String>, Option<String>) {
    let rest = rest.trim();
    // `var x: int = 3:` opens a property block; the trailing colon is syntax
    let rest = rest.strip_suffix(':').map(str::trim_end).unwrap_or(rest);
    let non_empty = |s: &str| Some(s.trim().to_string()).filter(|s| !s.is_empty());

    if let Some(value) = rest.strip_prefix(":=") {
        return (None, non_empty(value));
    }
    if let Some(typed) = rest.strip_prefix(':') {
        let (ty, default) = match typed.split_once('=') {
            Some((ty, value)) => (ty.trim(), non_empty(value)),
            None => (typed.trim(), None),
        };
        let ty = TYPE_RE.is_match(ty).then(|| ty.to_string());
        return (ty, default);
    }
    if let Some(value) = rest.strip_prefix('=') {
        return (None, non_empty(value));
    }
    (None, None)
}

/// Whether a literal is worth treating as a path, and its normalised form.
fn literal_reference(literal: &str, base_dir: &str) -> Option<String> {
    let s = literal.trim();
    if s.starts_with(paths::RES_SCHEME) {
        return paths::normalize_reference(s, base_dir);
    }
    if s.starts_with(UID_SCHEME) {
        return Some(s.to_string());
    }
    if s.contains("://") || !PLAIN_PATH_RE.is_match(s) {
        return None;
    }
    let ext = paths::extension(s)?;
    if !KNOWN_EXTENSIONS.contains(&ext.as_str()) {
        return None;
    }
    paths::normalize_reference(s, base_dir)
}

fn scan_literals(code: &[(usize, &str)], base_dir: &str) -> BTreeSet<String> {
    let mut refs = BTreeSet::new();
    for (_, line) in code {
        for cap in STRING_RE.captures_iter(line) {
            // ^"NodePath" and &"StringName" never name files
            if !cap[1].is_empty() {
                continue;
            }
            let Some(body) = cap.get(2).or_else(|| cap.get(3)) else {
                continue;
            };
            if let Some(reference) = literal_reference(body.as_str(), base_dir) {
                refs.insert(reference);
            }
        }
    }
    refs
}

fn handler_text(raw: Option<regex::Match<'_>>) -> Option<String> {
    raw.map(|m| m.as_str().trim()).filter(|h| !h.is_empty()).map(|h| {
        if h == "func" || h.starts_with("func(") {
            "<lambda>".to_string()
        } else {
            h.to_string()
        }
    })
}

fn compact(expr: &str) -> String {
    expr.split_whitespace().collect()
}

/// `recv.connect(name, handler)` where `name` is a plain identifier and the second
/// argument is a callable rather than a `CONNECT_*` flag.
fn signal_variable(line: &str, first: regex::Match<'_>) -> Option<(String, Option<String>)> {
    let name = first.as_str();
    if name.contains(['.', '(']) || name == "func" {
        return None;
    }
    let next = NEXT_ARG_RE.captures(&line[first.end()..])?.get(1)?;
    let text = next.as_str();
    if text.starts_with("CONNECT_") || text.contains(".CONNECT_") {
        return None;
    }
    Some((name.to_string(), handler_text(Some(next))))
}

fn scan_connect_calls(code: &[(usize, &str)]) -> Vec<ConnectCall> {
    let mut calls = Vec::new();
    for (line_no, line) in code {
        for cap in QUOTED_CONNECT_RE.captures_iter(line) {
            calls.push(ConnectCall {
                receiver: cap
                    .get(1)
                    .map(|m| compact(m.as_str()))
                    .unwrap_or_else(|| "self".to_string()),
                signal: cap[2].to_string(),
                handler: handler_text(cap.get(3)),
                pattern: ConnectPattern::QuotedSignal,
                line: *line_no,
            });
        }

        for cap in PROPERTY_CONNECT_RE.captures_iter(line) {
            if !cap[2].is_empty() {
                continue;
            }
            let chain = compact(&cap[1]);
            if let Some((signal, handler)) = cap.get(3).and_then(|arg| signal_variable(line, arg)) {
                calls.push(ConnectCall {
                    receiver: chain,
                    signal,
                    handler,
                    pattern: ConnectPattern::SignalVariable,
                    line: *line_no,
                });
                continue;
            }
            let (receiver, signal) = match chain.rsplit_once('.') {
                Some((recv, sig)) => (recv.to_string(), sig.to_string()),
                None => ("self".to_string(), chain.clone()),
            };
            if signal == "self" || signal.contains('(') || signal.starts_with(['$', '%']) {
                continue;
            }
            calls.push(ConnectCall {
                receiver,
                signal,
                handler: handler_text(cap.get(3)),
                pattern: ConnectPattern::SignalProperty,
                line: *line_no,
            });
        }
    }
    calls
}
