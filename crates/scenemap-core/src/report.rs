//! Markdown rendering of a [`ProjectModel`].
//!
//! The report is one document with a fixed section order. Everything except the
//! generation timestamp is derived from the model, so two renders of the same
//! model with the same options are identical.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::config::{ConnectPattern, FileKind, ResourceLink, SceneNode};
use crate::model::ProjectModel;
use crate::paths;

/// Rendering switches that are not part of the model.
#[derive(Debug, Clone)]
pub struct ReportOptions {
    /// Shown in the header; usually the directory that was scanned.
    pub project_root: String,
    pub generated_at: DateTime<Utc>,
    pub include_script_contents: bool,
}

impl ReportOptions {
    pub fn new(project_root: impl Into<String>) -> Self {
        Self {
            project_root: project_root.into(),
            generated_at: Utc::now(),
            include_script_contents: true,
        }
    }
}

/// Render the whole report.
pub fn render_report(model: &ProjectModel, options: &ReportOptions) -> String {
    let mut out = String::new();

    render_header(&mut out, model, options);
    render_settings(&mut out, model);
    render_input_map(&mut out, model);

    let _ = writeln!(out, "## File Tree\n");
    out.push_str(&fenced(&render_file_tree(model.files.keys()), "text"));
    out.push('\n');

    render_scenes(&mut out, model);
    render_class_registry(&mut out, model);
    render_exports(&mut out, model);
    render_signals(&mut out, model);
    render_dependency_graph(&mut out, model);
    render_usage(&mut out, model);
    render_unused(&mut out, model);
    render_warnings(&mut out, model);
    render_scripts(&mut out, model, options.include_script_contents);
    render_caveats(&mut out);

    out
}

/// A fence of `ch` strictly longer than any run of `ch` inside `text`, and at least three long.
pub fn choose_fence(text: &str, ch: char) -> String {
    let mut longest = 0;
    let mut run = 0;
    for c in text.chars() {
        if c == ch {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }
    std::iter::repeat(ch).take((longest + 1).max(3)).collect()
}

/// Wrap `text` in a tilde fence that it cannot close early.
pub fn fenced(text: &str, lang: &str) -> String {
    let fence = choose_fence(text, '~');
    format!("{fence}{lang}\n{text}\n{fence}\n")
}

/// Inline code for a table cell; pipes are escaped so the row stays intact.
fn cell(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let ticks = choose_fence(text, '`');
    // single backtick unless the text itself contains one
    let ticks = if text.contains('`') { ticks } else { "`".to_string() };
    let pad = if text.starts_with('`') || text.ends_with('`') { " " } else { "" };
    format!("{ticks}{pad}{}{pad}{ticks}", text.replace('|', "\\|"))
}

fn plain_cell(text: &str) -> String {
    text.replace('|', "\\|")
}

fn link_label(link: &ResourceLink) -> String {
    match link {
        ResourceLink::Path(_) | ResourceLink::Opaque(_) => link.label().to_string(),
        ResourceLink::Unresolved(raw) => format!("unresolved: {raw}"),
    }
}

/// One line per node: `Name (Type) <instance> [script]`, two spaces per depth level.
pub fn render_scene_tree(root: &SceneNode) -> String {
    fn walk(node: &SceneNode, depth: usize, lines: &mut Vec<String>) {
        let mut line = format!("{}{} ({})", "  ".repeat(depth), node.name, node.node_type);
        if let Some(instance) = &node.instance {
            let _ = write!(line, " <{}>", link_label(instance));
        }
        if let Some(script) = &node.script {
            let _ = write!(line, " [{}]", link_label(script));
        }
        lines.push(line);
        for child in &node.children {
            walk(child, depth + 1, lines);
        }
    }

    let mut lines = Vec::new();
    walk(root, 0, &mut lines);
    lines.join("\n")
}

#[derive(Default)]
struct DirEntry {
    dirs: BTreeMap<String, DirEntry>,
    files: BTreeSet<String>,
}

/// Indented tree of `res://` paths: directories first, then files, each sorted.
pub fn render_file_tree<'a>(res_paths: impl IntoIterator<Item = &'a String>) -> String {
    let mut root = DirEntry::default();
    for path in res_paths {
        let relative = path.strip_prefix(paths::RES_SCHEME).unwrap_or(path);
        let mut parts: Vec<&str> = relative.split('/').filter(|p| !p.is_empty()).collect();
        let Some(file) = parts.pop() else { continue };
        let mut dir = &mut root;
        for part in parts {
            dir = dir.dirs.entry(part.to_string()).or_default();
        }
        dir.files.insert(file.to_string());
    }

    fn walk(dir: &DirEntry, depth: usize, lines: &mut Vec<String>) {
        let pad = "  ".repeat(depth);
        for (name, sub) in &dir.dirs {
            lines.push(format!("{pad}{name}/"));
            walk(sub, depth + 1, lines);
        }
        for name in &dir.files {
            lines.push(format!("{pad}{name}"));
        }
    }

    let mut lines = vec![paths::RES_SCHEME.to_string()];
    walk(&root, 1, &mut lines);
    lines.join("\n")
}

/// Mermaid `graph TD` block. Node ids are positional so distinct paths never collide.
pub fn mermaid_graph(edges: &[(String, String)], title: &str) -> String {
    let nodes: BTreeSet<&str> = edges
        .iter()
        .flat_map(|(a, b)| [a.as_str(), b.as_str()])
        .collect();
    let ids: BTreeMap<&str, String> = nodes
        .iter()
        .enumerate()
        .map(|(i, n)| (*n, format!("N{i}")))
        .collect();

    let mut out = String::new();
    let _ = writeln!(out, "```mermaid");
    let _ = writeln!(out, "graph TD");
    let _ = writeln!(out, "%% {title}");
    for node in &nodes {
        let _ = writeln!(out, "{}[\"{}\"]", ids[node], node.replace('"', "#quot;"));
    }
    for (a, b) in edges {
        let _ = writeln!(out, "{} --> {}", ids[a.as_str()], ids[b.as_str()]);
    }
    let _ = writeln!(out, "```");
    out
}

fn render_header(out: &mut String, model: &ProjectModel, options: &ReportOptions) {
    let _ = writeln!(out, "# Godot Project Report\n");
    let _ = writeln!(
        out,
        "- Generated at: {}",
        options.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    let _ = writeln!(out, "- Project root: `{}`", options.project_root);
    let _ = writeln!(out, "- Files: {}", model.files.len());
    let _ = writeln!(out, "- Scenes: {}", model.count_of(FileKind::Scene));
    let _ = writeln!(out, "- Scripts: {}", model.count_of(FileKind::Script));
    let _ = writeln!(
        out,
        "- Text resources (.tres): {}",
        model.count_of(FileKind::ResourceDefinition)
    );
    let _ = writeln!(out, "- Resource files (for unused check): {}", model.resources.len());
    let _ = writeln!(
        out,
        "- Nodes: {}, persisted connections: {}",
        model.node_count(),
        model.connection_count()
    );
    let _ = writeln!(out, "- Usage edges: {}", model.edges.len());
    let _ = writeln!(out, "- Warnings: {}\n", model.warnings.len());
}

fn render_settings(out: &mut String, model: &ProjectModel) {
    let _ = writeln!(out, "## Project Settings\n");
    let _ = writeln!(out, "- Main scene: {}", cell(model.main_scene().unwrap_or("")));
    if model.settings.autoloads.is_empty() {
        let _ = writeln!(out, "- Autoloads: (none detected)");
    } else {
        let _ = writeln!(out, "- Autoloads:");
        for autoload in &model.settings.autoloads {
            let marker = if autoload.singleton { " (singleton)" } else { "" };
            let _ = writeln!(out, "  - `{}` → `{}`{marker}", autoload.name, autoload.path);
        }
    }
    let _ = writeln!(
        out,
        "- Editor recent/auto references (excluded from unused): {}\n",
        model.editor_references.len()
    );
}

fn render_input_map(out: &mut String, model: &ProjectModel) {
    let _ = writeln!(out, "## Input Map\n");
    let actions = &model.settings.input_actions;
    if actions.is_empty() {
        let _ = writeln!(out, "(No [input] section found.)\n");
        return;
    }

    let _ = writeln!(out, "| action | deadzone | events |");
    let _ = writeln!(out, "|---|---:|---|");
    for (name, action) in actions {
        let deadzone = action.deadzone.map(|d| d.to_string()).unwrap_or_default();
        let events = if action.events.is_empty() {
            "(no events parsed)".to_string()
        } else {
            action
                .events
                .iter()
                .map(|e| plain_cell(e))
                .collect::<Vec<_>>()
                .join("<br>")
        };
        let _ = writeln!(out, "| {} | {} | {events} |", cell(name), cell(&deadzone));
    }
    out.push('\n');

    let raw: Vec<String> = actions
        .iter()
        .map(|(name, action)| format!("{name}={}", action.raw))
        .collect();
    let _ = writeln!(out, "<details><summary>Raw input map</summary>\n");
    out.push_str(&fenced(&raw.join("\n"), "text"));
    let _ = writeln!(out, "</details>\n");
}

fn render_scenes(out: &mut String, model: &ProjectModel) {
    let _ = writeln!(out, "## Scene Node Trees\n");
    if model.scenes.is_empty() {
        let _ = writeln!(out, "(No scenes found.)\n");
        return;
    }

    for (path, scene) in &model.scenes {
        let _ = writeln!(out, "### {}\n", paths::file_name(path));
        let _ = writeln!(out, "`{path}`\n");

        match &scene.root {
            Some(root) => out.push_str(&fenced(&render_scene_tree(root), "text")),
            None => {
                let _ = writeln!(out, "> Failed to parse this scene.");
            }
        }
        out.push('\n');

        if !scene.connections.is_empty() {
            let _ = writeln!(out, "**Persisted signal connections**\n");
            let _ = writeln!(out, "| from | signal | to | method |");
            let _ = writeln!(out, "|---|---|---|---|");
            for c in &scene.connections {
                let _ = writeln!(
                    out,
                    "| {} | {} | {} | {} |",
                    cell(&c.from),
                    cell(&c.signal),
                    cell(&c.to),
                    cell(c.method.as_deref().unwrap_or(""))
                );
            }
            out.push('\n');
        }

        let warnings: Vec<_> = model.warnings_for(path).collect();
        if !warnings.is_empty() {
            let _ = writeln!(out, "> Warnings:");
            for w in warnings {
                let _ = writeln!(out, "> - {}", w.message);
            }
            out.push('\n');
        }
    }
}

fn render_class_registry(out: &mut String, model: &ProjectModel) {
    let _ = writeln!(out, "## Script Registry\n");
    if model.class_registry.is_empty() {
        let _ = writeln!(out, "(No `class_name` found.)\n");
        return;
    }
    let _ = writeln!(out, "| class_name | script | extends |");
    let _ = writeln!(out, "|---|---|---|");
    for entry in model.class_registry.values() {
        let _ = writeln!(
            out,
            "| {} | {} | {} |",
            cell(&entry.class_name),
            cell(&entry.script),
            cell(entry.extends.as_deref().unwrap_or(""))
        );
    }
    out.push('\n');
}

fn render_exports(out: &mut String, model: &ProjectModel) {
    let _ = writeln!(out, "## Exported Variables\n");
    let rows: Vec<_> = model
        .scripts
        .values()
        .flat_map(|s| s.exports.iter().map(move |e| (s.path.as_str(), e)))
        .collect();
    if rows.is_empty() {
        let _ = writeln!(out, "(No `@export` variables found.)\n");
        return;
    }
    let _ = writeln!(out, "| script | var | type | default | group | annotations |");
    let _ = writeln!(out, "|---|---|---|---|---|---|");
    for (script, field) in rows {
        let _ = writeln!(
            out,
            "| {} | {} | {} | {} | {} | {} |",
            cell(script),
            cell(&field.name),
            cell(field.type_hint.as_deref().unwrap_or("")),
            cell(field.default.as_deref().unwrap_or("")),
            cell(field.group.as_deref().unwrap_or("")),
            cell(&field.annotations.join(" "))
        );
    }
    out.push('\n');
}

fn render_signals(out: &mut String, model: &ProjectModel) {
    let _ = writeln!(out, "## Signal Mapping\n");

    let _ = writeln!(out, "### Persisted scene connections\n");
    let persisted: Vec<_> = model
        .scenes
        .iter()
        .flat_map(|(path, s)| s.connections.iter().map(move |c| (path.as_str(), c)))
        .collect();
    if persisted.is_empty() {
        let _ = writeln!(out, "(No persisted connections found.)\n");
    } else {
        let _ = writeln!(out, "| scene | from | signal | to | method |");
        let _ = writeln!(out, "|---|---|---|---|---|");
        for (scene, c) in persisted {
            let _ = writeln!(
                out,
                "| {} | {} | {} | {} | {} |",
                cell(scene),
                cell(&c.from),
                cell(&c.signal),
                cell(&c.to),
                cell(c.method.as_deref().unwrap_or(""))
            );
        }
        out.push('\n');
    }

    let _ = writeln!(out, "### Declared signals\n");
    let declared: Vec<_> = model
        .scripts
        .values()
        .flat_map(|s| s.signals.iter().map(move |sig| (s.path.as_str(), sig)))
        .collect();
    if declared.is_empty() {
        let _ = writeln!(out, "(No `signal` declarations found.)\n");
    } else {
        let _ = writeln!(out, "| script | signal | params |");
        let _ = writeln!(out, "|---|---|---|");
        for (script, sig) in declared {
            let _ = writeln!(
                out,
                "| {} | {} | {} |",
                cell(script),
                cell(&sig.name),
                cell(sig.params.as_deref().unwrap_or(""))
            );
        }
        out.push('\n');
    }

    let _ = writeln!(out, "### Code `connect()` calls (heuristic)\n");
    let mut any = false;
    for script in model.scripts.values().filter(|s| !s.heuristic_connections.is_empty()) {
        any = true;
        let _ = writeln!(out, "- `{}`", script.path);
        for call in &script.heuristic_connections {
            let shape = match call.pattern {
                ConnectPattern::QuotedSignal => {
                    format!("{}.connect(\"{}\")", call.receiver, call.signal)
                }
                ConnectPattern::SignalProperty => {
                    format!("{}.{}.connect()", call.receiver, call.signal)
                }
                ConnectPattern::SignalVariable => {
                    format!("{}.connect({})", call.receiver, call.signal)
                }
            };
            let handler = call
                .handler
                .as_deref()
                .map(|h| format!(" → `{h}`"))
                .unwrap_or_default();
            let _ = writeln!(out, "  - line {}: `{shape}`{handler}", call.line);
        }
    }
    if !any {
        let _ = writeln!(out, "(No `connect()` patterns detected.)");
    }
    out.push('\n');
}

fn render_dependency_graph(out: &mut String, model: &ProjectModel) {
    let _ = writeln!(out, "## Script Dependency Graph\n");
    if model.script_dependencies.is_empty() {
        let _ = writeln!(out, "(No script → script edges detected.)\n");
        return;
    }
    out.push_str(&mermaid_graph(
        &model.script_dependencies,
        "script -> script dependencies",
    ));
    out.push('\n');
}

fn render_usage(out: &mut String, model: &ProjectModel) {
    let _ = writeln!(out, "## Resource Usage\n");
    let _ = writeln!(out, "> `target` ← referenced by `sources`\n");
    if model.reverse_index.is_empty() {
        let _ = writeln!(out, "(No resource usage edges detected.)\n");
        return;
    }
    let mut lines = Vec::new();
    for (target, sources) in &model.reverse_index {
        lines.push(target.clone());
        lines.extend(sources.iter().map(|s| format!("  <- {s}")));
        lines.push(String::new());
    }
    let body = lines.join("\n");
    let _ = writeln!(out, "<details><summary>Show usage map</summary>\n");
    out.push_str(&fenced(body.trim_end(), "text"));
    let _ = writeln!(out, "</details>\n");
}

fn render_unused(out: &mut String, model: &ProjectModel) {
    let _ = writeln!(out, "## Unused Resources\n");
    let _ = writeln!(
        out,
        "> Not referenced by any scanned file, not the main scene or an autoload, and not in the editor's recent/auto references.\n"
    );
    if model.unused_resources.is_empty() {
        let _ = writeln!(out, "(No unused resources detected.)\n");
        return;
    }
    let _ = writeln!(out, "- Unused count: **{}**\n", model.unused_resources.len());

    let mut by_ext: BTreeMap<String, Vec<&str>> = BTreeMap::new();
    for path in &model.unused_resources {
        let ext = paths::extension(path)
            .map(|e| format!(".{e}"))
            .unwrap_or_else(|| "(no extension)".to_string());
        by_ext.entry(ext).or_default().push(path);
    }
    for (ext, group) in by_ext {
        let _ = writeln!(out, "### {ext}\n");
        out.push_str(&fenced(&group.join("\n"), "text"));
        out.push('\n');
    }
}

fn render_warnings(out: &mut String, model: &ProjectModel) {
    let _ = writeln!(out, "## Warnings\n");
    if model.warnings.is_empty() {
        let _ = writeln!(out, "(No warnings.)\n");
        return;
    }
    let mut current: Option<&str> = None;
    for w in &model.warnings {
        if current != Some(w.file.as_str()) {
            if current.is_some() {
                out.push('\n');
            }
            let _ = writeln!(out, "- `{}`", w.file);
            current = Some(&w.file);
        }
        let _ = writeln!(out, "  - {}", w.message);
    }
    out.push('\n');
}

fn render_scripts(out: &mut String, model: &ProjectModel, include_contents: bool) {
    let _ = writeln!(out, "## Scripts\n");
    if model.scripts.is_empty() {
        let _ = writeln!(out, "(No scripts found.)\n");
        return;
    }
    for script in model.scripts.values() {
        let _ = writeln!(out, "### {}\n", paths::file_name(&script.path));
        let _ = writeln!(out, "`{}`\n", script.path);
        let _ = writeln!(
            out,
            "- class_name: {}",
            cell(script.class_name.as_deref().unwrap_or(""))
        );
        let _ = writeln!(out, "- extends: {}", cell(script.extends.as_deref().unwrap_or("")));
        let _ = writeln!(out, "- referenced paths: {}", script.references.len());
        let _ = writeln!(out, "- exported vars: {}", script.exports.len());
        let _ = writeln!(out, "- declared signals: {}", script.signals.len());
        let used_by = model.used_by(&script.path);
        if !used_by.is_empty() {
            let _ = writeln!(out, "- used by: {}", used_by.join(", "));
        }
        out.push('\n');

        if include_contents {
            out.push_str(&fenced(script.source.trim_end(), "gdscript"));
            out.push('\n');
        }
    }
}

fn render_caveats(out: &mut String) {
    let _ = writeln!(out, "## Caveats\n");
    let _ = writeln!(
        out,
        "- Extraction is pattern based. Dynamically built paths and runtime loads are not detected."
    );
    let _ = writeln!(
        out,
        "- `uid://` references are kept verbatim and never resolved to files."
    );
    let _ = writeln!(
        out,
        "- Editor metadata is only used to keep recently opened files out of the unused list."
    );
}
