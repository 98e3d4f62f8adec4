//! Core data types and configuration for scenemap analysis.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::paths::{self, ExclusionMatch};

/// Kind of a discovered project file, decided by name/extension.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    Settings,
    Scene,
    ResourceDefinition,
    Script,
    Other,
}

impl FileKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Settings => "settings",
            Self::Scene => "scene",
            Self::ResourceDefinition => "resource_definition",
            Self::Script => "script",
            Self::Other => "other",
        }
    }

    /// Classify a `res://` path. Only the root `project.godot` is a settings file;
    /// binary `.scn` / `.res` are deliberately `Other`.
    pub fn from_path(res_path: &str) -> Self {
        if res_path == "res://project.godot" {
            return Self::Settings;
        }
        match paths::extension(res_path).as_deref() {
            Some("tscn") => Self::Scene,
            Some("tres") => Self::ResourceDefinition,
            Some("gd") => Self::Script,
            _ => Self::Other,
        }
    }

    /// Whether the core parses files of this kind.
    pub fn is_text_format(&self) -> bool {
        !matches!(self, Self::Other)
    }
}

impl std::fmt::Display for FileKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One discovered file, as handed to the core by the traversal phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFile {
    /// `res://`-prefixed, root-relative path.
    pub path: String,
    pub kind: FileKind,
    /// False when the file could not be read or decoded; `content` is then empty.
    pub readable: bool,
    pub content: String,
}

impl SourceFile {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            kind: FileKind::from_path(&path),
            path,
            readable: true,
            content: content.into(),
        }
    }

    pub fn unreadable(path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            kind: FileKind::from_path(&path),
            path,
            readable: false,
            content: String::new(),
        }
    }
}

/// Everything the core consumes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanInput {
    pub files: Vec<SourceFile>,
    /// Opaque `res://` / `uid://` strings from editor-local metadata.
    pub editor_references: Vec<String>,
}

/// A non-fatal problem attached to one file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct ScanWarning {
    pub file: String,
    pub message: String,
}

impl ScanWarning {
    pub fn new(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// A typed settings value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum SettingValue {
    Str(String),
    Bool(bool),
    Int(i64),
    Float(f64),
    List(Vec<SettingValue>),
    /// Dictionaries, constructor calls and anything else, verbatim.
    Raw(String),
}

impl SettingValue {
    /// Plain-text rendering; strings come back unquoted.
    pub fn as_text(&self) -> String {
        match self {
            Self::Str(s) | Self::Raw(s) => s.clone(),
            Self::Bool(b) => b.to_string(),
            Self::Int(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
            Self::List(items) => {
                let inner: Vec<String> = items
                    .iter()
                    .map(|v| match v {
                        Self::Str(s) => format!("\"{s}\""),
                        other => other.as_text(),
                    })
                    .collect();
                format!("[{}]", inner.join(", "))
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Autoload {
    pub name: String,
    pub path: String,
    /// `*`-prefixed entries are registered as global singletons.
    pub singleton: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct InputAction {
    pub deadzone: Option<f64>,
    /// Human-readable summary per bound event.
    pub events: Vec<String>,
    pub raw: String,
}

/// Parsed `project.godot`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProjectSettings {
    /// section → key → value. Keys before the first section live under `""`.
    pub sections: BTreeMap<String, BTreeMap<String, SettingValue>>,
    pub main_scene: Option<String>,
    pub autoloads: Vec<Autoload>,
    pub input_actions: BTreeMap<String, InputAction>,
}

impl ProjectSettings {
    pub fn get(&self, section: &str, key: &str) -> Option<&SettingValue> {
        self.sections.get(section).and_then(|s| s.get(key))
    }
}

// ---------------------------------------------------------------------------
// Scenes
// ---------------------------------------------------------------------------

/// Where a node's script or instance points.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(tag = "kind", content = "target", rename_all = "snake_case")]
pub enum ResourceLink {
    /// A normalised `res://` path.
    Path(String),
    /// An identifier-scheme reference such as `uid://...`.
    Opaque(String),
    /// Could not be turned into a path (unknown `ExtResource` id, `SubResource`, ...).
    Unresolved(String),
}

impl ResourceLink {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Path(s) | Self::Opaque(s) | Self::Unresolved(s) => s,
        }
    }

    /// Edge target for this link, if it names something.
    pub fn target(&self) -> Option<&str> {
        match self {
            Self::Path(s) | Self::Opaque(s) => Some(s),
            Self::Unresolved(_) => None,
        }
    }

    /// Short label: file name for paths, verbatim otherwise.
    pub fn label(&self) -> &str {
        match self {
            Self::Path(s) => paths::file_name(s),
            Self::Opaque(s) | Self::Unresolved(s) => s,
        }
    }
}

/// A node in a scene tree. Owns its children.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SceneNode {
    pub name: String,
    /// Path from the scene root, root name included (`Main/Player/Sprite`).
    pub path: String,
    pub node_type: String,
    pub script: Option<ResourceLink>,
    pub instance: Option<ResourceLink>,
    #[serde(default)]
    pub children: Vec<SceneNode>,
}

impl SceneNode {
    /// Depth-first, parent-before-children, in file order.
    pub fn iter(&self) -> SceneNodeIter<'_> {
        SceneNodeIter { stack: vec![self] }
    }

    /// Number of nodes in this subtree, itself included.
    pub fn count(&self) -> usize {
        self.iter().count()
    }

    pub fn find(&self, path: &str) -> Option<&SceneNode> {
        self.iter().find(|n| n.path == path)
    }
}

pub struct SceneNodeIter<'a> {
    stack: Vec<&'a SceneNode>,
}

impl<'a> Iterator for SceneNodeIter<'a> {
    type Item = &'a SceneNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

/// A persisted `[connection ...]` record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SceneConnection {
    pub signal: String,
    pub from: String,
    pub to: String,
    pub method: Option<String>,
    pub flags: Option<String>,
}

/// One parsed `.tscn`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SceneInfo {
    pub path: String,
    pub uid: Option<String>,
    pub root: Option<SceneNode>,
    pub connections: Vec<SceneConnection>,
    /// ext_resource paths plus every `res://` / `uid://` literal in the file.
    pub references: BTreeSet<String>,
}

// ---------------------------------------------------------------------------
// Scripts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExportedField {
    pub name: String,
    /// None when inferred (`:=`), absent, or not understood.
    pub type_hint: Option<String>,
    pub default: Option<String>,
    pub annotations: Vec<String>,
    pub group: Option<String>,
    pub line: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeclaredSignal {
    pub name: String,
    pub params: Option<String>,
    pub line: usize,
}

/// Which call shape produced a heuristic connection.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConnectPattern {
    /// `recv.connect("signal", ...)` or bare `connect("signal", ...)`.
    QuotedSignal,
    /// `recv.signal.connect(handler)`.
    SignalProperty,
    /// `recv.connect(signal_var, handler)`: the signal name is held in a variable.
    SignalVariable,
}

/// A best-effort `connect` call found in script text. Never authoritative.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConnectCall {
    /// Receiver expression text; `self` when the call had none.
    pub receiver: String,
    pub signal: String,
    pub handler: Option<String>,
    pub pattern: ConnectPattern,
    pub line: usize,
}

/// One analysed `.gd`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ScriptInfo {
    pub path: String,
    pub class_name: Option<String>,
    pub extends: Option<String>,
    pub exports: Vec<ExportedField>,
    pub signals: Vec<DeclaredSignal>,
    pub references: BTreeSet<String>,
    pub heuristic_connections: Vec<ConnectCall>,
    pub source: String,
}

// ---------------------------------------------------------------------------
// Resource definitions
// ---------------------------------------------------------------------------

/// One parsed `.tres`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ResourceDefinition {
    pub path: String,
    pub resource_type: Option<String>,
    pub script_class: Option<String>,
    pub uid: Option<String>,
    pub references: BTreeSet<String>,
}

// ---------------------------------------------------------------------------
// Edges
// ---------------------------------------------------------------------------

/// Why a usage edge exists.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    ProjectSetting,
    NodeScript,
    NodeInstance,
    SceneResource,
    ScriptLiteral,
    ClassReference,
    ResourceReference,
}

impl EdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProjectSetting => "project_setting",
            Self::NodeScript => "node_script",
            Self::NodeInstance => "node_instance",
            Self::SceneResource => "scene_resource",
            Self::ScriptLiteral => "script_literal",
            Self::ClassReference => "class_reference",
            Self::ResourceReference => "resource_reference",
        }
    }
}

impl std::fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether an edge target was found among the scanned files.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    Resolved,
    /// Identifier-scheme target, kept verbatim and never matched.
    Opaque,
    Missing,
}

/// Directed `source file → referenced path`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct UsageEdge {
    pub source: String,
    pub target: String,
    pub kind: EdgeKind,
    pub resolution: Resolution,
}

/// `class_name` registry row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct ClassEntry {
    pub class_name: String,
    pub script: String,
    pub extends: Option<String>,
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for a scan run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    #[serde(default)]
    pub project_root: String,
    pub output_path: Option<String>,
    pub json_output_path: Option<String>,
    #[serde(default = "default_include_script_contents")]
    pub include_script_contents: bool,
    #[serde(default = "default_ignore_dirs")]
    pub ignore_dirs: Vec<String>,
    #[serde(default = "default_ignore_files")]
    pub ignore_files: Vec<String>,
    /// Extensions (lowercase, no dot) considered for the unused-resource check.
    #[serde(default = "default_resource_extensions")]
    pub resource_extensions: Vec<String>,
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    #[serde(default)]
    pub exclusion_match: ExclusionMatch,
    #[serde(default = "default_class_name_references")]
    pub class_name_references: bool,
    #[serde(default)]
    pub verbose: bool,
    #[serde(default)]
    pub quiet: bool,
}

fn default_include_script_contents() -> bool {
    true
}
fn default_ignore_dirs() -> Vec<String> {
    [".git", ".godot", ".import", "__pycache__", ".venv", "venv"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
fn default_ignore_files() -> Vec<String> {
    vec![".DS_Store".to_string()]
}
fn default_resource_extensions() -> Vec<String> {
    [
        "tres", "gdshader", "gdshaderinc", "png", "jpg", "jpeg", "webp", "bmp", "tga", "svg",
        "wav", "ogg", "mp3", "ttf", "otf", "json", "cfg", "ini", "csv", "txt", "md",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
fn default_max_file_size() -> u64 {
    1_000_000
}
fn default_class_name_references() -> bool {
    true
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            project_root: String::new(),
            output_path: None,
            json_output_path: None,
            include_script_contents: default_include_script_contents(),
            ignore_dirs: default_ignore_dirs(),
            ignore_files: default_ignore_files(),
            resource_extensions: default_resource_extensions(),
            max_file_size: default_max_file_size(),
            exclusion_match: ExclusionMatch::default(),
            class_name_references: default_class_name_references(),
            verbose: false,
            quiet: false,
        }
    }
}

impl ScanConfig {
    /// Whether a path takes part in the unused-resource check. Decided by
    /// `resource_extensions` alone, so listing `gd` or `tscn` there also reports
    /// orphan scripts and scenes. `project.godot` never counts.
    pub fn is_tracked_resource(&self, res_path: &str, kind: FileKind) -> bool {
        if kind == FileKind::Settings {
            return false;
        }
        paths::extension(res_path)
            .is_some_and(|ext| self.resource_extensions.iter().any(|e| *e == ext))
    }
}
