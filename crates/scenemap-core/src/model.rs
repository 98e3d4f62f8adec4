//! The project model: one owning structure, populated once from the
//! per-file records and the resolver output, read-only afterwards.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::config::{
    ClassEntry, FileKind, ProjectSettings, ResourceDefinition, ScanConfig, ScanInput, ScanWarning,
    SceneInfo, ScriptInfo, UsageEdge,
};
use crate::phases::parsing::{run_parsing_phase, ParsedProject};
use crate::phases::references::{run_references_phase, ResolvedReferences};

/// Everything known about one project. Every collection is ordered, so two
/// builds from the same input serialise identically.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProjectModel {
    pub settings: ProjectSettings,
    /// Every discovered file and its kind.
    pub files: BTreeMap<String, FileKind>,
    pub scenes: BTreeMap<String, SceneInfo>,
    pub scripts: BTreeMap<String, ScriptInfo>,
    pub resource_definitions: BTreeMap<String, ResourceDefinition>,
    /// Files taking part in the unused check.
    pub resources: BTreeSet<String>,
    pub edges: Vec<UsageEdge>,
    /// target → files referencing it.
    pub reverse_index: BTreeMap<String, BTreeSet<String>>,
    pub script_dependencies: Vec<(String, String)>,
    pub class_registry: BTreeMap<String, ClassEntry>,
    pub unused_resources: BTreeSet<String>,
    pub editor_references: BTreeSet<String>,
    /// Grouped by file; within a file, reader warnings come before resolver warnings.
    pub warnings: Vec<ScanWarning>,
}

impl ProjectModel {
    /// Build the model from in-memory input. Never fails: problems become warnings.
    pub fn build(input: &ScanInput, config: &ScanConfig) -> Self {
        let parsed = run_parsing_phase(input);
        let resolved = run_references_phase(&parsed, input, config);
        Self::from_parts(input, parsed, resolved)
    }

    pub fn from_parts(input: &ScanInput, parsed: ParsedProject, resolved: ResolvedReferences) -> Self {
        let mut warnings = parsed.warnings;
        warnings.extend(resolved.warnings);
        // stable: per-file order is preserved
        warnings.sort_by(|a, b| a.file.cmp(&b.file));

        Self {
            settings: parsed.settings,
            files: parsed.files,
            scenes: parsed.scenes,
            scripts: parsed.scripts,
            resource_definitions: parsed.resource_definitions,
            resources: resolved.resources,
            edges: resolved.edges,
            reverse_index: resolved.reverse_index,
            script_dependencies: resolved.script_dependencies,
            class_registry: resolved.class_registry,
            unused_resources: resolved.unused_resources,
            editor_references: input.editor_references.iter().cloned().collect(),
            warnings,
        }
    }

    pub fn main_scene(&self) -> Option<&str> {
        self.settings.main_scene.as_deref()
    }

    pub fn count_of(&self, kind: FileKind) -> usize {
        self.files.values().filter(|k| **k == kind).count()
    }

    pub fn warnings_for<'a>(&'a self, file: &'a str) -> impl Iterator<Item = &'a ScanWarning> + 'a {
        self.warnings.iter().filter(move |w| w.file == file)
    }

    /// Files referencing `target`; empty when nothing does.
    pub fn used_by(&self, target: &str) -> Vec<&str> {
        self.reverse_index
            .get(target)
            .map(|sources| sources.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn node_count(&self) -> usize {
        self.scenes
            .values()
            .filter_map(|s| s.root.as_ref())
            .map(|root| root.count())
            .sum()
    }

    pub fn connection_count(&self) -> usize {
        self.scenes.values().map(|s| s.connections.len()).sum()
    }
}
