//! Phase 3: resolve references across files.
//!
//! Produces the usage edge set, the reverse index, script-to-script
//! dependencies, the `class_name` registry and the unused-resource set. This
//! is the only phase that looks at more than one file at a time.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::{
    ClassEntry, EdgeKind, FileKind, Resolution, ResourceLink, ScanConfig, ScanInput, ScanWarning,
    SettingValue, UsageEdge,
};
use crate::formats::script::strip_comment;
use crate::graph::usage_graph::UsageGraph;
use crate::paths::{self, RES_SCHEME, UID_SCHEME};
use crate::phases::parsing::{ParsedProject, SETTINGS_PATH};

static IDENT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[A-Za-z_]\w*").unwrap());

/// Everything derived from the per-file records.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ResolvedReferences {
    pub edges: Vec<UsageEdge>,
    pub reverse_index: BTreeMap<String, BTreeSet<String>>,
    pub script_dependencies: Vec<(String, String)>,
    pub class_registry: BTreeMap<String, ClassEntry>,
    /// Files that take part in the unused check.
    pub resources: BTreeSet<String>,
    pub unused_resources: BTreeSet<String>,
    pub warnings: Vec<ScanWarning>,
}

/// Candidate edges keyed by (source, target). The first kind proposed wins.
#[derive(Default)]
struct EdgeCollector {
    candidates: BTreeMap<(String, String), EdgeKind>,
}

impl EdgeCollector {
    fn propose(&mut self, source: &str, target: &str, kind: EdgeKind) {
        if source == target {
            return;
        }
        self.candidates
            .entry((source.to_string(), target.to_string()))
            .or_insert(kind);
    }
}

/// Run the references phase.
pub fn run_references_phase(
    parsed: &ParsedProject,
    input: &ScanInput,
    config: &ScanConfig,
) -> ResolvedReferences {
    let mut warnings = Vec::new();
    let mut collector = EdgeCollector::default();

    if parsed.has_settings {
        collect_settings_edges(parsed, &mut collector);
    }
    collect_scene_edges(parsed, &mut collector, &mut warnings);
    for script in parsed.scripts.values() {
        for target in &script.references {
            collector.propose(&script.path, target, EdgeKind::ScriptLiteral);
        }
    }
    let class_registry = build_class_registry(parsed, &mut warnings);
    if config.class_name_references {
        collect_class_edges(parsed, &class_registry, &mut collector);
    }
    for resource in parsed.resource_definitions.values() {
        for target in &resource.references {
            collector.propose(&resource.path, target, EdgeKind::ResourceReference);
        }
    }

    // BTreeMap order keeps the edge list sorted by (source, target).
    let edges: Vec<UsageEdge> = collector
        .candidates
        .into_iter()
        .map(|((source, target), kind)| {
            let resolution = if paths::is_identifier_scheme(&target) {
                Resolution::Opaque
            } else if parsed.files.contains_key(&target) {
                Resolution::Resolved
            } else {
                warnings.push(ScanWarning::new(
                    &source,
                    format!("unresolved reference to `{target}`"),
                ));
                Resolution::Missing
            };
            UsageEdge {
                source,
                target,
                kind,
                resolution,
            }
        })
        .collect();

    let graph = UsageGraph::from_edges(&edges);
    let script_dependencies = graph.edges_between(|p| {
        parsed.files.get(p) == Some(&FileKind::Script)
    });

    let resources: BTreeSet<String> = parsed
        .files
        .iter()
        .filter(|(path, kind)| config.is_tracked_resource(path, **kind))
        .map(|(path, _)| path.clone())
        .collect();
    let unused_resources = unused_resources(parsed, input, config, &resources, &graph.targets());

    log::debug!(
        "resolved {} edges, {} script dependencies, {} unused resources",
        edges.len(),
        script_dependencies.len(),
        unused_resources.len()
    );
    for w in &warnings {
        log::warn!("{}: {}", w.file, w.message);
    }

    ResolvedReferences {
        reverse_index: graph.reverse_index(),
        edges,
        script_dependencies,
        class_registry,
        resources,
        unused_resources,
        warnings,
    }
}

fn collect_settings_edges(parsed: &ParsedProject, collector: &mut EdgeCollector) {
    let settings = &parsed.settings;
    if let Some(main) = &settings.main_scene {
        collector.propose(SETTINGS_PATH, main, EdgeKind::ProjectSetting);
    }
    for autoload in &settings.autoloads {
        collector.propose(SETTINGS_PATH, &autoload.path, EdgeKind::ProjectSetting);
    }
    // Icons, themes, plugin configs and the like.
    let mut literals = BTreeSet::new();
    for values in settings.sections.values() {
        for value in values.values() {
            setting_literals(value, &mut literals);
        }
    }
    for target in &literals {
        collector.propose(SETTINGS_PATH, target, EdgeKind::ProjectSetting);
    }
}

fn setting_literals(value: &SettingValue, out: &mut BTreeSet<String>) {
    match value {
        SettingValue::Str(s) => {
            let s = s.trim_start_matches('*');
            if s.starts_with(RES_SCHEME) || s.starts_with(UID_SCHEME) {
                out.extend(paths::normalize_reference(s, RES_SCHEME));
            }
        }
        SettingValue::List(items) => items.iter().for_each(|v| setting_literals(v, out)),
        SettingValue::Raw(raw) => out.extend(paths::scheme_literals(raw, RES_SCHEME)),
        _ => {}
    }
}

fn collect_scene_edges(
    parsed: &ParsedProject,
    collector: &mut EdgeCollector,
    warnings: &mut Vec<ScanWarning>,
) {
    for scene in parsed.scenes.values() {
        let Some(root) = &scene.root else {
            for target in &scene.references {
                collector.propose(&scene.path, target, EdgeKind::SceneResource);
            }
            continue;
        };
        for node in root.iter() {
            let links = [
                (&node.script, EdgeKind::NodeScript, "script"),
                (&node.instance, EdgeKind::NodeInstance, "instance"),
            ];
            for (link, kind, what) in links {
                match link {
                    Some(ResourceLink::Unresolved(raw)) => warnings.push(ScanWarning::new(
                        &scene.path,
                        format!("node `{}`: {what} `{raw}` is unresolved", node.path),
                    )),
                    Some(link) => {
                        if let Some(target) = link.target() {
                            collector.propose(&scene.path, target, kind);
                        }
                    }
                    None => {}
                }
            }
        }
        for target in &scene.references {
            collector.propose(&scene.path, target, EdgeKind::SceneResource);
        }
    }
}

/// `class_name` → declaring script. On a clash the first script by path wins.
fn build_class_registry(
    parsed: &ParsedProject,
    warnings: &mut Vec<ScanWarning>,
) -> BTreeMap<String, ClassEntry> {
    let mut registry: BTreeMap<String, ClassEntry> = BTreeMap::new();
    for script in parsed.scripts.values() {
        let Some(class_name) = &script.class_name else {
            continue;
        };
        if let Some(existing) = registry.get(class_name) {
            warnings.push(ScanWarning::new(
                &script.path,
                format!(
                    "class_name `{class_name}` is already declared by `{}`",
                    existing.script
                ),
            ));
            continue;
        }
        registry.insert(
            class_name.clone(),
            ClassEntry {
                class_name: class_name.clone(),
                script: script.path.clone(),
                extends: script.extends.clone(),
            },
        );
    }
    registry
}

/// A script whose code mentions another script's class name as a whole word
/// depends on that script.
fn collect_class_edges(
    parsed: &ParsedProject,
    registry: &BTreeMap<String, ClassEntry>,
    collector: &mut EdgeCollector,
) {
    if registry.is_empty() {
        return;
    }
    for script in parsed.scripts.values() {
        let tokens: BTreeSet<&str> = script
            .source
            .lines()
            .map(strip_comment)
            .flat_map(|line| IDENT_RE.find_iter(line).map(|m| m.as_str()))
            .collect();
        for entry in registry.values() {
            if entry.script != script.path && tokens.contains(entry.class_name.as_str()) {
                collector.propose(&script.path, &entry.script, EdgeKind::ClassReference);
            }
        }
    }
}

fn unused_resources(
    parsed: &ParsedProject,
    input: &ScanInput,
    config: &ScanConfig,
    resources: &BTreeSet<String>,
    targets: &BTreeSet<String>,
) -> BTreeSet<String> {
    let settings = &parsed.settings;
    resources
        .iter()
        .filter(|r| !targets.contains(*r))
        .filter(|r| settings.main_scene.as_deref() != Some(r.as_str()))
        .filter(|r| !settings.autoloads.iter().any(|a| a.path == **r))
        .filter(|r| {
            !input
                .editor_references
                .iter()
                .any(|e| paths::matches_exclusion(r, e, config.exclusion_match))
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SourceFile;
    use crate::paths::ExclusionMatch;
    use crate::phases::parsing::run_parsing_phase;

    fn resolve(files: Vec<SourceFile>, editor: &[&str], config: &ScanConfig) -> ResolvedReferences {
        let input = ScanInput {
            files,
            editor_references: editor.iter().map(|s| s.to_string()).collect(),
        };
        let parsed = run_parsing_phase(&input);
        run_references_phase(&parsed, &input, config)
    }

    fn project() -> Vec<SourceFile> {
        vec![
            SourceFile::new(
                SETTINGS_PATH,
                "[application]\nrun/main_scene=\"res://main.tscn\"\nconfig/icon=\"res://icon.svg\"\n\n[autoload]\nGame=\"*res://game.gd\"\n",
            ),
            SourceFile::new(
                "res://main.tscn",
                "[gd_scene format=3]\n[ext_resource type=\"Script\" path=\"res://main.gd\" id=\"1\"]\n[node name=\"Main\" type=\"Node\"]\nscript = ExtResource(\"1\")\n[node name=\"Bad\" type=\"Node\" parent=\".\"]\nscript = SubResource(\"S\")\n",
            ),
            SourceFile::new(
                "res://main.gd",
                "extends Node\nvar hero: Hero\nvar tex = preload(\"res://art/hero.png\")\nvar gone = load(\"res://gone.ogg\")\nvar id = \"uid://q1\"\n",
            ),
            SourceFile::new("res://hero.gd", "class_name Hero\nextends Node2D\n# Hero again\n"),
            SourceFile::new("res://game.gd", "extends Node\n# mentions Hero only in a comment\n"),
            SourceFile::new("res://art/hero.png", ""),
            SourceFile::new("res://icon.svg", ""),
            SourceFile::new("res://art/unused.png", ""),
            SourceFile::new("res://recent.wav", ""),
        ]
    }

    #[test]
    fn edges_carry_kind_and_resolution() {
        let r = resolve(project(), &[], &ScanConfig::default());
        let find = |s: &str, t: &str| {
            r.edges
                .iter()
                .find(|e| e.source == s && e.target == t)
                .unwrap_or_else(|| panic!("no edge {s} -> {t}"))
        };
        assert_eq!(find(SETTINGS_PATH, "res://main.tscn").kind, EdgeKind::ProjectSetting);
        assert_eq!(find(SETTINGS_PATH, "res://game.gd").kind, EdgeKind::ProjectSetting);
        assert_eq!(find(SETTINGS_PATH, "res://icon.svg").kind, EdgeKind::ProjectSetting);
        assert_eq!(find("res://main.tscn", "res://main.gd").kind, EdgeKind::NodeScript);
        assert_eq!(find("res://main.gd", "res://hero.gd").kind, EdgeKind::ClassReference);
        assert_eq!(find("res://main.gd", "res://gone.ogg").resolution, Resolution::Missing);
        assert_eq!(find("res://main.gd", "uid://q1").resolution, Resolution::Opaque);
        assert_eq!(
            find("res://main.gd", "res://art/hero.png").resolution,
            Resolution::Resolved
        );
        // a comment mention is not a reference
        assert!(r.edges.iter().all(|e| e.source != "res://game.gd"));
    }

    #[test]
    fn warnings_for_missing_targets_and_unresolved_links_only() {
        let r = resolve(project(), &[], &ScanConfig::default());
        let messages: Vec<(&str, &str)> = r
            .warnings
            .iter()
            .map(|w| (w.file.as_str(), w.message.as_str()))
            .collect();
        assert_eq!(messages.len(), 2);
        assert!(messages.contains(&("res://main.tscn", "node `Main/Bad`: script `SubResource(\"S\")` is unresolved")));
        assert!(messages.contains(&("res://main.gd", "unresolved reference to `res://gone.ogg`")));
    }

    #[test]
    fn reverse_index_and_script_dependencies() {
        let r = resolve(project(), &[], &ScanConfig::default());
        assert_eq!(
            r.reverse_index["res://main.gd"],
            BTreeSet::from(["res://main.tscn".to_string()])
        );
        assert_eq!(
            r.reverse_index["uid://q1"],
            BTreeSet::from(["res://main.gd".to_string()])
        );
        assert_eq!(
            r.script_dependencies,
            vec![("res://main.gd".to_string(), "res://hero.gd".to_string())]
        );
        assert_eq!(r.class_registry["Hero"].extends.as_deref(), Some("Node2D"));
    }

    #[test]
    fn unused_set_respects_edges_and_editor_exclusions() {
        let r = resolve(project(), &["res://recent.wav"], &ScanConfig::default());
        assert_eq!(
            r.resources,
            BTreeSet::from([
                "res://art/hero.png".to_string(),
                "res://art/unused.png".to_string(),
                "res://icon.svg".to_string(),
                "res://recent.wav".to_string(),
            ])
        );
        assert_eq!(
            r.unused_resources,
            BTreeSet::from(["res://art/unused.png".to_string()])
        );
    }

    #[test]
    fn prefix_exclusions_cover_directories() {
        let exact = resolve(project(), &["res://art"], &ScanConfig::default());
        assert!(exact.unused_resources.contains("res://art/unused.png"));

        let config = ScanConfig {
            exclusion_match: ExclusionMatch::Prefix,
            ..Default::default()
        };
        let prefix = resolve(project(), &["res://art"], &config);
        assert!(!prefix.unused_resources.contains("res://art/unused.png"));
        assert!(prefix.unused_resources.contains("res://recent.wav"));
    }

    #[test]
    fn orphan_scripts_reported_when_gd_is_listed() {
        let files = vec![
            SourceFile::new(SETTINGS_PATH, "[application]\nrun/main_scene=\"res://main.tscn\"\n"),
            SourceFile::new(
                "res://main.tscn",
                "[gd_scene format=3]\n[ext_resource type=\"Script\" path=\"res://main.gd\" id=\"1\"]\n[node name=\"Main\" type=\"Node\"]\nscript = ExtResource(\"1\")\n",
            ),
            SourceFile::new("res://main.gd", "extends Node\n"),
            SourceFile::new("res://stray.gd", "extends Node\n"),
        ];

        let default = resolve(files.clone(), &[], &ScanConfig::default());
        assert!(default.unused_resources.is_empty());

        let mut config = ScanConfig::default();
        config.resource_extensions.extend(["gd".to_string(), "tscn".to_string()]);
        let opted_in = resolve(files, &[], &config);
        assert_eq!(
            opted_in.unused_resources.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["res://stray.gd"]
        );
    }

    #[test]
    fn class_references_can_be_disabled() {
        let config = ScanConfig {
            class_name_references: false,
            ..Default::default()
        };
        let r = resolve(project(), &[], &config);
        assert!(r.edges.iter().all(|e| e.kind != EdgeKind::ClassReference));
        assert!(r.script_dependencies.is_empty());
        // the registry is still built
        assert!(r.class_registry.contains_key("Hero"));
    }

    #[test]
    fn duplicate_class_name_first_path_wins() {
        let files = vec![
            SourceFile::new(SETTINGS_PATH, ""),
            SourceFile::new("res://b/enemy.gd", "class_name Enemy\n"),
            SourceFile::new("res://a/enemy.gd", "class_name Enemy\n"),
        ];
        let r = resolve(files, &[], &ScanConfig::default());
        assert_eq!(r.class_registry["Enemy"].script, "res://a/enemy.gd");
        assert_eq!(r.warnings.len(), 1);
        assert_eq!(r.warnings[0].file, "res://b/enemy.gd");
    }

    #[test]
    fn self_references_are_dropped() {
        let files = vec![
            SourceFile::new(SETTINGS_PATH, ""),
            SourceFile::new("res://me.gd", "const SELF = preload(\"res://me.gd\")\n"),
        ];
        let r = resolve(files, &[], &ScanConfig::default());
        assert!(r.edges.is_empty());
    }
}
