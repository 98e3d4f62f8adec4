//! Phase 2: run the per-file readers. Every file is handled in isolation, so a
//! broken file can only ever affect its own record.

use std::collections::BTreeMap;

use crate::config::{
    FileKind, ProjectSettings, ResourceDefinition, ScanInput, ScanWarning, SceneInfo, ScriptInfo,
    SourceFile,
};
use crate::formats::resource::parse_resource;
use crate::formats::scene::parse_scene;
use crate::formats::script::analyze_script;
use crate::formats::settings::parse_settings;
use crate::formats::Parsed;
use crate::graph::scene_tree::build_scene_tree;

pub const SETTINGS_PATH: &str = "res://project.godot";

/// Independent per-file records, keyed by `res://` path.
#[derive(Debug, Clone, Default)]
pub struct ParsedProject {
    pub settings: ProjectSettings,
    pub has_settings: bool,
    pub files: BTreeMap<String, FileKind>,
    pub scenes: BTreeMap<String, SceneInfo>,
    pub scripts: BTreeMap<String, ScriptInfo>,
    pub resource_definitions: BTreeMap<String, ResourceDefinition>,
    pub warnings: Vec<ScanWarning>,
}

impl ParsedProject {
    fn absorb<T>(&mut self, file: &str, parsed: Parsed<T>) -> T {
        for message in parsed.warnings {
            log::warn!("{file}: {message}");
            self.warnings.push(ScanWarning::new(file, message));
        }
        parsed.record
    }
}

/// Run the parsing phase over every discovered file.
pub fn run_parsing_phase(input: &ScanInput) -> ParsedProject {
    let mut project = ParsedProject::default();

    for file in &input.files {
        if project.files.insert(file.path.clone(), file.kind).is_some() {
            project.warnings.push(ScanWarning::new(
                &file.path,
                "listed more than once; later copy ignored",
            ));
            continue;
        }
        if file.kind.is_text_format() && !file.readable {
            log::warn!("{}: unreadable", file.path);
            project.warnings.push(ScanWarning::new(
                &file.path,
                "could not be read or decoded; record left empty",
            ));
        }
        parse_file(&mut project, file);
    }

    if !project.has_settings {
        project.warnings.push(ScanWarning::new(
            SETTINGS_PATH,
            "settings file not found; no main scene or autoloads known",
        ));
    }

    log::debug!(
        "parsed {} scenes, {} scripts, {} resource definitions",
        project.scenes.len(),
        project.scripts.len(),
        project.resource_definitions.len()
    );
    project
}

fn parse_file(project: &mut ParsedProject, file: &SourceFile) {
    let path = file.path.as_str();
    // An unreadable file still gets its (empty) record.
    let text = if file.readable { file.content.as_str() } else { "" };

    match file.kind {
        FileKind::Settings => {
            project.has_settings = true;
            if file.readable {
                project.settings = project.absorb(path, parse_settings(text));
            }
        }
        FileKind::Scene => {
            let scene = if file.readable {
                let raw = project.absorb(path, parse_scene(text, path));
                let root = project.absorb(path, build_scene_tree(&raw.nodes));
                SceneInfo {
                    path: path.to_string(),
                    uid: raw.uid,
                    root,
                    connections: raw.connections,
                    references: raw.references,
                }
            } else {
                SceneInfo {
                    path: path.to_string(),
                    ..Default::default()
                }
            };
            project.scenes.insert(path.to_string(), scene);
        }
        FileKind::Script => {
            let script = if file.readable {
                project.absorb(path, analyze_script(text, path))
            } else {
                ScriptInfo {
                    path: path.to_string(),
                    ..Default::default()
                }
            };
            project.scripts.insert(path.to_string(), script);
        }
        FileKind::ResourceDefinition => {
            let resource = if file.readable {
                project.absorb(path, parse_resource(text, path))
            } else {
                ResourceDefinition {
                    path: path.to_string(),
                    ..Default::default()
                }
            };
            project.resource_definitions.insert(path.to_string(), resource);
        }
        FileKind::Other => {}
    }
}
