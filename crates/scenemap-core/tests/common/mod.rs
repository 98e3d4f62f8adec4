//! Shared test helpers for integration tests.
#![allow(dead_code)]

use std::path::{Path, PathBuf};

use scenemap_core::config::{ScanConfig, ScanInput, SourceFile};
use scenemap_core::model::ProjectModel;
use scenemap_core::phases::parsing::ParsedProject;

// ---------------------------------------------------------------------------
// Fixture path resolution
// ---------------------------------------------------------------------------

/// Resolve `tests/fixtures/{name}` relative to the workspace root.
pub fn fixture_path(name: &str) -> PathBuf {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    Path::new(manifest_dir)
        .join("../../tests/fixtures")
        .join(name)
        .canonicalize()
        .unwrap_or_else(|_| {
            Path::new(manifest_dir)
                .join("../../tests/fixtures")
                .join(name)
        })
}

pub fn fixture_config(name: &str) -> ScanConfig {
    ScanConfig {
        project_root: fixture_path(name).to_string_lossy().to_string(),
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// Phase runners
// ---------------------------------------------------------------------------

/// Run phase 1 (structure) on a fixture directory.
pub fn run_structure(fixture_name: &str) -> ScanInput {
    scenemap_core::phases::structure::run_structure_phase(&fixture_config(fixture_name))
        .expect("fixture root should exist")
}

/// Run phases 1-2 (structure + parsing) on a fixture directory.
pub fn run_parsing(fixture_name: &str) -> ParsedProject {
    scenemap_core::phases::parsing::run_parsing_phase(&run_structure(fixture_name))
}

/// Run every phase through the pipeline and return the model.
pub fn run_all_phases(fixture_name: &str) -> ProjectModel {
    run_all_phases_with(fixture_config(fixture_name))
}

pub fn run_all_phases_with(config: ScanConfig) -> ProjectModel {
    scenemap_core::pipeline::run_pipeline(&config, None)
        .expect("pipeline should succeed")
        .model
}

// ---------------------------------------------------------------------------
// In-memory inputs
// ---------------------------------------------------------------------------

pub fn settings(text: &str) -> SourceFile {
    SourceFile::new("res://project.godot", text)
}

pub fn file(path: &str, text: &str) -> SourceFile {
    SourceFile::new(path, text)
}

pub fn input(files: Vec<SourceFile>) -> ScanInput {
    ScanInput {
        files,
        editor_references: Vec::new(),
    }
}

/// Build the model from in-memory files with the default configuration.
pub fn build(files: Vec<SourceFile>) -> ProjectModel {
    ProjectModel::build(&input(files), &ScanConfig::default())
}

/// A scene with `name` as root and one child per `(name, parent)` pair, in the given order.
pub fn scene_text(root: &str, children: &[(&str, &str)], connections: &[(&str, &str, &str)]) -> String {
    let mut text = format!("[gd_scene format=3]\n\n[node name=\"{root}\" type=\"Node\"]\n");
    for (name, parent) in children {
        text.push_str(&format!("\n[node name=\"{name}\" type=\"Node\" parent=\"{parent}\"]\n"));
    }
    for (signal, from, to) in connections {
        text.push_str(&format!(
            "[connection signal=\"{signal}\" from=\"{from}\" to=\"{to}\" method=\"_on_{signal}\"]\n"
        ));
    }
    text
}

pub fn strs<'a, I: IntoIterator<Item = &'a String>>(items: I) -> Vec<&'a str> {
    items.into_iter().map(String::as_str).collect()
}
