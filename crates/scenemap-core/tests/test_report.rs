//! Markdown report rendered from the fixture projects.

mod common;

use chrono::{TimeZone, Utc};
use common::*;
use scenemap_core::output::write_report;
use scenemap_core::report::{render_report, ReportOptions};

fn options(include_script_contents: bool) -> ReportOptions {
    ReportOptions {
        project_root: "platformer".to_string(),
        generated_at: Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap(),
        include_script_contents,
    }
}

fn platformer_report() -> String {
    render_report(&run_all_phases("platformer"), &options(true))
}

#[test]
fn header_counts() {
    let report = platformer_report();
    assert!(report.starts_with("# Godot Project Report\n"));
    assert!(report.contains("- Generated at: 2025-01-02 03:04:05 UTC"));
    assert!(report.contains("- Scenes: 3\n"));
    assert!(report.contains("- Scripts: 5\n"));
    assert!(report.contains("- Resource files (for unused check): 9\n"));
    assert!(report.contains("- Nodes: 12, persisted connections: 3\n"));
}

#[test]
fn settings_and_input_map() {
    let report = platformer_report();
    assert!(report.contains("- Main scene: `res://scenes/level.tscn`"));
    assert!(report.contains("  - `GameState` → `res://autoload/game_state.gd` (singleton)"));
    assert!(report.contains("- Editor recent/auto references (excluded from unused): 2"));
    assert!(report.contains("| `jump` | `0.5` | Key ' ' (unicode=32)<br>JoypadButton 0 |"));
    assert!(report.contains("<details><summary>Raw input map</summary>"));
}

#[test]
fn file_tree_under_res_root() {
    let report = platformer_report();
    assert!(report.contains(
        "~~~text\nres://\n  art/\n    coin.png\n    player.png\n    portrait.png\n    unused_bg.png\n  autoload/\n    game_state.gd\n"
    ));
    assert!(report.contains("  icon.svg\n  project.godot\n~~~"));
}

#[test]
fn scene_trees_render_instances_and_scripts() {
    let report = platformer_report();
    let level_tree = "Level (Node2D) [level.gd]\n  Player (Instance) <player.tscn>\n  Coins (Node2D)\n    Coin (Instance) <coin.tscn>\n  HUD (CanvasLayer)\n    Score (Label)";
    assert!(report.contains(level_tree), "{report}");
    assert!(report.contains("Coin (Area2D) [uid://a7coinscript]"));
    assert!(report.contains("| `Coins/Coin` | `collected` | `HUD` | `_on_coin_collected` |"));
}

#[test]
fn registry_exports_and_signals() {
    let report = platformer_report();
    assert!(report.contains("| `PlayerController` | `res://scripts/player.gd` | `CharacterBody2D` |"));
    assert!(report.contains("| `res://scripts/player.gd` | `jumps` |  | `2` | `Movement` | `@export_range(0, 10)` |"));
    assert!(report.contains("| `res://scripts/player.gd` | `health_changed` | `old_value: int, new_value: int` |"));
    assert!(report.contains("| `res://scenes/level.tscn` | `Player` | `died` | `.` | `_on_player_died` |"));
    assert!(report.contains("`self.connect(\"died\")` → `_on_died`"));
    assert!(report.contains("`GameState.score_changed.connect()` → `_on_score_changed`"));
}

#[test]
fn dependency_graph_and_usage() {
    let report = platformer_report();
    assert!(report.contains("```mermaid\ngraph TD\n"));
    assert!(report.contains("N0[\"res://scripts/level.gd\"]"));
    assert!(report.contains("N0 --> N1"));
    assert!(report.contains("N1 --> N2"));
    assert!(report.contains("res://scripts/player.gd\n  <- res://scenes/player.tscn\n  <- res://scripts/level.gd"));
}

#[test]
fn unused_resources_grouped_by_extension() {
    let report = platformer_report();
    assert!(report.contains("- Unused count: **2**"));
    assert!(report.contains("### .png\n\n~~~text\nres://art/unused_bg.png\n~~~"));
    assert!(report.contains("### .wav\n\n~~~text\nres://sfx/old_hit.wav\n~~~"));
    assert!(!report.contains("recent.ogg\n~~~"));
}

#[test]
fn warnings_section_lists_missing_reference() {
    let report = platformer_report();
    assert!(report.contains(
        "## Warnings\n\n- `res://scripts/level.gd`\n  - unresolved reference to `res://music/theme.ogg`"
    ));
}

#[test]
fn broken_scenes_are_visible_not_dropped() {
    let report = render_report(&run_all_phases("broken_project"), &options(false));
    assert!(report.contains("### latin1.tscn\n\n`res://latin1.tscn`\n\n> Failed to parse this scene."));
    assert!(report.contains("<root> (Node)\n  Orphan (Sprite2D) [unresolved: ExtResource(\"7_gone\")]"));
    assert!(report.contains("> Warnings:\n> - line 3: [ext_resource] without id or path skipped"));
}

#[test]
fn script_contents_toggle() {
    let model = run_all_phases("minimal_project");
    let with = render_report(&model, &options(true));
    let without = render_report(&model, &options(false));
    assert!(with.contains("~~~gdscript\nextends CharacterBody2D\n"));
    assert!(!without.contains("~~~gdscript"));
    assert!(without.contains("### b.gd\n\n`res://b.gd`\n"));
}

#[test]
fn report_is_written_to_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out/project_report.md");
    let report = platformer_report();
    write_report(&report, &path).unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), report);
}
