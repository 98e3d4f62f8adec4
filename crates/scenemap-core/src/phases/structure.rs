//! Phase 1: walk the project directory and hand every file to the core as a
//! tagged [`SourceFile`].

use std::path::Path;

use walkdir::WalkDir;

use crate::config::{FileKind, ScanConfig, ScanInput, SourceFile};
use crate::error::ScanError;
use crate::paths;

/// Editor metadata directory, relative to the project root.
const EDITOR_DIR: &[&str] = &[".godot", "editor"];

/// Extension-less editor files that list recently used paths.
const EDITOR_RECENT_FILES: &[&str] = &["recent_dirs", "recent_files"];

/// Run the structure phase: discover files, read the text formats, and
/// collect the editor exclusion list.
pub fn run_structure_phase(config: &ScanConfig) -> Result<ScanInput, ScanError> {
    let root = Path::new(&config.project_root);
    if !root.is_dir() {
        return Err(ScanError::InvalidRoot(root.to_path_buf()));
    }

    let mut files = Vec::new();

    for entry in WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            if e.depth() == 0 {
                return true;
            }
            let name = e.file_name().to_string_lossy();
            if e.file_type().is_dir() {
                // Hidden directories (.godot, .git, ...) are editor or VCS state
                return !name.starts_with('.') && !config.ignore_dirs.iter().any(|d| *d == name);
            }
            !name.starts_with('.') && !config.ignore_files.iter().any(|f| *f == name)
        })
    {
        let entry = match entry {
            Ok(e) => e,
            Err(err) => {
                log::warn!("skipping unreadable directory entry: {err}");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let rel = entry
            .path()
            .strip_prefix(root)
            .unwrap_or(entry.path())
            .to_string_lossy()
            .replace('\\', "/");
        let res_path = paths::to_res_path(&rel);
        let kind = FileKind::from_path(&res_path);

        if !kind.is_text_format() {
            files.push(SourceFile::new(res_path, String::new()));
            continue;
        }

        let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
        files.push(read_source(entry.path(), res_path, size, config.max_file_size));
    }

    log::debug!("discovered {} files under {}", files.len(), root.display());

    Ok(ScanInput {
        files,
        editor_references: collect_editor_references(root),
    })
}

/// Read one text-format file. Oversized, unreadable and non-UTF-8 files come
/// back with `readable == false`.
fn read_source(path: &Path, res_path: String, size: u64, max_size: u64) -> SourceFile {
    if size > max_size {
        log::warn!("{res_path}: {size} bytes exceeds the {max_size} byte limit; not read");
        return SourceFile::unreadable(res_path);
    }
    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(err) => {
            log::warn!("{res_path}: {err}");
            return SourceFile::unreadable(res_path);
        }
    };
    match String::from_utf8(bytes) {
        Ok(text) => {
            let text = text.strip_prefix('\u{feff}').map(str::to_string).unwrap_or(text);
            SourceFile::new(res_path, text)
        }
        Err(_) => {
            log::warn!("{res_path}: content is not valid UTF-8");
            SourceFile::unreadable(res_path)
        }
    }
}

/// Every `res://` / `uid://` literal in `.godot/editor/*.cfg` and the recent
/// lists. These are only used to keep editor-opened files out of the unused set.
pub fn collect_editor_references(root: &Path) -> Vec<String> {
    let editor_dir = EDITOR_DIR.iter().fold(root.to_path_buf(), |p, seg| p.join(seg));
    let Ok(entries) = std::fs::read_dir(&editor_dir) else {
        return Vec::new();
    };

    let mut candidates: Vec<_> = entries
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .filter(|p| {
            let name = p.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
            name.ends_with(".cfg") || EDITOR_RECENT_FILES.iter().any(|r| *r == name)
        })
        .collect();
    candidates.sort();

    let mut refs = std::collections::BTreeSet::new();
    for path in candidates {
        match std::fs::read(&path) {
            Ok(bytes) => {
                let text = String::from_utf8_lossy(&bytes);
                refs.extend(paths::scheme_literals(&text, paths::RES_SCHEME));
                // recent_dirs / recent_files hold one bare path per line
                refs.extend(
                    text.lines()
                        .map(str::trim)
                        .filter(|l| l.starts_with(paths::RES_SCHEME))
                        .filter_map(|l| paths::normalize_reference(l, paths::RES_SCHEME)),
                );
            }
            Err(err) => log::debug!("{}: {err}", path.display()),
        }
    }
    refs.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn invalid_root_is_an_error() {
        let config = ScanConfig {
            project_root: "/definitely/not/here".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            run_structure_phase(&config),
            Err(ScanError::InvalidRoot(_))
        ));
    }

    #[test]
    fn tags_kinds_and_skips_hidden_and_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("project.godot"), "config_version=5\n").unwrap();
        fs::create_dir_all(root.join("scenes")).unwrap();
        fs::write(root.join("scenes/main.tscn"), "[gd_scene format=3]\n").unwrap();
        fs::write(root.join("icon.svg"), "<svg/>").unwrap();
        fs::write(root.join(".DS_Store"), "x").unwrap();
        fs::create_dir_all(root.join(".godot/imported")).unwrap();
        fs::write(root.join(".godot/imported/a.ctex"), "x").unwrap();
        fs::create_dir_all(root.join("venv")).unwrap();
        fs::write(root.join("venv/x.gd"), "extends Node").unwrap();

        let config = ScanConfig {
            project_root: root.to_string_lossy().to_string(),
            ..Default::default()
        };
        let input = run_structure_phase(&config).unwrap();
        let found: Vec<(&str, FileKind)> = input
            .files
            .iter()
            .map(|f| (f.path.as_str(), f.kind))
            .collect();
        assert_eq!(
            found,
            vec![
                ("res://icon.svg", FileKind::Other),
                ("res://project.godot", FileKind::Settings),
                ("res://scenes/main.tscn", FileKind::Scene),
            ]
        );
        // non-text files are never read
        assert!(input.files[0].content.is_empty());
        assert!(input.files[2].content.starts_with("[gd_scene"));
    }

    #[test]
    fn oversized_and_non_utf8_files_are_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("big.gd"), "#".repeat(64)).unwrap();
        fs::write(root.join("bad.tres"), [0xff, 0xfe, 0x00, 0x41]).unwrap();
        fs::write(root.join("bom.gd"), "\u{feff}extends Node\n").unwrap();

        let config = ScanConfig {
            project_root: root.to_string_lossy().to_string(),
            max_file_size: 32,
            ..Default::default()
        };
        let input = run_structure_phase(&config).unwrap();
        let by_path = |p: &str| input.files.iter().find(|f| f.path == p).unwrap();
        assert!(!by_path("res://big.gd").readable);
        assert!(!by_path("res://bad.tres").readable);
        let bom = by_path("res://bom.gd");
        assert!(bom.readable);
        assert_eq!(bom.content, "extends Node\n");
    }

    #[test]
    fn editor_references_from_cfg_and_recent_lists() {
        let dir = tempfile::tempdir().unwrap();
        let editor = dir.path().join(".godot/editor");
        fs::create_dir_all(&editor).unwrap();
        fs::write(
            editor.join("project_metadata.cfg"),
            "[recent_files]\nscenes=[\"res://levels/one.tscn\", \"uid://abc\"]\n",
        )
        .unwrap();
        fs::write(editor.join("recent_dirs"), "res://art\nres://levels\n").unwrap();
        fs::write(editor.join("notes.txt"), "\"res://ignored.png\"").unwrap();

        let refs = collect_editor_references(dir.path());
        assert_eq!(
            refs,
            vec!["res://art", "res://levels", "res://levels/one.tscn", "uid://abc"]
        );
    }

    #[test]
    fn missing_editor_dir_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(collect_editor_references(dir.path()).is_empty());
    }
}
