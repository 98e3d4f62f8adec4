//! `project.godot` reader: INI-like sections with typed values and multi-line blocks.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use super::Parsed;
use crate::config::{Autoload, InputAction, ProjectSettings, SettingValue};
use crate::paths::{self, RES_SCHEME};

static SECTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[([^\[\]=]+)\]$").unwrap());

static DEADZONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""deadzone"\s*:\s*([0-9.]+)"#).unwrap());

static OBJECT_CLASS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Object\(\s*([A-Za-z_]\w*)\s*,").unwrap());

static INT_FIELD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""([^"]+)"\s*:\s*(-?\d+)\b"#).unwrap());

static FLOAT_FIELD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""([^"]+)"\s*:\s*(-?\d+(?:\.\d+)?)"#).unwrap());

static BOOL_FIELD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""([^"]+)"\s*:\s*(true|false)"#).unwrap());

static STRING_FIELD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""([^"]+)"\s*:\s*&?"([^"]*)""#).unwrap());

/// Parse the settings file.
pub fn parse_settings(text: &str) -> Parsed<ProjectSettings> {
    let mut warnings = Vec::new();
    let mut sections: BTreeMap<String, BTreeMap<String, SettingValue>> = BTreeMap::new();
    let mut section = String::new();

    let lines: Vec<&str> = text.lines().collect();
    let mut i = 0;
    while i < lines.len() {
        let line_no = i + 1;
        let line = lines[i].trim();
        i += 1;

        if line.is_empty() || line.starts_with(';') {
            continue;
        }

        if let Some(cap) = SECTION_RE.captures(line) {
            section = cap[1].trim().to_string();
            sections.entry(section.clone()).or_default();
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            warnings.push(format!("line {line_no}: expected `key=value`, ignored"));
            continue;
        };
        let key = key.trim().to_string();
        let mut value = value.trim().to_string();

        let mut depth = bracket_delta(&value);
        while depth > 0 && i < lines.len() {
            value.push('\n');
            value.push_str(lines[i].trim_end());
            depth += bracket_delta(lines[i]);
            i += 1;
        }
        if depth > 0 {
            warnings.push(format!(
                "line {line_no}: value of `{key}` is not terminated before end of file"
            ));
        }

        sections
            .entry(section.clone())
            .or_default()
            .insert(key, parse_value(&value));
    }

    let mut settings = ProjectSettings {
        sections,
        ..Default::default()
    };
    settings.main_scene = settings
        .get("application", "run/main_scene")
        .and_then(|v| paths::normalize_reference(&v.as_text(), RES_SCHEME));
    settings.autoloads = collect_autoloads(&settings);
    settings.input_actions = settings
        .sections
        .get("input")
        .map(|input| {
            input
                .iter()
                .map(|(action, v)| (action.clone(), parse_input_action(&v.as_text())))
                .collect()
        })
        .unwrap_or_default();

    Parsed::new(settings, warnings)
}

fn collect_autoloads(settings: &ProjectSettings) -> Vec<Autoload> {
    let Some(section) = settings.sections.get("autoload") else {
        return Vec::new();
    };
    section
        .iter()
        .filter_map(|(name, value)| {
            let text = value.as_text();
            let text = text.trim();
            let (singleton, raw) = match text.strip_prefix('*') {
                Some(rest) => (true, rest),
                None => (false, text),
            };
            let path = paths::normalize_reference(raw, RES_SCHEME)?;
            Some(Autoload {
                name: name.clone(),
                path,
                singleton,
            })
        })
        .collect()
}

/// Net count of opening minus closing brackets outside string literals.
fn bracket_delta(s: &str) -> i32 {
    let mut delta = 0;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for ch in s.chars() {
        if escaped {
            escaped = false;
            continue;
        }
        if ch == '\\' {
            escaped = true;
            continue;
        }
        if let Some(q) = quote {
            if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '"' | '\'' => quote = Some(ch),
            '{' | '[' | '(' => delta += 1,
            '}' | ']' | ')' => delta -= 1,
            _ => {}
        }
    }
    delta
}

/// Type a raw value.
pub fn parse_value(raw: &str) -> SettingValue {
    let v = raw.trim();

    if let Some(s) = as_single_string(v) {
        return SettingValue::Str(s);
    }
    match v {
        "true" => return SettingValue::Bool(true),
        "false" => return SettingValue::Bool(false),
        _ => {}
    }
    if let Ok(i) = v.parse::<i64>() {
        return SettingValue::Int(i);
    }
    if v.starts_with(|c: char| c.is_ascii_digit() || c == '-' || c == '+') {
        if let Ok(f) = v.parse::<f64>() {
            return SettingValue::Float(f);
        }
    }
    if let Some(inner) = v.strip_prefix('[').and_then(|r| r.strip_suffix(']')) {
        let items = split_top_level(inner)
            .into_iter()
            .filter(|s| !s.trim().is_empty())
            .map(parse_value)
            .collect();
        return SettingValue::List(items);
    }
    SettingValue::Raw(v.to_string())
}

/// `"..."` with no unescaped quote inside, unescaped.
fn as_single_string(v: &str) -> Option<String> {
    let inner = v.strip_prefix('"')?.strip_suffix('"')?;
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some(other) => out.push(other),
                None => out.push('\\'),
            },
            '"' => return None,
            _ => out.push(ch),
        }
    }
    Some(out)
}

/// Split on commas that sit outside quotes and nested brackets.
fn split_top_level(s: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut start = 0;
    for (idx, ch) in s.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        if ch == '\\' {
            escaped = true;
            continue;
        }
        if let Some(q) = quote {
            if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '"' | '\'' => quote = Some(ch),
            '{' | '[' | '(' => depth += 1,
            '}' | ']' | ')' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(&s[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    parts.push(&s[start..]);
    parts
}

// ---------------------------------------------------------------------------
// Input map
// ---------------------------------------------------------------------------

/// Summarise one `[input]` action value.
pub fn parse_input_action(raw: &str) -> InputAction {
    let deadzone = DEADZONE_RE
        .captures(raw)
        .and_then(|cap| cap[1].parse::<f64>().ok());
    let events = split_object_variants(raw)
        .into_iter()
        .map(summarize_event)
        .collect();
    InputAction {
        deadzone,
        events,
        raw: raw.to_string(),
    }
}

/// Every balanced `Object(...)` expression in order.
fn split_object_variants(s: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut from = 0;
    while let Some(pos) = s[from..].find("Object(") {
        let start = from + pos;
        let mut depth = 0;
        let mut end = None;
        for (offset, ch) in s[start..].char_indices() {
            match ch {
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        end = Some(start + offset + 1);
                        break;
                    }
                }
                _ => {}
            }
        }
        match end {
            Some(e) => {
                out.push(&s[start..e]);
                from = e;
            }
            None => break,
        }
    }
    out
}

fn summarize_event(obj: &str) -> String {
    let class = OBJECT_CLASS_RE
        .captures(obj)
        .map(|c| c[1].to_string())
        .unwrap_or_else(|| "Unknown".to_string());

    let ints: BTreeMap<String, i64> = INT_FIELD_RE
        .captures_iter(obj)
        .filter_map(|c| Some((c[1].to_string(), c[2].parse().ok()?)))
        .collect();
    let bools: BTreeMap<String, bool> = BOOL_FIELD_RE
        .captures_iter(obj)
        .map(|c| (c[1].to_string(), &c[2] == "true"))
        .collect();
    let int = |key: &str| ints.get(key).copied().unwrap_or(0);

    match class.as_str() {
        "InputEventKey" => {
            let keycode = int("keycode");
            let physical = int("physical_keycode");
            let unicode = int("unicode");
            let label = if (32..=126).contains(&unicode) {
                format!("'{}' (unicode={unicode})", ascii_char(unicode))
            } else if (65..=90).contains(&physical) {
                format!("'{}' (physical={physical})", ascii_char(physical))
            } else if (32..=126).contains(&keycode) {
                format!("'{}' (keycode={keycode})", ascii_char(keycode))
            } else if keycode != 0 {
                format!("keycode={keycode}")
            } else if physical != 0 {
                format!("physical={physical}")
            } else if unicode != 0 {
                format!("unicode={unicode}")
            } else {
                "key=?".to_string()
            };

            let modifiers: Vec<&str> = [
                ("shift_pressed", "Shift"),
                ("ctrl_pressed", "Ctrl"),
                ("alt_pressed", "Alt"),
                ("meta_pressed", "Meta"),
            ]
            .iter()
            .filter(|(key, _)| bools.get(*key).copied().unwrap_or(false))
            .map(|(_, label)| *label)
            .collect();

            if modifiers.is_empty() {
                format!("Key {label}")
            } else {
                format!("Key {label} + {}", modifiers.join("+"))
            }
        }
        "InputEventMouseButton" | "InputEventJoypadButton" => {
            let prefix = class.trim_start_matches("InputEvent");
            match ints.get("button_index").or_else(|| ints.get("button")) {
                Some(b) => format!("{prefix} {b}"),
                None => prefix.to_string(),
            }
        }
        "InputEventJoypadMotion" => {
            let axis = ints
                .get("axis")
                .map(|a| a.to_string())
                .unwrap_or_else(|| "?".to_string());
            let value = FLOAT_FIELD_RE
                .captures_iter(obj)
                .find(|c| &c[1] == "axis_value")
                .map(|c| c[2].to_string());
            match value {
                Some(v) => format!("JoypadAxis axis={axis} value={v}"),
                None => format!("JoypadAxis axis={axis}"),
            }
        }
        "InputEventAction" => {
            let action = STRING_FIELD_RE
                .captures_iter(obj)
                .find(|c| &c[1] == "action")
                .map(|c| c[2].to_string());
            match action {
                Some(a) if !a.is_empty() => format!("Action {a}"),
                _ => "Action".to_string(),
            }
        }
        _ => class,
    }
}

fn ascii_char(code: i64) -> char {
    u8::try_from(code).map(char::from).unwrap_or('?')
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROJECT: &str = r#"; Engine configuration file.
config_version=5

[application]

config/name="Dungeon Crawl"
run/main_scene="res://scenes/main.tscn"
config/features=PackedStringArray("4.2", "Forward Plus")
config/icon="res://icon.svg"

[autoload]

Game="*res://autoload/game.gd"
Audio="res://autoload/audio.tscn"

[display]

window/size/viewport_width=1280
window/stretch/scale=1.5

[input]

move_left={
"deadzone": 0.5,
"events": [Object(InputEventKey,"resource_local_to_scene":false,"device":-1,"window_id":0,"alt_pressed":false,"shift_pressed":false,"ctrl_pressed":false,"meta_pressed":false,"pressed":false,"keycode":0,"physical_keycode":65,"key_label":0,"unicode":97,"echo":false,"script":null)
, Object(InputEventJoypadMotion,"resource_local_to_scene":false,"device":-1,"axis":0,"axis_value":-1.0,"script":null)
]
}
jump={
"deadzone": 0.5,
"events": [Object(InputEventKey,"device":-1,"shift_pressed":true,"keycode":32,"physical_keycode":0,"unicode":0,"script":null)
, Object(InputEventMouseButton,"device":-1,"button_index":1,"pressed":false,"script":null)
]
}

[rendering]

textures/canvas_textures/default_texture_filter=0
environment/defaults/default_clear_color=Color(0.1, 0.1, 0.1, 1)
custom/tags=["a", "b,c", 3]
"#;

    #[test]
    fn typed_values_and_sections() {
        let parsed = parse_settings(PROJECT);
        let s = &parsed.record;
        assert!(parsed.warnings.is_empty(), "{:?}", parsed.warnings);
        assert_eq!(s.get("", "config_version"), Some(&SettingValue::Int(5)));
        assert_eq!(
            s.get("application", "config/name"),
            Some(&SettingValue::Str("Dungeon Crawl".into()))
        );
        assert_eq!(
            s.get("display", "window/stretch/scale"),
            Some(&SettingValue::Float(1.5))
        );
        assert!(matches!(
            s.get("application", "config/features"),
            Some(SettingValue::Raw(r)) if r.starts_with("PackedStringArray(")
        ));
        assert_eq!(
            s.get("rendering", "custom/tags"),
            Some(&SettingValue::List(vec![
                SettingValue::Str("a".into()),
                SettingValue::Str("b,c".into()),
                SettingValue::Int(3),
            ]))
        );
    }

    #[test]
    fn unknown_sections_are_kept() {
        let parsed = parse_settings(PROJECT);
        assert!(parsed.record.sections.contains_key("rendering"));
        assert!(parsed.record.sections.contains_key("display"));
    }

    #[test]
    fn main_scene_and_autoloads() {
        let s = parse_settings(PROJECT).record;
        assert_eq!(s.main_scene.as_deref(), Some("res://scenes/main.tscn"));
        assert_eq!(
            s.autoloads,
            vec![
                Autoload {
                    name: "Audio".into(),
                    path: "res://autoload/audio.tscn".into(),
                    singleton: false,
                },
                Autoload {
                    name: "Game".into(),
                    path: "res://autoload/game.gd".into(),
                    singleton: true,
                },
            ]
        );
    }

    #[test]
    fn multi_line_input_actions() {
        let s = parse_settings(PROJECT).record;
        assert_eq!(s.input_actions.len(), 2);

        let left = &s.input_actions["move_left"];
        assert_eq!(left.deadzone, Some(0.5));
        assert_eq!(
            left.events,
            vec![
                "Key 'a' (unicode=97)".to_string(),
                "JoypadAxis axis=0 value=-1.0".to_string(),
            ]
        );

        let jump = &s.input_actions["jump"];
        assert_eq!(
            jump.events,
            vec!["Key ' ' (keycode=32) + Shift".to_string(), "MouseButton 1".to_string()]
        );
        assert!(jump.raw.starts_with('{'));
    }

    #[test]
    fn no_input_section_means_no_actions() {
        let s = parse_settings("[application]\nconfig/name=\"x\"\n").record;
        assert!(s.input_actions.is_empty());
        assert!(s.main_scene.is_none());
        assert!(s.autoloads.is_empty());
    }

    #[test]
    fn malformed_lines_warn_but_keep_going() {
        let parsed = parse_settings("[application]\nthis is junk\nrun/main_scene=\"res://m.tscn\"\nbroken={\n\"a\": 1\n");
        assert_eq!(parsed.warnings.len(), 2);
        assert!(parsed.warnings[0].contains("line 2"));
        assert!(parsed.warnings[1].contains("broken"));
        assert_eq!(parsed.record.main_scene.as_deref(), Some("res://m.tscn"));
    }

    #[test]
    fn main_scene_uid_stays_opaque() {
        let s = parse_settings("[application]\nrun/main_scene=\"uid://cx1\"\n").record;
        assert_eq!(s.main_scene.as_deref(), Some("uid://cx1"));
    }

    #[test]
    fn action_events() {
        let a = parse_input_action(
            r#"{"deadzone": 0.2, "events": [Object(InputEventAction,"action":&"ui_accept","script":null), Object(InputEventJoypadButton,"button_index":3,"script":null), Object(InputEventScreenTouch,"index":0)]}"#,
        );
        assert_eq!(a.deadzone, Some(0.2));
        assert_eq!(
            a.events,
            vec!["Action ui_accept", "JoypadButton 3", "InputEventScreenTouch"]
        );
    }
}
