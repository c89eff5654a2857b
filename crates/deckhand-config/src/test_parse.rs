//! Parse tests for the deck configuration model.

use std::{io::Write as _, path::Path};

use super::*;

const SAMPLE: &str = r##"
background = "bg.png"

[[keys]]
index = 0
[keys.widget]
id = "button"
label = "Play"
color = "#20c040"
[keys.action]
exec = "mpc toggle"
[keys.action_hold]
deck = "media.deck"

[[keys]]
index = 2
[keys.widget]
id = "toggle"
interval = 500
probe = "pgrep -x mpd"

[[keys]]
index = 3
[keys.widget]
id = "mute"
stream = "mic"
[keys.action]
keycode = "29-47"

[[overrides]]
class = "(?i)konsole"
title = ".*"
[[overrides.keys]]
index = 0
[overrides.keys.widget]
id = "button"
label = "Clear"
[overrides.keys.action]
paste = "clear"

[[overrides]]
class = "firefox"
[[overrides.keys]]
index = 1
[overrides.keys.widget]
id = "recentWindow"
window = 1
showTitle = true
"##;

#[test]
fn parses_full_sample() {
    let cfg: DeckConfig = toml::from_str(SAMPLE).unwrap();
    assert_eq!(cfg.background.as_deref(), Some("bg.png"));
    assert_eq!(cfg.keys.len(), 3);

    let play = &cfg.keys[0];
    assert_eq!(play.index, 0);
    assert_eq!(play.widget.id, "button");
    assert_eq!(play.widget.str_setting("label").as_deref(), Some("Play"));
    assert_eq!(
        play.action.as_ref().unwrap().exec.as_deref(),
        Some("mpc toggle")
    );
    assert_eq!(
        play.action_hold.as_ref().unwrap().deck.as_deref(),
        Some("media.deck")
    );

    let toggle = &cfg.keys[1];
    assert_eq!(toggle.widget.interval, Some(500));
    assert_eq!(
        toggle.widget.str_setting("probe").as_deref(),
        Some("pgrep -x mpd")
    );

    assert_eq!(cfg.overrides.len(), 2);
    assert_eq!(cfg.overrides[0].class.as_deref(), Some("(?i)konsole"));
    assert_eq!(cfg.overrides[0].keys.len(), 1);
    assert!(cfg.overrides[1].title.is_none());
    let recent = &cfg.overrides[1].keys[0].widget;
    assert_eq!(recent.int_setting("window"), Some(1));
    assert!(recent.bool_setting("showTitle"));
}

#[test]
fn empty_action_detection() {
    let action = ActionConfig::default();
    assert!(action.is_empty());
    let action = ActionConfig {
        device: Some("sleep".to_string()),
        ..ActionConfig::default()
    };
    assert!(!action.is_empty());
}

#[test]
fn unknown_top_level_field_is_rejected() {
    let err = toml::from_str::<DeckConfig>("frobnicate = 1").unwrap_err();
    assert!(err.to_string().contains("frobnicate"));
}

#[test]
fn load_reports_missing_file() {
    let err = load(Path::new("/nonexistent/main.deck")).unwrap_err();
    assert!(matches!(err, Error::Read { .. }));
    assert!(err.pretty().contains("/nonexistent/main.deck"));
}

#[test]
fn load_reports_parse_error_with_path() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "keys = \"not a list\"").unwrap();
    let err = load(file.path()).unwrap_err();
    assert!(matches!(err, Error::Parse { .. }));
}

#[test]
fn expand_path_joins_relative_to_base() {
    let joined = expand_path(Path::new("/etc/deckhand"), Path::new("media.deck")).unwrap();
    assert_eq!(joined, Path::new("/etc/deckhand/media.deck"));

    let absolute = expand_path(Path::new("/etc/deckhand"), Path::new("/tmp/x.deck")).unwrap();
    assert_eq!(absolute, Path::new("/tmp/x.deck"));
}
