//! On-disk deck configuration: the typed model, the TOML loader, and
//! path expansion helpers.
//!
//! A deck file binds widgets and actions to key indices and may carry
//! window-scoped override sets. The model here is deliberately dumb:
//! regex compilation and widget construction happen at deck-load time in
//! the engine crate, so a parsed `DeckConfig` is plain data.

use std::path::{Path, PathBuf};

mod error;
#[cfg(test)]
mod test_parse;

use serde::Deserialize;

pub use error::{Error, Result};

/// A full deck configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeckConfig {
    /// Optional background image path, relative to the deck file.
    pub background: Option<String>,
    /// Key bindings; indices not covered get a placeholder widget.
    #[serde(default)]
    pub keys: Vec<KeyConfig>,
    /// Window-scoped override sets, in declaration order.
    #[serde(default)]
    pub overrides: Vec<OverrideConfig>,
}

/// Binding of one key index to a widget and its actions.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KeyConfig {
    /// Physical key index, `0..keys` for the opened device.
    pub index: u8,
    /// Widget occupying this key.
    pub widget: WidgetConfig,
    /// Action fired on a short press.
    pub action: Option<ActionConfig>,
    /// Action fired on a long press.
    pub action_hold: Option<ActionConfig>,
}

/// Widget kind plus free-form per-kind settings.
#[derive(Debug, Clone, Deserialize)]
pub struct WidgetConfig {
    /// Widget kind: `button`, `toggle`, `audio`, `mute`, `recentWindow`.
    pub id: String,
    /// Minimum interval between widget self-refresh probes, in ms.
    pub interval: Option<u64>,
    /// Kind-specific settings (label, color, probe command, ...).
    #[serde(flatten)]
    pub settings: toml::Table,
}

impl WidgetConfig {
    /// A string-valued setting, if present.
    pub fn str_setting(&self, key: &str) -> Option<String> {
        self.settings
            .get(key)
            .and_then(|v| v.as_str())
            .map(str::to_string)
    }

    /// A boolean setting, defaulting to false.
    pub fn bool_setting(&self, key: &str) -> bool {
        self.settings
            .get(key)
            .and_then(toml::Value::as_bool)
            .unwrap_or(false)
    }

    /// An integer setting, if present.
    pub fn int_setting(&self, key: &str) -> Option<i64> {
        self.settings.get(key).and_then(toml::Value::as_integer)
    }
}

/// Compound action attached to a press edge. Every field is optional;
/// the dispatcher applies the configured effects in a fixed order.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ActionConfig {
    /// Switch to another deck file, relative to the current deck's directory.
    pub deck: Option<String>,
    /// Synthetic key input spec (`codes[+delay]` steps joined by `/`,
    /// `-`-chained combos).
    pub keycode: Option<String>,
    /// Write text to the clipboard, then synthesize a paste keystroke.
    pub paste: Option<String>,
    /// External command line, spawned without waiting.
    pub exec: Option<String>,
    /// Device-level command: `sleep` or `brightness[=+-][n]`.
    pub device: Option<String>,
    /// Bus method call.
    pub dbus: Option<DbusConfig>,
}

impl ActionConfig {
    /// True when no effect is configured at all.
    pub fn is_empty(&self) -> bool {
        self.deck.is_none()
            && self.keycode.is_none()
            && self.paste.is_none()
            && self.exec.is_none()
            && self.device.is_none()
            && self.dbus.is_none()
    }
}

/// Target of a bus method call action.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DbusConfig {
    /// Destination (well-known bus name).
    pub object: String,
    /// Object path.
    pub path: String,
    /// Fully qualified method, `interface.Member`.
    pub method: String,
    /// Optional string argument.
    pub value: Option<String>,
}

/// One window-scoped override set: patterns plus alternate key bindings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OverrideConfig {
    /// Regex matched against the window resource class.
    pub class: Option<String>,
    /// Regex matched against the window title.
    pub title: Option<String>,
    /// Alternate bindings for a subset of keys.
    #[serde(default)]
    pub keys: Vec<KeyConfig>,
}

/// Load and parse a deck configuration from `path`.
pub fn load(path: &Path) -> Result<DeckConfig> {
    let raw = std::fs::read_to_string(path).map_err(|e| Error::Read {
        path: Some(path.to_path_buf()),
        message: e.to_string(),
    })?;
    toml::from_str(&raw).map_err(|e| Error::Parse {
        path: Some(path.to_path_buf()),
        message: e.to_string(),
    })
}

/// Expand `path` for use relative to `base`: `~` resolves to the home
/// directory, relative paths are joined onto `base`.
pub fn expand_path(base: &Path, path: &Path) -> Result<PathBuf> {
    let expanded = expand_home(path)?;
    if expanded.is_absolute() {
        return Ok(expanded);
    }
    Ok(base.join(expanded))
}

/// Resolve a leading `~` or `~/` component against the home directory.
fn expand_home(path: &Path) -> Result<PathBuf> {
    let Ok(stripped) = path.strip_prefix("~") else {
        return Ok(path.to_path_buf());
    };
    let home = dirs::home_dir().ok_or_else(|| Error::Validation {
        message: "cannot expand '~': no home directory".to_string(),
    })?;
    Ok(home.join(stripped))
}
