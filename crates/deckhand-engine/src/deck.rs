//! A loaded deck: one widget per physical key plus window-scoped
//! override sets.
//!
//! Overrides never replace the base widget vector. Resolution happens
//! per key at render/trigger time, so leaving an override restores the
//! base bindings with their state intact.

use std::{
    collections::{BTreeSet, HashMap},
    path::{Path, PathBuf},
};

use deckhand_config::{Error as ConfigError, OverrideConfig};
use deckhand_device::{Device, Geometry};
use regex::Regex;
use tracing::{debug, warn};

use crate::{
    Result, Widget,
    services::{ActiveWindow, Services},
    widgets::{self, BaseWidget},
};

/// One compiled override set: window patterns plus alternate widgets
/// for a subset of keys.
pub struct OverrideSet {
    class: Option<Regex>,
    title: Option<Regex>,
    widgets: HashMap<u8, Box<dyn Widget>>,
}

impl OverrideSet {
    /// Build an override set from already-constructed widgets. Used by
    /// tests; configuration loading goes through [`Deck::load`].
    pub fn new(
        class: Option<Regex>,
        title: Option<Regex>,
        widgets: HashMap<u8, Box<dyn Widget>>,
    ) -> Self {
        Self {
            class,
            title,
            widgets,
        }
    }

    fn from_config(geometry: Geometry, cfg: &OverrideConfig, services: &Services) -> Result<Self> {
        let mut widgets = HashMap::new();
        for key in &cfg.keys {
            if key.index >= geometry.keys {
                warn!(
                    key = key.index,
                    keys = geometry.keys,
                    "override key index out of range; ignored"
                );
                continue;
            }
            widgets.insert(key.index, widgets::from_config(geometry, key, services)?);
        }
        Ok(Self {
            class: compile_pattern(cfg.class.as_deref())?,
            title: compile_pattern(cfg.title.as_deref())?,
            widgets,
        })
    }

    /// Whether this set applies to `window`. A missing pattern matches
    /// any value; with both patterns present, both must match.
    pub fn matches(&self, window: &ActiveWindow) -> bool {
        self.class
            .as_ref()
            .is_none_or(|re| re.is_match(&window.class))
            && self
                .title
                .as_ref()
                .is_none_or(|re| re.is_match(&window.title))
    }

    /// Key indices this set overrides.
    fn keys(&self) -> impl Iterator<Item = u8> + '_ {
        self.widgets.keys().copied()
    }
}

fn compile_pattern(pattern: Option<&str>) -> Result<Option<Regex>> {
    pattern
        .map(|p| {
            Regex::new(p).map_err(|e| {
                ConfigError::Validation {
                    message: format!("invalid override pattern '{}': {}", p, e),
                }
                .into()
            })
        })
        .transpose()
}

/// Key-to-widget bindings for one deck file, with override resolution.
pub struct Deck {
    path: PathBuf,
    background: Option<PathBuf>,
    widgets: Vec<Box<dyn Widget>>,
    overrides: Vec<OverrideSet>,
    active: Option<usize>,
}

impl Deck {
    /// Load the deck file at `file` (resolved against `base`) and build
    /// its widgets for a device with `geometry`.
    pub fn load(
        geometry: Geometry,
        base: &Path,
        file: &Path,
        services: &Services,
    ) -> Result<Self> {
        let path = deckhand_config::expand_path(base, file)?;
        let cfg = deckhand_config::load(&path)?;
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let background = cfg
            .background
            .as_ref()
            .map(|b| deckhand_config::expand_path(dir, Path::new(b)))
            .transpose()?;

        let mut widgets: Vec<Box<dyn Widget>> = (0..geometry.keys)
            .map(|_| Box::new(BaseWidget::new(geometry)) as Box<dyn Widget>)
            .collect();
        for key in &cfg.keys {
            if key.index >= geometry.keys {
                warn!(
                    key = key.index,
                    keys = geometry.keys,
                    "key index out of range; ignored"
                );
                continue;
            }
            widgets[key.index as usize] = widgets::from_config(geometry, key, services)?;
        }

        let overrides = cfg
            .overrides
            .iter()
            .map(|ov| OverrideSet::from_config(geometry, ov, services))
            .collect::<Result<Vec<_>>>()?;

        debug!(
            path = %path.display(),
            keys = cfg.keys.len(),
            overrides = overrides.len(),
            "deck loaded"
        );
        Ok(Self {
            path,
            background,
            widgets,
            overrides,
            active: None,
        })
    }

    /// Assemble a deck from parts, bypassing the file loader.
    pub fn new(path: PathBuf, widgets: Vec<Box<dyn Widget>>, overrides: Vec<OverrideSet>) -> Self {
        Self {
            path,
            background: None,
            widgets,
            overrides,
            active: None,
        }
    }

    /// Path this deck was loaded from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory deck-switch targets resolve against.
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }

    /// Configured background image path, if any.
    pub fn background(&self) -> Option<&Path> {
        self.background.as_deref()
    }

    /// Widget currently in effect for `key`: the active override's
    /// binding when it has one, otherwise the base widget.
    pub fn effective_widget_mut(&mut self, key: u8) -> Option<&mut Box<dyn Widget>> {
        if let Some(i) = self.active
            && let Some(w) = self.overrides[i].widgets.get_mut(&key)
        {
            return Some(w);
        }
        self.widgets.get_mut(key as usize)
    }

    /// Every widget the deck owns, base and override alike.
    pub fn widgets_mut(&mut self) -> impl Iterator<Item = &mut Box<dyn Widget>> {
        self.widgets
            .iter_mut()
            .chain(self.overrides.iter_mut().flat_map(|o| o.widgets.values_mut()))
    }

    /// Re-resolve the active override for `window`. Returns the key
    /// indices whose effective widget changed (the union of the old and
    /// new override sets), empty when the selection is unchanged.
    /// Declaration order breaks ties: the last matching set wins.
    pub fn window_changed(&mut self, window: Option<&ActiveWindow>) -> Vec<u8> {
        let next = window.and_then(|w| self.overrides.iter().rposition(|o| o.matches(w)));
        if next == self.active {
            return Vec::new();
        }
        let mut affected = BTreeSet::new();
        if let Some(i) = self.active {
            affected.extend(self.overrides[i].keys());
        }
        if let Some(i) = next {
            affected.extend(self.overrides[i].keys());
        }
        self.active = next;
        affected.into_iter().collect()
    }

    /// Index of the active override set, if any.
    pub fn active_override(&self) -> Option<usize> {
        self.active
    }

    /// Redraw every effective widget that reports itself stale.
    pub fn repaint(&mut self, dev: &dyn Device) -> Result<()> {
        for key in 0..self.widgets.len() as u8 {
            let stale = self
                .effective_widget_mut(key)
                .is_some_and(|w| w.wants_render());
            if stale {
                self.render_key(dev, key)?;
            }
        }
        Ok(())
    }

    /// Redraw every key unconditionally.
    pub fn force_repaint(&mut self, dev: &dyn Device) -> Result<()> {
        for key in 0..self.widgets.len() as u8 {
            self.render_key(dev, key)?;
        }
        Ok(())
    }

    /// Redraw the given keys unconditionally.
    pub fn render_keys(&mut self, dev: &dyn Device, keys: &[u8]) -> Result<()> {
        for &key in keys {
            self.render_key(dev, key)?;
        }
        Ok(())
    }

    fn render_key(&mut self, dev: &dyn Device, key: u8) -> Result<()> {
        if let Some(w) = self.effective_widget_mut(key) {
            w.render(dev, key)?;
        }
        Ok(())
    }

    /// Release resources held by all widgets before dropping the deck.
    pub fn dispose(&mut self) {
        for w in self.widgets_mut() {
            w.dispose();
        }
    }
}
