use std::sync::Arc;

use deckhand_config::{ActionConfig, KeyConfig};
use deckhand_device::{Device, Geometry, KeyImage};
use tracing::warn;

use crate::{
    Result, Widget,
    services::{ActiveWindow, Services, WindowOps},
    widget::WindowObserver,
    widgets::{DEFAULT_COLOR, DIM_COLOR, parse_color},
};

/// Shows the N-th most recently focused window and raises it on press.
///
/// Slot 0 is the currently focused window, slot 1 the previous one, and
/// so on. An empty slot renders dim and triggers nothing.
pub struct RecentWindowWidget {
    pixels: u16,
    color: [u8; 4],
    empty_color: [u8; 4],
    action_hold: Option<ActionConfig>,
    slot: usize,
    show_title: bool,
    current: Option<ActiveWindow>,
    window_ops: Option<Arc<dyn WindowOps>>,
    dirty: bool,
}

impl RecentWindowWidget {
    /// Build a recent-window widget from its key configuration.
    pub fn from_config(geometry: Geometry, cfg: &KeyConfig, services: &Services) -> Result<Self> {
        if services.window_ops.is_none() {
            warn!(
                key = cfg.index,
                "window collaborator unavailable; recentWindow widget inert"
            );
        }
        Ok(Self {
            pixels: geometry.pixels,
            color: parse_color(cfg.widget.str_setting("color"), DEFAULT_COLOR)?,
            empty_color: DIM_COLOR,
            action_hold: cfg.action_hold.clone(),
            slot: cfg.widget.int_setting("window").unwrap_or(0).max(0) as usize,
            show_title: cfg.widget.bool_setting("showTitle"),
            current: None,
            window_ops: services.window_ops.clone(),
            dirty: true,
        })
    }

    /// Window currently bound to this slot.
    pub fn current(&self) -> Option<&ActiveWindow> {
        self.current.as_ref()
    }
}

impl Widget for RecentWindowWidget {
    fn wants_render(&mut self) -> bool {
        self.dirty
    }

    fn render(&mut self, dev: &dyn Device, key: u8) -> Result<()> {
        let color = if self.current.is_some() {
            self.color
        } else {
            self.empty_color
        };
        dev.set_image(key, &KeyImage::solid(self.pixels, color))?;
        self.dirty = false;
        Ok(())
    }

    fn triggered(&mut self, hold: bool) {
        if hold {
            return;
        }
        let (Some(win), Some(ops)) = (self.current.as_ref(), self.window_ops.as_ref()) else {
            return;
        };
        if let Err(e) = ops.activate(win.id) {
            warn!(window = win.id, "cannot activate window: {}", e);
        }
    }

    fn action(&self, hold: bool) -> Option<&ActionConfig> {
        if hold { self.action_hold.as_ref() } else { None }
    }

    fn as_window_observer(&mut self) -> Option<&mut dyn WindowObserver> {
        Some(self)
    }
}

impl WindowObserver for RecentWindowWidget {
    fn recent_windows_changed(&mut self, recent: &[ActiveWindow]) {
        let next = recent.get(self.slot).cloned();
        if next.as_ref().map(|w| w.id) != self.current.as_ref().map(|w| w.id)
            || (self.show_title
                && next.as_ref().map(|w| &w.title) != self.current.as_ref().map(|w| &w.title))
        {
            self.dirty = true;
        }
        self.current = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeWindowOps;

    fn window(id: u32, title: &str) -> ActiveWindow {
        ActiveWindow {
            class: "term".to_string(),
            title: title.to_string(),
            id,
        }
    }

    fn widget(ops: Arc<FakeWindowOps>, settings: &str) -> RecentWindowWidget {
        let cfg: KeyConfig = toml::from_str(&format!(
            "index = 0\n[widget]\nid = \"recentWindow\"\n{}",
            settings
        ))
        .unwrap();
        let geometry = Geometry {
            rows: 1,
            columns: 1,
            keys: 1,
            pixels: 8,
            padding: 0,
        };
        let services = Services {
            window_ops: Some(ops),
            ..Services::detached()
        };
        RecentWindowWidget::from_config(geometry, &cfg, &services).unwrap()
    }

    #[test]
    fn tracks_its_slot_and_activates() {
        let ops = Arc::new(FakeWindowOps::default());
        let mut w = widget(ops.clone(), "window = 1");

        w.recent_windows_changed(&[window(7, "editor"), window(3, "shell")]);
        assert_eq!(w.current().map(|win| win.id), Some(3));

        w.triggered(false);
        assert_eq!(ops.activated(), vec![3]);
    }

    #[test]
    fn empty_slot_is_inert() {
        let ops = Arc::new(FakeWindowOps::default());
        let mut w = widget(ops.clone(), "window = 2");

        w.recent_windows_changed(&[window(7, "editor")]);
        assert!(w.current().is_none());
        w.triggered(false);
        assert!(ops.activated().is_empty());
    }

    #[test]
    fn only_relevant_changes_mark_dirty() {
        let ops = Arc::new(FakeWindowOps::default());
        let mut w = widget(ops, "");
        let dev = deckhand_device::SimDevice::new(1);

        w.recent_windows_changed(&[window(7, "editor")]);
        w.render(&dev, 0).unwrap();
        assert!(!w.wants_render());

        // Same window, new title: only matters when titles are shown.
        w.recent_windows_changed(&[window(7, "editor *")]);
        assert!(!w.wants_render());

        w.recent_windows_changed(&[window(9, "browser")]);
        assert!(w.wants_render());
    }
}
