use deckhand_config::{ActionConfig, KeyConfig};
use deckhand_device::{Device, Geometry, KeyImage};
use tracing::trace;

use crate::{
    Result, Widget,
    widgets::{DEFAULT_COLOR, parse_color},
};

/// Static button: a label/color with configured press actions.
pub struct ButtonWidget {
    pixels: u16,
    label: Option<String>,
    color: [u8; 4],
    action: Option<ActionConfig>,
    action_hold: Option<ActionConfig>,
    dirty: bool,
}

impl ButtonWidget {
    /// Build a button from its key configuration.
    pub fn from_config(geometry: Geometry, cfg: &KeyConfig) -> Result<Self> {
        Ok(Self {
            pixels: geometry.pixels,
            label: cfg.widget.str_setting("label"),
            color: parse_color(cfg.widget.str_setting("color"), DEFAULT_COLOR)?,
            action: cfg.action.clone(),
            action_hold: cfg.action_hold.clone(),
            dirty: true,
        })
    }
}

impl Widget for ButtonWidget {
    fn wants_render(&mut self) -> bool {
        self.dirty
    }

    fn render(&mut self, dev: &dyn Device, key: u8) -> Result<()> {
        trace!(key, label = self.label.as_deref(), "render button");
        dev.set_image(key, &KeyImage::solid(self.pixels, self.color))?;
        self.dirty = false;
        Ok(())
    }

    fn action(&self, hold: bool) -> Option<&ActionConfig> {
        if hold {
            self.action_hold.as_ref()
        } else {
            self.action.as_ref()
        }
    }
}
