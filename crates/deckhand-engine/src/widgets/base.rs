use deckhand_config::ActionConfig;
use deckhand_device::{Device, Geometry, KeyImage};

use crate::{Result, Widget};

/// Placeholder bound to every key the configuration does not cover.
///
/// Keeps the "every key has a widget" invariant: renders a blank fill
/// once and never triggers anything.
pub struct BaseWidget {
    pixels: u16,
    dirty: bool,
}

impl BaseWidget {
    /// Create a blank widget for a device with `geometry`.
    pub fn new(geometry: Geometry) -> Self {
        Self {
            pixels: geometry.pixels,
            dirty: true,
        }
    }
}

impl Widget for BaseWidget {
    fn wants_render(&mut self) -> bool {
        self.dirty
    }

    fn render(&mut self, dev: &dyn Device, key: u8) -> Result<()> {
        dev.set_image(key, &KeyImage::solid(self.pixels, [0, 0, 0, 0xff]))?;
        self.dirty = false;
        Ok(())
    }

    fn action(&self, _hold: bool) -> Option<&ActionConfig> {
        None
    }
}
