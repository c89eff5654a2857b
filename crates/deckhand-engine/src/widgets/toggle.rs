use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use deckhand_config::{ActionConfig, KeyConfig};
use deckhand_device::{Device, Geometry, KeyImage};
use tokio::time::Instant;

use crate::{
    Result, Widget,
    services::Services,
    spawn::CommandSpawner,
    widgets::{DEFAULT_COLOR, DIM_COLOR, parse_color},
};

/// Default minimum interval between state probes.
const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_millis(500);

/// On/off indicator backed by an external probe command.
///
/// The probe runs asynchronously via the command spawner; its exit
/// status lands in a shared flag the repaint tick reads. Without a probe
/// the widget is a plain toggle flipped by its own trigger.
pub struct ToggleWidget {
    pixels: u16,
    on_color: [u8; 4],
    off_color: [u8; 4],
    action: Option<ActionConfig>,
    action_hold: Option<ActionConfig>,
    probe: Option<String>,
    interval: Duration,
    last_probe: Option<Instant>,
    active: Arc<AtomicBool>,
    shown: Option<bool>,
    spawner: CommandSpawner,
}

impl ToggleWidget {
    /// Build a toggle from its key configuration.
    pub fn from_config(geometry: Geometry, cfg: &KeyConfig, services: &Services) -> Result<Self> {
        Ok(Self {
            pixels: geometry.pixels,
            on_color: parse_color(cfg.widget.str_setting("color"), DEFAULT_COLOR)?,
            off_color: parse_color(cfg.widget.str_setting("disabled"), DIM_COLOR)?,
            action: cfg.action.clone(),
            action_hold: cfg.action_hold.clone(),
            probe: cfg.widget.str_setting("probe"),
            interval: cfg
                .widget
                .interval
                .map_or(DEFAULT_PROBE_INTERVAL, Duration::from_millis),
            last_probe: None,
            active: Arc::new(AtomicBool::new(false)),
            shown: None,
            spawner: services.spawner.clone(),
        })
    }

    /// Current on/off state.
    pub fn active(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }
}

impl Widget for ToggleWidget {
    fn wants_render(&mut self) -> bool {
        if let Some(cmd) = &self.probe {
            let due = self
                .last_probe
                .is_none_or(|at| at.elapsed() >= self.interval);
            if due {
                self.last_probe = Some(Instant::now());
                self.spawner.probe(cmd, self.active.clone());
            }
        }
        self.shown != Some(self.active())
    }

    fn render(&mut self, dev: &dyn Device, key: u8) -> Result<()> {
        let on = self.active();
        let color = if on { self.on_color } else { self.off_color };
        dev.set_image(key, &KeyImage::solid(self.pixels, color))?;
        self.shown = Some(on);
        Ok(())
    }

    fn triggered(&mut self, hold: bool) {
        if hold {
            return;
        }
        if self.probe.is_some() {
            // Force an early re-probe; the action just fired and likely
            // changed the probed state.
            self.last_probe = None;
        } else {
            self.active.fetch_xor(true, Ordering::Relaxed);
        }
    }

    fn action(&self, hold: bool) -> Option<&ActionConfig> {
        if hold {
            self.action_hold.as_ref()
        } else {
            self.action.as_ref()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn widget(settings: &str) -> ToggleWidget {
        let cfg: KeyConfig = toml::from_str(&format!("index = 0\n[widget]\nid = \"toggle\"\n{}", settings)).unwrap();
        let geometry = Geometry {
            rows: 1,
            columns: 1,
            keys: 1,
            pixels: 8,
            padding: 0,
        };
        ToggleWidget::from_config(geometry, &cfg, &Services::detached()).unwrap()
    }

    #[tokio::test]
    async fn probeless_toggle_flips_on_trigger() {
        let mut toggle = widget("");
        assert!(toggle.wants_render());

        let dev = deckhand_device::SimDevice::new(1);
        toggle.render(&dev, 0).unwrap();
        assert!(!toggle.wants_render());

        toggle.triggered(false);
        assert!(toggle.active());
        assert!(toggle.wants_render());

        // Long presses do not flip the state.
        toggle.triggered(true);
        assert!(toggle.active());
    }

    #[tokio::test]
    async fn probe_result_drives_rendering() {
        let mut toggle = widget("probe = \"true\"");
        let dev = deckhand_device::SimDevice::new(1);
        toggle.render(&dev, 0).unwrap();

        // wants_render kicks the probe; wait for the spawned `true` to exit.
        let _ = toggle.wants_render();
        for _ in 0..100 {
            if toggle.active() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(toggle.active());
        assert!(toggle.wants_render());
    }
}
