use std::sync::Arc;

use deckhand_config::{ActionConfig, KeyConfig};
use deckhand_device::{Device, Geometry, KeyImage};
use tracing::warn;

use crate::{
    Result, Widget,
    services::{AudioControl, Services},
    widget::AudioObserver,
    widgets::{DIM_COLOR, parse_color},
};

const MUTED_COLOR: [u8; 4] = [0xc0, 0x20, 0x20, 0xff];

/// Mute indicator and toggle for the default sink or source.
///
/// `stream = "mic"` binds to the capture side; anything else binds to
/// playback. The state is cached and refreshed from audio change
/// notifications, not polled every tick.
pub struct MuteWidget {
    pixels: u16,
    live_color: [u8; 4],
    muted_color: [u8; 4],
    action: Option<ActionConfig>,
    action_hold: Option<ActionConfig>,
    playback: bool,
    audio: Option<Arc<dyn AudioControl>>,
    muted: bool,
    shown: Option<bool>,
}

impl MuteWidget {
    /// Build a mute widget from its key configuration.
    pub fn from_config(geometry: Geometry, cfg: &KeyConfig, services: &Services) -> Result<Self> {
        if services.audio.is_none() {
            warn!(key = cfg.index, "audio collaborator unavailable; mute widget inert");
        }
        let playback = cfg
            .widget
            .str_setting("stream")
            .is_none_or(|s| s != "mic");
        let mut widget = Self {
            pixels: geometry.pixels,
            live_color: parse_color(cfg.widget.str_setting("color"), DIM_COLOR)?,
            muted_color: parse_color(cfg.widget.str_setting("mutedColor"), MUTED_COLOR)?,
            action: cfg.action.clone(),
            action_hold: cfg.action_hold.clone(),
            playback,
            audio: services.audio.clone(),
            muted: false,
            shown: None,
        };
        widget.refresh();
        Ok(widget)
    }

    /// Re-query the daemon and cache the mute state.
    fn refresh(&mut self) {
        let Some(audio) = self.audio.as_ref() else {
            return;
        };
        let queried = if self.playback {
            audio.sink_muted()
        } else {
            audio.source_muted()
        };
        match queried {
            Some(muted) => self.muted = muted,
            None => warn!(playback = self.playback, "cannot query mute state"),
        }
    }
}

impl Widget for MuteWidget {
    fn wants_render(&mut self) -> bool {
        self.shown != Some(self.muted)
    }

    fn render(&mut self, dev: &dyn Device, key: u8) -> Result<()> {
        let color = if self.muted {
            self.muted_color
        } else {
            self.live_color
        };
        dev.set_image(key, &KeyImage::solid(self.pixels, color))?;
        self.shown = Some(self.muted);
        Ok(())
    }

    fn triggered(&mut self, hold: bool) {
        if hold {
            return;
        }
        let Some(audio) = self.audio.as_ref() else {
            return;
        };
        let toggled = if self.playback {
            audio.toggle_sink_mute()
        } else {
            audio.toggle_source_mute()
        };
        if let Err(e) = toggled {
            warn!("cannot toggle mute: {}", e);
        }
        self.refresh();
    }

    fn action(&self, hold: bool) -> Option<&ActionConfig> {
        if hold {
            self.action_hold.as_ref()
        } else {
            self.action.as_ref()
        }
    }

    fn as_audio_observer(&mut self) -> Option<&mut dyn AudioObserver> {
        Some(self)
    }
}

impl AudioObserver for MuteWidget {
    fn mute_changed(&mut self, playback: bool) {
        if playback == self.playback {
            self.refresh();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeAudio;

    fn widget(audio: Arc<FakeAudio>, settings: &str) -> MuteWidget {
        let cfg: KeyConfig =
            toml::from_str(&format!("index = 0\n[widget]\nid = \"mute\"\n{}", settings)).unwrap();
        let geometry = Geometry {
            rows: 1,
            columns: 1,
            keys: 1,
            pixels: 8,
            padding: 0,
        };
        let services = Services {
            audio: Some(audio),
            ..Services::detached()
        };
        MuteWidget::from_config(geometry, &cfg, &services).unwrap()
    }

    #[test]
    fn trigger_toggles_playback_mute() {
        let audio = Arc::new(FakeAudio::new("speakers", "mic"));
        let mut w = widget(audio.clone(), "");
        assert!(!w.muted);

        w.triggered(false);
        assert!(audio.state().sink_muted);
        assert!(w.muted);
        assert!(w.wants_render());

        w.triggered(false);
        assert!(!w.muted);
    }

    #[test]
    fn mic_widget_binds_to_capture_side() {
        let audio = Arc::new(FakeAudio::new("speakers", "mic"));
        let mut w = widget(audio.clone(), "stream = \"mic\"");

        w.triggered(false);
        assert!(audio.state().source_muted);
        assert!(!audio.state().sink_muted);
    }

    #[test]
    fn external_change_refreshes_cached_state() {
        let audio = Arc::new(FakeAudio::new("speakers", "mic"));
        let mut w = widget(audio.clone(), "");
        let dev = deckhand_device::SimDevice::new(1);
        w.render(&dev, 0).unwrap();
        assert!(!w.wants_render());

        audio.toggle_sink_mute().unwrap();
        // Notification for the other side is ignored.
        w.mute_changed(false);
        assert!(!w.wants_render());
        w.mute_changed(true);
        assert!(w.wants_render());
    }
}
