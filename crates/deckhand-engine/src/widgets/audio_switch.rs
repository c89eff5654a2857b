use std::sync::Arc;

use deckhand_config::{ActionConfig, KeyConfig};
use deckhand_device::{Device, Geometry, KeyImage};
use tracing::{debug, warn};

use crate::{
    Result, Widget,
    services::{AudioChange, AudioControl, Services},
    widget::AudioObserver,
    widgets::{DEFAULT_COLOR, DIM_COLOR, parse_color},
};

/// Stream pair named by an `audio` widget: capture source and playback
/// sink, configured as a `"source,sink"` list (a single name covers both).
#[derive(Debug, Clone, Default)]
struct StreamPair {
    source: String,
    sink: String,
}

impl StreamPair {
    fn parse(value: Option<String>) -> Self {
        let value = value.unwrap_or_default();
        let mut parts = value.split(',').map(str::trim);
        let source = parts.next().unwrap_or_default().to_string();
        let sink = parts.next().map_or_else(|| source.clone(), str::to_string);
        Self { source, sink }
    }
}

/// Switches the audio system's default sink/source between a main and an
/// alternate stream, indicating which side is active.
pub struct AudioSwitchWidget {
    pixels: u16,
    main_color: [u8; 4],
    alt_color: [u8; 4],
    action: Option<ActionConfig>,
    action_hold: Option<ActionConfig>,
    main: StreamPair,
    alt: StreamPair,
    audio: Option<Arc<dyn AudioControl>>,
    shown: Option<bool>,
}

impl AudioSwitchWidget {
    /// Build an audio switch from its key configuration.
    pub fn from_config(geometry: Geometry, cfg: &KeyConfig, services: &Services) -> Result<Self> {
        if services.audio.is_none() {
            warn!(key = cfg.index, "audio collaborator unavailable; audio widget inert");
        }
        Ok(Self {
            pixels: geometry.pixels,
            main_color: parse_color(cfg.widget.str_setting("color"), DEFAULT_COLOR)?,
            alt_color: parse_color(cfg.widget.str_setting("altColor"), DIM_COLOR)?,
            action: cfg.action.clone(),
            action_hold: cfg.action_hold.clone(),
            main: StreamPair::parse(cfg.widget.str_setting("main")),
            alt: StreamPair::parse(cfg.widget.str_setting("stream")),
            audio: services.audio.clone(),
            shown: None,
        })
    }

    /// Whether the main stream is the current default sink. Matching is
    /// substring-based, so short configured names match long daemon names.
    fn main_is_default(&self) -> bool {
        let Some(audio) = self.audio.as_ref() else {
            return true;
        };
        let current = audio.default_sink().unwrap_or_default();
        if self.main.sink.is_empty() {
            !current.contains(&self.alt.sink)
        } else {
            current.contains(&self.main.sink)
        }
    }

    fn set_sink(&self, alt: bool) {
        let Some(audio) = self.audio.as_ref() else {
            return;
        };
        let name = if alt { &self.alt.sink } else { &self.main.sink };
        if let Err(e) = audio.set_default_sink(name) {
            warn!("cannot switch default sink to '{}': {}", name, e);
        }
    }

    fn set_source(&self, alt: bool) {
        let Some(audio) = self.audio.as_ref() else {
            return;
        };
        let name = if alt {
            &self.alt.source
        } else {
            &self.main.source
        };
        if let Err(e) = audio.set_default_source(name) {
            warn!("cannot switch default source to '{}': {}", name, e);
        }
    }
}

impl Widget for AudioSwitchWidget {
    fn wants_render(&mut self) -> bool {
        self.shown != Some(self.main_is_default())
    }

    fn render(&mut self, dev: &dyn Device, key: u8) -> Result<()> {
        let main = self.main_is_default();
        let color = if main { self.main_color } else { self.alt_color };
        dev.set_image(key, &KeyImage::solid(self.pixels, color))?;
        self.shown = Some(main);
        Ok(())
    }

    fn triggered(&mut self, hold: bool) {
        if !hold {
            self.set_sink(self.main_is_default());
        }
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

impl AudioObserver for AudioSwitchWidget {
    fn mute_changed(&mut self, _playback: bool) {}

    fn audio_changed(&mut self, change: AudioChange) {
        match change {
            AudioChange::SinkChanged => {
                // Keep the capture side aligned with the playback side.
                debug!("default sink changed; aligning source");
                self.set_source(!self.main_is_default());
            }
            _ => {
                // The render gate picks up the new state on the next tick.
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeAudio;

    fn widget(audio: Arc<FakeAudio>) -> AudioSwitchWidget {
        let cfg: KeyConfig = toml::from_str(
            r#"
            index = 0
            [widget]
            id = "audio"
            main = "main-mic,main-speakers"
            stream = "headset-mic,headset"
            "#,
        )
        .unwrap();
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
        AudioSwitchWidget::from_config(geometry, &cfg, &services).unwrap()
    }

    #[test]
    fn trigger_flips_between_streams() {
        let audio = Arc::new(FakeAudio::new("alsa.main-speakers.stereo", "main-mic"));
        let mut w = widget(audio.clone());
        assert!(w.main_is_default());

        w.triggered(false);
        assert_eq!(audio.state().sink, "headset");
        assert!(!w.main_is_default());

        w.triggered(false);
        assert_eq!(audio.state().sink, "main-speakers");
    }

    #[test]
    fn sink_change_aligns_source() {
        let audio = Arc::new(FakeAudio::new("main-speakers", "main-mic"));
        let mut w = widget(audio.clone());

        // Some other client switched the default sink to the alt stream.
        audio.set_sink_external("usb.headset.mono");
        w.audio_changed(AudioChange::SinkChanged);
        assert_eq!(audio.state().source, "headset-mic");
        assert!(w.wants_render());
    }

    #[test]
    fn render_tracks_default_state() {
        let audio = Arc::new(FakeAudio::new("main-speakers", "main-mic"));
        let mut w = widget(audio);
        let dev = deckhand_device::SimDevice::new(1);
        assert!(w.wants_render());
        w.render(&dev, 0).unwrap();
        assert!(!w.wants_render());
    }
}
