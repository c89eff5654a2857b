//! Test doubles for the collaborator traits and a probe widget.
//!
//! Used by the crate's own unit tests and by the integration tests, so
//! this module is always compiled.

use std::sync::{Arc, Mutex};

use deckhand_config::ActionConfig;
use deckhand_device::{Device, KeyImage};

use crate::{
    Result, Widget,
    services::{AudioControl, Clipboard, IpcCall, KeyInjector, ServiceResult, WindowOps},
};

/// Shared log of `(tag, hold)` trigger notifications.
pub type TriggerLog = Arc<Mutex<Vec<(u8, bool)>>>;

/// Shared log of widget tags whose `dispose` ran.
pub type DisposeLog = Arc<Mutex<Vec<u8>>>;

/// Minimal widget that records its triggers and renders a fill encoding
/// its tag, so tests can read back which widget owns a key.
pub struct ProbeWidget {
    tag: u8,
    dirty: bool,
    log: Option<TriggerLog>,
    action: Option<ActionConfig>,
    disposed: Option<DisposeLog>,
}

impl ProbeWidget {
    /// A probe rendering `[tag, tag, tag, 0xff]`.
    pub fn new(tag: u8) -> Self {
        Self {
            tag,
            dirty: true,
            log: None,
            action: None,
            disposed: None,
        }
    }

    /// Record triggers into `log`.
    pub fn with_log(tag: u8, log: TriggerLog) -> Self {
        Self {
            log: Some(log),
            ..Self::new(tag)
        }
    }

    /// Attach an action returned for both press edges.
    pub fn with_action(mut self, action: ActionConfig) -> Self {
        self.action = Some(action);
        self
    }

    /// Record this widget's tag into `log` when it is disposed.
    pub fn with_dispose(mut self, log: DisposeLog) -> Self {
        self.disposed = Some(log);
        self
    }
}

impl Widget for ProbeWidget {
    fn wants_render(&mut self) -> bool {
        self.dirty
    }

    fn render(&mut self, dev: &dyn Device, key: u8) -> Result<()> {
        dev.set_image(key, &KeyImage::solid(1, [self.tag, self.tag, self.tag, 0xff]))?;
        self.dirty = false;
        Ok(())
    }

    fn triggered(&mut self, hold: bool) {
        if let Some(log) = &self.log {
            log.lock().unwrap().push((self.tag, hold));
        }
        self.dirty = true;
    }

    fn action(&self, _hold: bool) -> Option<&ActionConfig> {
        self.action.as_ref()
    }

    fn dispose(&mut self) {
        if let Some(log) = &self.disposed {
            log.lock().unwrap().push(self.tag);
        }
    }
}

/// In-memory audio daemon state.
#[derive(Debug, Clone)]
pub struct AudioState {
    /// Current default sink name.
    pub sink: String,
    /// Current default source name.
    pub source: String,
    /// Default sink mute flag.
    pub sink_muted: bool,
    /// Default source mute flag.
    pub source_muted: bool,
}

/// [`AudioControl`] double backed by plain in-memory state.
pub struct FakeAudio {
    state: Mutex<AudioState>,
}

impl FakeAudio {
    /// A daemon whose defaults are `sink` and `source`, both unmuted.
    pub fn new(sink: &str, source: &str) -> Self {
        Self {
            state: Mutex::new(AudioState {
                sink: sink.to_string(),
                source: source.to_string(),
                sink_muted: false,
                source_muted: false,
            }),
        }
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> AudioState {
        self.state.lock().unwrap().clone()
    }

    /// Change the default sink as if another client did it.
    pub fn set_sink_external(&self, name: &str) {
        self.state.lock().unwrap().sink = name.to_string();
    }
}

impl AudioControl for FakeAudio {
    fn default_sink(&self) -> Option<String> {
        Some(self.state.lock().unwrap().sink.clone())
    }

    fn default_source(&self) -> Option<String> {
        Some(self.state.lock().unwrap().source.clone())
    }

    fn sink_muted(&self) -> Option<bool> {
        Some(self.state.lock().unwrap().sink_muted)
    }

    fn source_muted(&self) -> Option<bool> {
        Some(self.state.lock().unwrap().source_muted)
    }

    fn set_default_sink(&self, name: &str) -> ServiceResult {
        self.state.lock().unwrap().sink = name.to_string();
        Ok(())
    }

    fn set_default_source(&self, name: &str) -> ServiceResult {
        self.state.lock().unwrap().source = name.to_string();
        Ok(())
    }

    fn toggle_sink_mute(&self) -> ServiceResult {
        let mut state = self.state.lock().unwrap();
        state.sink_muted = !state.sink_muted;
        Ok(())
    }

    fn toggle_source_mute(&self) -> ServiceResult {
        let mut state = self.state.lock().unwrap();
        state.source_muted = !state.source_muted;
        Ok(())
    }
}

/// [`KeyInjector`] double recording `down`/`up`/`tap` calls in order.
#[derive(Default)]
pub struct FakeInjector {
    log: Mutex<Vec<String>>,
}

impl FakeInjector {
    /// Recorded calls, oldest first.
    pub fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }
}

impl KeyInjector for FakeInjector {
    fn key_down(&self, code: u16) -> ServiceResult {
        self.log.lock().unwrap().push(format!("down {}", code));
        Ok(())
    }

    fn key_up(&self, code: u16) -> ServiceResult {
        self.log.lock().unwrap().push(format!("up {}", code));
        Ok(())
    }

    fn tap(&self, code: u16) -> ServiceResult {
        self.log.lock().unwrap().push(format!("tap {}", code));
        Ok(())
    }
}

/// [`Clipboard`] double holding the last written text.
#[derive(Default)]
pub struct FakeClipboard {
    text: Mutex<Option<String>>,
}

impl FakeClipboard {
    /// Last written text, if any.
    pub fn text(&self) -> Option<String> {
        self.text.lock().unwrap().clone()
    }
}

impl Clipboard for FakeClipboard {
    fn set_text(&self, text: &str) -> ServiceResult {
        *self.text.lock().unwrap() = Some(text.to_string());
        Ok(())
    }
}

/// [`IpcCall`] double recording calls as formatted strings.
#[derive(Default)]
pub struct FakeIpc {
    calls: Mutex<Vec<String>>,
    fail: bool,
}

impl FakeIpc {
    /// A bus that records every call but reports each as failed.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Recorded calls, oldest first.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl IpcCall for FakeIpc {
    fn call(
        &self,
        destination: &str,
        path: &str,
        method: &str,
        value: Option<&str>,
    ) -> ServiceResult {
        self.calls.lock().unwrap().push(format!(
            "{} {} {} {}",
            destination,
            path,
            method,
            value.unwrap_or("-")
        ));
        if self.fail {
            return Err(crate::services::ServiceError("bus unreachable".to_string()));
        }
        Ok(())
    }
}

/// [`WindowOps`] double recording activation requests.
#[derive(Default)]
pub struct FakeWindowOps {
    activated: Mutex<Vec<u32>>,
}

impl FakeWindowOps {
    /// Window ids activated, oldest first.
    pub fn activated(&self) -> Vec<u32> {
        self.activated.lock().unwrap().clone()
    }
}

impl WindowOps for FakeWindowOps {
    fn activate(&self, id: u32) -> ServiceResult {
        self.activated.lock().unwrap().push(id);
        Ok(())
    }
}

/// Let spawned tasks on the current runtime make progress. Works under
/// a paused clock, where sleeping would deadlock the test.
pub async fn settle() {
    for _ in 0..50 {
        tokio::task::yield_now().await;
    }
}
