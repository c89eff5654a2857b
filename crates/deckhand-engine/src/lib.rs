//! Core engine for deckhand: owns the device, the active deck, and the
//! single event loop that multiplexes key reports, repaint ticks,
//! long-press watches, collaborator notifications, and control
//! messages.
//!
//! The engine is deliberately single-threaded at the decision level.
//! Everything that can block (spawned commands, synthetic key playback,
//! bus calls) is pushed onto tasks; the loop itself only routes events
//! and mutates deck state.

mod actions;
mod deck;
mod error;
mod key_state;
mod keyspec;
mod services;
mod spawn;
pub mod test_support;
mod widget;
mod widgets;

use std::{path::Path, sync::Arc};

use deckhand_device::{Device, KeyEvent};
use tokio::{
    select,
    sync::mpsc::{self, UnboundedReceiver, UnboundedSender},
    time::{self, Duration, Instant, MissedTickBehavior},
};
use tracing::{debug, info, warn};

pub use deck::{Deck, OverrideSet};
pub use error::{Error, Result};
pub use key_state::{KeyStateTracker, LONG_PRESS_DURATION, Transition};
pub use services::{
    ActiveWindow, AudioChange, AudioControl, Clipboard, IpcCall, KeyInjector, ServiceError,
    ServiceResult, Services, WindowEvent, WindowOps,
};
pub use spawn::{CommandSpawner, ResourceGroup};
pub use widget::{AudioObserver, Widget, WindowObserver};

/// Repaint cadence of the event loop.
const TICK_INTERVAL: Duration = Duration::from_millis(100);
/// How many recently active windows are kept for `recentWindow` widgets.
const RECENT_WINDOW_LIMIT: usize = 10;

/// Control messages accepted by a running engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    /// Reload the active deck file from disk.
    Reload,
    /// Clean up and stop the event loop.
    Shutdown,
}

/// Cloneable handle for sending control messages into a running engine.
#[derive(Clone)]
pub struct EngineHandle {
    tx: UnboundedSender<Control>,
}

impl EngineHandle {
    /// Ask the engine to reload its deck file.
    pub fn reload(&self) {
        let _ = self.tx.send(Control::Reload);
    }

    /// Ask the engine to shut down.
    pub fn shutdown(&self) {
        let _ = self.tx.send(Control::Shutdown);
    }
}

/// Event routed through one iteration of the loop.
enum LoopEvent {
    Tick,
    Key(KeyEvent),
    KeyStreamClosed,
    LongPress(u8),
    Audio(AudioChange),
    Window(WindowEvent),
    Control(Control),
}

/// The deckhand engine: device, active deck, and event loop state.
pub struct Engine {
    dev: Arc<dyn Device>,
    deck: Deck,
    services: Services,
    tracker: KeyStateTracker,
    brightness: u8,
    recent: Vec<ActiveWindow>,
    active_window: Option<ActiveWindow>,
    press_tx: UnboundedSender<u8>,
    press_rx: UnboundedReceiver<u8>,
    control_tx: UnboundedSender<Control>,
    control_rx: UnboundedReceiver<Control>,
    audio_rx: Option<UnboundedReceiver<AudioChange>>,
    window_rx: Option<UnboundedReceiver<WindowEvent>>,
}

impl Engine {
    /// Create an engine driving `dev` with `deck` installed.
    pub fn new(dev: Arc<dyn Device>, deck: Deck, services: Services, brightness: u8) -> Self {
        let (press_tx, press_rx) = mpsc::unbounded_channel();
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        Self {
            dev,
            deck,
            services,
            tracker: KeyStateTracker::new(),
            brightness,
            recent: Vec::new(),
            active_window: None,
            press_tx,
            press_rx,
            control_tx,
            control_rx,
            audio_rx: None,
            window_rx: None,
        }
    }

    /// Attach a stream of audio-system notifications.
    #[must_use]
    pub fn with_audio_events(mut self, rx: UnboundedReceiver<AudioChange>) -> Self {
        self.audio_rx = Some(rx);
        self
    }

    /// Attach a stream of window-tracker notifications.
    #[must_use]
    pub fn with_window_events(mut self, rx: UnboundedReceiver<WindowEvent>) -> Self {
        self.window_rx = Some(rx);
        self
    }

    /// Control handle usable from other tasks (signal handlers).
    pub fn handle(&self) -> EngineHandle {
        EngineHandle {
            tx: self.control_tx.clone(),
        }
    }

    /// Run the event loop until shutdown or a device failure.
    pub async fn run(mut self) -> Result<()> {
        self.dev.set_brightness(self.brightness)?;
        self.deck.force_repaint(self.dev.as_ref())?;
        let mut keys = Some(self.dev.key_events()?);

        let mut tick = time::interval(TICK_INTERVAL);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            let event = select! {
                _ = tick.tick() => LoopEvent::Tick,
                ev = recv_opt(&mut keys) => match ev {
                    Some(ev) => LoopEvent::Key(ev),
                    None => LoopEvent::KeyStreamClosed,
                },
                Some(key) = self.press_rx.recv() => LoopEvent::LongPress(key),
                Some(change) = recv_opt(&mut self.audio_rx) => LoopEvent::Audio(change),
                Some(ev) = recv_opt(&mut self.window_rx) => LoopEvent::Window(ev),
                Some(ctl) = self.control_rx.recv() => LoopEvent::Control(ctl),
            };
            match event {
                LoopEvent::Tick => self.deck.repaint(self.dev.as_ref())?,
                LoopEvent::Key(ev) => self.on_key(ev)?,
                LoopEvent::KeyStreamClosed => {
                    warn!("key event stream closed; reopening");
                    keys = Some(self.dev.key_events()?);
                }
                LoopEvent::LongPress(key) => self.trigger(key, true)?,
                LoopEvent::Audio(change) => self.on_audio(change),
                LoopEvent::Window(ev) => self.on_window(ev)?,
                LoopEvent::Control(Control::Reload) => self.reload()?,
                LoopEvent::Control(Control::Shutdown) => {
                    info!("shutting down");
                    self.deck.dispose();
                    self.dev.clear()?;
                    return Ok(());
                }
            }
        }
    }

    /// Classify a raw key report and arm the long-press watch on press.
    fn on_key(&mut self, ev: KeyEvent) -> Result<()> {
        let now = Instant::now();
        match self.tracker.observe(ev.index, ev.pressed, now) {
            Some(Transition::Pressed) => {
                let tracker = self.tracker.clone();
                let press_tx = self.press_tx.clone();
                let key = ev.index;
                tokio::spawn(async move {
                    time::sleep(LONG_PRESS_DURATION).await;
                    // Only fire if this very press is still being held.
                    if tracker.still_pressed_since(key, now) {
                        let _ = press_tx.send(key);
                    }
                });
            }
            Some(Transition::Released { held }) if held < LONG_PRESS_DURATION => {
                self.trigger(ev.index, false)?;
            }
            _ => {}
        }
        Ok(())
    }

    /// Notify the effective widget and run its configured action.
    fn trigger(&mut self, key: u8, hold: bool) -> Result<()> {
        debug!(key, hold, "key triggered");
        let action = match self.deck.effective_widget_mut(key) {
            Some(w) => {
                w.triggered(hold);
                w.action(hold).cloned()
            }
            None => None,
        };
        let Some(action) = action else {
            return Ok(());
        };
        let next = {
            let mut fx = actions::Effects {
                dev: self.dev.as_ref(),
                services: &self.services,
                geometry: self.dev.geometry(),
                deck_dir: self.deck.dir(),
                brightness: &mut self.brightness,
            };
            actions::run(&mut fx, &action)
        };
        if let Some(next) = next {
            self.install_deck(next)?;
        }
        Ok(())
    }

    /// Swap in `next`, carrying over the current window context.
    fn install_deck(&mut self, mut next: Deck) -> Result<()> {
        info!(path = %next.path().display(), "installing deck");
        next.window_changed(self.active_window.as_ref());
        for w in next.widgets_mut() {
            if let Some(obs) = w.as_window_observer() {
                obs.recent_windows_changed(&self.recent);
            }
        }
        self.deck.dispose();
        self.deck = next;
        self.dev.clear()?;
        self.deck.force_repaint(self.dev.as_ref())
    }

    /// Reload the active deck file; a failing load keeps the current deck.
    fn reload(&mut self) -> Result<()> {
        let path = self.deck.path().to_path_buf();
        info!(path = %path.display(), "reloading deck");
        match Deck::load(self.dev.geometry(), Path::new("."), &path, &self.services) {
            Ok(next) => self.install_deck(next),
            Err(e) => {
                warn!("cannot reload deck, keeping the current one: {}", e.pretty());
                Ok(())
            }
        }
    }

    /// Fan an audio notification out to every audio-observing widget.
    fn on_audio(&mut self, change: AudioChange) {
        debug!(?change, "audio notification");
        let playback = matches!(
            change,
            AudioChange::SinkChanged | AudioChange::SinkMuteChanged
        );
        for w in self.deck.widgets_mut() {
            if let Some(obs) = w.as_audio_observer() {
                obs.mute_changed(playback);
                obs.audio_changed(change);
            }
        }
    }

    /// Update the recent-window list and re-resolve deck overrides.
    fn on_window(&mut self, ev: WindowEvent) -> Result<()> {
        match ev {
            WindowEvent::Activated(win) => {
                debug!(class = %win.class, title = %win.title, "window activated");
                self.recent.retain(|w| w.id != win.id);
                self.recent.insert(0, win.clone());
                self.recent.truncate(RECENT_WINDOW_LIMIT);
                self.active_window = Some(win);
            }
            WindowEvent::Closed { id } => {
                debug!(id, "window closed");
                self.recent.retain(|w| w.id != id);
            }
        }
        let recent = self.recent.clone();
        for w in self.deck.widgets_mut() {
            if let Some(obs) = w.as_window_observer() {
                obs.recent_windows_changed(&recent);
            }
        }
        let affected = self.deck.window_changed(self.active_window.as_ref());
        if !affected.is_empty() {
            self.deck.render_keys(self.dev.as_ref(), &affected)?;
        }
        Ok(())
    }
}

/// Receive from an optional channel; a missing channel never yields.
async fn recv_opt<T>(rx: &mut Option<UnboundedReceiver<T>>) -> Option<T> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
