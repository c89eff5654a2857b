//! The polymorphic per-key behavior unit.
//!
//! A widget owns whatever state it needs to decide when it must be
//! redrawn; the deck asks via [`Widget::wants_render`] on every repaint
//! tick and only calls [`Widget::render`] when the answer is yes.
//! Domain notifications (audio, windows) are optional capabilities
//! queried through the `as_*_observer` methods.

use deckhand_config::ActionConfig;
use deckhand_device::Device;

use crate::{
    Result,
    services::{ActiveWindow, AudioChange},
};

/// Behavior bound to one physical key.
pub trait Widget: Send {
    /// Whether the widget needs to be redrawn. May kick off internal
    /// refresh work (state probes), hence `&mut self`.
    fn wants_render(&mut self) -> bool;

    /// Draw the widget onto its key display.
    fn render(&mut self, dev: &dyn Device, key: u8) -> Result<()>;

    /// Notification that the key was triggered (short or long press);
    /// purely internal state bookkeeping, the configured action is
    /// dispatched separately.
    fn triggered(&mut self, _hold: bool) {}

    /// The compound action configured for the given press edge.
    fn action(&self, hold: bool) -> Option<&ActionConfig>;

    /// Audio-notification capability, when implemented.
    fn as_audio_observer(&mut self) -> Option<&mut dyn AudioObserver> {
        None
    }

    /// Window-notification capability, when implemented.
    fn as_window_observer(&mut self) -> Option<&mut dyn WindowObserver> {
        None
    }

    /// Release external resources before the owning deck is discarded.
    fn dispose(&mut self) {}
}

impl core::fmt::Debug for dyn Widget {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("dyn Widget")
    }
}

/// Capability of widgets that react to audio-system notifications.
pub trait AudioObserver {
    /// A mute flag changed; `playback` is true for sink-side changes.
    fn mute_changed(&mut self, playback: bool);

    /// The default sink or source changed.
    fn audio_changed(&mut self, _change: AudioChange) {}
}

/// Capability of widgets that track recently active windows.
pub trait WindowObserver {
    /// The ordered most-recently-used window list changed (focus moved
    /// or a window closed).
    fn recent_windows_changed(&mut self, recent: &[ActiveWindow]);
}
