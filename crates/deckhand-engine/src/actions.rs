//! Applies the effects of a compound action configuration.
//!
//! Every field of an [`ActionConfig`] is optional and independent; the
//! configured effects run in a fixed order (deck switch, key input,
//! paste, bus call, command, device control). Failing effects are
//! logged and never abort the remaining ones or the event loop.

use std::{path::Path, sync::Arc};

use deckhand_config::ActionConfig;
use deckhand_device::{Device, Geometry};
use tokio::time::{Duration, sleep};
use tracing::{debug, warn};

use crate::{
    deck::Deck,
    keyspec::{self, Step},
    services::{KeyInjector, Services},
};

/// Key spec synthesized for the `paste` effect (ctrl-v).
const PASTE_SPEC: &str = "29-47";

/// Mutable engine state an action is allowed to touch.
pub struct Effects<'a> {
    /// Device the engine drives.
    pub dev: &'a dyn Device,
    /// Collaborator handles for input, clipboard, and bus effects.
    pub services: &'a Services,
    /// Geometry used when loading a replacement deck.
    pub geometry: Geometry,
    /// Directory deck-switch targets resolve against.
    pub deck_dir: &'a Path,
    /// Current panel brightness, updated by `device` effects.
    pub brightness: &'a mut u8,
}

/// Apply `action`. Returns a replacement deck when the action switches
/// decks and the new deck loaded cleanly.
pub fn run(fx: &mut Effects<'_>, action: &ActionConfig) -> Option<Deck> {
    let mut next_deck = None;
    if let Some(target) = &action.deck {
        match Deck::load(fx.geometry, fx.deck_dir, Path::new(target), fx.services) {
            Ok(deck) => next_deck = Some(deck),
            Err(e) => warn!(deck = %target, "cannot switch deck: {}", e),
        }
    }
    if let Some(spec) = &action.keycode {
        inject(fx.services, spec);
    }
    if let Some(text) = &action.paste {
        paste(fx.services, text);
    }
    if let Some(dbus) = &action.dbus {
        if let Some(ipc) = fx.services.ipc.clone() {
            let dbus = dbus.clone();
            tokio::task::spawn_blocking(move || {
                if let Err(e) =
                    ipc.call(&dbus.object, &dbus.path, &dbus.method, dbus.value.as_deref())
                {
                    warn!(method = %dbus.method, "bus call failed: {}", e);
                }
            });
        } else {
            warn!("bus client unavailable; dbus action skipped");
        }
    }
    if let Some(cmdline) = &action.exec {
        if let Err(e) = fx.services.spawner.spawn(cmdline) {
            warn!(cmd = %cmdline, "cannot run command: {}", e);
        }
    }
    if let Some(cmd) = &action.device {
        device_command(fx, cmd);
    }
    next_deck
}

/// Parse and asynchronously play back a key input spec.
fn inject(services: &Services, spec: &str) {
    let Some(injector) = services.injector.clone() else {
        warn!("key injector unavailable; keycode action skipped");
        return;
    };
    let steps = match keyspec::parse(spec) {
        Ok(steps) => steps,
        Err(e) => {
            warn!(spec, "invalid keycode spec: {}", e);
            return;
        }
    };
    tokio::spawn(async move {
        play_steps(injector, steps).await;
    });
}

/// Hold the modifiers of each combo, tap its final code, release in
/// reverse order, then honor the configured pause.
async fn play_steps(injector: Arc<dyn KeyInjector>, steps: Vec<Step>) {
    for step in steps {
        let (last, held) = match step.codes.split_last() {
            Some(split) => split,
            None => continue,
        };
        let mut failed = false;
        for &code in held {
            if let Err(e) = injector.key_down(code) {
                warn!(code, "cannot press key: {}", e);
                failed = true;
                break;
            }
        }
        if !failed && let Err(e) = injector.tap(*last) {
            warn!(code = *last, "cannot tap key: {}", e);
        }
        for &code in held.iter().rev() {
            if let Err(e) = injector.key_up(code) {
                warn!(code, "cannot release key: {}", e);
            }
        }
        if let Some(ms) = step.delay_ms {
            sleep(Duration::from_millis(ms)).await;
        }
    }
}

/// Write `text` to the clipboard and synthesize a paste keystroke.
fn paste(services: &Services, text: &str) {
    let Some(clipboard) = services.clipboard.as_ref() else {
        warn!("clipboard unavailable; paste action skipped");
        return;
    };
    if let Err(e) = clipboard.set_text(text) {
        warn!("cannot write clipboard: {}", e);
        return;
    }
    inject(services, PASTE_SPEC);
}

/// Apply a `device` effect: `sleep` or a brightness adjustment.
fn device_command(fx: &mut Effects<'_>, cmd: &str) {
    if cmd == "sleep" {
        if let Err(e) = fx.dev.sleep() {
            warn!("cannot sleep device: {}", e);
        }
        return;
    }
    let Some(target) = brightness_target(*fx.brightness, cmd) else {
        warn!(cmd, "unknown device command");
        return;
    };
    debug!(brightness = target, "adjusting panel brightness");
    match fx.dev.set_brightness(target) {
        Ok(()) => *fx.brightness = target,
        Err(e) => warn!("cannot set brightness: {}", e),
    }
}

/// Resolve a `brightness` spec against the current value. `=` sets an
/// absolute level, `+`/`-` step relative (default step 10); the result
/// clamps to 1..=100 so the panel never goes fully dark.
fn brightness_target(current: u8, spec: &str) -> Option<u8> {
    let rest = spec.strip_prefix("brightness")?;
    let mut chars = rest.chars();
    let op = chars.next()?;
    let amount = chars.as_str().trim();
    let amount: Option<i32> = if amount.is_empty() {
        None
    } else {
        Some(amount.parse().ok()?)
    };
    let target = match op {
        '=' => amount?,
        '+' => i32::from(current) + amount.unwrap_or(10),
        '-' => i32::from(current) - amount.unwrap_or(10),
        _ => return None,
    };
    Some(target.clamp(1, 100) as u8)
}
