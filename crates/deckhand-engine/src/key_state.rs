use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use tokio::time::Instant;

/// Hold duration at which a press stops being "short" and the long-press
/// watch fires.
pub const LONG_PRESS_DURATION: Duration = Duration::from_millis(350);

/// Last observed state of one physical key.
#[derive(Debug, Clone, Copy)]
struct PressRecord {
    pressed: bool,
    since: Instant,
}

/// Classified state change produced by [`KeyStateTracker::observe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The key went from released to pressed.
    Pressed,
    /// The key went from pressed to released after being held for `held`.
    Released {
        /// Time the key spent pressed.
        held: Duration,
    },
}

/// Tracks per-key press state and transition timestamps.
///
/// Shared between the event loop (which records transitions) and the
/// long-press watch tasks (which re-read the live state at fire time),
/// so all access goes through one lock.
#[derive(Clone)]
pub struct KeyStateTracker {
    states: Arc<Mutex<HashMap<u8, PressRecord>>>,
}

impl KeyStateTracker {
    /// Create a new key state tracker.
    pub fn new() -> Self {
        Self {
            states: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Record a device report for `key` taken at `now`.
    ///
    /// Returns the transition this report represents, or `None` when the
    /// report repeats the last known state (debounce) or is a release for
    /// a key never seen pressed.
    pub fn observe(&self, key: u8, pressed: bool, now: Instant) -> Option<Transition> {
        let mut states = self.states.lock().unwrap();
        let prev = states.get(&key).copied();
        if let Some(rec) = prev
            && rec.pressed == pressed
        {
            return None;
        }
        states.insert(key, PressRecord { pressed, since: now });
        if pressed {
            Some(Transition::Pressed)
        } else {
            prev.map(|rec| Transition::Released {
                held: now.saturating_duration_since(rec.since),
            })
        }
    }

    /// True if `key` is currently considered down.
    pub fn is_pressed(&self, key: u8) -> bool {
        self.states
            .lock()
            .unwrap()
            .get(&key)
            .is_some_and(|rec| rec.pressed)
    }

    /// True if `key` is still down from the press recorded at `since`.
    ///
    /// The long-press watch uses this rather than [`Self::is_pressed`] so a
    /// release-and-repress inside the threshold window cannot satisfy a
    /// stale watch.
    pub fn still_pressed_since(&self, key: u8, since: Instant) -> bool {
        self.states
            .lock()
            .unwrap()
            .get(&key)
            .is_some_and(|rec| rec.pressed && rec.since == since)
    }
}

impl Default for KeyStateTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_release_transitions() {
        let tracker = KeyStateTracker::new();
        let t0 = Instant::now();

        assert_eq!(tracker.observe(2, true, t0), Some(Transition::Pressed));
        assert!(tracker.is_pressed(2));

        let t1 = t0 + Duration::from_millis(100);
        assert_eq!(
            tracker.observe(2, false, t1),
            Some(Transition::Released {
                held: Duration::from_millis(100)
            })
        );
        assert!(!tracker.is_pressed(2));
    }

    #[test]
    fn repeated_reports_are_debounced() {
        let tracker = KeyStateTracker::new();
        let t0 = Instant::now();

        assert_eq!(tracker.observe(0, true, t0), Some(Transition::Pressed));
        assert_eq!(
            tracker.observe(0, true, t0 + Duration::from_millis(10)),
            None
        );
        // Hold duration is measured from the first press report.
        assert_eq!(
            tracker.observe(0, false, t0 + Duration::from_millis(50)),
            Some(Transition::Released {
                held: Duration::from_millis(50)
            })
        );
        assert_eq!(
            tracker.observe(0, false, t0 + Duration::from_millis(60)),
            None
        );
    }

    #[test]
    fn initial_release_is_ignored() {
        let tracker = KeyStateTracker::new();
        assert_eq!(tracker.observe(5, false, Instant::now()), None);
    }

    #[test]
    fn stale_watch_does_not_match_a_new_press() {
        let tracker = KeyStateTracker::new();
        let t0 = Instant::now();
        tracker.observe(1, true, t0);
        assert!(tracker.still_pressed_since(1, t0));

        let t1 = t0 + Duration::from_millis(100);
        tracker.observe(1, false, t1);
        let t2 = t0 + Duration::from_millis(200);
        tracker.observe(1, true, t2);

        assert!(!tracker.still_pressed_since(1, t0));
        assert!(tracker.still_pressed_since(1, t2));
    }
}
