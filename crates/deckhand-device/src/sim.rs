//! In-memory device used by tests and `--simulate` runs.

use std::sync::Mutex;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::trace;

use crate::{Device, Error, Geometry, KeyEvent, KeyImage, Result};

/// Per-device state recorded by the simulator.
#[derive(Debug, Default)]
struct SimState {
    /// Sender side of the currently open key-event stream, if any.
    keys_tx: Option<UnboundedSender<KeyEvent>>,
    /// Last image blitted per key index.
    images: Vec<Option<KeyImage>>,
    /// Ordered log of key indices that were rendered.
    render_log: Vec<u8>,
    /// Last brightness value applied.
    brightness: Option<u8>,
    /// Whether the panel is currently asleep.
    asleep: bool,
    /// Number of `clear` calls observed.
    clears: usize,
}

/// A simulated deck: records every operation and lets tests inject key
/// events and transport hiccups.
pub struct SimDevice {
    geometry: Geometry,
    state: Mutex<SimState>,
}

impl SimDevice {
    /// Create a simulated device with `keys` buttons laid out in up to
    /// three columns of 72px displays.
    pub fn new(keys: u8) -> Self {
        let columns = keys.min(3).max(1);
        let rows = keys.div_ceil(columns).max(1);
        Self::with_geometry(Geometry {
            rows,
            columns,
            keys,
            pixels: 72,
            padding: 16,
        })
    }

    /// Create a simulated device with an explicit geometry.
    pub fn with_geometry(geometry: Geometry) -> Self {
        Self {
            geometry,
            state: Mutex::new(SimState {
                images: (0..geometry.keys).map(|_| None).collect(),
                ..SimState::default()
            }),
        }
    }

    fn send(&self, event: KeyEvent) {
        let state = self.state.lock().unwrap();
        if let Some(tx) = state.keys_tx.as_ref() {
            let _ = tx.send(event);
        }
    }

    /// Inject a key press.
    pub fn press(&self, index: u8) {
        self.send(KeyEvent {
            index,
            pressed: true,
        });
    }

    /// Inject a key release.
    pub fn release(&self, index: u8) {
        self.send(KeyEvent {
            index,
            pressed: false,
        });
    }

    /// Inject a raw key event (useful for duplicate-state tests).
    pub fn inject(&self, event: KeyEvent) {
        self.send(event);
    }

    /// Drop the sender side of the key stream, simulating a transport
    /// hiccup; the engine is expected to reopen via `key_events`.
    pub fn close_key_stream(&self) {
        self.state.lock().unwrap().keys_tx = None;
    }

    /// Key indices rendered since the last call, in order.
    pub fn drain_render_log(&self) -> Vec<u8> {
        std::mem::take(&mut self.state.lock().unwrap().render_log)
    }

    /// Last image blitted to `key`, if any.
    pub fn image(&self, key: u8) -> Option<KeyImage> {
        self.state
            .lock()
            .unwrap()
            .images
            .get(usize::from(key))
            .cloned()
            .flatten()
    }

    /// Last brightness applied, if any.
    pub fn brightness(&self) -> Option<u8> {
        self.state.lock().unwrap().brightness
    }

    /// Whether the panel is currently asleep.
    pub fn asleep(&self) -> bool {
        self.state.lock().unwrap().asleep
    }

    /// Number of `clear` calls observed.
    pub fn clears(&self) -> usize {
        self.state.lock().unwrap().clears
    }
}

impl Device for SimDevice {
    fn geometry(&self) -> Geometry {
        self.geometry
    }

    fn set_image(&self, key: u8, image: &KeyImage) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let slot = state
            .images
            .get_mut(usize::from(key))
            .ok_or_else(|| Error::Msg(format!("key {} out of range", key)))?;
        *slot = Some(image.clone());
        state.render_log.push(key);
        Ok(())
    }

    fn set_brightness(&self, percent: u8) -> Result<()> {
        self.state.lock().unwrap().brightness = Some(percent);
        Ok(())
    }

    fn sleep(&self) -> Result<()> {
        self.state.lock().unwrap().asleep = true;
        Ok(())
    }

    fn reset(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.asleep = false;
        state.images.fill(None);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.images.fill(None);
        state.clears += 1;
        Ok(())
    }

    fn key_events(&self) -> Result<UnboundedReceiver<KeyEvent>> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.state.lock().unwrap().keys_tx = Some(tx);
        trace!("sim key stream opened");
        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_images_and_render_order() {
        let dev = SimDevice::new(6);
        let img = KeyImage::solid(dev.geometry().pixels, [1, 2, 3, 255]);
        dev.set_image(2, &img).unwrap();
        dev.set_image(0, &img).unwrap();
        assert_eq!(dev.drain_render_log(), vec![2, 0]);
        assert_eq!(dev.image(2), Some(img));
        assert!(dev.drain_render_log().is_empty());
    }

    #[test]
    fn out_of_range_key_is_an_error() {
        let dev = SimDevice::new(3);
        let img = KeyImage::solid(72, [0, 0, 0, 255]);
        assert!(dev.set_image(3, &img).is_err());
    }

    #[tokio::test]
    async fn key_stream_reopen() {
        let dev = SimDevice::new(2);
        let mut rx = dev.key_events().unwrap();
        dev.press(1);
        assert_eq!(
            rx.recv().await,
            Some(KeyEvent {
                index: 1,
                pressed: true
            })
        );

        dev.close_key_stream();
        assert_eq!(rx.recv().await, None);

        let mut rx = dev.key_events().unwrap();
        dev.release(1);
        assert_eq!(
            rx.recv().await,
            Some(KeyEvent {
                index: 1,
                pressed: false
            })
        );
    }
}
