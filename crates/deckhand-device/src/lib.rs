//! Device transport interface for key/display decks.
//!
//! The engine drives hardware exclusively through the [`Device`] trait:
//! a stream of key press/release events in, image blits and device-level
//! commands out. Geometry is queried once at open time. Vendor wire
//! protocols live behind this seam and are out of scope for this
//! workspace; [`SimDevice`] provides an in-memory implementation for
//! tests and the `--simulate` mode of the binary.

use std::{io, result::Result as StdResult};

use thiserror::Error;
use tokio::sync::mpsc::UnboundedReceiver;

mod sim;

pub use sim::SimDevice;

/// Convenient result type for device operations.
pub type Result<T> = StdResult<T, Error>;

/// Errors produced by a device transport.
#[derive(Debug, Error)]
pub enum Error {
    /// No compatible device was found at open time.
    #[error("no compatible deck device found")]
    NotFound,

    /// The transport has been closed and could not be reopened.
    #[error("device transport closed")]
    Closed,

    /// I/O failure while talking to the device.
    #[error("device I/O error: {0}")]
    Io(#[from] io::Error),

    /// Transport-specific failure with context.
    #[error("device error: {0}")]
    Msg(String),
}

/// Physical layout of a deck, queried once when the transport is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    /// Number of key rows.
    pub rows: u8,
    /// Number of key columns.
    pub columns: u8,
    /// Total key count (`rows * columns` for rectangular decks).
    pub keys: u8,
    /// Pixel edge length of one (square) key display.
    pub pixels: u16,
    /// Pixel gap between adjacent key displays.
    pub padding: u16,
}

/// A single key press or release reported by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    /// Key index, `0..geometry.keys`.
    pub index: u8,
    /// True on press, false on release.
    pub pressed: bool,
}

/// Raw RGBA image for one key display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyImage {
    /// Edge length in pixels (images are square).
    pub pixels: u16,
    /// RGBA bytes, `pixels * pixels * 4` long.
    pub data: Vec<u8>,
}

impl KeyImage {
    /// A uniform fill of `rgba` sized for a `pixels`-wide key.
    pub fn solid(pixels: u16, rgba: [u8; 4]) -> Self {
        let count = usize::from(pixels) * usize::from(pixels);
        let mut data = Vec::with_capacity(count * 4);
        for _ in 0..count {
            data.extend_from_slice(&rgba);
        }
        Self { pixels, data }
    }
}

/// Operations the engine needs from a deck transport.
///
/// `key_events` hands out the event stream; when the receiver reports
/// closure (a transport hiccup), calling it again reopens the stream.
pub trait Device: Send + Sync {
    /// Physical layout of the device.
    fn geometry(&self) -> Geometry;

    /// Blit an image onto one key display.
    fn set_image(&self, key: u8, image: &KeyImage) -> Result<()>;

    /// Set panel brightness as a percentage in `[1, 100]`.
    fn set_brightness(&self, percent: u8) -> Result<()>;

    /// Put the panel to sleep (displays off until the next key event).
    fn sleep(&self) -> Result<()>;

    /// Reset the device to its power-on state.
    fn reset(&self) -> Result<()>;

    /// Blank all key displays.
    fn clear(&self) -> Result<()>;

    /// Open (or reopen) the key-event stream.
    fn key_events(&self) -> Result<UnboundedReceiver<KeyEvent>>;
}
