use std::{io, result::Result as StdResult};

use thiserror::Error;

/// Convenient result type for the engine crate.
pub type Result<T> = StdResult<T, Error>;

/// Unified error type for the deckhand engine.
#[derive(Debug, Error)]
pub enum Error {
    /// Errors originating from the device transport.
    #[error("device error: {0}")]
    Device(#[from] deckhand_device::Error),

    /// Errors originating from configuration loading.
    #[error("configuration error: {0}")]
    Config(#[from] deckhand_config::Error),

    /// I/O failure while performing a system operation.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Generic error with context.
    #[error("engine error: {0}")]
    Msg(String),
}

impl Error {
    /// Render a human-friendly message. Configuration errors keep the
    /// offending file's path, which `Display` drops.
    pub fn pretty(&self) -> String {
        match self {
            Self::Config(e) => e.pretty(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn pretty_keeps_the_deck_path() {
        let e = Error::from(deckhand_config::Error::Parse {
            path: Some(PathBuf::from("/tmp/main.deck")),
            message: "expected newline".to_string(),
        });
        assert!(e.pretty().contains("/tmp/main.deck"));
        assert!(!e.to_string().contains("/tmp/main.deck"));

        let e = Error::Msg("no device".to_string());
        assert_eq!(e.pretty(), "engine error: no device");
    }
}
