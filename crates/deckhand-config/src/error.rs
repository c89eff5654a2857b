//! Error types for deck configuration loading.

use std::{path::PathBuf, result::Result as StdResult};

use thiserror::Error;

/// Convenient result type for configuration operations.
pub type Result<T> = StdResult<T, Error>;

/// Errors produced while reading or parsing a deck configuration.
#[derive(Debug, Error, Clone)]
pub enum Error {
    /// I/O or filesystem read error.
    #[error("{message}")]
    Read {
        /// Path associated with the read error, when known.
        path: Option<PathBuf>,
        /// Human-readable error message.
        message: String,
    },

    /// TOML parse or deserialization error.
    #[error("{message}")]
    Parse {
        /// Path associated with the parse error, when known.
        path: Option<PathBuf>,
        /// Human-readable error message.
        message: String,
    },

    /// Semantic validation error (bad regex, bad widget kind, ...).
    #[error("{message}")]
    Validation {
        /// Human-readable error message.
        message: String,
    },
}

impl Error {
    /// Render a human-friendly message including the path when available.
    pub fn pretty(&self) -> String {
        match self {
            Self::Read { path, message } => match path {
                Some(p) => format!("Read error at {}: {}", p.display(), message),
                None => format!("Read error: {}", message),
            },
            Self::Parse { path, message } => match path {
                Some(p) => format!("Deck parse error at {}:\n{}", p.display(), message),
                None => format!("Deck parse error:\n{}", message),
            },
            Self::Validation { message } => format!("Invalid deck configuration: {}", message),
        }
    }
}
