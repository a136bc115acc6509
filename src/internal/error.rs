use std::io;
use thiserror::Error;

/// Errors raised while configuring or installing the keyboard.
#[derive(Debug, Error)]
pub enum KeyboardError {
    /// Applying a keymap or layout configuration hit a broken precondition,
    /// e.g. `loadkeys` could not be run at all.
    #[error("keyboard configuration failed: {0}")]
    Configuration(String),

    /// Persisting a configuration file into the target root failed.
    #[error("keyboard installation failed: {0}")]
    Installation(String),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    /// The capability flags or install document could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl KeyboardError {
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        KeyboardError::Io {
            context: context.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, KeyboardError>;
