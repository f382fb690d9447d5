//! Error types for rlcheck

/// Result type alias using rlcheck's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for rlcheck operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Input file errors (missing columns, unreadable rows)
    #[error("input error: {0}")]
    Input(String),

    /// Output destination errors
    #[error("output error: {0}")]
    Output(String),

    /// Filesystem errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV encoding/decoding errors
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// Generic internal errors
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new input error
    pub fn input(msg: impl Into<String>) -> Self {
        Self::Input(msg.into())
    }

    /// Create a new output error
    pub fn output(msg: impl Into<String>) -> Self {
        Self::Output(msg.into())
    }

    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
