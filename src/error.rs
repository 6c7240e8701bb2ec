//! Error types for the operator shell

use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Pipe closed: {0}")]
    PipeClosed(String),

    #[error("Surface error: {0}")]
    Surface(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Process exit code used when this error reaches the top level
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Spawn { .. } => 127,
            Self::Config(_) | Self::Toml(_) => 78,
            _ => 1,
        }
    }
}

/// Result type alias for this crate
pub type Result<T> = std::result::Result<T, Error>;
