//! Error types for the UASC runtime

use std::path::PathBuf;
use thiserror::Error;
use uasc_core::{ActionError, CodecError, RegistryError};
use uasc_dsl::DslError;

/// Runtime error types
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Configuration file could not be read
    #[error("Failed to read {path}: {source}")]
    Io {
        /// File being read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Configuration file is not valid YAML
    #[error("Invalid configuration file: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// Graph documents failed to load
    #[error("Graph loading error: {0}")]
    GraphError(#[from] DslError),

    /// Registry rejected a graph or binding
    #[error("Registry error: {0}")]
    RegistryError(#[from] RegistryError),

    /// Action handler registration failed
    #[error("Action registration error: {0}")]
    ActionError(#[from] ActionError),

    /// Input line is not a frame
    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    /// Frame bytes could not be decoded
    #[error("Invalid frame: {0}")]
    CodecError(#[from] CodecError),
}

/// Result type for runtime operations
pub type RuntimeResult<T> = Result<T, RuntimeError>;

impl RuntimeError {
    /// Whether the error concerns a single input line rather than startup
    pub fn is_frame_error(&self) -> bool {
        matches!(self, RuntimeError::InvalidFrame(_) | RuntimeError::CodecError(_))
    }
}
