//! Error types for the simulator

use std::io;
use std::path::PathBuf;

use nvword_core::layout::LocationError;
use thiserror::Error;

/// Simulator errors
#[derive(Debug, Error)]
pub enum SimError {
    /// Failed to read a config file
    #[error("Failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Config file is not valid TOML or has unknown keys
    #[error("Invalid simulator config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Preloaded word is not a valid flash location
    #[error("Invalid stored word location: {0}")]
    Location(#[from] LocationError),
}

/// Result type for simulator operations
pub type Result<T> = std::result::Result<T, SimError>;
