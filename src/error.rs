//! Error types for clusteropts
//!
//! Every failure in this crate is a hard stop: nothing here retries or falls
//! back to another machine.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for cluster option handling
#[derive(Error, Debug)]
pub enum ClusterError {
    /// Support for this machine is stubbed out
    #[error("Not implemented: {operation} for target machine '{machine}'")]
    NotImplemented { machine: String, operation: String },

    /// Core counts do not split evenly into nodes
    #[error(
        "Inconsistent topology: {total_max_nodes} nodes x {cores_per_node} cores/node != {total_max_cores} total cores"
    )]
    InconsistentTopology {
        total_max_cores: i64,
        cores_per_node: i64,
        total_max_nodes: i64,
    },

    /// Upward search did not find the project root marker
    #[error("Unable to find project root: no '{marker}' within {levels} levels of '{start}'")]
    RootNotFound {
        start: PathBuf,
        marker: String,
        levels: usize,
    },

    /// Space cores do not divide the cores of a node
    #[error(
        "Number of cores on node ({cores_per_node}) not evenly dividable by space cores ({par_space_cores})"
    )]
    InvalidDecomposition {
        cores_per_node: i64,
        par_space_cores: u32,
    },

    /// I/O error during file operations
    #[error("I/O error at '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl ClusterError {
    /// Create a not-implemented error for a machine/operation pair
    pub fn not_implemented(machine: impl Into<String>, operation: impl Into<String>) -> Self {
        Self::NotImplemented {
            machine: machine.into(),
            operation: operation.into(),
        }
    }

    /// Create an I/O error with path context
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError(message.into())
    }

    /// Check if this error should abort the run
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Io { .. })
    }

    /// Get the path associated with this error, if any
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::Io { path, .. } | Self::RootNotFound { start: path, .. } => Some(path),
            _ => None,
        }
    }
}

/// Result type alias for clusteropts operations
pub type Result<T> = std::result::Result<T, ClusterError>;

impl From<serde_json::Error> for ClusterError {
    fn from(err: serde_json::Error) -> Self {
        ClusterError::ConfigError(err.to_string())
    }
}

/// Extension trait for adding path context to std::io::Result
pub trait IoResultExt<T> {
    /// Add path context to an I/O error
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|e| ClusterError::io(path, e))
    }
}
