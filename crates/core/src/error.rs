//! Error types for the bridge
//!
//! This module defines the error taxonomy shared by every crate:
//! - Usage errors (a suite node passed where a test case is required)
//! - Assembly/symbol load errors, fatal to one navigator instance
//! - Configuration errors
//!
//! Lookup misses are deliberately absent: an unknown cache key or an
//! unresolvable source location is a value (`None`, `NavigationResult::invalid()`),
//! never an error.
//!
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.

use std::io;
use thiserror::Error;

/// Result type alias for bridge operations
pub type BridgeResult<T> = std::result::Result<T, BridgeError>;

/// Error types for the bridge
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The caller passed input that the operation rejects
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The compiled assembly or its debug symbols could not be read
    #[error("Failed to load assembly '{path}': {reason}")]
    AssemblyLoad {
        /// Path of the assembly that failed to load
        path: String,
        /// Human-readable failure reason
        reason: String,
    },

    /// Configuration could not be read or is invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl BridgeError {
    /// Build an `InvalidArgument` error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        BridgeError::InvalidArgument(message.into())
    }

    /// Build an `AssemblyLoad` error
    pub fn assembly_load(path: impl Into<String>, reason: impl Into<String>) -> Self {
        BridgeError::AssemblyLoad {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Build a `Config` error
    pub fn config(message: impl Into<String>) -> Self {
        BridgeError::Config(message.into())
    }

    /// True when the error invalidates the whole assembly rather than one input
    pub fn is_load_failure(&self) -> bool {
        matches!(self, BridgeError::AssemblyLoad { .. })
    }
}
