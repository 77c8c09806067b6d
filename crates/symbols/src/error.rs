//! Error types for symbol reading

use std::io;
use std::path::PathBuf;
use testbridge_core::BridgeError;
use thiserror::Error;

/// Result type alias for symbol operations
pub type SymbolResult<T> = std::result::Result<T, SymbolError>;

/// Errors raised while reading an assembly and its debug symbols
#[derive(Debug, Error)]
pub enum SymbolError {
    /// I/O error opening or mapping a file
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Data ended before a structure was complete
    #[error("{context}: truncated at offset {offset}")]
    Truncated {
        /// Structure being read
        context: &'static str,
        /// Offset where the read failed
        offset: usize,
    },

    /// Structurally invalid data
    #[error("Malformed image: {0}")]
    Malformed(String),

    /// The PE image carries no CLI header
    #[error("Not a managed assembly: {0}")]
    NotManaged(String),

    /// No debug symbols could be located for the assembly
    #[error("No debug symbols found for '{}'", .0.display())]
    MissingSymbols(PathBuf),

    /// Debug symbols exist but are not Portable PDB
    #[error("Unsupported symbol format in '{}' (only Portable PDB is supported)", .0.display())]
    UnsupportedSymbols(PathBuf),

    /// The index for this navigator failed to build earlier
    #[error("Failed to load assembly '{path}': {reason}")]
    AssemblyLoad {
        /// Assembly path
        path: String,
        /// Original failure
        reason: String,
    },
}

impl SymbolError {
    /// Build a `Malformed` error
    pub fn malformed(message: impl Into<String>) -> Self {
        SymbolError::Malformed(message.into())
    }
}

impl From<SymbolError> for BridgeError {
    fn from(e: SymbolError) -> Self {
        match e {
            SymbolError::AssemblyLoad { path, reason } => BridgeError::AssemblyLoad { path, reason },
            other => BridgeError::AssemblyLoad {
                path: String::new(),
                reason: other.to_string(),
            },
        }
    }
}
