//! Collaborator traits
//!
//! The core talks to its surroundings through three seams:
//! - `TestLogger`: the runner's logging sink
//! - `SourceNavigator`: class/method to source location lookup
//! - `MachineIdentity`: the name reported as the machine a test ran on

use crate::error::BridgeResult;
use crate::types::NavigationResult;

/// Logging sink supplied by the host
///
/// Hosts forward these to the runner's message logger. Implementations
/// decide on their own whether low-verbosity diagnostics are shown.
pub trait TestLogger: Send + Sync {
    /// Report an error
    fn error(&self, message: &str);

    /// Report a warning
    fn warning(&self, message: &str);

    /// Report an informational message
    fn info(&self, message: &str);

    /// Report a diagnostic message
    fn debug(&self, message: &str);
}

/// Resolves a test method to its source location
pub trait SourceNavigator {
    /// Find the first executable source line of `method_name` on `class_name`
    ///
    /// Returns `NavigationResult::invalid()` when no location exists.
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::AssemblyLoad` when the backing assembly or its
    /// symbols cannot be read.
    fn resolve(&self, class_name: &str, method_name: &str) -> BridgeResult<NavigationResult>;
}

/// Navigator that never finds anything
///
/// Used when source information collection is turned off or no symbols
/// are available.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullNavigator;

impl SourceNavigator for NullNavigator {
    fn resolve(&self, _class_name: &str, _method_name: &str) -> BridgeResult<NavigationResult> {
        Ok(NavigationResult::invalid())
    }
}

/// Supplies the machine name attached to results
pub trait MachineIdentity: Send + Sync {
    /// Name of the machine
    fn machine_name(&self) -> String;
}

/// A machine identity with a fixed name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedMachine(pub String);

impl FixedMachine {
    /// Create a fixed identity
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl MachineIdentity for FixedMachine {
    fn machine_name(&self) -> String {
        self.0.clone()
    }
}
