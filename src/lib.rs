//! testbridge - test identity, source navigation and outcome translation
//!
//! Bridges an NUnit-style framework's run model to a VSTest-style runner's
//! reporting model for one compiled test assembly at a time.
//!
//! # Quick Start
//!
//! ```ignore
//! use testbridge::{AssemblySession, RawOutcome, ResultState, TestIdentity};
//!
//! let session = AssemblySession::open("bin/Release/Acme.Tests.dll")?;
//!
//! // Discovery: one descriptor per test case, located through the PDB
//! let adds = TestIdentity::case(
//!     "0-1001",
//!     "Acme.Tests.CalculatorTests.Adds",
//!     "Adds",
//!     "Acme.Tests.CalculatorTests",
//!     "Adds",
//! );
//! let descriptor = session.discover(&adds)?;
//!
//! // Execution: results are matched to the descriptor by unique name
//! let result = session.record(&RawOutcome::new("0-1001", ResultState::Success, 0.02));
//! ```
//!
//! # Architecture
//!
//! - `testbridge-core`: data model, errors and collaborator traits
//! - `testbridge-symbols`: PE, ECMA-335 metadata and Portable PDB reading
//! - `testbridge-engine`: identity cache, outcome translation, configuration

pub use testbridge_core::*;
pub use testbridge_engine::*;
pub use testbridge_symbols::{
    AssemblyFile, IndexLoader, SymbolError, SymbolNavigator, SymbolResult, TypeIndex,
};

/// Symbol reading internals and the test image builder
pub mod symbols {
    pub use testbridge_symbols::*;
}
