//! Core types and traits for testbridge
//!
//! This crate defines the foundational types shared by the symbol reader and
//! the translation engine:
//! - TestIdentity / NodeKind: discovered framework nodes
//! - TestId / ExternalTestDescriptor / Trait: runner-facing test cases
//! - NavigationResult: source location lookups
//! - ResultState / RawOutcome: finished tests as the framework reports them
//! - ExternalOutcome / ExternalResult / Ticks / ResultMessage: finished tests as the runner expects them
//! - BridgeError: error taxonomy
//! - Traits: TestLogger, SourceNavigator, MachineIdentity

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod result_types;
pub mod traits;
pub mod types;

pub use error::{BridgeError, BridgeResult};
pub use result_types::{
    ExternalOutcome, ExternalResult, MessageCategory, RawOutcome, ResultMessage, ResultState,
    Ticks,
};
pub use traits::{FixedMachine, MachineIdentity, NullNavigator, SourceNavigator, TestLogger};
pub use types::{ExternalTestDescriptor, NavigationResult, NodeKind, TestId, TestIdentity, Trait};
