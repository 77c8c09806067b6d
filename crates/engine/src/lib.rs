//! Translation engine for testbridge
//!
//! This crate turns framework test nodes and results into what a runner
//! reports:
//! - IdentityCache: one descriptor per test case, created on discovery and
//!   looked up on completion
//! - OutcomeTranslator: state mapping and message/output normalization
//! - StackTraceFilter: removal of framework frames
//! - BridgeConfig: `testbridge.toml`
//! - Logging sinks and host machine identity
//! - AssemblySession: config, navigator and cache for one assembly

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cache; // IdentityCache
pub mod config; // BridgeConfig
pub mod logging; // TracingLogger, RecordingLogger
pub mod machine; // HostMachine
pub mod outcome; // OutcomeTranslator
pub mod session; // AssemblySession
pub mod stack_trace; // StackTraceFilter

pub use cache::{IdentityCache, CATEGORY_TRAIT};
pub use config::{BridgeConfig, CONFIG_FILE_NAME, DEFAULT_EXECUTOR_URI, MAX_VERBOSITY};
pub use logging::{init_tracing, LogEntry, LogLevel, RecordingLogger, TracingLogger};
pub use machine::HostMachine;
pub use outcome::OutcomeTranslator;
pub use session::AssemblySession;
pub use stack_trace::StackTraceFilter;
