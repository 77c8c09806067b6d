//! Integration Tests
//!
//! Whole-pipeline tests over an assembly written to disk:
//! - Discovery: descriptors, locations, traits, stable ids
//! - Execution: outcome, duration, message and output translation
//! - Failure modes: missing assemblies and symbols, undiscovered results

#[path = "../common/mod.rs"]
mod common;

mod discovery;
mod execution;
mod failures;
