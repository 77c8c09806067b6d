//! Shared test utilities for the integration suites.
//!
//! Import via `mod common;` from a test's main.rs.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use testbridge::symbols::testing::{Base, ImageBuilder, Point};
use testbridge::{AssemblySession, FixedMachine, RecordingLogger, TestIdentity};

pub const FIXTURE_CS: &str = "/src/Acme.Tests/CalculatorTests.cs";
pub const BASE_CS: &str = "/src/Acme.Tests/FixtureBase.cs";
pub const FIXTURE: &str = "Acme.Tests.CalculatorTests";
pub const MACHINE: &str = "ci-agent";

// ============================================================================
// Assembly fixtures
// ============================================================================

/// The sample test assembly:
///
/// ```text
/// FixtureBase              SetUp (11), Inherited (hidden, 17)
/// CalculatorTests          Adds (14), Divides x2 (22, 28), AddsAsync -> <AddsAsync>d__3.MoveNext (35)
/// CalculatorTests+Nested   Multiplies (44)
/// ```
pub fn calculator_assembly() -> ImageBuilder {
    let mut b = ImageBuilder::new();
    let fixture_doc = b.document(FIXTURE_CS);
    let base_doc = b.document(BASE_CS);

    let base = b.add_type("Acme.Tests", "FixtureBase", Base::Object);
    b.add_method(base, "SetUp", base_doc, &[Point::line(11, 9)]);
    b.add_method(base, "Inherited", base_doc, &[Point::Hidden, Point::line(17, 9)]);

    let fixture = b.add_type("Acme.Tests", "CalculatorTests", Base::Type(base));
    b.add_method(fixture, "Adds", fixture_doc, &[Point::Hidden, Point::line(14, 9)]);
    b.add_method(fixture, "Divides", fixture_doc, &[Point::line(22, 9)]);
    b.add_method(fixture, "Divides", fixture_doc, &[Point::line(28, 9)]);

    let state_machine = b.add_nested_type(fixture, "<AddsAsync>d__3", Base::Object);
    b.add_method(state_machine, "MoveNext", fixture_doc, &[Point::Hidden, Point::line(35, 13)]);
    b.add_async_method(fixture, "AddsAsync", state_machine, fixture_doc, &[Point::line(33, 9)]);

    let nested = b.add_nested_type(fixture, "Nested", Base::Type(fixture));
    b.add_method(nested, "Multiplies", fixture_doc, &[Point::line(44, 13)]);
    b
}

/// Write the sample assembly and its PDB into `dir`
pub fn write_calculator_assembly(dir: &TempDir) -> PathBuf {
    calculator_assembly()
        .build()
        .expect("build image")
        .write_to(dir.path(), "Acme.Tests")
        .expect("write image")
}

/// Session over the sample assembly with a recording logger and fixed machine
pub fn open_session(dir: &TempDir) -> (AssemblySession, Arc<RecordingLogger>) {
    let logger = Arc::new(RecordingLogger::new());
    let session = AssemblySession::open(write_calculator_assembly(dir))
        .expect("open session")
        .with_logger(logger.clone())
        .with_machine(Arc::new(FixedMachine::new(MACHINE)));
    (session, logger)
}

// ============================================================================
// Identities
// ============================================================================

/// A test case on `CalculatorTests`
pub fn case(unique_name: &str, method: &str) -> TestIdentity {
    case_on(unique_name, FIXTURE, method)
}

/// A test case on any fixture
pub fn case_on(unique_name: &str, class: &str, method: &str) -> TestIdentity {
    TestIdentity::case(
        unique_name,
        format!("{}.{}", class, method),
        method,
        class,
        method,
    )
}
