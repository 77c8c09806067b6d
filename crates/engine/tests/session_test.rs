//! End-to-end discovery and execution reporting over a real assembly
//!
//! These tests write a PE image with a Portable PDB and verify that:
//! 1. Discovered test cases carry the first visible source line
//! 2. Inherited and async tests are located through bases and state machines
//! 3. Results are translated against the descriptors created at discovery
//! 4. Ids are stable across sessions over the same assembly
//! 5. A result for an undiscovered test yields nothing and one diagnostic

use std::sync::Arc;
use tempfile::TempDir;
use testbridge_core::{
    ExternalOutcome, FixedMachine, MessageCategory, RawOutcome, ResultState, Ticks, TestIdentity,
};
use testbridge_engine::{AssemblySession, BridgeConfig, LogLevel, RecordingLogger, CONFIG_FILE_NAME};
use testbridge_symbols::testing::{Base, ImageBuilder, Point};

const FIXTURE_CS: &str = "/src/Acme.Tests/CalculatorTests.cs";
const BASE_CS: &str = "/src/Acme.Tests/FixtureBase.cs";

fn write_assembly(dir: &TempDir) -> std::path::PathBuf {
    let mut b = ImageBuilder::new();
    let fixture_doc = b.document(FIXTURE_CS);
    let base_doc = b.document(BASE_CS);

    let base = b.add_type("Acme.Tests", "FixtureBase", Base::Object);
    b.add_method(base, "Inherited", base_doc, &[Point::Hidden, Point::line(17, 9)]);

    let fixture = b.add_type("Acme.Tests", "CalculatorTests", Base::Type(base));
    b.add_method(fixture, "Adds", fixture_doc, &[Point::line(14, 9), Point::line(15, 13)]);
    b.add_method(fixture, "Hidden", fixture_doc, &[Point::Hidden, Point::Hidden]);

    let state_machine = b.add_nested_type(fixture, "<AddsAsync>d__2", Base::Object);
    b.add_method(state_machine, "MoveNext", fixture_doc, &[Point::Hidden, Point::line(31, 13)]);
    b.add_async_method(fixture, "AddsAsync", state_machine, fixture_doc, &[Point::line(29, 9)]);

    b.build()
        .unwrap()
        .write_to(dir.path(), "Acme.Tests")
        .unwrap()
}

fn case(id: &str, method: &str) -> TestIdentity {
    TestIdentity::case(
        id,
        format!("Acme.Tests.CalculatorTests.{}", method),
        method,
        "Acme.Tests.CalculatorTests",
        method,
    )
}

fn session(dir: &TempDir) -> (AssemblySession, Arc<RecordingLogger>) {
    let logger = Arc::new(RecordingLogger::new());
    let session = AssemblySession::open(write_assembly(dir))
        .unwrap()
        .with_logger(logger.clone())
        .with_machine(Arc::new(FixedMachine::new("agent-7")));
    (session, logger)
}

#[test]
fn test_discovery_attaches_locations() {
    let dir = TempDir::new().unwrap();
    let (session, _) = session(&dir);

    let adds = session.discover(&case("0-1001", "Adds")).unwrap();
    assert_eq!(adds.code_file_path.as_deref(), Some(FIXTURE_CS));
    assert_eq!(adds.line_number, Some(14));

    let inherited = session.discover(&case("0-1002", "Inherited")).unwrap();
    assert_eq!(inherited.code_file_path.as_deref(), Some(BASE_CS));
    assert_eq!(inherited.line_number, Some(17));

    let async_test = session.discover(&case("0-1003", "AddsAsync")).unwrap();
    assert_eq!(async_test.line_number, Some(31));

    let hidden = session.discover(&case("0-1004", "Hidden")).unwrap();
    assert!(!hidden.has_location());
}

#[test]
fn test_discover_all_skips_suites() {
    let dir = TempDir::new().unwrap();
    let (session, _) = session(&dir);
    let nodes = vec![
        TestIdentity::suite("0-1000", "Acme.Tests.CalculatorTests"),
        case("0-1001", "Adds"),
        case("0-1003", "AddsAsync"),
    ];
    let descriptors = session.discover_all(&nodes).unwrap();
    assert_eq!(descriptors.len(), 2);
    assert_eq!(session.cache().len(), 2);
}

#[test]
fn test_results_follow_discovery() {
    let dir = TempDir::new().unwrap();
    let (session, _) = session(&dir);
    let adds = session.discover(&case("0-1001", "Adds")).unwrap();

    let passed = session
        .record(&RawOutcome::new("0-1001", ResultState::Success, 0.0).with_output("2 + 2 = 4\n"))
        .unwrap();
    assert_eq!(passed.descriptor, adds);
    assert_eq!(passed.outcome, ExternalOutcome::Passed);
    assert_eq!(passed.duration, Ticks::ONE);
    assert_eq!(passed.computer_name, "agent-7");
    assert_eq!(passed.messages.len(), 1);
    assert_eq!(passed.messages[0].category, MessageCategory::StandardOut);
    assert_eq!(passed.messages[0].text, "2 + 2 = 4");

    let failed = session
        .record(
            &RawOutcome::new("0-1001", ResultState::Error, 1.5)
                .with_message("System.DivideByZeroException")
                .with_stack_trace("   at NUnit.Framework.Internal.Reflect.InvokeMethod()\n"),
        )
        .unwrap();
    assert_eq!(failed.outcome, ExternalOutcome::Failed);
    assert_eq!(failed.duration, Ticks(15_000_000));
    assert_eq!(failed.error_message.as_deref(), Some("System.DivideByZeroException"));
    assert!(failed.error_stack_trace.is_none());
}

#[test]
fn test_interactive_host_from_config() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join(CONFIG_FILE_NAME), "interactive_host = true\n").unwrap();
    let (session, _) = session(&dir);
    session.discover(&case("0-1001", "Adds")).unwrap();

    let result = session
        .record(
            &RawOutcome::new("0-1001", ResultState::Failure, 0.2)
                .with_message("  Expected: 4\r\n  But was:  5\r\n  ------------^\r\n"),
        )
        .unwrap();
    assert_eq!(
        result.error_message.as_deref(),
        Some("  Expected: 4\r\n  But was:  5\r\n")
    );
}

#[test]
fn test_ids_stable_across_sessions() {
    let dir = TempDir::new().unwrap();
    let path = write_assembly(&dir);
    let first = AssemblySession::open(&path).unwrap();
    let second = AssemblySession::open(&path).unwrap();
    let a = first.discover(&case("0-1001", "Adds")).unwrap();
    let b = second.discover(&case("0-1001", "Adds")).unwrap();
    assert_eq!(a.id, b.id);
    assert_eq!(a, b);
}

#[test]
fn test_undiscovered_result_is_dropped_with_diagnostic() {
    let dir = TempDir::new().unwrap();
    let (session, logger) = session(&dir);
    let result = session.record(&RawOutcome::new("0-9999", ResultState::Success, 0.1));
    assert!(result.is_none());
    let warnings = logger.messages(LogLevel::Warning);
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("0-9999"));
}

#[test]
fn test_disabled_source_information() {
    let dir = TempDir::new().unwrap();
    let path = write_assembly(&dir);
    let config = BridgeConfig {
        collect_source_information: false,
        ..BridgeConfig::default()
    };
    let session = AssemblySession::with_config(&path, config).unwrap();
    let adds = session.discover(&case("0-1001", "Adds")).unwrap();
    assert!(!adds.has_location());
    assert!(!session.navigator().is_loaded());
}

#[test]
fn test_explicit_symbols_path() {
    let dir = TempDir::new().unwrap();
    let path = write_assembly(&dir);
    let moved = dir.path().join("symbols.pdb");
    std::fs::rename(path.with_extension("pdb"), &moved).unwrap();

    let session = AssemblySession::open(&path).unwrap().with_symbols(&moved);
    let adds = session.discover(&case("0-1001", "Adds")).unwrap();
    assert_eq!(adds.line_number, Some(14));
}

#[test]
fn test_concurrent_discovery() {
    let dir = TempDir::new().unwrap();
    let (session, _) = session(&dir);
    std::thread::scope(|s| {
        for i in 0..8 {
            let session = &session;
            s.spawn(move || {
                let method = if i % 2 == 0 { "Adds" } else { "AddsAsync" };
                let id = if i % 2 == 0 { "0-1001" } else { "0-1003" };
                session.discover(&case(id, method)).unwrap()
            });
        }
    });
    assert_eq!(session.cache().len(), 2);
}

#[test]
fn test_descriptors_serialize() {
    let dir = TempDir::new().unwrap();
    let (session, _) = session(&dir);
    let adds = session.discover(&case("0-1001", "Adds")).unwrap();
    let json = serde_json::to_value(&adds).unwrap();
    assert_eq!(json["line_number"], 14);
    assert_eq!(json["code_file_path"], FIXTURE_CS);
}
