//! Discovery: descriptors and their source locations

use crate::common::*;
use tempfile::TempDir;
use testbridge::{AssemblySession, BridgeError, TestIdentity, Trait, CATEGORY_TRAIT};

#[test]
fn declared_method_located_at_first_visible_line() {
    let dir = TempDir::new().unwrap();
    let (session, _) = open_session(&dir);
    let d = session.discover(&case("0-1001", "Adds")).unwrap();
    assert_eq!(d.code_file_path.as_deref(), Some(FIXTURE_CS));
    assert_eq!(d.line_number, Some(14));
}

#[test]
fn base_fixture_method_located_in_base_file() {
    let dir = TempDir::new().unwrap();
    let (session, _) = open_session(&dir);
    let d = session.discover(&case("0-1002", "Inherited")).unwrap();
    assert_eq!(d.code_file_path.as_deref(), Some(BASE_CS));
    assert_eq!(d.line_number, Some(17));
}

#[test]
fn nested_fixture_reported_with_plus() {
    let dir = TempDir::new().unwrap();
    let (session, _) = open_session(&dir);
    let nested = "Acme.Tests.CalculatorTests+Nested";

    let own = session.discover(&case_on("0-2001", nested, "Multiplies")).unwrap();
    assert_eq!(own.line_number, Some(44));

    // Nested derives from CalculatorTests, which derives from FixtureBase
    let two_levels_up = session.discover(&case_on("0-2002", nested, "SetUp")).unwrap();
    assert_eq!(two_levels_up.code_file_path.as_deref(), Some(BASE_CS));
    assert_eq!(two_levels_up.line_number, Some(11));
}

#[test]
fn async_test_located_inside_state_machine() {
    let dir = TempDir::new().unwrap();
    let (session, _) = open_session(&dir);
    let d = session.discover(&case("0-1003", "AddsAsync")).unwrap();
    assert_eq!(d.line_number, Some(35));
}

#[test]
fn overloads_share_first_declaration() {
    let dir = TempDir::new().unwrap();
    let (session, _) = open_session(&dir);
    let first = session.discover(&case("0-1004", "Divides")).unwrap();
    let second = session
        .discover(&TestIdentity::case(
            "0-1005",
            "Acme.Tests.CalculatorTests.Divides(4,0)",
            "Divides(4,0)",
            FIXTURE,
            "Divides",
        ))
        .unwrap();
    assert_eq!(first.line_number, Some(22));
    assert_eq!(second.line_number, Some(22));
    assert_ne!(first.id, second.id);
}

#[test]
fn unknown_method_has_no_location() {
    let dir = TempDir::new().unwrap();
    let (session, _) = open_session(&dir);
    let d = session.discover(&case("0-1006", "Subtracts")).unwrap();
    assert!(!d.has_location());
    let d = session.discover(&case_on("0-1007", "Acme.Tests.Gone", "Adds")).unwrap();
    assert!(!d.has_location());
}

#[test]
fn conversion_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let (session, _) = open_session(&dir);
    let first = session.discover(&case("0-1001", "Adds")).unwrap();
    let second = session.discover(&case("0-1001", "Adds")).unwrap();
    assert_eq!(first, second);
    assert_eq!(session.cache().len(), 1);
}

#[test]
fn suites_are_rejected_individually_and_skipped_in_bulk() {
    let dir = TempDir::new().unwrap();
    let (session, _) = open_session(&dir);
    let suite = TestIdentity::suite("0-1000", FIXTURE);

    let err = session.discover(&suite).unwrap_err();
    assert!(matches!(err, BridgeError::InvalidArgument(_)));

    let all = session
        .discover_all(&[suite, case("0-1001", "Adds"), case("0-1003", "AddsAsync")])
        .unwrap();
    assert_eq!(all.len(), 2);
}

#[test]
fn traits_carry_categories_and_properties() {
    let dir = TempDir::new().unwrap();
    let (session, _) = open_session(&dir);
    let identity = case("0-1001", "Adds")
        .with_category("Smoke")
        .with_property("Priority", "1")
        .with_property("_JOINTYPE", "Sequential");
    let d = session.discover(&identity).unwrap();
    assert_eq!(
        d.traits,
        vec![Trait::new(CATEGORY_TRAIT, "Smoke"), Trait::new("Priority", "1")]
    );
}

#[test]
fn ids_are_stable_across_sessions() {
    let dir = TempDir::new().unwrap();
    let path = write_calculator_assembly(&dir);
    let a = AssemblySession::open(&path)
        .unwrap()
        .discover(&case("0-1001", "Adds"))
        .unwrap();
    let b = AssemblySession::open(&path)
        .unwrap()
        .discover(&case("7-5555", "Adds"))
        .unwrap();
    assert_eq!(a.id, b.id);
}

#[test]
fn snapshot_lists_every_descriptor() {
    let dir = TempDir::new().unwrap();
    let (session, _) = open_session(&dir);
    for (id, method) in [("0-1003", "AddsAsync"), ("0-1001", "Adds"), ("0-1002", "Inherited")] {
        session.discover(&case(id, method)).unwrap();
    }
    let names: Vec<String> = session
        .cache()
        .descriptors()
        .into_iter()
        .map(|d| d.fully_qualified_name)
        .collect();
    assert_eq!(
        names,
        vec![
            "Acme.Tests.CalculatorTests.Adds",
            "Acme.Tests.CalculatorTests.AddsAsync",
            "Acme.Tests.CalculatorTests.Inherited",
        ]
    );
}
