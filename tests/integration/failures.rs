//! Failure modes: unreadable assemblies, missing symbols, unknown results

use crate::common::*;
use std::sync::Arc;
use tempfile::TempDir;
use testbridge::{
    AssemblySession, BridgeError, LogLevel, RawOutcome, RecordingLogger, ResultState,
};

fn assert_load_failure(err: &BridgeError, needle: &str) {
    match err {
        BridgeError::AssemblyLoad { reason, .. } => {
            assert!(reason.contains(needle), "unexpected reason: {}", reason)
        }
        other => panic!("expected AssemblyLoad, got {:?}", other),
    }
}

#[test]
fn missing_assembly_fails_every_discovery_the_same_way() {
    let dir = TempDir::new().unwrap();
    let session = AssemblySession::open(dir.path().join("Acme.Tests.dll")).unwrap();
    let first = session.discover(&case("0-1001", "Adds")).unwrap_err();
    let second = session.discover(&case("0-1002", "Inherited")).unwrap_err();
    assert!(first.is_load_failure());
    assert_eq!(first.to_string(), second.to_string());
    assert!(session.cache().is_empty());
}

#[test]
fn load_failure_reaches_the_runner_log() {
    let dir = TempDir::new().unwrap();
    let path = write_calculator_assembly(&dir);
    std::fs::write(&path, b"MZ not really an image").unwrap();
    let logger = Arc::new(RecordingLogger::new());
    let session = AssemblySession::open(&path).unwrap().with_logger(logger.clone());

    assert!(session.discover(&case("0-1001", "Adds")).is_err());
    let errors = logger.messages(LogLevel::Error);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].starts_with("Cannot read source information for 0-1001"));
}

#[test]
fn missing_symbols_is_a_load_failure() {
    let dir = TempDir::new().unwrap();
    let path = write_calculator_assembly(&dir);
    std::fs::remove_file(path.with_extension("pdb")).unwrap();
    let session = AssemblySession::open(&path).unwrap();
    let err = session.discover(&case("0-1001", "Adds")).unwrap_err();
    assert_load_failure(&err, "symbols");
}

#[test]
fn windows_pdb_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_calculator_assembly(&dir);
    let mut msf = b"Microsoft C/C++ MSF 7.00\r\n\x1a\x44\x53\x00\x00\x00".to_vec();
    msf.resize(512, 0);
    std::fs::write(path.with_extension("pdb"), msf).unwrap();

    let session = AssemblySession::open(&path).unwrap();
    let err = session.discover(&case("0-1001", "Adds")).unwrap_err();
    assert!(err.is_load_failure());
}

#[test]
fn embedded_symbols_need_no_pdb_file() {
    let dir = TempDir::new().unwrap();
    let image = calculator_assembly().embed_pdb(true).build().unwrap();
    let path = image.write_assembly(dir.path(), "Acme.Tests").unwrap();
    let session = AssemblySession::open(&path).unwrap();
    let d = session.discover(&case("0-1003", "AddsAsync")).unwrap();
    assert_eq!(d.line_number, Some(35));
}

#[test]
fn result_for_undiscovered_test_yields_nothing() {
    let dir = TempDir::new().unwrap();
    let (session, logger) = open_session(&dir);
    session.discover(&case("0-1001", "Adds")).unwrap();
    logger.drain();

    let result = session.record(&RawOutcome::new("0-4040", ResultState::Failure, 0.3));
    assert!(result.is_none());

    let entries = logger.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].level, LogLevel::Warning);
    assert!(entries[0].message.contains("0-4040"));
    assert_eq!(session.cache().len(), 1);
}
