//! Execution: raw outcomes translated against discovered descriptors

use crate::common::*;
use chrono::{TimeZone, Utc};
use tempfile::TempDir;
use testbridge::{
    AssemblySession, BridgeConfig, ExternalOutcome, MessageCategory, RawOutcome, ResultState,
    Ticks, CONFIG_FILE_NAME,
};

fn discovered(dir: &TempDir) -> AssemblySession {
    let (session, _) = open_session(dir);
    session.discover(&case("0-1001", "Adds")).unwrap();
    session
}

#[test]
fn every_state_maps_to_its_outcome() {
    let dir = TempDir::new().unwrap();
    let session = discovered(&dir);
    let table = [
        (ResultState::Success, ExternalOutcome::Passed),
        (ResultState::Failure, ExternalOutcome::Failed),
        (ResultState::Error, ExternalOutcome::Failed),
        (ResultState::NotRunnable, ExternalOutcome::Failed),
        (ResultState::Ignored, ExternalOutcome::Skipped),
        (ResultState::Skipped, ExternalOutcome::Skipped),
        (ResultState::Cancelled, ExternalOutcome::None),
        (ResultState::Inconclusive, ExternalOutcome::None),
    ];
    for (state, outcome) in table {
        let result = session.record(&RawOutcome::new("0-1001", state, 0.5)).unwrap();
        assert_eq!(result.outcome, outcome, "{:?}", state);
        assert_eq!(result.duration, Ticks(5_000_000));
        assert_eq!(result.computer_name, MACHINE);
    }
}

#[test]
fn zero_duration_passed_reports_one_tick() {
    let dir = TempDir::new().unwrap();
    let session = discovered(&dir);
    let result = session
        .record(&RawOutcome::new("0-1001", ResultState::Success, 0.0))
        .unwrap();
    assert_eq!(result.duration, Ticks::ONE);

    let skipped = session
        .record(&RawOutcome::new("0-1001", ResultState::Ignored, 0.0))
        .unwrap();
    assert_eq!(skipped.duration, Ticks::ZERO);
}

#[test]
fn output_becomes_standard_out_message() {
    let dir = TempDir::new().unwrap();
    let session = discovered(&dir);
    let result = session
        .record(&RawOutcome::new("0-1001", ResultState::Success, 0.1).with_output("LINE#1\n\tLINE#2\n\n"))
        .unwrap();
    assert_eq!(result.messages.len(), 1);
    assert_eq!(result.messages[0].category, MessageCategory::StandardOut);
    assert_eq!(result.messages[0].text, "LINE#1\n\tLINE#2\n");
}

#[test]
fn failure_message_kept_verbatim_outside_ide() {
    let dir = TempDir::new().unwrap();
    let session = discovered(&dir);
    let message = "  Expected: 4\n  But was:  5\n  ------------^\n";
    let result = session
        .record(&RawOutcome::new("0-1001", ResultState::Failure, 0.1).with_message(message))
        .unwrap();
    assert_eq!(result.error_message.as_deref(), Some(message));
}

#[test]
fn failure_message_loses_caret_line_in_ide() {
    let dir = TempDir::new().unwrap();
    let (session, _) = open_session(&dir);
    let session = session.with_interactive_host(true);
    session.discover(&case("0-1001", "Adds")).unwrap();

    let result = session
        .record(
            &RawOutcome::new("0-1001", ResultState::Failure, 0.1)
                .with_message("  Expected: 4\r  But was:  5\r  ------------^\r"),
        )
        .unwrap();
    assert_eq!(result.error_message.as_deref(), Some("  Expected: 4\r  But was:  5\r"));
}

#[test]
fn framework_frames_removed_from_stack_trace() {
    let dir = TempDir::new().unwrap();
    let session = discovered(&dir);
    let trace = "   at NUnit.Framework.Assert.That[TActual](TActual actual)\n   at Acme.Tests.CalculatorTests.Adds() in /src/Acme.Tests/CalculatorTests.cs:line 14\n";
    let result = session
        .record(&RawOutcome::new("0-1001", ResultState::Failure, 0.1).with_stack_trace(trace))
        .unwrap();
    assert_eq!(
        result.error_stack_trace.as_deref(),
        Some("   at Acme.Tests.CalculatorTests.Adds() in /src/Acme.Tests/CalculatorTests.cs:line 14\n")
    );
}

#[test]
fn configured_filters_and_machine_name() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join(CONFIG_FILE_NAME),
        "machine_name = \"lab-3\"\nstack_trace_filters = [\"Acme.Harness.\"]\n",
    )
    .unwrap();
    let path = write_calculator_assembly(&dir);
    let session = AssemblySession::open(&path).unwrap();
    assert_eq!(session.config().machine_name.as_deref(), Some("lab-3"));
    session.discover(&case("0-1001", "Adds")).unwrap();

    let trace = "   at NUnit.Framework.Assert.Fail()\n   at Acme.Harness.Run()\n";
    let result = session
        .record(&RawOutcome::new("0-1001", ResultState::Failure, 0.1).with_stack_trace(trace))
        .unwrap();
    assert_eq!(result.computer_name, "lab-3");
    assert_eq!(
        result.error_stack_trace.as_deref(),
        Some("   at NUnit.Framework.Assert.Fail()\n")
    );
}

#[test]
fn timestamps_pass_through() {
    let dir = TempDir::new().unwrap();
    let session = discovered(&dir);
    let start = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
    let end = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 2).unwrap();
    let result = session
        .record(&RawOutcome::new("0-1001", ResultState::Success, 2.0).with_times(start, end))
        .unwrap();
    assert_eq!(result.start_time, Some(start));
    assert_eq!(result.end_time, Some(end));
}

#[test]
fn results_serialize_for_the_runner() {
    let dir = TempDir::new().unwrap();
    let session = discovered(&dir);
    let result = session
        .record(&RawOutcome::new("0-1001", ResultState::Success, 0.1))
        .unwrap();
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["outcome"], "Passed");
    assert_eq!(json["descriptor"]["line_number"], 14);
    assert_eq!(json["duration"], 1_000_000);
}

#[test]
fn source_information_can_be_disabled() {
    let dir = TempDir::new().unwrap();
    let path = write_calculator_assembly(&dir);
    let config = BridgeConfig {
        collect_source_information: false,
        ..BridgeConfig::default()
    };
    let session = AssemblySession::with_config(&path, config).unwrap();
    let d = session.discover(&case("0-1001", "Adds")).unwrap();
    assert!(!d.has_location());
    assert!(session.record(&RawOutcome::new("0-1001", ResultState::Success, 0.1)).is_some());
}
