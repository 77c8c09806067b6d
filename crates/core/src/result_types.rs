//! Result types
//!
//! Raw framework outcomes on one side, runner-facing results on the other.

use crate::types::ExternalTestDescriptor;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Final state of a finished test as reported by the framework
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResultState {
    /// The test passed
    Success,
    /// An assertion failed
    Failure,
    /// An unexpected exception escaped the test
    Error,
    /// The run was cancelled while the test was running
    Cancelled,
    /// The test could not decide (Assert.Inconclusive)
    Inconclusive,
    /// The test could not be run (bad signature, invalid arguments)
    NotRunnable,
    /// The test was skipped
    Skipped,
    /// The test was ignored by attribute or at run time
    Ignored,
}

impl ResultState {
    /// All states, in declaration order
    pub const ALL: [ResultState; 8] = [
        ResultState::Success,
        ResultState::Failure,
        ResultState::Error,
        ResultState::Cancelled,
        ResultState::Inconclusive,
        ResultState::NotRunnable,
        ResultState::Skipped,
        ResultState::Ignored,
    ];
}

/// Outcome vocabulary of the external runner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExternalOutcome {
    /// Test passed
    Passed,
    /// Test failed
    Failed,
    /// Test was skipped
    Skipped,
    /// No outcome (cancelled or inconclusive)
    None,
}

impl fmt::Display for ExternalOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExternalOutcome::Passed => "Passed",
            ExternalOutcome::Failed => "Failed",
            ExternalOutcome::Skipped => "Skipped",
            ExternalOutcome::None => "None",
        };
        f.write_str(s)
    }
}

/// Duration in 100-nanosecond ticks
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Ticks(pub u64);

impl Ticks {
    /// Ticks per second
    pub const PER_SECOND: u64 = 10_000_000;

    /// Zero duration
    pub const ZERO: Ticks = Ticks(0);

    /// Smallest non-zero duration
    pub const ONE: Ticks = Ticks(1);

    /// Convert elapsed seconds, truncating toward zero
    ///
    /// Negative and non-finite inputs map to zero.
    pub fn from_seconds(seconds: f64) -> Self {
        if !seconds.is_finite() || seconds <= 0.0 {
            return Ticks::ZERO;
        }
        let ticks = seconds * Self::PER_SECOND as f64;
        if ticks >= u64::MAX as f64 {
            Ticks(u64::MAX)
        } else {
            Ticks(ticks as u64)
        }
    }

    /// Whether the duration is zero
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

/// A finished test as reported by the framework
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawOutcome {
    /// Unique name of the finished test
    pub unique_name: String,
    /// Final state
    pub state: ResultState,
    /// Failure or skip message
    pub message: Option<String>,
    /// Stack trace of the failure
    pub stack_trace: Option<String>,
    /// Elapsed wall time in seconds
    pub elapsed_seconds: f64,
    /// Console output captured while the test ran
    pub output: Option<String>,
    /// When the test started
    pub start_time: Option<DateTime<Utc>>,
    /// When the test finished
    pub end_time: Option<DateTime<Utc>>,
}

impl RawOutcome {
    /// Create an outcome with no message, trace or output
    pub fn new(unique_name: impl Into<String>, state: ResultState, elapsed_seconds: f64) -> Self {
        Self {
            unique_name: unique_name.into(),
            state,
            message: None,
            stack_trace: None,
            elapsed_seconds,
            output: None,
            start_time: None,
            end_time: None,
        }
    }

    /// Attach a message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Attach a stack trace
    pub fn with_stack_trace(mut self, stack_trace: impl Into<String>) -> Self {
        self.stack_trace = Some(stack_trace.into());
        self
    }

    /// Attach captured output
    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.output = Some(output.into());
        self
    }

    /// Attach start and end times
    pub fn with_times(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.start_time = Some(start);
        self.end_time = Some(end);
        self
    }
}

/// Category of a message attached to a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageCategory {
    /// Captured standard output
    StandardOut,
    /// Captured standard error
    StandardError,
    /// Extra information
    AdditionalInfo,
}

/// A text message attached to a result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultMessage {
    /// Message category
    pub category: MessageCategory,
    /// Message text
    pub text: String,
}

impl ResultMessage {
    /// Create a message
    pub fn new(category: MessageCategory, text: impl Into<String>) -> Self {
        Self {
            category,
            text: text.into(),
        }
    }
}

/// A finished test in the runner's vocabulary
///
/// Derived deterministically from a `RawOutcome` and the cached descriptor;
/// consumed immediately by the runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalResult {
    /// Descriptor of the test
    pub descriptor: ExternalTestDescriptor,
    /// Translated outcome
    pub outcome: ExternalOutcome,
    /// Duration in ticks
    pub duration: Ticks,
    /// Normalized error message
    pub error_message: Option<String>,
    /// Filtered stack trace
    pub error_stack_trace: Option<String>,
    /// Name of the machine the test ran on
    pub computer_name: String,
    /// Attached output messages
    pub messages: Vec<ResultMessage>,
    /// When the test started
    pub start_time: Option<DateTime<Utc>>,
    /// When the test finished
    pub end_time: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticks_from_seconds() {
        assert_eq!(Ticks::from_seconds(1.0), Ticks(10_000_000));
        assert_eq!(Ticks::from_seconds(0.25), Ticks(2_500_000));
        assert_eq!(Ticks::from_seconds(0.0), Ticks::ZERO);
    }

    #[test]
    fn test_ticks_below_resolution_truncate_to_zero() {
        assert!(Ticks::from_seconds(0.00000001).is_zero());
    }

    #[test]
    fn test_ticks_reject_negative_and_nan() {
        assert_eq!(Ticks::from_seconds(-3.0), Ticks::ZERO);
        assert_eq!(Ticks::from_seconds(f64::NAN), Ticks::ZERO);
        assert_eq!(Ticks::from_seconds(f64::INFINITY), Ticks::ZERO);
    }

    #[test]
    fn test_ticks_saturate() {
        assert_eq!(Ticks::from_seconds(1e300), Ticks(u64::MAX));
    }

    #[test]
    fn test_all_states_listed_once() {
        let mut seen = std::collections::HashSet::new();
        for state in ResultState::ALL {
            assert!(seen.insert(state));
        }
        assert_eq!(seen.len(), 8);
    }

    #[test]
    fn test_outcome_display() {
        assert_eq!(ExternalOutcome::Passed.to_string(), "Passed");
        assert_eq!(ExternalOutcome::None.to_string(), "None");
    }

    #[test]
    fn test_raw_outcome_builders() {
        let raw = RawOutcome::new("0-1001", ResultState::Failure, 0.5)
            .with_message("Expected 1")
            .with_stack_trace("at A.B()")
            .with_output("hello\n");
        assert_eq!(raw.message.as_deref(), Some("Expected 1"));
        assert_eq!(raw.stack_trace.as_deref(), Some("at A.B()"));
        assert_eq!(raw.output.as_deref(), Some("hello\n"));
        assert!(raw.start_time.is_none());
    }
}
