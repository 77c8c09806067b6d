//! Logging sinks
//!
//! - [`TracingLogger`]: forwards host messages to `tracing`, dropping
//!   diagnostics below the configured verbosity
//! - [`RecordingLogger`]: keeps every message in memory, for tests and for
//!   hosts that replay messages to a runner handle
//! - [`init_tracing`]: installs a stderr `fmt` subscriber

use parking_lot::Mutex;
use testbridge_core::TestLogger;
use tracing::level_filters::LevelFilter;
use tracing::{debug, error, info, warn};

/// Lowest verbosity at which diagnostics are shown
pub const DEBUG_VERBOSITY: u8 = 1;

/// Tracing level for a verbosity setting
pub fn level_for(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::INFO,
        1..=4 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// Install a global `fmt` subscriber writing to stderr.
///
/// Returns `false` when a global subscriber was already installed, in
/// which case that one stays in place.
pub fn init_tracing(verbosity: u8) -> bool {
    tracing_subscriber::fmt()
        .with_max_level(level_for(verbosity))
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init()
        .is_ok()
}

/// Forwards host messages to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger {
    verbosity: u8,
}

impl TracingLogger {
    /// Logger showing diagnostics when `verbosity >= DEBUG_VERBOSITY`
    pub fn new(verbosity: u8) -> Self {
        Self { verbosity }
    }

    /// Configured verbosity
    pub fn verbosity(&self) -> u8 {
        self.verbosity
    }
}

impl TestLogger for TracingLogger {
    fn error(&self, message: &str) {
        error!(target: "testbridge::host", "{}", message);
    }

    fn warning(&self, message: &str) {
        warn!(target: "testbridge::host", "{}", message);
    }

    fn info(&self, message: &str) {
        info!(target: "testbridge::host", "{}", message);
    }

    fn debug(&self, message: &str) {
        if self.verbosity >= DEBUG_VERBOSITY {
            debug!(target: "testbridge::host", "{}", message);
        }
    }
}

/// Severity of a recorded message
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    /// Diagnostic
    Debug,
    /// Informational
    Info,
    /// Warning
    Warning,
    /// Error
    Error,
}

/// One recorded message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// Severity
    pub level: LogLevel,
    /// Message text
    pub message: String,
}

/// Logger that records every message
#[derive(Debug, Default)]
pub struct RecordingLogger {
    entries: Mutex<Vec<LogEntry>>,
}

impl RecordingLogger {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().clone()
    }

    /// Messages recorded at `level`
    pub fn messages(&self, level: LogLevel) -> Vec<String> {
        self.entries
            .lock()
            .iter()
            .filter(|e| e.level == level)
            .map(|e| e.message.clone())
            .collect()
    }

    /// Take and clear everything recorded so far
    pub fn drain(&self) -> Vec<LogEntry> {
        std::mem::take(&mut *self.entries.lock())
    }

    /// Number of recorded messages
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// True when nothing was recorded
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    fn record(&self, level: LogLevel, message: &str) {
        self.entries.lock().push(LogEntry {
            level,
            message: message.to_string(),
        });
    }
}

impl TestLogger for RecordingLogger {
    fn error(&self, message: &str) {
        self.record(LogLevel::Error, message);
    }

    fn warning(&self, message: &str) {
        self.record(LogLevel::Warning, message);
    }

    fn info(&self, message: &str) {
        self.record(LogLevel::Info, message);
    }

    fn debug(&self, message: &str) {
        self.record(LogLevel::Debug, message);
    }
}
