//! Bridge configuration via `testbridge.toml`
//!
//! Hosts keep a `testbridge.toml` next to the test assembly (or anywhere
//! they like) and load it once per session. Missing fields take their
//! defaults, so an empty file is a valid configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use testbridge_core::{BridgeError, BridgeResult};

/// Config file name looked up next to the test assembly.
pub const CONFIG_FILE_NAME: &str = "testbridge.toml";

/// Highest accepted verbosity.
pub const MAX_VERBOSITY: u8 = 5;

/// Executor URI used when none is configured.
pub const DEFAULT_EXECUTOR_URI: &str = "executor://NUnit3TestExecutor";

/// Frame prefix filtered from stack traces by default.
pub const DEFAULT_STACK_TRACE_FILTER: &str = "NUnit.Framework.";

/// Bridge configuration loaded from `testbridge.toml`.
///
/// # Example
///
/// ```toml
/// # 0 (quiet) to 5 (every diagnostic)
/// verbosity = 0
/// collect_source_information = true
/// executor_uri = "executor://NUnit3TestExecutor"
/// stack_trace_filters = ["NUnit.Framework."]
/// # machine_name = "build-agent-7"
/// # interactive_host = true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Logging verbosity, 0 to 5.
    ///
    /// At 0 only errors, warnings (including results for unknown tests)
    /// and progress reach the log. Diagnostics need 1 or more.
    #[serde(default)]
    pub verbosity: u8,
    /// Look up source file and line for each discovered test.
    #[serde(default = "default_collect_source_information")]
    pub collect_source_information: bool,
    /// Executor URI stamped on every descriptor.
    #[serde(default = "default_executor_uri")]
    pub executor_uri: String,
    /// Reported machine name; the host's name when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub machine_name: Option<String>,
    /// Stack frames whose method starts with one of these are dropped.
    #[serde(default = "default_stack_trace_filters")]
    pub stack_trace_filters: Vec<String>,
    /// Whether results are shown by an interactive host (an IDE).
    /// When absent the caller decides.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interactive_host: Option<bool>,
}

fn default_collect_source_information() -> bool {
    true
}

fn default_executor_uri() -> String {
    DEFAULT_EXECUTOR_URI.to_string()
}

fn default_stack_trace_filters() -> Vec<String> {
    vec![DEFAULT_STACK_TRACE_FILTER.to_string()]
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            verbosity: 0,
            collect_source_information: default_collect_source_information(),
            executor_uri: default_executor_uri(),
            machine_name: None,
            stack_trace_filters: default_stack_trace_filters(),
            interactive_host: None,
        }
    }
}

impl BridgeConfig {
    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::Config` for a verbosity above [`MAX_VERBOSITY`]
    /// or an empty executor URI.
    pub fn validate(&self) -> BridgeResult<()> {
        if self.verbosity > MAX_VERBOSITY {
            return Err(BridgeError::config(format!(
                "Invalid verbosity {} in {}. Expected 0 to {}.",
                self.verbosity, CONFIG_FILE_NAME, MAX_VERBOSITY
            )));
        }
        if self.executor_uri.trim().is_empty() {
            return Err(BridgeError::config(format!(
                "executor_uri in {} must not be empty",
                CONFIG_FILE_NAME
            )));
        }
        Ok(())
    }

    /// Interactive-host flag, falling back to `caller_default` when unset.
    pub fn interactive_host_or(&self, caller_default: bool) -> bool {
        self.interactive_host.unwrap_or(caller_default)
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# testbridge configuration
#
# Verbosity: 0 (default) to 5
#   0 = errors, warnings and progress; results for unknown tests are warnings
#   1 = adds diagnostics such as tests without a source location
#   5 = every diagnostic, including navigation details
verbosity = 0

# Look up the source file and first line of each test (default: true).
# Turning this off skips reading debug symbols entirely.
collect_source_information = true

# Executor URI attached to every test case.
executor_uri = "executor://NUnit3TestExecutor"

# Stack frames from methods starting with these prefixes are removed
# from failure stack traces.
stack_trace_filters = ["NUnit.Framework."]

# Machine name reported with each result. Defaults to the host name.
# machine_name = "build-agent-7"

# Set when results are shown in an IDE. Caret annotation lines are then
# removed from failure messages. Left unset, the host decides.
# interactive_host = true
"#
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> BridgeResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            BridgeError::config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config: BridgeConfig = toml::from_str(&content).map_err(|e| {
            BridgeError::config(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load `testbridge.toml` from `dir`, or the defaults when there is none.
    pub fn from_dir_or_default(dir: &Path) -> BridgeResult<Self> {
        let path = dir.join(CONFIG_FILE_NAME);
        if path.is_file() {
            Self::from_file(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Write the default config file if it does not already exist.
    ///
    /// Returns `Ok(())` whether the file was created or already existed.
    pub fn write_default_if_missing(path: &Path) -> BridgeResult<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| {
                BridgeError::config(format!(
                    "Failed to write default config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> BridgeResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| BridgeError::config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            BridgeError::config(format!(
                "Failed to write config file '{}': {}",
                path.display(),
                e
            ))
        })
    }
}
