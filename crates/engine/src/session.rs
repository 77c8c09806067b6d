//! Per-assembly session
//!
//! Ties together what one test assembly needs: its configuration, a symbol
//! navigator over the assembly and the identity cache shared by discovery
//! and execution.

use crate::cache::IdentityCache;
use crate::config::BridgeConfig;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use testbridge_core::{
    BridgeResult, ExternalResult, ExternalTestDescriptor, MachineIdentity, RawOutcome, TestIdentity,
    TestLogger,
};
use testbridge_symbols::{AssemblyFile, SymbolNavigator};
use tracing::info;

/// Everything needed to report the tests of one assembly
#[derive(Debug)]
pub struct AssemblySession {
    assembly_path: PathBuf,
    config: BridgeConfig,
    navigator: SymbolNavigator,
    cache: IdentityCache,
}

impl AssemblySession {
    /// Open a session, reading `testbridge.toml` from the assembly's
    /// directory when present.
    ///
    /// The assembly itself is not read until the first test is discovered.
    pub fn open(assembly_path: impl Into<PathBuf>) -> BridgeResult<Self> {
        let assembly_path = assembly_path.into();
        let dir = assembly_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let config = BridgeConfig::from_dir_or_default(&dir)?;
        Self::with_config(assembly_path, config)
    }

    /// Open a session with an explicit configuration
    pub fn with_config(assembly_path: impl Into<PathBuf>, config: BridgeConfig) -> BridgeResult<Self> {
        config.validate()?;
        let assembly_path = assembly_path.into();
        let cache = IdentityCache::new(assembly_path.display().to_string(), &config);
        info!(
            target: "testbridge::session",
            assembly = %assembly_path.display(),
            collect_source_information = config.collect_source_information,
            "Opened assembly session"
        );
        Ok(Self {
            navigator: SymbolNavigator::new(assembly_path.clone()),
            assembly_path,
            config,
            cache,
        })
    }

    /// Read symbols from `symbols` instead of searching for them
    pub fn with_symbols(mut self, symbols: impl Into<PathBuf>) -> Self {
        let loader = AssemblyFile::new(self.assembly_path.clone()).with_symbols(symbols);
        self.navigator = SymbolNavigator::with_loader(loader);
        self
    }

    /// Report through `logger`
    pub fn with_logger(mut self, logger: Arc<dyn TestLogger>) -> Self {
        self.cache = self.cache.with_logger(logger);
        self
    }

    /// Report `machine` with every result
    pub fn with_machine(mut self, machine: Arc<dyn MachineIdentity>) -> Self {
        self.cache = self.cache.with_machine(machine);
        self
    }

    /// Set whether results are shown by an interactive host
    pub fn with_interactive_host(mut self, interactive_host: bool) -> Self {
        self.cache = self.cache.with_interactive_host(interactive_host);
        self
    }

    /// Descriptor for a discovered test case
    pub fn discover(&self, identity: &TestIdentity) -> BridgeResult<ExternalTestDescriptor> {
        self.cache.convert(identity, &self.navigator)
    }

    /// Descriptors for every test case in `identities`; suites are skipped
    pub fn discover_all<'a>(
        &self,
        identities: impl IntoIterator<Item = &'a TestIdentity>,
    ) -> BridgeResult<Vec<ExternalTestDescriptor>> {
        identities
            .into_iter()
            .filter(|identity| identity.is_case())
            .map(|identity| self.discover(identity))
            .collect()
    }

    /// Runner-facing result for a finished test; `None` when undiscovered
    pub fn record(&self, raw: &RawOutcome) -> Option<ExternalResult> {
        self.cache.translate_result(raw)
    }

    /// Assembly path
    pub fn assembly_path(&self) -> &Path {
        &self.assembly_path
    }

    /// Active configuration
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// The session's identity cache
    pub fn cache(&self) -> &IdentityCache {
        &self.cache
    }

    /// The session's navigator
    pub fn navigator(&self) -> &SymbolNavigator {
        &self.navigator
    }
}
