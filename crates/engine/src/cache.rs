//! Identity cache
//!
//! Maps framework unique names to runner-facing test case descriptors for
//! one source assembly. Descriptors are created once, on first conversion,
//! and never change afterwards. The cache is shared by discovery and
//! execution: results are translated by looking up the descriptor created
//! when the test was discovered.
//!
//! Conversion holds the write lock across the navigator call, so each test
//! is navigated at most once even when converted from several threads.

use crate::config::BridgeConfig;
use crate::logging::TracingLogger;
use crate::machine::HostMachine;
use crate::outcome::OutcomeTranslator;
use crate::stack_trace::StackTraceFilter;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use testbridge_core::{
    BridgeError, BridgeResult, ExternalOutcome, ExternalResult, ExternalTestDescriptor,
    FixedMachine, MachineIdentity, MessageCategory, RawOutcome, ResultMessage, SourceNavigator,
    TestId, TestIdentity, TestLogger, Ticks, Trait,
};
use tracing::{debug, warn};

/// Trait name used for categories
pub const CATEGORY_TRAIT: &str = "Category";

/// Properties with this prefix are framework bookkeeping, not traits
const INTERNAL_PROPERTY_PREFIX: char = '_';

/// Descriptor cache for one source assembly
pub struct IdentityCache {
    source_assembly_path: String,
    executor_reference: String,
    collect_source_information: bool,
    translator: OutcomeTranslator,
    stack_filter: StackTraceFilter,
    machine: Arc<dyn MachineIdentity>,
    logger: Arc<dyn TestLogger>,
    descriptors: RwLock<HashMap<String, ExternalTestDescriptor>>,
}

impl std::fmt::Debug for IdentityCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityCache")
            .field("source_assembly_path", &self.source_assembly_path)
            .field("executor_reference", &self.executor_reference)
            .field("len", &self.len())
            .finish()
    }
}

impl IdentityCache {
    /// Create an empty cache for `source_assembly_path`
    ///
    /// The machine name comes from `config.machine_name` or the host. Logs
    /// go to [`TracingLogger`] at the configured verbosity. The
    /// interactive-host flag defaults to `false` unless configured.
    pub fn new(source_assembly_path: impl Into<String>, config: &BridgeConfig) -> Self {
        let machine: Arc<dyn MachineIdentity> = match &config.machine_name {
            Some(name) => Arc::new(FixedMachine::new(name.clone())),
            None => Arc::new(HostMachine),
        };
        Self {
            source_assembly_path: source_assembly_path.into(),
            executor_reference: config.executor_uri.clone(),
            collect_source_information: config.collect_source_information,
            translator: OutcomeTranslator::new(config.interactive_host_or(false)),
            stack_filter: StackTraceFilter::new(config.stack_trace_filters.iter().cloned()),
            machine,
            logger: Arc::new(TracingLogger::new(config.verbosity)),
            descriptors: RwLock::new(HashMap::new()),
        }
    }

    /// Report through `logger` instead of `tracing`
    pub fn with_logger(mut self, logger: Arc<dyn TestLogger>) -> Self {
        self.logger = logger;
        self
    }

    /// Report `machine` as the machine results ran on
    pub fn with_machine(mut self, machine: Arc<dyn MachineIdentity>) -> Self {
        self.machine = machine;
        self
    }

    /// Set whether results are shown by an interactive host
    pub fn with_interactive_host(mut self, interactive_host: bool) -> Self {
        self.translator = OutcomeTranslator::new(interactive_host);
        self
    }

    /// Source assembly path stamped on every descriptor
    pub fn source_assembly_path(&self) -> &str {
        &self.source_assembly_path
    }

    /// Executor URI stamped on every descriptor
    pub fn executor_reference(&self) -> &str {
        &self.executor_reference
    }

    /// Translator used for results
    pub fn translator(&self) -> &OutcomeTranslator {
        &self.translator
    }

    /// Descriptor for a discovered test case, creating it on first use.
    ///
    /// # Errors
    ///
    /// - `BridgeError::InvalidArgument` when `identity` is a suite
    /// - `BridgeError::AssemblyLoad` when the navigator cannot read the
    ///   assembly; nothing is cached in that case
    pub fn convert(
        &self,
        identity: &TestIdentity,
        navigator: &dyn SourceNavigator,
    ) -> BridgeResult<ExternalTestDescriptor> {
        if !identity.is_case() {
            return Err(BridgeError::invalid_argument(format!(
                "'{}' is a suite; only test cases can be converted",
                identity.unique_name
            )));
        }

        let cached = self.descriptors.read().get(&identity.unique_name).cloned();
        if let Some(descriptor) = cached {
            return Ok(descriptor);
        }

        let mut descriptors = self.descriptors.write();
        // Another thread may have converted it between the two locks
        if let Some(descriptor) = descriptors.get(&identity.unique_name) {
            return Ok(descriptor.clone());
        }

        let descriptor = self.build_descriptor(identity, navigator)?;
        descriptors.insert(identity.unique_name.clone(), descriptor.clone());
        debug!(
            target: "testbridge::cache",
            unique_name = %identity.unique_name,
            id = %descriptor.id,
            located = descriptor.has_location(),
            "Cached test case"
        );
        Ok(descriptor)
    }

    /// Descriptor created for `unique_name`, if any
    ///
    /// A miss is reported to the logger as a warning.
    pub fn lookup(&self, unique_name: &str) -> Option<ExternalTestDescriptor> {
        let found = self.descriptors.read().get(unique_name).cloned();
        if found.is_none() {
            self.logger
                .warning(&format!("No test case found for '{}'", unique_name));
        }
        found
    }

    /// Runner-facing result for a finished test
    ///
    /// `None` when the test was never converted.
    pub fn translate_result(&self, raw: &RawOutcome) -> Option<ExternalResult> {
        let descriptor = self.lookup(&raw.unique_name)?;
        let outcome = OutcomeTranslator::outcome_of(raw.state);

        let mut duration = Ticks::from_seconds(raw.elapsed_seconds);
        if duration.is_zero() && matches!(outcome, ExternalOutcome::Passed | ExternalOutcome::Failed)
        {
            duration = Ticks::ONE;
        }

        let messages = raw
            .output
            .as_deref()
            .map(OutcomeTranslator::normalize_output_chunk)
            .filter(|text| !text.is_empty())
            .map(|text| ResultMessage::new(MessageCategory::StandardOut, text))
            .into_iter()
            .collect();

        Some(ExternalResult {
            descriptor,
            outcome,
            duration,
            error_message: self
                .translator
                .normalize_message(raw.state, raw.message.as_deref()),
            error_stack_trace: self.stack_filter.filter(raw.stack_trace.as_deref()),
            computer_name: self.machine.machine_name(),
            messages,
            start_time: raw.start_time,
            end_time: raw.end_time,
        })
    }

    /// Number of cached descriptors
    pub fn len(&self) -> usize {
        self.descriptors.read().len()
    }

    /// True when nothing has been converted
    pub fn is_empty(&self) -> bool {
        self.descriptors.read().is_empty()
    }

    /// Snapshot of every cached descriptor, ordered by fully qualified name
    pub fn descriptors(&self) -> Vec<ExternalTestDescriptor> {
        let mut all: Vec<_> = self.descriptors.read().values().cloned().collect();
        all.sort_by(|a, b| a.fully_qualified_name.cmp(&b.fully_qualified_name));
        all
    }

    fn build_descriptor(
        &self,
        identity: &TestIdentity,
        navigator: &dyn SourceNavigator,
    ) -> BridgeResult<ExternalTestDescriptor> {
        let mut descriptor = ExternalTestDescriptor {
            id: TestId::derive(
                &self.executor_reference,
                &self.source_assembly_path,
                &identity.full_name,
            ),
            display_name: identity.display_name.clone(),
            fully_qualified_name: identity.full_name.clone(),
            source_assembly_path: self.source_assembly_path.clone(),
            executor_reference: self.executor_reference.clone(),
            code_file_path: None,
            line_number: None,
            traits: traits_of(identity),
        };

        if self.collect_source_information {
            let location = navigator
                .resolve(&identity.class_name, &identity.method_name)
                .map_err(|e| {
                    warn!(
                        target: "testbridge::cache",
                        unique_name = %identity.unique_name,
                        error = %e,
                        "Source navigation failed"
                    );
                    self.logger.error(&format!(
                        "Cannot read source information for {}: {}",
                        identity.unique_name, e
                    ));
                    e
                })?;
            match location.location() {
                Some((file, line)) => {
                    descriptor.code_file_path = Some(file.to_string());
                    descriptor.line_number = Some(line);
                }
                None => self.logger.debug(&format!(
                    "No source location for {}.{}",
                    identity.class_name, identity.method_name
                )),
            }
        }

        Ok(descriptor)
    }
}

/// Categories and public properties, in declaration order, without repeats
fn traits_of(identity: &TestIdentity) -> Vec<Trait> {
    let categories = identity
        .categories
        .iter()
        .map(|c| Trait::new(CATEGORY_TRAIT, c.as_str()));
    let properties = identity
        .properties
        .iter()
        .filter(|(name, _)| !name.starts_with(INTERNAL_PROPERTY_PREFIX))
        .map(|(name, value)| Trait::new(name.as_str(), value.as_str()));

    let mut traits: Vec<Trait> = Vec::new();
    for t in categories.chain(properties) {
        if !traits.contains(&t) {
            traits.push(t);
        }
    }
    traits
}
