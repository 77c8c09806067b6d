//! Source navigation over an assembly's symbols
//!
//! [`SymbolNavigator`] answers "where is this test method declared?" for
//! one assembly. The [`TypeIndex`] is built on first use and kept for the
//! navigator's lifetime. A failed build is remembered, so every later
//! query reports the same `AssemblyLoad` error without touching the disk
//! again.
//!
//! Resolution:
//!
//! 1. Find the class; walk base types until a type declaring the method is
//!    found (stopping at `System.Object`, at a base outside the assembly,
//!    or after visiting every type once)
//! 2. If that method is async, switch to its state machine's `MoveNext`
//! 3. Report the first sequence point that is not hidden

use crate::error::{SymbolError, SymbolResult};
use crate::format::pdb::SequencePoints;
use crate::index::{MethodDefinition, TypeIndex, ROOT_TYPE};
use crate::loader::{AssemblyFile, IndexLoader};
use once_cell::sync::OnceCell;
use std::path::PathBuf;
use std::time::Instant;
use testbridge_core::{BridgeResult, NavigationResult, SourceNavigator};
use tracing::{debug, error, info};

/// Method holding an async method's body inside its state machine
pub const MOVE_NEXT: &str = "MoveNext";

/// Lazily loaded navigator for one assembly
pub struct SymbolNavigator<L: IndexLoader = AssemblyFile> {
    loader: L,
    index: OnceCell<Result<TypeIndex, String>>,
}

impl<L: IndexLoader> std::fmt::Debug for SymbolNavigator<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymbolNavigator")
            .field("source", &self.loader.describe())
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

impl SymbolNavigator<AssemblyFile> {
    /// Navigator for the assembly at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_loader(AssemblyFile::new(path))
    }
}

impl<L: IndexLoader> SymbolNavigator<L> {
    /// Navigator over a custom index source
    pub fn with_loader(loader: L) -> Self {
        Self {
            loader,
            index: OnceCell::new(),
        }
    }

    /// The index, building it on first call
    pub fn index(&self) -> SymbolResult<&TypeIndex> {
        let slot = self.index.get_or_init(|| {
            let started = Instant::now();
            match self.loader.load() {
                Ok(index) => {
                    info!(
                        source = %self.loader.describe(),
                        types = index.len(),
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Loaded symbols"
                    );
                    Ok(index)
                }
                Err(e) => {
                    error!(source = %self.loader.describe(), error = %e, "Failed to load symbols");
                    Err(e.to_string())
                }
            }
        });
        slot.as_ref().map_err(|reason| SymbolError::AssemblyLoad {
            path: self.loader.describe(),
            reason: reason.clone(),
        })
    }

    /// True once a load has been attempted
    pub fn is_loaded(&self) -> bool {
        self.index.get().is_some()
    }

    /// Resolve the declaration site of `class_name.method_name`
    ///
    /// Fails only when the index cannot be built; an unknown class or
    /// method, or a method without visible sequence points, is an invalid
    /// result.
    pub fn resolve(&self, class_name: &str, method_name: &str) -> SymbolResult<NavigationResult> {
        Ok(navigate(self.index()?, class_name, method_name))
    }
}

impl<L: IndexLoader> SourceNavigator for SymbolNavigator<L> {
    fn resolve(&self, class_name: &str, method_name: &str) -> BridgeResult<NavigationResult> {
        SymbolNavigator::resolve(self, class_name, method_name).map_err(Into::into)
    }
}

/// Resolve against an already built index
pub fn navigate(index: &TypeIndex, class_name: &str, method_name: &str) -> NavigationResult {
    let Some(declared) = find_method(index, class_name, method_name) else {
        debug!(class = class_name, method = method_name, "Method not found");
        return NavigationResult::invalid();
    };
    first_visible_point(index, effective_method(index, declared))
}

/// Find a method on `class_name` or the nearest base type declaring it
pub fn find_method<'a>(index: &'a TypeIndex, class_name: &str, method_name: &str) -> Option<&'a MethodDefinition> {
    let mut current = index.find(class_name)?;
    for _ in 0..=index.len() {
        if let Some(method) = current.method(method_name) {
            return Some(method);
        }
        match current.base_type.as_deref() {
            None | Some(ROOT_TYPE) => return None,
            Some(base) => current = index.get(base)?,
        }
    }
    debug!(class = class_name, "Base type chain does not terminate");
    None
}

/// The method whose sequence points describe `declared`
///
/// Async methods are redirected to their state machine's `MoveNext`; when
/// the state machine or its `MoveNext` is missing the declared method is
/// used as is.
pub fn effective_method<'a>(index: &'a TypeIndex, declared: &'a MethodDefinition) -> &'a MethodDefinition {
    declared
        .async_state_machine
        .as_deref()
        .and_then(|state_machine| index.get(state_machine))
        .and_then(|ty| ty.method(MOVE_NEXT))
        .unwrap_or(declared)
}

/// Location of the first non-hidden sequence point of `method`
pub fn first_visible_point(index: &TypeIndex, method: &MethodDefinition) -> NavigationResult {
    let Some(info) = &method.debug_info else {
        return NavigationResult::invalid();
    };
    let points = match SequencePoints::new(&info.sequence_points, info.document) {
        Ok(points) => points,
        Err(e) => {
            debug!(method = %method.name, error = %e, "Unreadable sequence points");
            return NavigationResult::invalid();
        }
    };
    for point in points {
        match point {
            Ok(point) if point.is_hidden() => continue,
            Ok(point) => {
                return match index.document(point.document) {
                    Some(path) => NavigationResult::valid(path, point.start_line),
                    None => {
                        debug!(method = %method.name, document = point.document, "Unknown document");
                        NavigationResult::invalid()
                    }
                };
            }
            Err(e) => {
                debug!(method = %method.name, error = %e, "Unreadable sequence points");
                return NavigationResult::invalid();
            }
        }
    }
    NavigationResult::invalid()
}
