//! Type index
//!
//! The in-memory result of reading an assembly and its symbols once:
//! every type definition keyed by its canonical full name (nested types
//! joined with `/`), its base type as a name, and per method the async
//! state machine target and the raw sequence point blob.
//!
//! The index owns copies of everything it needs so the image can be
//! unmapped as soon as it has been built. Sequence points stay encoded and
//! are decoded on demand, one method at a time.

use crate::format::signatures::canonical_type_name;
use std::collections::HashMap;
use tracing::warn;

/// Universal root of every class hierarchy
pub const ROOT_TYPE: &str = "System.Object";

/// Encoded debug information of one method
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDebugInfo {
    /// `Document` row the blob starts in (0 = named in the blob header)
    pub document: u32,
    /// Sequence point blob as stored in the PDB
    pub sequence_points: Vec<u8>,
}

/// A method definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDefinition {
    /// Method name
    pub name: String,
    /// Canonical name of the async state machine type, when the method is async
    pub async_state_machine: Option<String>,
    /// Sequence points, when the method has a body with debug info
    pub debug_info: Option<MethodDebugInfo>,
}

impl MethodDefinition {
    /// A method without debug info
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            async_state_machine: None,
            debug_info: None,
        }
    }

    /// Attach a sequence point blob
    pub fn with_debug_info(mut self, document: u32, sequence_points: Vec<u8>) -> Self {
        self.debug_info = Some(MethodDebugInfo {
            document,
            sequence_points,
        });
        self
    }

    /// Mark as async with the given state machine type
    pub fn with_async_state_machine(mut self, state_machine: &str) -> Self {
        self.async_state_machine = Some(canonical_type_name(state_machine));
        self
    }
}

/// A type definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDefinition {
    /// Canonical full name
    pub full_name: String,
    /// Canonical full name of the base type (`None` for interfaces and the root)
    pub base_type: Option<String>,
    /// Declared methods, in metadata order
    pub methods: Vec<MethodDefinition>,
}

impl TypeDefinition {
    /// A type with no methods
    pub fn new(full_name: &str, base_type: Option<&str>) -> Self {
        Self {
            full_name: canonical_type_name(full_name),
            base_type: base_type.map(canonical_type_name),
            methods: Vec::new(),
        }
    }

    /// Add a method
    pub fn with_method(mut self, method: MethodDefinition) -> Self {
        self.methods.push(method);
        self
    }

    /// First declared method with the given name
    pub fn method(&self, name: &str) -> Option<&MethodDefinition> {
        self.methods.iter().find(|m| m.name == name)
    }
}

/// All type definitions of one assembly
#[derive(Debug, Default)]
pub struct TypeIndex {
    types: Vec<TypeDefinition>,
    by_name: HashMap<String, usize>,
    documents: Vec<String>,
}

impl TypeIndex {
    /// Start building an index
    pub fn builder() -> TypeIndexBuilder {
        TypeIndexBuilder::default()
    }

    /// Type by canonical name
    pub fn get(&self, canonical_name: &str) -> Option<&TypeDefinition> {
        self.by_name.get(canonical_name).map(|&i| &self.types[i])
    }

    /// Type by any accepted spelling (`+` or `/` for nesting)
    pub fn find(&self, name: &str) -> Option<&TypeDefinition> {
        self.get(&canonical_type_name(name))
    }

    /// Source path of a `Document` row
    pub fn document(&self, row: u32) -> Option<&str> {
        let i = (row as usize).checked_sub(1)?;
        self.documents.get(i).map(String::as_str)
    }

    /// Number of types
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// True when the assembly defines no types
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Number of source documents
    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    /// Iterate over all types
    pub fn types(&self) -> impl Iterator<Item = &TypeDefinition> {
        self.types.iter()
    }
}

/// Incremental index construction
#[derive(Debug, Default)]
pub struct TypeIndexBuilder {
    index: TypeIndex,
}

impl TypeIndexBuilder {
    /// Register a source document, returning its 1-based row
    pub fn document(&mut self, path: impl Into<String>) -> u32 {
        self.index.documents.push(path.into());
        self.index.documents.len() as u32
    }

    /// Add a type; the first definition of a name wins
    pub fn add_type(&mut self, definition: TypeDefinition) -> &mut Self {
        if self.index.by_name.contains_key(&definition.full_name) {
            warn!(name = %definition.full_name, "Duplicate type definition ignored");
            return self;
        }
        let slot = self.index.types.len();
        self.index
            .by_name
            .insert(definition.full_name.clone(), slot);
        self.index.types.push(definition);
        self
    }

    /// Finish
    pub fn build(self) -> TypeIndex {
        self.index
    }
}
