//! Building a [`TypeIndex`] from assembly metadata and a Portable PDB
//!
//! The assembly contributes type names, base types, method lists and
//! custom attributes; the PDB contributes documents and one sequence point
//! blob per `MethodDef` row. Both sides are joined on `MethodDef` row ids,
//! so their method counts must agree.
//!
//! ## Names
//!
//! - Type definitions: `Namespace.Name`, nested types as `Enclosing/Name`
//!   (via the `NestedClass` table)
//! - Type references: the same, nested through a `TypeRef` resolution scope
//! - Generic base types (`TypeSpec`): the instantiated generic definition

use crate::error::{SymbolError, SymbolResult};
use crate::format::metadata::{BlobHeap, MetadataRoot, StringsHeap, PDB_STREAM};
use crate::format::pdb::{decode_document_name, PdbHeader};
use crate::format::signatures::{
    canonical_type_name, generic_instance_target, nested_name, qualified_name, read_type_argument,
};
use crate::format::tables::{col, CodedIndex, TableId, TableStream};
use crate::index::{MethodDebugInfo, MethodDefinition, TypeDefinition, TypeIndex};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Attribute the compiler puts on async methods, naming their state machine
pub const ASYNC_STATE_MACHINE_ATTRIBUTE: &str = "System.Runtime.CompilerServices.AsyncStateMachineAttribute";

/// Build the index of an assembly from its metadata root and PDB image
pub fn read_index(metadata: &[u8], pdb: &[u8]) -> SymbolResult<TypeIndex> {
    let root = MetadataRoot::parse(metadata)?;
    let assembly = AssemblyTables {
        tables: TableStream::parse(root.tables()?, None)?,
        strings: root.strings(),
        blobs: root.blobs(),
    };

    let pdb_root = MetadataRoot::parse(pdb)?;
    let header_stream = pdb_root
        .stream(PDB_STREAM)
        .ok_or_else(|| SymbolError::malformed("symbols have no #Pdb stream"))?;
    let header = PdbHeader::parse(header_stream)?;
    let symbols = SymbolTables {
        tables: TableStream::parse(pdb_root.tables()?, Some(&header.referenced_rows))?,
        blobs: pdb_root.blobs(),
    };

    let method_count = assembly.tables.row_count(TableId::MethodDef);
    let debug_rows = symbols.tables.row_count(TableId::MethodDebugInformation);
    if debug_rows != 0 && debug_rows != method_count {
        return Err(SymbolError::malformed(format!(
            "symbols describe {} methods, assembly defines {}",
            debug_rows, method_count
        )));
    }
    if header.method_count() != method_count {
        return Err(SymbolError::malformed(format!(
            "symbols were built for {} methods, assembly defines {}",
            header.method_count(),
            method_count
        )));
    }

    let mut builder = TypeIndex::builder();
    for row in 1..=symbols.tables.row_count(TableId::Document) {
        builder.document(symbols.document_name(row)?);
    }

    let type_names = assembly.type_def_names()?;
    let type_ref_names = assembly.type_ref_names()?;
    let method_rows = assembly.method_rows()?;

    let mut owners = HashMap::new();
    for (i, rows) in method_rows.iter().enumerate() {
        for &method in rows {
            owners.insert(method, i as u32 + 1);
        }
    }
    let state_machines = assembly.async_state_machines(&type_names, &type_ref_names, &owners)?;

    for (i, rows) in method_rows.iter().enumerate() {
        let rid = i as u32 + 1;
        let mut definition = TypeDefinition {
            full_name: type_names[i].clone(),
            base_type: assembly.base_type(rid, &type_names, &type_ref_names)?,
            methods: Vec::with_capacity(rows.len()),
        };
        for &method in rows {
            let name = assembly
                .strings
                .get(assembly.tables.get(TableId::MethodDef, method, col::METHODDEF_NAME)?)?;
            let mut m = MethodDefinition::new(name);
            m.async_state_machine = state_machines.get(&method).cloned();
            if debug_rows != 0 {
                m.debug_info = symbols.debug_info(method)?;
            }
            definition.methods.push(m);
        }
        builder.add_type(definition);
    }

    let index = builder.build();
    debug!(
        types = index.len(),
        documents = index.document_count(),
        methods = method_count,
        async_methods = state_machines.len(),
        "Built type index"
    );
    Ok(index)
}

struct AssemblyTables<'a> {
    tables: TableStream<'a>,
    strings: StringsHeap<'a>,
    blobs: BlobHeap<'a>,
}

impl<'a> AssemblyTables<'a> {
    /// Full names of all TypeDef rows, in row order
    fn type_def_names(&self) -> SymbolResult<Vec<String>> {
        let count = self.tables.row_count(TableId::TypeDef);
        let mut simple = Vec::with_capacity(count as usize);
        for row in 1..=count {
            let name = self.strings.get(self.tables.get(TableId::TypeDef, row, col::TYPEDEF_NAME)?)?;
            let namespace = self
                .strings
                .get(self.tables.get(TableId::TypeDef, row, col::TYPEDEF_NAMESPACE)?)?;
            simple.push(qualified_name(namespace, name));
        }

        let mut enclosing = HashMap::new();
        for row in 1..=self.tables.row_count(TableId::NestedClass) {
            let nested = self.tables.get(TableId::NestedClass, row, col::NESTEDCLASS_NESTED)?;
            let outer = self.tables.get(TableId::NestedClass, row, col::NESTEDCLASS_ENCLOSING)?;
            if nested == 0 || nested > count || outer == 0 || outer > count || nested == outer {
                warn!(nested, outer, "Ignoring out of range NestedClass row");
                continue;
            }
            enclosing.insert(nested, outer);
        }
        resolve_nested(simple, &enclosing, "NestedClass")
    }

    /// Full names of all TypeRef rows, in row order
    fn type_ref_names(&self) -> SymbolResult<Vec<String>> {
        let count = self.tables.row_count(TableId::TypeRef);
        let mut simple = Vec::with_capacity(count as usize);
        let mut enclosing = HashMap::new();
        for row in 1..=count {
            let name = self.strings.get(self.tables.get(TableId::TypeRef, row, col::TYPEREF_NAME)?)?;
            let namespace = self
                .strings
                .get(self.tables.get(TableId::TypeRef, row, col::TYPEREF_NAMESPACE)?)?;
            simple.push(qualified_name(namespace, name));
            let scope = self
                .tables
                .coded(TableId::TypeRef, row, col::TYPEREF_SCOPE, CodedIndex::ResolutionScope)?;
            if let Some((TableId::TypeRef, outer)) = scope {
                if outer != row && outer <= count {
                    enclosing.insert(row, outer);
                }
            }
        }
        resolve_nested(simple, &enclosing, "TypeRef resolution scope")
    }

    /// Method rows of each TypeDef, honoring `MethodPtr` indirection
    fn method_rows(&self) -> SymbolResult<Vec<Vec<u32>>> {
        let type_count = self.tables.row_count(TableId::TypeDef);
        let indirect = self.tables.row_count(TableId::MethodPtr) > 0;
        let list_len = if indirect {
            self.tables.row_count(TableId::MethodPtr)
        } else {
            self.tables.row_count(TableId::MethodDef)
        };

        let mut out = Vec::with_capacity(type_count as usize);
        for row in 1..=type_count {
            let start = self.tables.get(TableId::TypeDef, row, col::TYPEDEF_METHOD_LIST)?;
            let end = if row < type_count {
                self.tables.get(TableId::TypeDef, row + 1, col::TYPEDEF_METHOD_LIST)?
            } else {
                list_len + 1
            };
            let start = start.clamp(1, list_len + 1);
            let end = end.clamp(start, list_len + 1);
            let mut rows = Vec::with_capacity((end - start) as usize);
            for entry in start..end {
                rows.push(if indirect {
                    self.tables.get(TableId::MethodPtr, entry, col::METHODPTR_METHOD)?
                } else {
                    entry
                });
            }
            out.push(rows);
        }
        Ok(out)
    }

    /// Canonical base type name of a TypeDef
    fn base_type(&self, row: u32, type_names: &[String], type_ref_names: &[String]) -> SymbolResult<Option<String>> {
        let extends = self
            .tables
            .coded(TableId::TypeDef, row, col::TYPEDEF_EXTENDS, CodedIndex::TypeDefOrRef)?;
        Ok(match extends {
            Some((TableId::TypeSpec, spec)) => {
                let signature = self.blobs.get(self.tables.get(TableId::TypeSpec, spec, col::TYPESPEC_SIGNATURE)?)?;
                match generic_instance_target(signature) {
                    Ok(Some((table, target))) => type_name(table, target, type_names, type_ref_names),
                    Ok(None) => None,
                    Err(e) => {
                        debug!(row, error = %e, "Unreadable TypeSpec base");
                        None
                    }
                }
            }
            Some((table, target)) => type_name(table, target, type_names, type_ref_names),
            None => None,
        })
    }

    /// State machine type of each async MethodDef row
    fn async_state_machines(
        &self,
        type_names: &[String],
        type_ref_names: &[String],
        owners: &HashMap<u32, u32>,
    ) -> SymbolResult<HashMap<u32, String>> {
        let mut out = HashMap::new();
        for row in 1..=self.tables.row_count(TableId::CustomAttribute) {
            let parent = self.tables.coded(
                TableId::CustomAttribute,
                row,
                col::CUSTOMATTRIBUTE_PARENT,
                CodedIndex::HasCustomAttribute,
            )?;
            let Some((TableId::MethodDef, method)) = parent else {
                continue;
            };

            let constructor = self.tables.coded(
                TableId::CustomAttribute,
                row,
                col::CUSTOMATTRIBUTE_TYPE,
                CodedIndex::CustomAttributeType,
            )?;
            let attribute = match constructor {
                Some((TableId::MethodDef, ctor)) => owners
                    .get(&ctor)
                    .and_then(|&owner| type_name(TableId::TypeDef, owner, type_names, type_ref_names)),
                Some((TableId::MemberRef, ctor)) => {
                    let class = self.tables.coded(
                        TableId::MemberRef,
                        ctor,
                        col::MEMBERREF_CLASS,
                        CodedIndex::MemberRefParent,
                    )?;
                    class.and_then(|(table, target)| type_name(table, target, type_names, type_ref_names))
                }
                _ => None,
            };
            if attribute.as_deref() != Some(ASYNC_STATE_MACHINE_ATTRIBUTE) {
                continue;
            }

            let value = self
                .blobs
                .get(self.tables.get(TableId::CustomAttribute, row, col::CUSTOMATTRIBUTE_VALUE)?)?;
            match read_type_argument(value) {
                Ok(Some(state_machine)) => {
                    out.insert(method, canonical_type_name(&state_machine));
                }
                Ok(None) => {}
                Err(e) => debug!(method, error = %e, "Unreadable async state machine attribute"),
            }
        }
        Ok(out)
    }
}

struct SymbolTables<'a> {
    tables: TableStream<'a>,
    blobs: BlobHeap<'a>,
}

impl<'a> SymbolTables<'a> {
    fn document_name(&self, row: u32) -> SymbolResult<String> {
        let name = self
            .blobs
            .get(self.tables.get(TableId::Document, row, col::DOCUMENT_NAME)?)?;
        decode_document_name(&self.blobs, name)
    }

    fn debug_info(&self, method: u32) -> SymbolResult<Option<MethodDebugInfo>> {
        let blob_index = self.tables.get(
            TableId::MethodDebugInformation,
            method,
            col::METHODDEBUG_SEQUENCE_POINTS,
        )?;
        if blob_index == 0 {
            return Ok(None);
        }
        let document = self
            .tables
            .get(TableId::MethodDebugInformation, method, col::METHODDEBUG_DOCUMENT)?;
        Ok(Some(MethodDebugInfo {
            document,
            sequence_points: self.blobs.get(blob_index)?.to_vec(),
        }))
    }
}

/// Name of a TypeDef or TypeRef row
fn type_name(table: TableId, row: u32, type_names: &[String], type_ref_names: &[String]) -> Option<String> {
    let names = match table {
        TableId::TypeDef => type_names,
        TableId::TypeRef => type_ref_names,
        _ => return None,
    };
    let i = (row as usize).checked_sub(1)?;
    names.get(i).cloned()
}

/// Prefix nested names with their enclosing names
///
/// `enclosing` maps 1-based rows to the row of their enclosing type.
fn resolve_nested(simple: Vec<String>, enclosing: &HashMap<u32, u32>, what: &str) -> SymbolResult<Vec<String>> {
    let count = simple.len();
    let mut names: Vec<Option<String>> = vec![None; count];
    for start in 1..=count as u32 {
        let mut chain = vec![start];
        let mut current = start;
        while let Some(&outer) = enclosing.get(&current) {
            if names[outer as usize - 1].is_some() {
                break;
            }
            if chain.len() > count {
                return Err(SymbolError::malformed(format!("{} nesting cycle at row {}", what, start)));
            }
            chain.push(outer);
            current = outer;
        }
        for &row in chain.iter().rev() {
            if names[row as usize - 1].is_some() {
                continue;
            }
            let own = &simple[row as usize - 1];
            let full = match enclosing.get(&row) {
                Some(&outer) => {
                    let outer_name = names[outer as usize - 1].as_deref().ok_or_else(|| {
                        SymbolError::malformed(format!("{} row {} resolved before its parent", what, row))
                    })?;
                    nested_name(outer_name, own)
                }
                None => own.clone(),
            };
            names[row as usize - 1] = Some(full);
        }
    }
    Ok(names.into_iter().flatten().collect())
}
