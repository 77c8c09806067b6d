//! Symbol reading for test source navigation
//!
//! This crate maps a test's class and method name to the source file and
//! line that declare it:
//!
//! - Binary formats: PE/COFF, ECMA-335 metadata tables, Portable PDB
//! - Type index: types, base types, methods, async state machines and
//!   sequence point blobs of one assembly
//! - Loader: locates symbols (embedded, companion, CodeView path)
//! - Navigator: lazy, load-once resolution with base-type walk, async
//!   redirect and hidden sequence point skipping
//! - Testing utilities that write real assemblies and PDBs

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod assembly; // Metadata + PDB -> TypeIndex
pub mod error; // SymbolError
pub mod format; // PE, metadata, tables, Portable PDB, signatures
pub mod index; // TypeIndex model
pub mod loader; // Symbol discovery and loading
pub mod navigator; // SymbolNavigator
pub mod testing; // Image builder and blob encoders

pub use assembly::{read_index, ASYNC_STATE_MACHINE_ATTRIBUTE};
pub use error::{SymbolError, SymbolResult};
pub use format::HIDDEN_LINE;
pub use index::{MethodDebugInfo, MethodDefinition, TypeDefinition, TypeIndex, TypeIndexBuilder, ROOT_TYPE};
pub use loader::{AssemblyFile, IndexLoader};
pub use navigator::{navigate, SymbolNavigator, MOVE_NEXT};
