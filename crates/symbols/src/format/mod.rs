//! Binary formats of managed assemblies and their debug symbols
//!
//! This module contains the readers for:
//! - PE/COFF images and their debug directories (pe)
//! - Metadata roots, string and blob heaps (metadata)
//! - Metadata table streams with full row schemas (tables)
//! - Portable PDB headers, documents and sequence points (pdb)
//! - Custom attribute and TypeSpec signatures (signatures)
//!
//! Everything here borrows the underlying bytes; the index builder copies
//! out what it keeps.

pub mod metadata;
pub mod pdb;
pub mod pe;
pub mod reader;
pub mod signatures;
pub mod tables;

pub use metadata::{BlobHeap, MetadataRoot, StringsHeap};
pub use pdb::{PdbHeader, SequencePoint, SequencePoints, HIDDEN_LINE};
pub use pe::{CodeViewInfo, DebugEntry, PeImage};
pub use reader::ByteReader;
pub use tables::{CodedIndex, TableId, TableStream};
