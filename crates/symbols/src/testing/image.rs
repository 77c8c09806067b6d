//! Minimal managed assembly and Portable PDB writer
//!
//! Produces byte-exact PE32 images with one `.text` section holding the
//! CLI header, the metadata root and the debug directory, plus the matching
//! Portable PDB. Only the tables the index builder reads are populated,
//! with every index column two bytes wide.
//!
//! ## Layout
//!
//! ```text
//! 0x000  DOS header (e_lfanew = 0x80)
//! 0x080  PE signature, COFF header, PE32 optional header, section table
//! 0x200  .text (RVA 0x2000): CLI header | metadata | debug directory | debug data
//! ```

use super::encode::{compressed_u32, pad_to, u16_le, u32_le};
use super::sequence_points::{encode_sequence_points, Point};
use crate::format::pdb::EMBEDDED_PDB_SIGNATURE;
use crate::format::pe::{
    CLI_HEADER_DIRECTORY, DEBUG_DIRECTORY, DEBUG_TYPE_CODEVIEW, DEBUG_TYPE_EMBEDDED_PORTABLE_PDB,
};
use crate::format::tables::{schema, CodedIndex, Column, TableId, MAX_TABLES};
use flate2::write::DeflateEncoder;
use flate2::Compression;
use std::collections::HashMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

const PE_OFFSET: usize = 0x80;
const OPTIONAL_HEADER_SIZE: u16 = 224;
const TEXT_RVA: u32 = 0x2000;
const TEXT_FILE_OFFSET: usize = 0x200;
const FILE_ALIGNMENT: usize = 0x200;
const CLI_HEADER_SIZE: u32 = 72;
const TIMESTAMP: u32 = 0x6523_1C00;
const PDB_GUID: [u8; 16] = [
    0x3F, 0x2A, 0x91, 0x5C, 0x07, 0x44, 0x4B, 0x1E, 0x9A, 0x61, 0x0D, 0x8E, 0x52, 0xC3, 0x77, 0x10,
];

const OBJECT_TYPEREF: u32 = 1;
const ASYNC_ATTRIBUTE_TYPEREF: u32 = 2;
const SYSTEM_TYPE_TYPEREF: u32 = 3;
const FIRST_EXTERNAL_TYPEREF: u32 = 4;

/// Handle of a type added to an [`ImageBuilder`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeHandle(usize);

/// Base type of a built type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Base {
    /// `System.Object`
    Object,
    /// No base (interfaces, `<Module>`)
    None,
    /// Another type of the same image
    Type(TypeHandle),
    /// A generic instantiation `T<int>` of another type of the same image
    Generic(TypeHandle),
    /// A type of another assembly, by full name
    External(String),
}

#[derive(Debug, Clone)]
struct BuiltMethod {
    name: String,
    document: u32,
    points: Vec<Point>,
    state_machine: Option<TypeHandle>,
}

#[derive(Debug, Clone)]
struct BuiltType {
    namespace: String,
    name: String,
    enclosing: Option<TypeHandle>,
    base: Base,
    methods: Vec<BuiltMethod>,
}

/// Bytes of a built assembly and its Portable PDB
#[derive(Debug, Clone)]
pub struct BuiltImage {
    /// The PE image
    pub assembly: Vec<u8>,
    /// The standalone Portable PDB
    pub pdb: Vec<u8>,
}

impl BuiltImage {
    /// Write `<stem>.dll` and its companion `<stem>.pdb` into `dir`
    pub fn write_to(&self, dir: &Path, stem: &str) -> io::Result<PathBuf> {
        let assembly = self.write_assembly(dir, stem)?;
        std::fs::write(assembly.with_extension("pdb"), &self.pdb)?;
        Ok(assembly)
    }

    /// Write only `<stem>.dll` into `dir`
    pub fn write_assembly(&self, dir: &Path, stem: &str) -> io::Result<PathBuf> {
        let path = dir.join(format!("{}.dll", stem));
        std::fs::write(&path, &self.assembly)?;
        Ok(path)
    }
}

/// Builder of small test assemblies with real metadata and symbols
#[derive(Debug, Clone, Default)]
pub struct ImageBuilder {
    types: Vec<BuiltType>,
    documents: Vec<String>,
    pdb_path: Option<String>,
    embed_pdb: bool,
}

impl ImageBuilder {
    /// An image with no types
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a CodeView entry naming this PDB path
    pub fn pdb_path(mut self, path: impl Into<String>) -> Self {
        self.pdb_path = Some(path.into());
        self
    }

    /// Embed the Portable PDB in the assembly's debug directory
    pub fn embed_pdb(mut self, embed: bool) -> Self {
        self.embed_pdb = embed;
        self
    }

    /// Register a source document, returning its row
    pub fn document(&mut self, path: impl Into<String>) -> u32 {
        self.documents.push(path.into());
        self.documents.len() as u32
    }

    /// Add a top-level type
    pub fn add_type(&mut self, namespace: &str, name: &str, base: Base) -> TypeHandle {
        self.push_type(namespace, name, None, base)
    }

    /// Add a type nested in `enclosing`
    pub fn add_nested_type(&mut self, enclosing: TypeHandle, name: &str, base: Base) -> TypeHandle {
        self.push_type("", name, Some(enclosing), base)
    }

    /// Replace the base of an existing type
    pub fn set_base(&mut self, ty: TypeHandle, base: Base) {
        self.types[ty.0].base = base;
    }

    /// Add a method with sequence points in `document`
    ///
    /// An empty `points` slice gives a method without debug info.
    pub fn add_method(&mut self, ty: TypeHandle, name: &str, document: u32, points: &[Point]) {
        self.types[ty.0].methods.push(BuiltMethod {
            name: name.to_string(),
            document,
            points: points.to_vec(),
            state_machine: None,
        });
    }

    /// Add an async method whose body lives in `state_machine`'s `MoveNext`
    pub fn add_async_method(
        &mut self,
        ty: TypeHandle,
        name: &str,
        state_machine: TypeHandle,
        document: u32,
        points: &[Point],
    ) {
        self.types[ty.0].methods.push(BuiltMethod {
            name: name.to_string(),
            document,
            points: points.to_vec(),
            state_machine: Some(state_machine),
        });
    }

    /// Reflection name of a built type (`Ns.Outer+Inner`)
    pub fn reflection_name(&self, ty: TypeHandle) -> String {
        let t = &self.types[ty.0];
        match t.enclosing {
            Some(outer) => format!("{}+{}", self.reflection_name(outer), t.name),
            None if t.namespace.is_empty() => t.name.clone(),
            None => format!("{}.{}", t.namespace, t.name),
        }
    }

    fn push_type(&mut self, namespace: &str, name: &str, enclosing: Option<TypeHandle>, base: Base) -> TypeHandle {
        self.types.push(BuiltType {
            namespace: namespace.to_string(),
            name: name.to_string(),
            enclosing,
            base,
            methods: Vec::new(),
        });
        TypeHandle(self.types.len() - 1)
    }

    fn type_rid(ty: TypeHandle) -> u32 {
        // Row 1 is <Module>
        ty.0 as u32 + 2
    }

    /// Produce the assembly and PDB bytes
    pub fn build(&self) -> io::Result<BuiltImage> {
        let assembly_tables = self.assembly_metadata();
        let pdb = self.pdb(&assembly_tables.row_counts);
        let embedded = if self.embed_pdb {
            Some(embed(&pdb)?)
        } else {
            None
        };
        let assembly = self.pe(&assembly_tables.metadata, embedded.as_deref());
        Ok(BuiltImage { assembly, pdb })
    }

    fn assembly_metadata(&self) -> AssemblyMetadata {
        let mut strings = StringHeap::new();
        let mut blobs = BlobHeap::new();
        let mut tables = TableWriter::default();

        let method_sig = blobs.add(&[0x20, 0x00, 0x01]);

        tables.row(TableId::Module, &[0, strings.add("Tests.dll"), 1, 0, 0]);

        let scope = coded(CodedIndex::ResolutionScope, TableId::AssemblyRef, 1);
        for (namespace, name) in [
            ("System", "Object"),
            ("System.Runtime.CompilerServices", "AsyncStateMachineAttribute"),
            ("System", "Type"),
        ] {
            tables.row(TableId::TypeRef, &[scope, strings.add(name), strings.add(namespace)]);
        }
        let mut externals: Vec<String> = Vec::new();
        for t in &self.types {
            if let Base::External(full) = &t.base {
                if !externals.contains(full) {
                    externals.push(full.clone());
                }
            }
        }
        for full in &externals {
            let (namespace, name) = full.rsplit_once('.').unwrap_or(("", full.as_str()));
            tables.row(TableId::TypeRef, &[scope, strings.add(name), strings.add(namespace)]);
        }

        // <Module>
        tables.row(TableId::TypeDef, &[0, strings.add("<Module>"), 0, 0, 1, 1]);
        let mut next_method = 1u32;
        let mut type_specs = 0u32;
        let mut method_rids: Vec<Vec<u32>> = Vec::with_capacity(self.types.len());
        for t in &self.types {
            let extends = match &t.base {
                Base::Object => coded(CodedIndex::TypeDefOrRef, TableId::TypeRef, OBJECT_TYPEREF),
                Base::None => 0,
                Base::Type(handle) => coded(CodedIndex::TypeDefOrRef, TableId::TypeDef, Self::type_rid(*handle)),
                Base::Generic(handle) => {
                    let mut sig = vec![0x15, 0x12];
                    compressed_u32(&mut sig, Self::type_rid(*handle) << 2);
                    sig.extend_from_slice(&[0x01, 0x08]);
                    tables.row(TableId::TypeSpec, &[blobs.add(&sig)]);
                    type_specs += 1;
                    coded(CodedIndex::TypeDefOrRef, TableId::TypeSpec, type_specs)
                }
                Base::External(full) => {
                    let slot = externals.iter().position(|e| e == full).unwrap_or(0) as u32;
                    coded(CodedIndex::TypeDefOrRef, TableId::TypeRef, FIRST_EXTERNAL_TYPEREF + slot)
                }
            };
            tables.row(
                TableId::TypeDef,
                &[0x0010_0001, strings.add(&t.name), strings.add(&t.namespace), extends, 1, next_method],
            );
            let rids: Vec<u32> = (next_method..next_method + t.methods.len() as u32).collect();
            next_method += t.methods.len() as u32;
            method_rids.push(rids);
        }

        for t in &self.types {
            for m in &t.methods {
                tables.row(TableId::MethodDef, &[0, 0, 0x0086, strings.add(&m.name), method_sig, 1]);
            }
        }

        let has_async = self.types.iter().flat_map(|t| &t.methods).any(|m| m.state_machine.is_some());
        if has_async {
            let mut ctor_sig = vec![0x20, 0x01, 0x01, 0x12];
            compressed_u32(&mut ctor_sig, (SYSTEM_TYPE_TYPEREF << 2) | 1);
            let class = coded(CodedIndex::MemberRefParent, TableId::TypeRef, ASYNC_ATTRIBUTE_TYPEREF);
            tables.row(TableId::MemberRef, &[class, strings.add(".ctor"), blobs.add(&ctor_sig)]);
        }

        for (t, rids) in self.types.iter().zip(&method_rids) {
            for (m, rid) in t.methods.iter().zip(rids) {
                let Some(state_machine) = m.state_machine else {
                    continue;
                };
                let name = self.reflection_name(state_machine);
                let mut value = vec![0x01, 0x00];
                compressed_u32(&mut value, name.len() as u32);
                value.extend_from_slice(name.as_bytes());
                value.extend_from_slice(&[0x00, 0x00]);
                tables.row(
                    TableId::CustomAttribute,
                    &[
                        coded(CodedIndex::HasCustomAttribute, TableId::MethodDef, *rid),
                        coded(CodedIndex::CustomAttributeType, TableId::MemberRef, 1),
                        blobs.add(&value),
                    ],
                );
            }
        }

        tables.row(
            TableId::AssemblyRef,
            &[8, 0, 0, 0, 0, 0, strings.add("System.Runtime"), 0, 0],
        );

        for (i, t) in self.types.iter().enumerate() {
            if let Some(outer) = t.enclosing {
                tables.row(
                    TableId::NestedClass,
                    &[Self::type_rid(TypeHandle(i)), Self::type_rid(outer)],
                );
            }
        }

        let row_counts = tables.row_counts();
        let mut guids = PDB_GUID.to_vec();
        pad_to(&mut guids, 4);
        let metadata = metadata_root(
            "v4.0.30319",
            &[
                ("#~", tables.finish()),
                ("#Strings", strings.finish()),
                ("#GUID", guids),
                ("#Blob", blobs.finish()),
            ],
        );
        AssemblyMetadata {
            metadata,
            row_counts,
        }
    }

    fn pdb(&self, referenced: &[u32; MAX_TABLES]) -> Vec<u8> {
        let mut blobs = BlobHeap::new();
        let mut tables = TableWriter::default();

        for path in &self.documents {
            let name = document_name(&mut blobs, path);
            tables.row(TableId::Document, &[name, 0, 0, 0]);
        }
        for t in &self.types {
            for m in &t.methods {
                if m.points.is_empty() {
                    tables.row(TableId::MethodDebugInformation, &[0, 0]);
                } else {
                    let blob = blobs.add(&encode_sequence_points(&m.points));
                    tables.row(TableId::MethodDebugInformation, &[m.document, blob]);
                }
            }
        }

        let mut pdb_stream = Vec::new();
        pdb_stream.extend_from_slice(&PDB_GUID);
        u32_le(&mut pdb_stream, TIMESTAMP);
        u32_le(&mut pdb_stream, 0); // entry point
        let mut mask = 0u64;
        for (number, count) in referenced.iter().enumerate() {
            if *count > 0 && TableId::from_number(number as u8).is_some_and(TableId::is_type_system) {
                mask |= 1 << number;
            }
        }
        pdb_stream.extend_from_slice(&mask.to_le_bytes());
        for (number, count) in referenced.iter().enumerate() {
            if mask & (1 << number) != 0 {
                u32_le(&mut pdb_stream, *count);
            }
        }

        metadata_root(
            "PDB v1.0",
            &[
                ("#Pdb", pdb_stream),
                ("#~", tables.finish()),
                ("#Strings", StringHeap::new().finish()),
                ("#Blob", blobs.finish()),
            ],
        )
    }

    fn pe(&self, metadata: &[u8], embedded: Option<&[u8]>) -> Vec<u8> {
        // .text contents
        let mut text = vec![0u8; CLI_HEADER_SIZE as usize];
        let metadata_offset = text.len() as u32;
        text.extend_from_slice(metadata);
        pad_to(&mut text, 4);

        let mut debug_payloads: Vec<(u32, Vec<u8>)> = Vec::new();
        if let Some(path) = &self.pdb_path {
            let mut rsds = b"RSDS".to_vec();
            rsds.extend_from_slice(&PDB_GUID);
            u32_le(&mut rsds, 1);
            rsds.extend_from_slice(path.as_bytes());
            rsds.push(0);
            debug_payloads.push((DEBUG_TYPE_CODEVIEW, rsds));
        }
        if let Some(payload) = embedded {
            debug_payloads.push((DEBUG_TYPE_EMBEDDED_PORTABLE_PDB, payload.to_vec()));
        }

        let debug_dir_offset = text.len() as u32;
        let debug_dir_size = 28 * debug_payloads.len() as u32;
        let mut data_offset = debug_dir_offset + debug_dir_size;
        let mut directory = Vec::new();
        let mut data = Vec::new();
        for (kind, payload) in &debug_payloads {
            u32_le(&mut directory, 0); // characteristics
            u32_le(&mut directory, TIMESTAMP);
            let (major, minor) = if *kind == DEBUG_TYPE_EMBEDDED_PORTABLE_PDB {
                (0x0100, 0x0100)
            } else {
                (0, 0)
            };
            u16_le(&mut directory, major);
            u16_le(&mut directory, minor);
            u32_le(&mut directory, *kind);
            u32_le(&mut directory, payload.len() as u32);
            u32_le(&mut directory, TEXT_RVA + data_offset);
            u32_le(&mut directory, TEXT_FILE_OFFSET as u32 + data_offset);
            data.extend_from_slice(payload);
            let padded = (payload.len() + 3) / 4 * 4;
            data.resize(data.len() + padded - payload.len(), 0);
            data_offset += padded as u32;
        }
        text.extend_from_slice(&directory);
        text.extend_from_slice(&data);

        // CLI header
        let mut cli = Vec::new();
        u32_le(&mut cli, CLI_HEADER_SIZE);
        u16_le(&mut cli, 2);
        u16_le(&mut cli, 5);
        u32_le(&mut cli, TEXT_RVA + metadata_offset);
        u32_le(&mut cli, metadata.len() as u32);
        u32_le(&mut cli, 1); // ILONLY
        text[..cli.len()].copy_from_slice(&cli);

        let virtual_size = text.len() as u32;
        let raw_size = (text.len() + FILE_ALIGNMENT - 1) / FILE_ALIGNMENT * FILE_ALIGNMENT;

        let mut image = vec![0u8; PE_OFFSET];
        image[0] = b'M';
        image[1] = b'Z';
        image[0x3C..0x40].copy_from_slice(&(PE_OFFSET as u32).to_le_bytes());

        image.extend_from_slice(b"PE\0\0");
        u16_le(&mut image, 0x014C); // i386
        u16_le(&mut image, 1); // sections
        u32_le(&mut image, TIMESTAMP);
        u32_le(&mut image, 0);
        u32_le(&mut image, 0);
        u16_le(&mut image, OPTIONAL_HEADER_SIZE);
        u16_le(&mut image, 0x2102); // executable, 32-bit, DLL

        let optional_start = image.len();
        u16_le(&mut image, 0x010B);
        image.resize(optional_start + 92, 0);
        u32_le(&mut image, 16);
        let mut directories = [(0u32, 0u32); 16];
        directories[CLI_HEADER_DIRECTORY] = (TEXT_RVA, CLI_HEADER_SIZE);
        if debug_dir_size > 0 {
            directories[DEBUG_DIRECTORY] = (TEXT_RVA + debug_dir_offset, debug_dir_size);
        }
        for (rva, size) in directories {
            u32_le(&mut image, rva);
            u32_le(&mut image, size);
        }

        image.extend_from_slice(b".text\0\0\0");
        u32_le(&mut image, virtual_size);
        u32_le(&mut image, TEXT_RVA);
        u32_le(&mut image, raw_size as u32);
        u32_le(&mut image, TEXT_FILE_OFFSET as u32);
        image.resize(image.len() + 12, 0);
        u32_le(&mut image, 0x6000_0020);

        image.resize(TEXT_FILE_OFFSET, 0);
        image.extend_from_slice(&text);
        image.resize(TEXT_FILE_OFFSET + raw_size, 0);
        image
    }
}

struct AssemblyMetadata {
    metadata: Vec<u8>,
    row_counts: [u32; MAX_TABLES],
}

fn coded(kind: CodedIndex, table: TableId, row: u32) -> u32 {
    kind.encode(table, row).unwrap_or(0)
}

fn embed(pdb: &[u8]) -> io::Result<Vec<u8>> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(pdb)?;
    let compressed = encoder.finish()?;
    let mut payload = EMBEDDED_PDB_SIGNATURE.to_vec();
    u32_le(&mut payload, pdb.len() as u32);
    payload.extend_from_slice(&compressed);
    Ok(payload)
}

fn document_name(blobs: &mut BlobHeap, path: &str) -> u32 {
    let separator = if path.contains('\\') { b'\\' } else { b'/' };
    let mut name = vec![separator];
    for part in path.split(char::from(separator)) {
        compressed_u32(&mut name, blobs.add(part.as_bytes()));
    }
    blobs.add(&name)
}

fn metadata_root(version: &str, streams: &[(&str, Vec<u8>)]) -> Vec<u8> {
    let mut version_bytes = version.as_bytes().to_vec();
    version_bytes.push(0);
    pad_to(&mut version_bytes, 4);

    let mut header = Vec::new();
    u32_le(&mut header, 0x424A_5342);
    u16_le(&mut header, 1);
    u16_le(&mut header, 1);
    u32_le(&mut header, 0);
    u32_le(&mut header, version_bytes.len() as u32);
    header.extend_from_slice(&version_bytes);
    u16_le(&mut header, 0);
    u16_le(&mut header, streams.len() as u16);

    let headers_len: usize = streams
        .iter()
        .map(|(name, _)| 8 + (name.len() + 1 + 3) / 4 * 4)
        .sum();
    let mut offset = header.len() + headers_len;
    let mut body = Vec::new();
    for (name, data) in streams {
        let mut data = data.clone();
        pad_to(&mut data, 4);
        u32_le(&mut header, offset as u32);
        u32_le(&mut header, data.len() as u32);
        header.extend_from_slice(name.as_bytes());
        header.push(0);
        pad_to(&mut header, 4);
        offset += data.len();
        body.extend_from_slice(&data);
    }
    header.extend_from_slice(&body);
    header
}

struct StringHeap {
    data: Vec<u8>,
    seen: HashMap<String, u32>,
}

impl StringHeap {
    fn new() -> Self {
        Self {
            data: vec![0],
            seen: HashMap::new(),
        }
    }

    fn add(&mut self, s: &str) -> u32 {
        if s.is_empty() {
            return 0;
        }
        if let Some(&index) = self.seen.get(s) {
            return index;
        }
        let index = self.data.len() as u32;
        self.data.extend_from_slice(s.as_bytes());
        self.data.push(0);
        self.seen.insert(s.to_string(), index);
        index
    }

    fn finish(self) -> Vec<u8> {
        self.data
    }
}

struct BlobHeap {
    data: Vec<u8>,
}

impl BlobHeap {
    fn new() -> Self {
        Self { data: vec![0] }
    }

    fn add(&mut self, bytes: &[u8]) -> u32 {
        if bytes.is_empty() {
            return 0;
        }
        let index = self.data.len() as u32;
        compressed_u32(&mut self.data, bytes.len() as u32);
        self.data.extend_from_slice(bytes);
        index
    }

    fn finish(self) -> Vec<u8> {
        self.data
    }
}

/// Table rows with two-byte heap and index columns
#[derive(Default)]
struct TableWriter {
    tables: Vec<(TableId, u32, Vec<u8>)>,
}

impl TableWriter {
    fn row(&mut self, table: TableId, values: &[u32]) {
        let columns = schema(table);
        debug_assert_eq!(columns.len(), values.len(), "{:?} column count", table);
        let slot = match self.tables.iter().position(|(t, _, _)| *t == table) {
            Some(slot) => slot,
            None => {
                self.tables.push((table, 0, Vec::new()));
                self.tables.len() - 1
            }
        };
        let (_, count, data) = &mut self.tables[slot];
        *count += 1;
        for (column, value) in columns.iter().zip(values) {
            match column {
                Column::U32 => u32_le(data, *value),
                _ => u16_le(data, *value as u16),
            }
        }
    }

    fn row_counts(&self) -> [u32; MAX_TABLES] {
        let mut counts = [0u32; MAX_TABLES];
        for (table, count, _) in &self.tables {
            counts[table.number()] = *count;
        }
        counts
    }

    fn finish(mut self) -> Vec<u8> {
        self.tables.sort_by_key(|(t, _, _)| t.number());
        let mut out = Vec::new();
        u32_le(&mut out, 0);
        out.push(2);
        out.push(0);
        out.push(0); // heap sizes: all narrow
        out.push(1);
        let valid = self
            .tables
            .iter()
            .fold(0u64, |mask, (t, _, _)| mask | (1 << t.number()));
        out.extend_from_slice(&valid.to_le_bytes());
        out.extend_from_slice(&0u64.to_le_bytes());
        for (_, count, _) in &self.tables {
            u32_le(&mut out, *count);
        }
        for (_, _, data) in &self.tables {
            out.extend_from_slice(data);
        }
        out
    }
}
