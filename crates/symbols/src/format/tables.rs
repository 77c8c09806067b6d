//! Metadata table stream (`#~`)
//!
//! ## Layout
//!
//! ```text
//! reserved(4) major(1) minor(1) heap_sizes(1) reserved(1)
//! valid(8) sorted(8) rows(4 * popcount(valid)) [extra(4) if heap_sizes & 0x40]
//! table rows, in ascending table order
//! ```
//!
//! Row widths depend on heap sizes and on the row counts of every table a
//! column can point into, so the full schema of every table that may be
//! present is needed even though only a handful are ever read. Portable PDB
//! table streams size their type-system columns from the row counts recorded
//! in the `#Pdb` stream instead of local tables.

use super::reader::ByteReader;
use crate::error::{SymbolError, SymbolResult};

/// Number of table slots in the `valid` mask
pub const MAX_TABLES: usize = 64;

const HEAP_STRINGS_WIDE: u8 = 0x01;
const HEAP_GUID_WIDE: u8 = 0x02;
const HEAP_BLOB_WIDE: u8 = 0x04;
const HEAP_EXTRA_DATA: u8 = 0x40;

/// Metadata table identifiers (ECMA-335 II.22, Portable PDB tables 0x30-0x37)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
#[allow(missing_docs)]
pub enum TableId {
    Module = 0x00,
    TypeRef = 0x01,
    TypeDef = 0x02,
    FieldPtr = 0x03,
    Field = 0x04,
    MethodPtr = 0x05,
    MethodDef = 0x06,
    ParamPtr = 0x07,
    Param = 0x08,
    InterfaceImpl = 0x09,
    MemberRef = 0x0A,
    Constant = 0x0B,
    CustomAttribute = 0x0C,
    FieldMarshal = 0x0D,
    DeclSecurity = 0x0E,
    ClassLayout = 0x0F,
    FieldLayout = 0x10,
    StandAloneSig = 0x11,
    EventMap = 0x12,
    EventPtr = 0x13,
    Event = 0x14,
    PropertyMap = 0x15,
    PropertyPtr = 0x16,
    Property = 0x17,
    MethodSemantics = 0x18,
    MethodImpl = 0x19,
    ModuleRef = 0x1A,
    TypeSpec = 0x1B,
    ImplMap = 0x1C,
    FieldRva = 0x1D,
    EncLog = 0x1E,
    EncMap = 0x1F,
    Assembly = 0x20,
    AssemblyProcessor = 0x21,
    AssemblyOs = 0x22,
    AssemblyRef = 0x23,
    AssemblyRefProcessor = 0x24,
    AssemblyRefOs = 0x25,
    File = 0x26,
    ExportedType = 0x27,
    ManifestResource = 0x28,
    NestedClass = 0x29,
    GenericParam = 0x2A,
    MethodSpec = 0x2B,
    GenericParamConstraint = 0x2C,
    Document = 0x30,
    MethodDebugInformation = 0x31,
    LocalScope = 0x32,
    LocalVariable = 0x33,
    LocalConstant = 0x34,
    ImportScope = 0x35,
    StateMachineMethod = 0x36,
    CustomDebugInformation = 0x37,
}

impl TableId {
    /// Map a table number to its id
    pub fn from_number(number: u8) -> Option<Self> {
        use TableId::*;
        let id = match number {
            0x00 => Module,
            0x01 => TypeRef,
            0x02 => TypeDef,
            0x03 => FieldPtr,
            0x04 => Field,
            0x05 => MethodPtr,
            0x06 => MethodDef,
            0x07 => ParamPtr,
            0x08 => Param,
            0x09 => InterfaceImpl,
            0x0A => MemberRef,
            0x0B => Constant,
            0x0C => CustomAttribute,
            0x0D => FieldMarshal,
            0x0E => DeclSecurity,
            0x0F => ClassLayout,
            0x10 => FieldLayout,
            0x11 => StandAloneSig,
            0x12 => EventMap,
            0x13 => EventPtr,
            0x14 => Event,
            0x15 => PropertyMap,
            0x16 => PropertyPtr,
            0x17 => Property,
            0x18 => MethodSemantics,
            0x19 => MethodImpl,
            0x1A => ModuleRef,
            0x1B => TypeSpec,
            0x1C => ImplMap,
            0x1D => FieldRva,
            0x1E => EncLog,
            0x1F => EncMap,
            0x20 => Assembly,
            0x21 => AssemblyProcessor,
            0x22 => AssemblyOs,
            0x23 => AssemblyRef,
            0x24 => AssemblyRefProcessor,
            0x25 => AssemblyRefOs,
            0x26 => File,
            0x27 => ExportedType,
            0x28 => ManifestResource,
            0x29 => NestedClass,
            0x2A => GenericParam,
            0x2B => MethodSpec,
            0x2C => GenericParamConstraint,
            0x30 => Document,
            0x31 => MethodDebugInformation,
            0x32 => LocalScope,
            0x33 => LocalVariable,
            0x34 => LocalConstant,
            0x35 => ImportScope,
            0x36 => StateMachineMethod,
            0x37 => CustomDebugInformation,
            _ => return None,
        };
        Some(id)
    }

    /// Table number
    pub fn number(self) -> usize {
        self as u8 as usize
    }

    /// True for tables defined by the type system (as opposed to debug tables)
    pub fn is_type_system(self) -> bool {
        self.number() < 0x30
    }
}

/// Coded index kinds (ECMA-335 II.24.2.6, Portable PDB)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum CodedIndex {
    TypeDefOrRef,
    HasConstant,
    HasCustomAttribute,
    HasFieldMarshal,
    HasDeclSecurity,
    MemberRefParent,
    HasSemantics,
    MethodDefOrRef,
    MemberForwarded,
    Implementation,
    CustomAttributeType,
    ResolutionScope,
    TypeOrMethodDef,
    HasCustomDebugInformation,
}

impl CodedIndex {
    /// Tables addressed by each tag value; `None` marks unused tags
    pub fn tables(self) -> &'static [Option<TableId>] {
        use TableId as T;
        match self {
            CodedIndex::TypeDefOrRef => &[Some(T::TypeDef), Some(T::TypeRef), Some(T::TypeSpec)],
            CodedIndex::HasConstant => &[Some(T::Field), Some(T::Param), Some(T::Property)],
            CodedIndex::HasCustomAttribute => &[
                Some(T::MethodDef),
                Some(T::Field),
                Some(T::TypeRef),
                Some(T::TypeDef),
                Some(T::Param),
                Some(T::InterfaceImpl),
                Some(T::MemberRef),
                Some(T::Module),
                Some(T::DeclSecurity),
                Some(T::Property),
                Some(T::Event),
                Some(T::StandAloneSig),
                Some(T::ModuleRef),
                Some(T::TypeSpec),
                Some(T::Assembly),
                Some(T::AssemblyRef),
                Some(T::File),
                Some(T::ExportedType),
                Some(T::ManifestResource),
                Some(T::GenericParam),
                Some(T::GenericParamConstraint),
                Some(T::MethodSpec),
            ],
            CodedIndex::HasFieldMarshal => &[Some(T::Field), Some(T::Param)],
            CodedIndex::HasDeclSecurity => &[Some(T::TypeDef), Some(T::MethodDef), Some(T::Assembly)],
            CodedIndex::MemberRefParent => &[
                Some(T::TypeDef),
                Some(T::TypeRef),
                Some(T::ModuleRef),
                Some(T::MethodDef),
                Some(T::TypeSpec),
            ],
            CodedIndex::HasSemantics => &[Some(T::Event), Some(T::Property)],
            CodedIndex::MethodDefOrRef => &[Some(T::MethodDef), Some(T::MemberRef)],
            CodedIndex::MemberForwarded => &[Some(T::Field), Some(T::MethodDef)],
            CodedIndex::Implementation => &[Some(T::File), Some(T::AssemblyRef), Some(T::ExportedType)],
            CodedIndex::CustomAttributeType => {
                &[None, None, Some(T::MethodDef), Some(T::MemberRef), None]
            }
            CodedIndex::ResolutionScope => &[
                Some(T::Module),
                Some(T::ModuleRef),
                Some(T::AssemblyRef),
                Some(T::TypeRef),
            ],
            CodedIndex::TypeOrMethodDef => &[Some(T::TypeDef), Some(T::MethodDef)],
            CodedIndex::HasCustomDebugInformation => &[
                Some(T::MethodDef),
                Some(T::Field),
                Some(T::TypeRef),
                Some(T::TypeDef),
                Some(T::Param),
                Some(T::InterfaceImpl),
                Some(T::MemberRef),
                Some(T::Module),
                Some(T::DeclSecurity),
                Some(T::Property),
                Some(T::Event),
                Some(T::StandAloneSig),
                Some(T::ModuleRef),
                Some(T::TypeSpec),
                Some(T::Assembly),
                Some(T::AssemblyRef),
                Some(T::File),
                Some(T::ExportedType),
                Some(T::ManifestResource),
                Some(T::GenericParam),
                Some(T::GenericParamConstraint),
                Some(T::MethodSpec),
                Some(T::Document),
                Some(T::LocalScope),
                Some(T::LocalVariable),
                Some(T::LocalConstant),
                Some(T::ImportScope),
            ],
        }
    }

    /// Number of low bits holding the tag
    pub fn tag_bits(self) -> u32 {
        let n = self.tables().len() as u32;
        32 - (n - 1).leading_zeros()
    }

    /// Split a raw value into `(table, row)`; `None` for null or unused tags
    pub fn decode(self, value: u32) -> Option<(TableId, u32)> {
        let bits = self.tag_bits();
        let tag = (value & ((1 << bits) - 1)) as usize;
        let row = value >> bits;
        let table = (*self.tables().get(tag)?)?;
        (row != 0).then_some((table, row))
    }

    /// Combine a table and row into a raw value
    pub fn encode(self, table: TableId, row: u32) -> Option<u32> {
        let tag = self.tables().iter().position(|t| *t == Some(table))? as u32;
        Some((row << self.tag_bits()) | tag)
    }
}

/// Column kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    /// Two-byte constant
    U16,
    /// Four-byte constant
    U32,
    /// `#Strings` index
    Str,
    /// `#GUID` index
    Guid,
    /// `#Blob` index
    Blob,
    /// Simple index into one table
    Table(TableId),
    /// Coded index
    Coded(CodedIndex),
}

/// Column layout of a table
pub fn schema(table: TableId) -> &'static [Column] {
    use CodedIndex as C;
    use Column::*;
    use TableId as T;
    match table {
        T::Module => &[U16, Str, Guid, Guid, Guid],
        T::TypeRef => &[Coded(C::ResolutionScope), Str, Str],
        T::TypeDef => &[U32, Str, Str, Coded(C::TypeDefOrRef), Table(T::Field), Table(T::MethodDef)],
        T::FieldPtr => &[Table(T::Field)],
        T::Field => &[U16, Str, Blob],
        T::MethodPtr => &[Table(T::MethodDef)],
        T::MethodDef => &[U32, U16, U16, Str, Blob, Table(T::Param)],
        T::ParamPtr => &[Table(T::Param)],
        T::Param => &[U16, U16, Str],
        T::InterfaceImpl => &[Table(T::TypeDef), Coded(C::TypeDefOrRef)],
        T::MemberRef => &[Coded(C::MemberRefParent), Str, Blob],
        // Type is one byte followed by one padding byte
        T::Constant => &[U16, Coded(C::HasConstant), Blob],
        T::CustomAttribute => &[Coded(C::HasCustomAttribute), Coded(C::CustomAttributeType), Blob],
        T::FieldMarshal => &[Coded(C::HasFieldMarshal), Blob],
        T::DeclSecurity => &[U16, Coded(C::HasDeclSecurity), Blob],
        T::ClassLayout => &[U16, U32, Table(T::TypeDef)],
        T::FieldLayout => &[U32, Table(T::Field)],
        T::StandAloneSig => &[Blob],
        T::EventMap => &[Table(T::TypeDef), Table(T::Event)],
        T::EventPtr => &[Table(T::Event)],
        T::Event => &[U16, Str, Coded(C::TypeDefOrRef)],
        T::PropertyMap => &[Table(T::TypeDef), Table(T::Property)],
        T::PropertyPtr => &[Table(T::Property)],
        T::Property => &[U16, Str, Blob],
        T::MethodSemantics => &[U16, Table(T::MethodDef), Coded(C::HasSemantics)],
        T::MethodImpl => &[Table(T::TypeDef), Coded(C::MethodDefOrRef), Coded(C::MethodDefOrRef)],
        T::ModuleRef => &[Str],
        T::TypeSpec => &[Blob],
        T::ImplMap => &[U16, Coded(C::MemberForwarded), Str, Table(T::ModuleRef)],
        T::FieldRva => &[U32, Table(T::Field)],
        T::EncLog => &[U32, U32],
        T::EncMap => &[U32],
        T::Assembly => &[U32, U16, U16, U16, U16, U32, Blob, Str, Str],
        T::AssemblyProcessor => &[U32],
        T::AssemblyOs => &[U32, U32, U32],
        T::AssemblyRef => &[U16, U16, U16, U16, U32, Blob, Str, Str, Blob],
        T::AssemblyRefProcessor => &[U32, Table(T::AssemblyRef)],
        T::AssemblyRefOs => &[U32, U32, U32, Table(T::AssemblyRef)],
        T::File => &[U32, Str, Blob],
        T::ExportedType => &[U32, U32, Str, Str, Coded(C::Implementation)],
        T::ManifestResource => &[U32, U32, Str, Coded(C::Implementation)],
        T::NestedClass => &[Table(T::TypeDef), Table(T::TypeDef)],
        T::GenericParam => &[U16, U16, Coded(C::TypeOrMethodDef), Str],
        T::MethodSpec => &[Coded(C::MethodDefOrRef), Blob],
        T::GenericParamConstraint => &[Table(T::GenericParam), Coded(C::TypeDefOrRef)],
        T::Document => &[Blob, Guid, Blob, Guid],
        T::MethodDebugInformation => &[Table(T::Document), Blob],
        T::LocalScope => &[
            Table(T::MethodDef),
            Table(T::ImportScope),
            Table(T::LocalVariable),
            Table(T::LocalConstant),
            U32,
            U32,
        ],
        T::LocalVariable => &[U16, U16, Str],
        T::LocalConstant => &[Str, Blob],
        T::ImportScope => &[Table(T::ImportScope), Blob],
        T::StateMachineMethod => &[Table(T::MethodDef), Table(T::MethodDef)],
        T::CustomDebugInformation => &[Coded(C::HasCustomDebugInformation), Guid, Blob],
    }
}

/// Column indices of the tables the index builder reads
pub mod col {
    /// TypeRef.ResolutionScope
    pub const TYPEREF_SCOPE: usize = 0;
    /// TypeRef.TypeName
    pub const TYPEREF_NAME: usize = 1;
    /// TypeRef.TypeNamespace
    pub const TYPEREF_NAMESPACE: usize = 2;
    /// TypeDef.TypeName
    pub const TYPEDEF_NAME: usize = 1;
    /// TypeDef.TypeNamespace
    pub const TYPEDEF_NAMESPACE: usize = 2;
    /// TypeDef.Extends
    pub const TYPEDEF_EXTENDS: usize = 3;
    /// TypeDef.MethodList
    pub const TYPEDEF_METHOD_LIST: usize = 5;
    /// MethodPtr.Method
    pub const METHODPTR_METHOD: usize = 0;
    /// MethodDef.Name
    pub const METHODDEF_NAME: usize = 3;
    /// MemberRef.Class
    pub const MEMBERREF_CLASS: usize = 0;
    /// CustomAttribute.Parent
    pub const CUSTOMATTRIBUTE_PARENT: usize = 0;
    /// CustomAttribute.Type
    pub const CUSTOMATTRIBUTE_TYPE: usize = 1;
    /// CustomAttribute.Value
    pub const CUSTOMATTRIBUTE_VALUE: usize = 2;
    /// TypeSpec.Signature
    pub const TYPESPEC_SIGNATURE: usize = 0;
    /// NestedClass.NestedClass
    pub const NESTEDCLASS_NESTED: usize = 0;
    /// NestedClass.EnclosingClass
    pub const NESTEDCLASS_ENCLOSING: usize = 1;
    /// Document.Name
    pub const DOCUMENT_NAME: usize = 0;
    /// MethodDebugInformation.Document
    pub const METHODDEBUG_DOCUMENT: usize = 0;
    /// MethodDebugInformation.SequencePoints
    pub const METHODDEBUG_SEQUENCE_POINTS: usize = 1;
}

#[derive(Debug, Clone, Default)]
struct TableLayout {
    offset: usize,
    row_size: usize,
    columns: Vec<(usize, usize)>,
}

/// A parsed table stream
#[derive(Debug)]
pub struct TableStream<'a> {
    data: &'a [u8],
    rows: [u32; MAX_TABLES],
    layouts: Vec<TableLayout>,
}

impl<'a> TableStream<'a> {
    /// Parse a table stream
    ///
    /// `external_rows` supplies row counts for tables that live in another
    /// metadata image (type-system tables referenced from a Portable PDB).
    pub fn parse(data: &'a [u8], external_rows: Option<&[u32; MAX_TABLES]>) -> SymbolResult<Self> {
        let mut r = ByteReader::new(data, "table stream");
        let _reserved = r.u32()?;
        let _major = r.u8()?;
        let _minor = r.u8()?;
        let heap_sizes = r.u8()?;
        let _reserved = r.u8()?;
        let valid = r.u64()?;
        let _sorted = r.u64()?;

        let mut rows = [0u32; MAX_TABLES];
        for (number, slot) in rows.iter_mut().enumerate() {
            if valid & (1u64 << number) == 0 {
                continue;
            }
            if TableId::from_number(number as u8).is_none() {
                return Err(SymbolError::malformed(format!(
                    "table stream declares unknown table 0x{:02X}",
                    number
                )));
            }
            *slot = r.u32()?;
        }
        if heap_sizes & HEAP_EXTRA_DATA != 0 {
            r.skip(4)?;
        }

        // Column widths see local counts plus the referenced external ones
        let mut sizing = rows;
        if let Some(external) = external_rows {
            for (number, count) in external.iter().enumerate() {
                if rows[number] == 0 {
                    sizing[number] = *count;
                }
            }
        }

        let mut layouts = vec![TableLayout::default(); MAX_TABLES];
        let mut offset = r.position();
        for number in 0..MAX_TABLES {
            if rows[number] == 0 {
                continue;
            }
            let Some(table) = TableId::from_number(number as u8) else {
                continue;
            };
            let mut columns = Vec::with_capacity(schema(table).len());
            let mut row_size = 0;
            for column in schema(table) {
                let width = column_width(*column, heap_sizes, &sizing);
                columns.push((row_size, width));
                row_size += width;
            }
            layouts[number] = TableLayout {
                offset,
                row_size,
                columns,
            };
            offset = offset
                .checked_add(row_size * rows[number] as usize)
                .ok_or_else(|| SymbolError::malformed("table stream size overflow"))?;
        }
        if offset > data.len() {
            return Err(SymbolError::Truncated {
                context: "table rows",
                offset: data.len(),
            });
        }

        Ok(Self {
            data,
            rows,
            layouts,
        })
    }

    /// Number of rows in a table
    pub fn row_count(&self, table: TableId) -> u32 {
        self.rows[table.number()]
    }

    /// All row counts, indexed by table number
    pub fn row_counts(&self) -> &[u32; MAX_TABLES] {
        &self.rows
    }

    /// Read column `column` of 1-based row `row`
    pub fn get(&self, table: TableId, row: u32, column: usize) -> SymbolResult<u32> {
        if row == 0 || row > self.row_count(table) {
            return Err(SymbolError::malformed(format!(
                "{:?} row {} out of range (1..={})",
                table,
                row,
                self.row_count(table)
            )));
        }
        let layout = &self.layouts[table.number()];
        let (column_offset, width) = *layout.columns.get(column).ok_or_else(|| {
            SymbolError::malformed(format!("{:?} has no column {}", table, column))
        })?;
        let offset = layout.offset + (row as usize - 1) * layout.row_size + column_offset;
        ByteReader::at(self.data, offset, "table row")?.index(width)
    }

    /// Read a coded index column and decode it
    pub fn coded(
        &self,
        table: TableId,
        row: u32,
        column: usize,
        kind: CodedIndex,
    ) -> SymbolResult<Option<(TableId, u32)>> {
        Ok(kind.decode(self.get(table, row, column)?))
    }
}

fn column_width(column: Column, heap_sizes: u8, rows: &[u32; MAX_TABLES]) -> usize {
    let wide_if = |flag: u8| if heap_sizes & flag != 0 { 4 } else { 2 };
    match column {
        Column::U16 => 2,
        Column::U32 => 4,
        Column::Str => wide_if(HEAP_STRINGS_WIDE),
        Column::Guid => wide_if(HEAP_GUID_WIDE),
        Column::Blob => wide_if(HEAP_BLOB_WIDE),
        Column::Table(table) => {
            if rows[table.number()] < (1 << 16) {
                2
            } else {
                4
            }
        }
        Column::Coded(kind) => {
            let max_rows = kind
                .tables()
                .iter()
                .flatten()
                .map(|t| rows[t.number()])
                .max()
                .unwrap_or(0);
            if max_rows < (1u32 << (16 - kind.tag_bits())) {
                2
            } else {
                4
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_bits() {
        assert_eq!(CodedIndex::TypeDefOrRef.tag_bits(), 2);
        assert_eq!(CodedIndex::HasConstant.tag_bits(), 2);
        assert_eq!(CodedIndex::HasCustomAttribute.tag_bits(), 5);
        assert_eq!(CodedIndex::HasFieldMarshal.tag_bits(), 1);
        assert_eq!(CodedIndex::MemberRefParent.tag_bits(), 3);
        assert_eq!(CodedIndex::CustomAttributeType.tag_bits(), 3);
        assert_eq!(CodedIndex::ResolutionScope.tag_bits(), 2);
        assert_eq!(CodedIndex::HasCustomDebugInformation.tag_bits(), 5);
    }

    #[test]
    fn test_coded_decode() {
        // TypeRef row 3 in TypeDefOrRef: (3 << 2) | 1
        assert_eq!(CodedIndex::TypeDefOrRef.decode(13), Some((TableId::TypeRef, 3)));
        // MemberRef row 2 in CustomAttributeType: (2 << 3) | 3
        assert_eq!(
            CodedIndex::CustomAttributeType.decode(19),
            Some((TableId::MemberRef, 2))
        );
        // Unused tag
        assert_eq!(CodedIndex::CustomAttributeType.decode(8), None);
        // Null row
        assert_eq!(CodedIndex::TypeDefOrRef.decode(0), None);
        // Tag beyond the table list
        assert_eq!(CodedIndex::TypeDefOrRef.decode(3 | (1 << 2)), None);
    }

    #[test]
    fn test_coded_encode_matches_decode() {
        let kinds = [
            (CodedIndex::HasCustomAttribute, TableId::MethodDef),
            (CodedIndex::TypeDefOrRef, TableId::TypeSpec),
            (CodedIndex::MemberRefParent, TableId::TypeRef),
            (CodedIndex::ResolutionScope, TableId::TypeRef),
        ];
        for (kind, table) in kinds {
            let raw = kind.encode(table, 7).unwrap();
            assert_eq!(kind.decode(raw), Some((table, 7)));
        }
        assert_eq!(CodedIndex::TypeDefOrRef.encode(TableId::MethodDef, 1), None);
    }

    #[test]
    fn test_table_numbers_round_trip() {
        for number in 0u8..64 {
            if let Some(table) = TableId::from_number(number) {
                assert_eq!(table.number(), number as usize);
            }
        }
        assert!(TableId::from_number(0x2D).is_none());
        assert!(TableId::from_number(0x38).is_none());
        assert!(TableId::Document.number() >= 0x30 && !TableId::Document.is_type_system());
        assert!(TableId::TypeDef.is_type_system());
    }

    #[test]
    fn test_column_widths_grow_with_counts() {
        let mut rows = [0u32; MAX_TABLES];
        assert_eq!(column_width(Column::Table(TableId::TypeDef), 0, &rows), 2);
        rows[TableId::TypeDef.number()] = 70_000;
        assert_eq!(column_width(Column::Table(TableId::TypeDef), 0, &rows), 4);

        let mut rows = [0u32; MAX_TABLES];
        // HasCustomAttribute has 5 tag bits: 2^11 rows switch to 4 bytes
        rows[TableId::MethodDef.number()] = 2047;
        assert_eq!(column_width(Column::Coded(CodedIndex::HasCustomAttribute), 0, &rows), 2);
        rows[TableId::MethodDef.number()] = 2048;
        assert_eq!(column_width(Column::Coded(CodedIndex::HasCustomAttribute), 0, &rows), 4);

        assert_eq!(column_width(Column::Str, HEAP_STRINGS_WIDE, &rows), 4);
        assert_eq!(column_width(Column::Blob, HEAP_STRINGS_WIDE, &rows), 2);
        assert_eq!(column_width(Column::Guid, HEAP_GUID_WIDE, &rows), 4);
    }

    fn stream_with(tables: &[(TableId, u32)], heap_sizes: u8, body: &[u8]) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&0u32.to_le_bytes());
        data.push(2);
        data.push(0);
        data.push(heap_sizes);
        data.push(1);
        let valid = tables.iter().fold(0u64, |m, (t, _)| m | (1 << t.number()));
        data.extend_from_slice(&valid.to_le_bytes());
        data.extend_from_slice(&0u64.to_le_bytes());
        let mut sorted: Vec<_> = tables.to_vec();
        sorted.sort_by_key(|(t, _)| t.number());
        for (_, count) in sorted {
            data.extend_from_slice(&count.to_le_bytes());
        }
        data.extend_from_slice(body);
        data
    }

    #[test]
    fn test_parse_and_read_rows() {
        // Two ModuleRef rows (Str, 2 bytes each), one TypeSpec row (Blob)
        let body = [0x05, 0x00, 0x09, 0x00, 0x11, 0x00];
        let data = stream_with(&[(TableId::ModuleRef, 2), (TableId::TypeSpec, 1)], 0, &body);
        let stream = TableStream::parse(&data, None).unwrap();
        assert_eq!(stream.row_count(TableId::ModuleRef), 2);
        assert_eq!(stream.get(TableId::ModuleRef, 1, 0).unwrap(), 5);
        assert_eq!(stream.get(TableId::ModuleRef, 2, 0).unwrap(), 9);
        assert_eq!(stream.get(TableId::TypeSpec, 1, 0).unwrap(), 0x11);
        assert!(stream.get(TableId::ModuleRef, 3, 0).is_err());
        assert!(stream.get(TableId::ModuleRef, 0, 0).is_err());
        assert!(stream.get(TableId::ModuleRef, 1, 1).is_err());
    }

    #[test]
    fn test_wide_heaps_and_extra_data() {
        let mut body = vec![0xAA, 0xBB, 0xCC, 0xDD]; // extra data
        body.extend_from_slice(&0x0001_0002u32.to_le_bytes());
        let data = stream_with(&[(TableId::ModuleRef, 1)], HEAP_STRINGS_WIDE | HEAP_EXTRA_DATA, &body);
        let stream = TableStream::parse(&data, None).unwrap();
        assert_eq!(stream.get(TableId::ModuleRef, 1, 0).unwrap(), 0x0001_0002);
    }

    #[test]
    fn test_truncated_rows() {
        let data = stream_with(&[(TableId::ModuleRef, 4)], 0, &[0, 0]);
        assert!(matches!(
            TableStream::parse(&data, None),
            Err(SymbolError::Truncated { .. })
        ));
    }

    #[test]
    fn test_unknown_table_rejected() {
        let mut data = stream_with(&[], 0, &[]);
        data[8 + 5] = 0x20; // bit 45 = table 0x2D
        data.extend_from_slice(&1u32.to_le_bytes());
        assert!(matches!(TableStream::parse(&data, None), Err(SymbolError::Malformed(_))));
    }

    #[test]
    fn test_external_rows_size_columns() {
        // LocalScope.Method is a MethodDef index; 70k external methods -> 4 bytes
        let mut external = [0u32; MAX_TABLES];
        external[TableId::MethodDef.number()] = 70_000;
        // Method(4) ImportScope(2) VariableList(2) ConstantList(2) Start(4) Length(4) = 18
        let body = vec![0u8; 18];
        let data = stream_with(&[(TableId::LocalScope, 1)], 0, &body);
        assert!(TableStream::parse(&data, None).is_ok());
        let stream = TableStream::parse(&data, Some(&external)).unwrap();
        assert_eq!(stream.row_count(TableId::MethodDef), 0);
        assert_eq!(stream.get(TableId::LocalScope, 1, 0).unwrap(), 0);
    }
}
