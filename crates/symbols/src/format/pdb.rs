//! Portable PDB structures
//!
//! A Portable PDB is a metadata image (`BSJB` root) with a `#Pdb` stream
//! and debug tables 0x30-0x37. Two of them matter for navigation:
//!
//! - `Document`: source file names, stored as a separator byte followed by
//!   compressed blob indices of the path parts
//! - `MethodDebugInformation`: one row per `MethodDef`, holding the
//!   sequence point blob of that method
//!
//! ## Sequence point blob
//!
//! ```text
//! header:  LocalSignature [InitialDocument if the row's Document is nil]
//! record:  δIL (0 on a non-first record => document record: Document)
//!          ΔLines ΔColumns                       (0, 0 => hidden)
//!          δStartLine δStartColumn               (unsigned first, then signed)
//! ```
//!
//! Hidden sequence points are materialized with the conventional hidden
//! line value `0xFEEFEE`.

use super::metadata::BlobHeap;
use super::reader::ByteReader;
use super::tables::{TableId, MAX_TABLES};
use crate::error::{SymbolError, SymbolResult};
use flate2::read::DeflateDecoder;
use std::io::Read;

/// Start line marking a hidden sequence point
pub const HIDDEN_LINE: u32 = 0x00FE_EFEE;

/// Signature of an embedded Portable PDB payload ("MPDB")
pub const EMBEDDED_PDB_SIGNATURE: &[u8; 4] = b"MPDB";

/// File signature of Windows (MSF) PDBs, which are not supported
pub const WINDOWS_PDB_SIGNATURE: &[u8] = b"Microsoft C/C++ MSF 7.00\r\n\x1aDS\0\0\0";

/// Signature of any metadata image, including Portable PDBs
pub const PORTABLE_PDB_SIGNATURE: &[u8; 4] = b"BSJB";

/// The `#Pdb` stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdbHeader {
    /// PDB id (matches the CodeView GUID + stamp of the assembly)
    pub id: [u8; 20],
    /// Entry point MethodDef token
    pub entry_point: u32,
    /// Row counts of the type-system tables in the assembly
    pub referenced_rows: [u32; MAX_TABLES],
}

impl PdbHeader {
    /// Parse the `#Pdb` stream
    pub fn parse(data: &[u8]) -> SymbolResult<Self> {
        let mut r = ByteReader::new(data, "#Pdb stream");
        let mut id = [0u8; 20];
        id.copy_from_slice(r.bytes(20)?);
        let entry_point = r.u32()?;
        let referenced = r.u64()?;

        let mut referenced_rows = [0u32; MAX_TABLES];
        for (number, slot) in referenced_rows.iter_mut().enumerate() {
            if referenced & (1u64 << number) != 0 {
                *slot = r.u32()?;
            }
        }
        Ok(Self {
            id,
            entry_point,
            referenced_rows,
        })
    }

    /// Number of `MethodDef` rows in the assembly these symbols describe
    pub fn method_count(&self) -> u32 {
        self.referenced_rows[TableId::MethodDef.number()]
    }
}

/// Upper bound on the expansion assumed when pre-sizing inflated output
const MAX_DEFLATE_RATIO: usize = 16;

/// Decompress the payload of an embedded Portable PDB debug entry
///
/// Layout: `"MPDB" + uncompressed_size(4) + raw deflate stream`.
pub fn inflate_embedded(payload: &[u8]) -> SymbolResult<Vec<u8>> {
    let mut r = ByteReader::new(payload, "embedded PDB");
    if r.bytes(4)? != EMBEDDED_PDB_SIGNATURE {
        return Err(SymbolError::malformed("embedded PDB entry lacks MPDB signature"));
    }
    let expected = r.u32()? as usize;
    let compressed = r.bytes(r.remaining())?;

    // Declared size comes from the file; never reserve or inflate past it blindly
    let reserve = expected.min(compressed.len().saturating_mul(MAX_DEFLATE_RATIO));
    let mut out = Vec::with_capacity(reserve);
    DeflateDecoder::new(compressed)
        .take(expected as u64 + 1)
        .read_to_end(&mut out)?;
    if out.len() != expected {
        return Err(SymbolError::malformed(format!(
            "embedded PDB inflated to {} bytes, header says {}",
            out.len(),
            expected
        )));
    }
    Ok(out)
}

/// Decode a `Document.Name` blob into a path
pub fn decode_document_name(blobs: &BlobHeap<'_>, name: &[u8]) -> SymbolResult<String> {
    if name.is_empty() {
        return Ok(String::new());
    }
    let mut r = ByteReader::new(name, "document name");
    let separator = r.u8()?;
    let mut path = String::new();
    let mut first = true;
    while !r.is_empty() {
        let part_index = r.compressed_u32()?;
        if !first && separator != 0 {
            path.push(char::from(separator));
        }
        first = false;
        let part = blobs.get(part_index)?;
        path.push_str(&String::from_utf8_lossy(part));
    }
    Ok(path)
}

/// One decoded sequence point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequencePoint {
    /// IL offset the point starts at
    pub il_offset: u32,
    /// `Document` row of the point
    pub document: u32,
    /// Start line (`HIDDEN_LINE` for hidden points)
    pub start_line: u32,
    /// Start column
    pub start_column: u32,
    /// End line
    pub end_line: u32,
    /// End column
    pub end_column: u32,
}

impl SequencePoint {
    /// True for hidden sequence points
    pub fn is_hidden(&self) -> bool {
        self.start_line == HIDDEN_LINE
    }
}

/// Iterator decoding a sequence point blob in order
#[derive(Debug)]
pub struct SequencePoints<'a> {
    r: ByteReader<'a>,
    document: u32,
    il_offset: u32,
    first: bool,
    previous: Option<(u32, u32)>,
    failed: bool,
}

impl<'a> SequencePoints<'a> {
    /// Start decoding; `document` is the row's `Document` column (0 = nil)
    pub fn new(blob: &'a [u8], document: u32) -> SymbolResult<Self> {
        let mut r = ByteReader::new(blob, "sequence points");
        let _local_signature = r.compressed_u32()?;
        let document = if document == 0 {
            r.compressed_u32()?
        } else {
            document
        };
        Ok(Self {
            r,
            document,
            il_offset: 0,
            first: true,
            previous: None,
            failed: false,
        })
    }

    fn read_record(&mut self) -> SymbolResult<Option<SequencePoint>> {
        loop {
            if self.r.is_empty() {
                return Ok(None);
            }
            let delta_il = self.r.compressed_u32()?;
            if !self.first && delta_il == 0 {
                self.document = self.r.compressed_u32()?;
                continue;
            }
            self.il_offset = if self.first {
                delta_il
            } else {
                self.il_offset
                    .checked_add(delta_il)
                    .ok_or_else(|| SymbolError::malformed("sequence point IL offset overflow"))?
            };
            self.first = false;

            let delta_lines = self.r.compressed_u32()?;
            let delta_columns = if delta_lines == 0 {
                i64::from(self.r.compressed_u32()?)
            } else {
                i64::from(self.r.compressed_i32()?)
            };

            if delta_lines == 0 && delta_columns == 0 {
                return Ok(Some(SequencePoint {
                    il_offset: self.il_offset,
                    document: self.document,
                    start_line: HIDDEN_LINE,
                    start_column: 0,
                    end_line: HIDDEN_LINE,
                    end_column: 0,
                }));
            }

            let (start_line, start_column) = match self.previous {
                None => (
                    i64::from(self.r.compressed_u32()?),
                    i64::from(self.r.compressed_u32()?),
                ),
                Some((line, column)) => (
                    i64::from(line) + i64::from(self.r.compressed_i32()?),
                    i64::from(column) + i64::from(self.r.compressed_i32()?),
                ),
            };
            let end_line = start_line + i64::from(delta_lines);
            let end_column = start_column + delta_columns;

            let to_u32 = |v: i64, what: &str| {
                u32::try_from(v).map_err(|_| {
                    SymbolError::malformed(format!("sequence point {} out of range: {}", what, v))
                })
            };
            let point = SequencePoint {
                il_offset: self.il_offset,
                document: self.document,
                start_line: to_u32(start_line, "start line")?,
                start_column: to_u32(start_column, "start column")?,
                end_line: to_u32(end_line, "end line")?,
                end_column: to_u32(end_column, "end column")?,
            };
            self.previous = Some((point.start_line, point.start_column));
            return Ok(Some(point));
        }
    }
}

impl<'a> Iterator for SequencePoints<'a> {
    type Item = SymbolResult<SequencePoint>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.read_record() {
            Ok(point) => point.map(Ok),
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}
