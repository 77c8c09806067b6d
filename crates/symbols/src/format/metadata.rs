//! Metadata root and heaps
//!
//! Both assemblies and Portable PDBs start their metadata with the same
//! root:
//!
//! ```text
//! "BSJB" + major(2) + minor(2) + reserved(4) + length(4) + version[length]
//! + flags(2) + stream_count(2) + { offset(4) size(4) name\0 (padded to 4) }*
//! ```

use super::reader::ByteReader;
use crate::error::{SymbolError, SymbolResult};

const METADATA_SIGNATURE: u32 = 0x424A_5342;

/// Compressed table stream
pub const TABLES_STREAM: &str = "#~";
/// Uncompressed (edit-and-continue) table stream
pub const UNCOMPRESSED_TABLES_STREAM: &str = "#-";
/// String heap
pub const STRINGS_STREAM: &str = "#Strings";
/// Blob heap
pub const BLOB_STREAM: &str = "#Blob";
/// Portable PDB header stream
pub const PDB_STREAM: &str = "#Pdb";

/// A parsed metadata root
#[derive(Debug)]
pub struct MetadataRoot<'a> {
    version: String,
    streams: Vec<(String, &'a [u8])>,
}

impl<'a> MetadataRoot<'a> {
    /// Parse the root and stream headers
    pub fn parse(data: &'a [u8]) -> SymbolResult<Self> {
        let mut r = ByteReader::new(data, "metadata root");
        if r.u32()? != METADATA_SIGNATURE {
            return Err(SymbolError::malformed("missing BSJB metadata signature"));
        }
        let _major = r.u16()?;
        let _minor = r.u16()?;
        let _reserved = r.u32()?;
        let version_length = r.u32()? as usize;
        let version_bytes = r.bytes(version_length)?;
        let version = String::from_utf8_lossy(version_bytes)
            .trim_end_matches('\0')
            .to_string();
        let _flags = r.u16()?;
        let stream_count = r.u16()? as usize;

        let mut streams = Vec::with_capacity(stream_count);
        for _ in 0..stream_count {
            let offset = r.u32()? as usize;
            let size = r.u32()? as usize;
            let name = r.cstr()?.to_string();
            r.align(4)?;

            let end = offset
                .checked_add(size)
                .filter(|&end| end <= data.len())
                .ok_or_else(|| {
                    SymbolError::malformed(format!(
                        "stream {} ({} bytes at {}) exceeds metadata ({} bytes)",
                        name,
                        size,
                        offset,
                        data.len()
                    ))
                })?;
            streams.push((name, &data[offset..end]));
        }

        Ok(Self { version, streams })
    }

    /// Runtime version string (e.g. `v4.0.30319`, `PDB v1.0`)
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Stream by name
    pub fn stream(&self, name: &str) -> Option<&'a [u8]> {
        self.streams
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, data)| *data)
    }

    /// The table stream, compressed or not
    pub fn tables(&self) -> SymbolResult<&'a [u8]> {
        self.stream(TABLES_STREAM)
            .or_else(|| self.stream(UNCOMPRESSED_TABLES_STREAM))
            .ok_or_else(|| SymbolError::malformed("metadata has no table stream"))
    }

    /// The string heap (empty when absent)
    pub fn strings(&self) -> StringsHeap<'a> {
        StringsHeap(self.stream(STRINGS_STREAM).unwrap_or(&[]))
    }

    /// The blob heap (empty when absent)
    pub fn blobs(&self) -> BlobHeap<'a> {
        BlobHeap(self.stream(BLOB_STREAM).unwrap_or(&[]))
    }
}

/// `#Strings`: NUL-terminated UTF-8 strings addressed by byte offset
#[derive(Debug, Clone, Copy)]
pub struct StringsHeap<'a>(&'a [u8]);

impl<'a> StringsHeap<'a> {
    /// String at `index`; index 0 is the empty string
    pub fn get(&self, index: u32) -> SymbolResult<&'a str> {
        if index == 0 {
            return Ok("");
        }
        ByteReader::at(self.0, index as usize, "#Strings")?.cstr()
    }
}

/// `#Blob`: length-prefixed byte runs addressed by byte offset
#[derive(Debug, Clone, Copy)]
pub struct BlobHeap<'a>(&'a [u8]);

impl<'a> BlobHeap<'a> {
    /// Blob at `index`; index 0 is the empty blob
    pub fn get(&self, index: u32) -> SymbolResult<&'a [u8]> {
        if index == 0 {
            return Ok(&[]);
        }
        let mut r = ByteReader::at(self.0, index as usize, "#Blob")?;
        let len = r.compressed_u32()? as usize;
        r.bytes(len)
    }
}
