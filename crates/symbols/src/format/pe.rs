//! PE/COFF image parsing
//!
//! Only what is needed to reach managed metadata and debug directories:
//!
//! ```text
//! DOS header ("MZ", e_lfanew @ 0x3C)
//!   -> "PE\0\0" + COFF header (20 bytes)
//!   -> optional header (PE32 0x10B / PE32+ 0x20B) + data directories
//!   -> section table (40 bytes per section)
//! ```
//!
//! Data directory 6 is the debug directory, 14 the CLI header.

use super::reader::ByteReader;
use crate::error::{SymbolError, SymbolResult};

const DOS_MAGIC: &[u8; 2] = b"MZ";
const PE_SIGNATURE: &[u8; 4] = b"PE\0\0";
const PE32_MAGIC: u16 = 0x10B;
const PE32_PLUS_MAGIC: u16 = 0x20B;
const SECTION_HEADER_SIZE: usize = 40;
const DEBUG_ENTRY_SIZE: usize = 28;

/// Data directory index of the debug directory
pub const DEBUG_DIRECTORY: usize = 6;
/// Data directory index of the CLI header
pub const CLI_HEADER_DIRECTORY: usize = 14;

/// CodeView debug entry (points at an external PDB)
pub const DEBUG_TYPE_CODEVIEW: u32 = 2;
/// Embedded Portable PDB debug entry
pub const DEBUG_TYPE_EMBEDDED_PORTABLE_PDB: u32 = 17;

const CODEVIEW_SIGNATURE: &[u8; 4] = b"RSDS";

/// An RVA/size pair from the optional header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DataDirectory {
    /// Relative virtual address
    pub rva: u32,
    /// Size in bytes
    pub size: u32,
}

impl DataDirectory {
    /// True when the directory is absent
    pub fn is_empty(&self) -> bool {
        self.rva == 0 || self.size == 0
    }
}

#[derive(Debug, Clone, Copy)]
struct Section {
    virtual_address: u32,
    virtual_size: u32,
    raw_size: u32,
    raw_pointer: u32,
}

impl Section {
    fn contains(&self, rva: u32) -> bool {
        let extent = self.virtual_size.max(self.raw_size);
        rva >= self.virtual_address && u64::from(rva) < u64::from(self.virtual_address) + u64::from(extent)
    }
}

/// One entry of the debug directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebugEntry {
    /// Entry type (2 = CodeView, 17 = embedded Portable PDB)
    pub kind: u32,
    /// Major version
    pub major_version: u16,
    /// Minor version
    pub minor_version: u16,
    /// Size of the entry data
    pub size_of_data: u32,
    /// RVA of the entry data (0 when not mapped)
    pub address_of_raw_data: u32,
    /// File offset of the entry data
    pub pointer_to_raw_data: u32,
}

/// Contents of a CodeView (RSDS) debug entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeViewInfo {
    /// PDB signature GUID bytes
    pub guid: [u8; 16],
    /// PDB age
    pub age: u32,
    /// PDB path recorded at build time
    pub path: String,
}

/// A parsed PE image borrowing the file bytes
#[derive(Debug)]
pub struct PeImage<'a> {
    data: &'a [u8],
    sections: Vec<Section>,
    directories: Vec<DataDirectory>,
}

impl<'a> PeImage<'a> {
    /// Parse PE headers
    pub fn parse(data: &'a [u8]) -> SymbolResult<Self> {
        let mut r = ByteReader::new(data, "DOS header");
        if r.bytes(2)? != DOS_MAGIC {
            return Err(SymbolError::malformed("missing MZ signature"));
        }
        r.seek(0x3C)?;
        let pe_offset = r.u32()? as usize;

        let mut r = ByteReader::at(data, pe_offset, "PE signature")?;
        if r.bytes(4)? != PE_SIGNATURE {
            return Err(SymbolError::malformed("missing PE signature"));
        }

        // COFF header
        let _machine = r.u16()?;
        let section_count = r.u16()? as usize;
        r.skip(12)?; // timestamp, symbol table pointer, symbol count
        let optional_header_size = r.u16()? as usize;
        let _characteristics = r.u16()?;

        let optional_start = r.position();
        let magic = r.u16()?;
        let (count_offset, directories_offset) = match magic {
            PE32_MAGIC => (92, 96),
            PE32_PLUS_MAGIC => (108, 112),
            other => {
                return Err(SymbolError::malformed(format!(
                    "unknown optional header magic 0x{:04X}",
                    other
                )))
            }
        };

        r.seek(optional_start + count_offset)?;
        let directory_count = r.u32()? as usize;
        let max_directories = optional_header_size.saturating_sub(directories_offset) / 8;
        let directory_count = directory_count.min(max_directories).min(16);

        r.seek(optional_start + directories_offset)?;
        let mut directories = Vec::with_capacity(directory_count);
        for _ in 0..directory_count {
            directories.push(DataDirectory {
                rva: r.u32()?,
                size: r.u32()?,
            });
        }

        let mut r = ByteReader::at(data, optional_start + optional_header_size, "section table")?;
        let mut sections = Vec::with_capacity(section_count);
        for _ in 0..section_count {
            let header = r.bytes(SECTION_HEADER_SIZE)?;
            let mut h = ByteReader::new(header, "section header");
            h.skip(8)?; // name
            let virtual_size = h.u32()?;
            let virtual_address = h.u32()?;
            let raw_size = h.u32()?;
            let raw_pointer = h.u32()?;
            sections.push(Section {
                virtual_address,
                virtual_size,
                raw_size,
                raw_pointer,
            });
        }

        Ok(Self {
            data,
            sections,
            directories,
        })
    }

    /// Data directory by index; empty when absent
    pub fn directory(&self, index: usize) -> DataDirectory {
        self.directories.get(index).copied().unwrap_or_default()
    }

    /// Map an RVA to a file offset
    pub fn rva_to_offset(&self, rva: u32) -> Option<usize> {
        let section = self.sections.iter().find(|s| s.contains(rva))?;
        let offset = (rva - section.virtual_address) as usize + section.raw_pointer as usize;
        (offset <= self.data.len()).then_some(offset)
    }

    /// Borrow `size` bytes starting at `rva`
    pub fn slice_at_rva(&self, rva: u32, size: u32, context: &'static str) -> SymbolResult<&'a [u8]> {
        let offset = self
            .rva_to_offset(rva)
            .ok_or_else(|| SymbolError::malformed(format!("{}: RVA 0x{:X} is not mapped", context, rva)))?;
        let mut r = ByteReader::at(self.data, offset, context)?;
        r.bytes(size as usize)
    }

    /// True when the image has a CLI header
    pub fn is_managed(&self) -> bool {
        !self.directory(CLI_HEADER_DIRECTORY).is_empty()
    }

    /// Borrow the metadata root referenced by the CLI header
    pub fn metadata(&self) -> SymbolResult<&'a [u8]> {
        let cli = self.directory(CLI_HEADER_DIRECTORY);
        if cli.is_empty() {
            return Err(SymbolError::NotManaged("image has no CLI header".to_string()));
        }
        let header = self.slice_at_rva(cli.rva, cli.size, "CLI header")?;
        let mut r = ByteReader::new(header, "CLI header");
        r.skip(8)?; // cb, runtime version
        let metadata_rva = r.u32()?;
        let metadata_size = r.u32()?;
        if metadata_rva == 0 || metadata_size == 0 {
            return Err(SymbolError::malformed("CLI header has no metadata directory"));
        }
        self.slice_at_rva(metadata_rva, metadata_size, "metadata")
    }

    /// Entries of the debug directory
    pub fn debug_entries(&self) -> SymbolResult<Vec<DebugEntry>> {
        let dir = self.directory(DEBUG_DIRECTORY);
        if dir.is_empty() {
            return Ok(Vec::new());
        }
        let bytes = self.slice_at_rva(dir.rva, dir.size, "debug directory")?;
        let mut r = ByteReader::new(bytes, "debug directory");
        let mut entries = Vec::with_capacity(bytes.len() / DEBUG_ENTRY_SIZE);
        while r.remaining() >= DEBUG_ENTRY_SIZE {
            let _characteristics = r.u32()?;
            let _timestamp = r.u32()?;
            let major_version = r.u16()?;
            let minor_version = r.u16()?;
            let kind = r.u32()?;
            let size_of_data = r.u32()?;
            let address_of_raw_data = r.u32()?;
            let pointer_to_raw_data = r.u32()?;
            entries.push(DebugEntry {
                kind,
                major_version,
                minor_version,
                size_of_data,
                address_of_raw_data,
                pointer_to_raw_data,
            });
        }
        Ok(entries)
    }

    /// Borrow the data of a debug entry
    pub fn debug_data(&self, entry: &DebugEntry) -> SymbolResult<&'a [u8]> {
        if entry.pointer_to_raw_data != 0 {
            let mut r = ByteReader::at(self.data, entry.pointer_to_raw_data as usize, "debug data")?;
            return r.bytes(entry.size_of_data as usize);
        }
        self.slice_at_rva(entry.address_of_raw_data, entry.size_of_data, "debug data")
    }

    /// Decode the first CodeView entry, if any
    pub fn codeview(&self) -> SymbolResult<Option<CodeViewInfo>> {
        for entry in self.debug_entries()? {
            if entry.kind != DEBUG_TYPE_CODEVIEW {
                continue;
            }
            let data = self.debug_data(&entry)?;
            let mut r = ByteReader::new(data, "CodeView entry");
            if r.bytes(4)? != CODEVIEW_SIGNATURE {
                continue;
            }
            let mut guid = [0u8; 16];
            guid.copy_from_slice(r.bytes(16)?);
            let age = r.u32()?;
            let path = r.cstr()?.to_string();
            return Ok(Some(CodeViewInfo { guid, age, path }));
        }
        Ok(None)
    }

    /// Borrow the compressed payload of an embedded Portable PDB entry, if any
    pub fn embedded_pdb(&self) -> SymbolResult<Option<&'a [u8]>> {
        for entry in self.debug_entries()? {
            if entry.kind == DEBUG_TYPE_EMBEDDED_PORTABLE_PDB {
                return self.debug_data(&entry).map(Some);
            }
        }
        Ok(None)
    }
}
