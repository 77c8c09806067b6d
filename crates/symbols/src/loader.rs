//! Locating and loading an assembly's symbols
//!
//! Symbols are searched in this order:
//!
//! 1. An explicit symbol file, when one was configured
//! 2. A Portable PDB embedded in the assembly's debug directory
//! 3. `<assembly>.pdb` next to the assembly
//! 4. The path recorded in the CodeView debug entry, then its file name
//!    next to the assembly
//!
//! Windows (MSF) PDBs are recognized and rejected.

use crate::assembly::read_index;
use crate::error::{SymbolError, SymbolResult};
use crate::format::pdb::{inflate_embedded, PORTABLE_PDB_SIGNATURE, WINDOWS_PDB_SIGNATURE};
use crate::format::PeImage;
use crate::index::TypeIndex;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Source of a [`TypeIndex`]
///
/// Implemented by [`AssemblyFile`] for real assemblies; tests substitute
/// in-memory loaders.
pub trait IndexLoader: Send + Sync {
    /// Human-readable name of what is loaded (usually a path)
    fn describe(&self) -> String;

    /// Build the index
    fn load(&self) -> SymbolResult<TypeIndex>;
}

/// An assembly on disk, with optional explicit symbols
#[derive(Debug, Clone)]
pub struct AssemblyFile {
    path: PathBuf,
    symbols: Option<PathBuf>,
}

impl AssemblyFile {
    /// Assembly at `path`, symbols discovered automatically
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            symbols: None,
        }
    }

    /// Use this symbol file instead of searching
    pub fn with_symbols(mut self, symbols: impl Into<PathBuf>) -> Self {
        self.symbols = Some(symbols.into());
        self
    }

    /// Assembly path
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn locate_symbols(&self, image: &PeImage<'_>) -> SymbolResult<(PathBuf, FileData)> {
        if let Some(explicit) = &self.symbols {
            return Ok((explicit.clone(), FileData::map(explicit)?));
        }

        if let Some(payload) = image.embedded_pdb()? {
            debug!(path = %self.path.display(), "Using embedded Portable PDB");
            return Ok((self.path.clone(), FileData::Owned(inflate_embedded(payload)?)));
        }

        let companion = self.path.with_extension("pdb");
        if companion.is_file() {
            return Ok((companion.clone(), FileData::map(&companion)?));
        }

        if let Some(codeview) = image.codeview()? {
            let recorded = PathBuf::from(codeview.path.replace('\\', "/"));
            let mut candidates = vec![recorded.clone()];
            if let (Some(name), Some(dir)) = (recorded.file_name(), self.path.parent()) {
                candidates.push(dir.join(name));
            }
            for candidate in candidates {
                if candidate.is_file() {
                    return Ok((candidate.clone(), FileData::map(&candidate)?));
                }
            }
            debug!(recorded = %codeview.path, "CodeView PDB path not found");
        }

        Err(SymbolError::MissingSymbols(self.path.clone()))
    }
}

impl IndexLoader for AssemblyFile {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn load(&self) -> SymbolResult<TypeIndex> {
        let assembly = FileData::map(&self.path)?;
        let image = PeImage::parse(assembly.as_bytes())?;
        let metadata = image.metadata()?;

        let (symbols_path, symbols) = self.locate_symbols(&image)?;
        let bytes = symbols.as_bytes();
        if bytes.starts_with(WINDOWS_PDB_SIGNATURE) {
            return Err(SymbolError::UnsupportedSymbols(symbols_path));
        }
        if !bytes.starts_with(PORTABLE_PDB_SIGNATURE) {
            return Err(SymbolError::malformed(format!(
                "'{}' is not a Portable PDB",
                symbols_path.display()
            )));
        }

        let index = read_index(metadata, bytes)?;
        info!(
            path = %self.path.display(),
            symbols = %symbols_path.display(),
            types = index.len(),
            "Indexed assembly"
        );
        Ok(index)
    }
}

/// Bytes of a file, mapped or decompressed
enum FileData {
    /// Decompressed in memory
    Owned(Vec<u8>),
    /// Memory-mapped file
    Mmap(memmap2::Mmap),
}

impl FileData {
    fn map(path: &Path) -> SymbolResult<Self> {
        let file = File::open(path)?;
        if file.metadata()?.len() == 0 {
            return Err(SymbolError::malformed(format!("'{}' is empty", path.display())));
        }
        let mmap = unsafe { memmap2::Mmap::map(&file)? };
        Ok(FileData::Mmap(mmap))
    }

    fn as_bytes(&self) -> &[u8] {
        match self {
            FileData::Owned(v) => v,
            FileData::Mmap(m) => m,
        }
    }
}
