//! Archive capabilities used by the ORA codec
//!
//! The importer and exporter only need named-entry reads and sequential
//! entry writes, so they are written against these traits. The zip crate
//! provides the on-disk implementation.

use super::types::ArchiveError;
use std::io::{Read, Seek, Write};
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Upper bound on the read buffer reserved from an entry's declared size
const MAX_PREALLOC: u64 = 64 << 20;

/// How an entry's bytes are stored in the archive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryCompression {
    Stored,
    Deflated,
}

impl EntryCompression {
    fn method(self) -> CompressionMethod {
        match self {
            EntryCompression::Stored => CompressionMethod::Stored,
            EntryCompression::Deflated => CompressionMethod::Deflated,
        }
    }
}

/// Read access to named archive entries
pub trait ArchiveReader {
    /// Names of all entries, in archive order
    fn entry_names(&self) -> Vec<String>;

    /// Read a whole entry into memory
    fn read_entry(&mut self, name: &str) -> Result<Vec<u8>, ArchiveError>;

    fn contains(&self, name: &str) -> bool {
        self.entry_names().iter().any(|n| n == name)
    }
}

/// Sequential write access to a new archive
pub trait ArchiveWriter {
    fn write_entry(
        &mut self,
        name: &str,
        data: &[u8],
        compression: EntryCompression,
    ) -> Result<(), ArchiveError>;

    /// Write the central directory and release the underlying stream
    fn close(self) -> Result<(), ArchiveError>
    where
        Self: Sized;
}

impl<R: Read + Seek> ArchiveReader for ZipArchive<R> {
    fn entry_names(&self) -> Vec<String> {
        self.file_names().map(str::to_string).collect()
    }

    fn read_entry(&mut self, name: &str) -> Result<Vec<u8>, ArchiveError> {
        let mut entry = match self.by_name(name) {
            Ok(entry) => entry,
            Err(ZipError::FileNotFound) => {
                return Err(ArchiveError::EntryNotFound(name.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        // The declared size comes from the archive header and may be bogus
        let mut data = Vec::with_capacity(entry.size().min(MAX_PREALLOC) as usize);
        entry.read_to_end(&mut data)?;
        Ok(data)
    }

    fn contains(&self, name: &str) -> bool {
        self.index_for_name(name).is_some()
    }
}

impl<W: Write + Seek> ArchiveWriter for ZipWriter<W> {
    fn write_entry(
        &mut self,
        name: &str,
        data: &[u8],
        compression: EntryCompression,
    ) -> Result<(), ArchiveError> {
        let options = SimpleFileOptions::default()
            .compression_method(compression.method())
            .unix_permissions(0o644);
        self.start_file(name, options)?;
        self.write_all(data)?;
        Ok(())
    }

    fn close(self) -> Result<(), ArchiveError> {
        let mut inner = self.finish()?;
        inner.flush()?;
        Ok(())
    }
}
