//! # Archive Access Layer
//!
//! The codec never touches the container format directly. It reads and writes
//! named entries through [`EntryReader`] and [`EntryWriter`], so the tree walk
//! can be tested against memory and shipped against a compressed file.
//!
//! ## Implementations
//!
//! - [`tar_gz::TarGzWriter`] / [`tar_gz::TarGzReader`]: tar archive compressed
//!   with gzip. The writer buffers every entry and only produces bytes on
//!   `finish`; the reader loads the whole archive when it is opened.
//! - [`memory::MemArchive`]: map-backed archive for tests and in-process use.
//!
//! ## Entry Names
//!
//! Entries are addressed by slash-separated, case-sensitive path strings.
//! There are no directory objects: a directory is just a shared prefix.
//!
//! ## Absent vs Empty
//!
//! [`EntryReader::find_entry`] reports absence as `None`, keeping it apart from
//! an entry that exists with zero bytes. [`EntryReader::read_entry`] folds both
//! into an empty payload for callers that do not care.

use crate::error::{BundleError, Result};

pub mod memory;
pub mod tar_gz;

pub use memory::MemArchive;
pub use tar_gz::{TarGzReader, TarGzWriter};

/// Read side of an archive.
pub trait EntryReader {
    /// Raw bytes of an entry, or `None` if the archive has no such entry.
    fn find_entry(&self, path: &str) -> Result<Option<Vec<u8>>>;

    /// Names of all entries, in archive order.
    fn entry_names(&self) -> Vec<String>;

    /// Raw bytes of an entry; an absent entry reads as empty.
    fn read_entry(&self, path: &str) -> Result<Vec<u8>> {
        Ok(self.find_entry(path)?.unwrap_or_default())
    }

    /// An entry decoded as UTF-8; an absent entry reads as empty.
    fn read_entry_text(&self, path: &str) -> Result<String> {
        decode_text(path, self.read_entry(path)?)
    }

    fn contains_entry(&self, path: &str) -> Result<bool> {
        Ok(self.find_entry(path)?.is_some())
    }
}

/// Write side of an archive. Writing an existing path replaces its payload.
pub trait EntryWriter {
    fn write_entry(&mut self, path: &str, data: &[u8]) -> Result<()>;

    fn write_entry_text(&mut self, path: &str, text: &str) -> Result<()> {
        self.write_entry(path, text.as_bytes())
    }
}

pub(crate) fn decode_text(path: &str, data: Vec<u8>) -> Result<String> {
    String::from_utf8(data).map_err(|source| BundleError::Encoding {
        path: path.to_string(),
        source,
    })
}
