use super::memory::MemArchive;
use super::{EntryReader, EntryWriter};
use crate::error::{BundleError, Result};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::Path;
use tar::{Archive, Builder, EntryType, Header};
use tracing::trace;

/// Buffers entries and writes them out as a tar.gz stream on [`finish`](Self::finish).
///
/// Nothing reaches the sink before `finish`; dropping the writer discards
/// every buffered entry.
pub struct TarGzWriter<W: Write> {
    sink: W,
    compression: Compression,
    entries: MemArchive,
}

impl<W: Write> TarGzWriter<W> {
    pub fn new(sink: W, compression: Compression) -> Self {
        Self {
            sink,
            compression,
            entries: MemArchive::new(),
        }
    }

    /// Number of entries buffered so far.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Writes the archive and hands back the sink.
    ///
    /// Entries keep the order of their first write. Headers carry a zero mtime
    /// so the same entries always produce the same bytes.
    pub fn finish(self) -> Result<W> {
        let encoder = GzEncoder::new(self.sink, self.compression);
        let mut builder = Builder::new(encoder);

        for (path, data) in self.entries.iter() {
            let mut header = Header::new_gnu();
            header.set_entry_type(EntryType::Regular);
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_mtime(0);

            builder
                .append_data(&mut header, path, data)
                .map_err(|e| BundleError::archive(format!("append '{}': {}", path, e)))?;
            trace!(path, bytes = data.len(), "Wrote entry");
        }

        let encoder = builder
            .into_inner()
            .map_err(|e| BundleError::archive(format!("tar finish: {}", e)))?;
        let mut sink = encoder
            .finish()
            .map_err(|e| BundleError::archive(format!("gzip finish: {}", e)))?;
        sink.flush()?;
        Ok(sink)
    }
}

impl<W: Write> EntryWriter for TarGzWriter<W> {
    fn write_entry(&mut self, path: &str, data: &[u8]) -> Result<()> {
        self.entries.write_entry(path, data)
    }
}

/// A tar.gz archive loaded fully into memory.
///
/// The source is consumed and released while opening; later reads never
/// touch it again.
#[derive(Debug)]
pub struct TarGzReader {
    entries: MemArchive,
}

impl TarGzReader {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn from_reader<R: Read>(source: R) -> Result<Self> {
        let mut archive = Archive::new(GzDecoder::new(source));
        let mut entries = MemArchive::new();

        for entry in archive
            .entries()
            .map_err(|e| BundleError::archive(e.to_string()))?
        {
            let mut entry = entry.map_err(|e| BundleError::archive(e.to_string()))?;
            if !entry.header().entry_type().is_file() {
                continue;
            }

            let raw_path = entry.path_bytes().into_owned();
            let path = String::from_utf8(raw_path).map_err(|source| BundleError::Encoding {
                path: String::from_utf8_lossy(source.as_bytes()).into_owned(),
                source,
            })?;

            let mut data = Vec::new();
            entry
                .read_to_end(&mut data)
                .map_err(|e| BundleError::archive(format!("read {}: {}", path, e)))?;
            trace!(path = %path, bytes = data.len(), "Read entry");

            // A repeated name overrides the earlier copy
            entries.write_entry(&path, &data)?;
        }

        Ok(Self { entries })
    }
}

impl EntryReader for TarGzReader {
    fn find_entry(&self, path: &str) -> Result<Option<Vec<u8>>> {
        self.entries.find_entry(path)
    }

    fn entry_names(&self) -> Vec<String> {
        self.entries.entry_names()
    }
}
