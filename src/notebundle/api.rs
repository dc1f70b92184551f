//! # API Facade
//!
//! Entry points for hosts that hold a document tree and want it on disk (or in
//! a byte stream) and back. Each call owns its archive for its whole duration:
//!
//! - the container is opened at the start of the call
//! - the tree walk in [`commands`] reads or writes entries through the
//!   archive traits
//! - the container is finished and released before the call returns, on
//!   success and on failure alike
//!
//! File exports go through a temporary sibling file that is renamed into place
//! only once the archive is complete, so a failed export never leaves a file
//! that looks like a finished bundle.

use crate::archive::{TarGzReader, TarGzWriter};
use crate::commands::{self, ExportReport};
use crate::config::BundleConfig;
use crate::error::{BundleError, Result};
use crate::model::DocumentNode;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A document format a host application can export to.
pub trait ExportStrategy {
    fn export(&self, path: &Path, root: &DocumentNode) -> Result<ExportReport>;
}

/// The tar.gz + `index.json` format.
#[derive(Debug, Clone, Default)]
pub struct IndexedArchive {
    config: BundleConfig,
}

impl IndexedArchive {
    pub fn new(config: BundleConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BundleConfig {
        &self.config
    }

    pub fn import(&self, path: &Path) -> Result<DocumentNode> {
        import_file(path, &self.config)
    }
}

impl ExportStrategy for IndexedArchive {
    fn export(&self, path: &Path, root: &DocumentNode) -> Result<ExportReport> {
        export_file(path, root, &self.config)
    }
}

/// Exports `root` as a complete archive into `sink` and hands the sink back.
pub fn export_to_writer<W: Write>(
    sink: W,
    root: &DocumentNode,
    config: &BundleConfig,
) -> Result<(W, ExportReport)> {
    let mut writer = TarGzWriter::new(sink, config.compression());
    let report = commands::export::run(&mut writer, root, config)?;
    let sink = writer.finish()?;
    Ok((sink, report))
}

pub fn import_from_reader<R: Read>(source: R, config: &BundleConfig) -> Result<DocumentNode> {
    let reader = TarGzReader::from_reader(source)?;
    commands::import::run(&reader, config)
}

/// Exports `root` to `path`, replacing any existing file only on success.
pub fn export_file(path: &Path, root: &DocumentNode, config: &BundleConfig) -> Result<ExportReport> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }

    let temp_path = temp_path_for(path);
    match write_archive_file(&temp_path, root, config) {
        Ok((report, archive_bytes)) => {
            if let Err(e) = fs::rename(&temp_path, path) {
                let _ = fs::remove_file(&temp_path);
                return Err(e.into());
            }
            debug!(path = %path.display(), archive_bytes, "Archive written");
            Ok(ExportReport {
                path: Some(path.to_path_buf()),
                archive_bytes: Some(archive_bytes),
                ..report
            })
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Export failed, discarding partial archive");
            let _ = fs::remove_file(&temp_path);
            Err(e)
        }
    }
}

pub fn import_file(path: &Path, config: &BundleConfig) -> Result<DocumentNode> {
    let reader = TarGzReader::open(path)?;
    debug!(path = %path.display(), "Archive opened");
    commands::import::run(&reader, config)
}

/// Writes and syncs the complete archive at `path`, returning its size.
fn write_archive_file(
    path: &Path,
    root: &DocumentNode,
    config: &BundleConfig,
) -> Result<(ExportReport, u64)> {
    let file = File::create(path)?;
    let (buffered, report) = export_to_writer(BufWriter::new(file), root, config)?;
    let file = buffered
        .into_inner()
        .map_err(|e| BundleError::Io(e.into_error()))?;
    file.sync_all()?;
    let archive_bytes = file.metadata()?.len();
    Ok((report, archive_bytes))
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Note;
    use tempfile::TempDir;

    fn sample() -> DocumentNode {
        DocumentNode::branch("Root")
            .with_child(DocumentNode::note("Draft", Note::new("a")))
            .with_child(DocumentNode::note("Draft", Note::new("b")))
    }

    #[test]
    fn test_export_file_reports_path_and_size() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out").join("doc.tar.gz");

        let report = export_file(&path, &sample(), &BundleConfig::default()).unwrap();

        assert_eq!(report.path.as_deref(), Some(path.as_path()));
        assert_eq!(report.archive_bytes, Some(fs::metadata(&path).unwrap().len()));
        assert_eq!(report.notes, 2);
        assert!(!temp_path_for(&path).exists());
    }

    #[test]
    fn test_archive_size_is_taken_from_the_temp_file() {
        let dir = TempDir::new().unwrap();
        let temp = dir.path().join("doc.tar.gz.tmp");

        let (report, archive_bytes) =
            write_archive_file(&temp, &sample(), &BundleConfig::default()).unwrap();
        assert_eq!(archive_bytes, fs::metadata(&temp).unwrap().len());
        assert_eq!(report.path, None);

        // The rename does not change the size, so it is the reported one
        let path = dir.path().join("doc.tar.gz");
        let report = export_file(&path, &sample(), &BundleConfig::default()).unwrap();
        assert_eq!(report.archive_bytes, Some(archive_bytes));
    }

    #[test]
    fn test_rejected_tree_leaves_nothing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("doc.tar.gz");
        let note = Note::new("").with_attachment(crate::model::Attachment::new("./a", vec![1]));
        let root = DocumentNode::branch("Root").with_child(DocumentNode::note("n", note));

        let err = export_file(&path, &root, &BundleConfig::default()).unwrap_err();
        assert!(matches!(err, BundleError::InvalidAttachmentName { .. }));
        assert!(!path.exists());
        assert!(!temp_path_for(&path).exists());
    }

    #[test]
    fn test_export_file_failure_leaves_nothing() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "a file, not a directory").unwrap();
        let path = blocker.join("doc.tar.gz");

        let err = export_file(&path, &sample(), &BundleConfig::default()).unwrap_err();
        assert!(err.is_archive_failure());
        assert!(!path.exists());
    }

    #[test]
    fn test_import_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let err = import_file(&dir.path().join("nope.tar.gz"), &BundleConfig::default())
            .unwrap_err();
        assert!(matches!(err, BundleError::Io(_)));
    }

    #[test]
    fn test_strategy_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("doc.tar.gz");
        let format = IndexedArchive::default();

        let strategy: &dyn ExportStrategy = &format;
        strategy.export(&path, &sample()).unwrap();

        assert_eq!(format.import(&path).unwrap(), sample());
    }

    #[test]
    fn test_stream_roundtrip() {
        let config = BundleConfig::default();
        let (bytes, report) = export_to_writer(Vec::new(), &sample(), &config).unwrap();
        assert_eq!(report.path, None);

        let root = import_from_reader(bytes.as_slice(), &config).unwrap();
        assert_eq!(root, sample());
    }

    #[test]
    fn test_import_plain_tar_gz_without_manifest() {
        let mut writer = TarGzWriter::new(Vec::new(), flate2::Compression::default());
        crate::archive::EntryWriter::write_entry_text(&mut writer, "readme.txt", "hi").unwrap();
        let bytes = writer.finish().unwrap();

        let err = import_from_reader(bytes.as_slice(), &BundleConfig::default()).unwrap_err();
        assert!(matches!(err, BundleError::InvalidFormat(_)));
    }
}
