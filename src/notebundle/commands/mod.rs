//! The two tree walks: [`export`] turns a [`DocumentNode`](crate::model::DocumentNode)
//! into archive entries plus a manifest, [`import`] does the reverse.
//!
//! Both work against the archive traits only and never open or close a
//! container themselves; that is the job of [`crate::api`].

use std::path::PathBuf;

pub mod export;
pub mod import;

/// Summary of one export.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExportReport {
    pub branches: usize,
    pub notes: usize,
    pub attachments: usize,
    /// Entries written, manifest included
    pub entries: usize,
    /// Set for exports to a file
    pub path: Option<PathBuf>,
    /// Final archive size, for exports to a file
    pub archive_bytes: Option<u64>,
}
