//! # Archive Path Allocation
//!
//! Titles are free text, archive entry names are not. Every node gets a
//! directory inside the archive built from its ancestors' directories, a kind
//! token and a sanitized form of its title:
//!
//! ```text
//! branch_Root/
//! ├── note_Draft/Draft.md
//! ├── note_Draft_(1)/Draft_(1).md
//! └── branch_Ideas/
//!     └── note_untitled/untitled.md
//! ```
//!
//! Two titles that sanitize to the same token get distinct directories: the
//! [`PathAllocator`] remembers every directory handed out during one export and
//! appends `_(1)`, `_(2)`, ... until the candidate is free.

use std::collections::HashSet;
use tracing::debug;

/// Name used when a title sanitizes to nothing.
pub const PLACEHOLDER_NAME: &str = "untitled";

/// Directory token that distinguishes branch directories from note directories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    Branch,
    Note,
}

impl EntryKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            EntryKind::Branch => "branch_",
            EntryKind::Note => "note_",
        }
    }
}

/// Builds the directory of a node below `parent_dir` (empty for the root).
pub fn node_dir(parent_dir: &str, kind: EntryKind, filename: &str) -> String {
    if parent_dir.is_empty() {
        format!("{}{}", kind.prefix(), filename)
    } else {
        format!("{}/{}{}", parent_dir, kind.prefix(), filename)
    }
}

/// Path of the body entry of a note living in `dir`.
pub fn body_path(dir: &str, filename: &str, body_ext: &str) -> String {
    format!("{}/{}{}", dir, filename, body_ext)
}

/// Path of an attachment entry of a note living in `dir`.
pub fn attachment_path(dir: &str, name: &str) -> String {
    format!("{}/{}", dir, name)
}

/// Checks that an attachment name maps to exactly one archive entry.
///
/// Names are stored verbatim below the note directory and may contain `/`
/// to nest, but every segment must be a plain name: container formats
/// rewrite empty, `.` and `..` segments, and the entry would no longer be
/// found under the name recorded in the manifest.
pub fn validate_attachment_name(name: &str) -> Result<(), &'static str> {
    if name.is_empty() {
        return Err("name is empty");
    }
    if name.starts_with('/') {
        return Err("starts with '/'");
    }
    if name.contains('\0') {
        return Err("contains a NUL character");
    }
    for segment in name.split('/') {
        match segment {
            "" => return Err("contains an empty segment"),
            "." => return Err("contains a '.' segment"),
            ".." => return Err("contains a '..' segment"),
            _ => {}
        }
    }
    Ok(())
}

/// Turns arbitrary text into a token that is safe as an archive path segment.
///
/// Keeps alphanumerics, space, `-` and `_`; everything else (including `/` and
/// `.`) becomes `_`. The result is cut to `max_len` chars and trimmed. Applying
/// it to its own output returns the output unchanged.
pub fn sanitize_filename(name: &str, max_len: usize) -> String {
    let cleaned = name
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == ' ' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .take(max_len.max(1))
        .collect::<String>();

    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        PLACEHOLDER_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}

/// A directory handed out by the allocator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    /// Full archive-relative directory, e.g. `branch_Root/note_Draft_(1)`
    pub dir: String,
    /// Collision-resolved segment, e.g. `Draft_(1)`; recorded in the manifest
    pub filename: String,
}

/// Hands out unique archive directories for one export.
///
/// Owned by a single export call; it is never shared or reused.
#[derive(Debug)]
pub struct PathAllocator {
    used: HashSet<String>,
    max_name_len: usize,
}

impl PathAllocator {
    pub fn new(max_name_len: usize) -> Self {
        Self {
            used: HashSet::new(),
            max_name_len: max_name_len.max(1),
        }
    }

    pub fn allocate(&mut self, parent_dir: &str, kind: EntryKind, raw_name: &str) -> Allocation {
        let base = sanitize_filename(raw_name, self.max_name_len);
        let mut filename = base.clone();
        let mut dir = node_dir(parent_dir, kind, &filename);

        let mut counter = 1u64;
        while self.used.contains(&dir) {
            filename = format!("{}_({})", base, counter);
            dir = node_dir(parent_dir, kind, &filename);
            counter += 1;
        }
        if counter > 1 {
            debug!(%dir, collisions = counter - 1, "Resolved path collision");
        } else {
            debug!(%dir, "Allocated path");
        }

        self.used.insert(dir.clone());
        Allocation { dir, filename }
    }

    pub fn is_allocated(&self, dir: &str) -> bool {
        self.used.contains(dir)
    }

    pub fn len(&self) -> usize {
        self.used.len()
    }

    pub fn is_empty(&self) -> bool {
        self.used.is_empty()
    }
}
