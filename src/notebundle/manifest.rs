//! # Manifest
//!
//! The manifest (`index.json`) describes the whole tree: one record per node,
//! nested the same way the nodes are. It is the only place that knows which
//! archive directory belongs to which node.
//!
//! ```json
//! {
//!   "title": "Root",
//!   "filename": "Root",
//!   "children": [
//!     { "title": "Draft", "filename": "Draft", "status": 0 },
//!     {
//!       "title": "Draft",
//!       "filename": "Draft_(1)",
//!       "status": 1,
//!       "attachments": [{ "name": "img.png" }]
//!     }
//!   ]
//! }
//! ```
//!
//! A record with a `children` array is a branch, even when the array is empty.
//! A record without one is a note.
//!
//! Trees are limited to [`MAX_TREE_DEPTH`] levels. Export refuses deeper trees
//! and decode refuses manifests nested deeper than such a tree can be.

use crate::error::{BundleError, Result};
use crate::model::NoteStatus;
use serde::{Deserialize, Serialize};

/// Reserved archive path of the manifest.
pub const MANIFEST_PATH: &str = "index.json";

/// Deepest tree a bundle may hold; a lone root is one level.
pub const MAX_TREE_DEPTH: usize = 100;

/// JSON nesting of a note with attachments at [`MAX_TREE_DEPTH`]: two levels
/// per tree level (record object, then its `children` array) plus the
/// `attachments` array and one attachment object.
const MAX_JSON_NESTING: usize = 2 * MAX_TREE_DEPTH + 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentRef {
    pub name: String,
}

/// Serialized counterpart of one tree node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestRecord {
    pub title: String,

    /// Collision-resolved name chosen at export time
    pub filename: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<NoteStatus>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<ManifestRecord>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<AttachmentRef>>,
}

impl ManifestRecord {
    pub fn branch(title: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            filename: filename.into(),
            status: None,
            children: Some(Vec::new()),
            attachments: None,
        }
    }

    pub fn note(
        title: impl Into<String>,
        filename: impl Into<String>,
        status: NoteStatus,
    ) -> Self {
        Self {
            title: title.into(),
            filename: filename.into(),
            status: Some(status),
            children: None,
            attachments: None,
        }
    }

    pub fn is_branch(&self) -> bool {
        self.children.is_some()
    }

    pub fn status_or_default(&self) -> NoteStatus {
        self.status.unwrap_or(NoteStatus::NORMAL)
    }

    /// Levels in the record tree, counted the same way as
    /// [`DocumentNode::depth`](crate::model::DocumentNode::depth).
    pub fn depth(&self) -> usize {
        let mut max = 0;
        let mut pending = vec![(self, 1usize)];
        while let Some((record, level)) = pending.pop() {
            max = max.max(level);
            for child in record.children.iter().flatten() {
                pending.push((child, level + 1));
            }
        }
        max
    }

    pub fn attachment_names(&self) -> impl Iterator<Item = &str> {
        self.attachments
            .iter()
            .flatten()
            .map(|a| a.name.as_str())
    }
}

pub fn encode(root: &ManifestRecord) -> Result<String> {
    serde_json::to_string_pretty(root).map_err(|e| BundleError::malformed(e.to_string()))
}

/// Parses manifest text. Notes without a status come back as
/// [`NoteStatus::NORMAL`]; other optional fields stay absent.
///
/// serde_json's own recursion limit is off so every tree export accepts can be
/// read back; nesting is bounded by a scan before parsing instead.
pub fn decode(text: &str) -> Result<ManifestRecord> {
    let nesting = json_nesting(text);
    if nesting > MAX_JSON_NESTING {
        return Err(BundleError::malformed(format!(
            "nested {} levels deep, the limit is {}",
            nesting, MAX_JSON_NESTING
        )));
    }

    let mut de = serde_json::Deserializer::from_str(text);
    de.disable_recursion_limit();
    let mut root =
        ManifestRecord::deserialize(&mut de).map_err(|e| BundleError::malformed(e.to_string()))?;
    de.end().map_err(|e| BundleError::malformed(e.to_string()))?;

    let depth = root.depth();
    if depth > MAX_TREE_DEPTH {
        return Err(BundleError::malformed(format!(
            "tree is {} levels deep, the limit is {}",
            depth, MAX_TREE_DEPTH
        )));
    }

    fill_default_status(&mut root);
    Ok(root)
}

/// Deepest bracket nesting in `text`, ignoring brackets inside strings.
fn json_nesting(text: &str) -> usize {
    let mut depth = 0usize;
    let mut max = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for byte in text.bytes() {
        if in_string {
            match byte {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' | b'[' => {
                depth += 1;
                max = max.max(depth);
            }
            b'}' | b']' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    max
}

fn fill_default_status(record: &mut ManifestRecord) {
    match record.children.as_mut() {
        Some(children) => children.iter_mut().for_each(fill_default_status),
        None => {
            record.status.get_or_insert(NoteStatus::NORMAL);
        }
    }
}
