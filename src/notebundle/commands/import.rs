use crate::archive::{decode_text, EntryReader};
use crate::config::BundleConfig;
use crate::error::{BundleError, Result};
use crate::manifest::{self, ManifestRecord, MANIFEST_PATH};
use crate::model::{Attachment, DocumentNode, Note, NodeKind};
use crate::paths::{attachment_path, body_path, node_dir, validate_attachment_name, EntryKind};
use tracing::{info, trace, warn};

/// Rebuilds the tree described by the archive's manifest.
///
/// Every entry the manifest points at must exist; an absent body or
/// attachment is a [`BundleError::MissingEntry`], an empty one is just empty.
pub fn run<R: EntryReader>(reader: &R, config: &BundleConfig) -> Result<DocumentNode> {
    let manifest_bytes = reader.find_entry(MANIFEST_PATH)?.ok_or_else(|| {
        BundleError::InvalidFormat(format!("archive has no {}", MANIFEST_PATH))
    })?;
    let manifest_text = decode_text(MANIFEST_PATH, manifest_bytes)?;
    if manifest_text.trim().is_empty() {
        return Err(BundleError::InvalidFormat(format!(
            "{} is empty",
            MANIFEST_PATH
        )));
    }

    let record = manifest::decode(&manifest_text)?;
    info!(title = %record.title, "Import started");

    let root = read_node(reader, "", &record, &config.body_ext)?;
    info!(title = %root.title, "Import finished");
    Ok(root)
}

fn read_node<R: EntryReader>(
    reader: &R,
    parent_dir: &str,
    record: &ManifestRecord,
    body_ext: &str,
) -> Result<DocumentNode> {
    match &record.children {
        Some(children) => {
            let dir = node_dir(parent_dir, EntryKind::Branch, &record.filename);
            let nodes = children
                .iter()
                .map(|child| read_node(reader, &dir, child, body_ext))
                .collect::<Result<Vec<_>>>()?;
            Ok(DocumentNode {
                title: record.title.clone(),
                kind: NodeKind::Branch(nodes),
            })
        }
        None => {
            let dir = node_dir(parent_dir, EntryKind::Note, &record.filename);
            let body = body_path(&dir, &record.filename, body_ext);
            let content = decode_text(&body, read_required(reader, &body)?)?;

            let mut note = Note::new(content).with_status(record.status_or_default());
            for name in record.attachment_names() {
                validate_attachment_name(name).map_err(|reason| {
                    BundleError::malformed(format!(
                        "attachment {:?} of {:?}: {}",
                        name, record.title, reason
                    ))
                })?;
                if note.attachment(name).is_some() {
                    warn!(note = %record.title, attachment = name, "Attachment listed twice");
                }
                let path = attachment_path(&dir, name);
                note.add_attachment(Attachment::new(name, read_required(reader, &path)?));
            }

            Ok(DocumentNode::note(record.title.clone(), note))
        }
    }
}

fn read_required<R: EntryReader>(reader: &R, path: &str) -> Result<Vec<u8>> {
    let data = reader
        .find_entry(path)?
        .ok_or_else(|| BundleError::missing_entry(path))?;
    trace!(path, bytes = data.len(), "Read entry");
    Ok(data)
}
