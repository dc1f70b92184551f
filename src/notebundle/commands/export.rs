use crate::archive::EntryWriter;
use crate::config::BundleConfig;
use crate::error::{BundleError, Result};
use crate::manifest::{self, AttachmentRef, ManifestRecord, MANIFEST_PATH, MAX_TREE_DEPTH};
use crate::model::{DocumentNode, Note, NodeKind};
use crate::paths::{
    attachment_path, body_path, validate_attachment_name, EntryKind, PathAllocator,
};
use std::collections::HashSet;
use tracing::{info, trace};

use super::ExportReport;

/// Writes every node of `root` into `writer`, then the manifest.
///
/// The path allocator lives for this call only, so exporting the same tree
/// into a fresh archive always yields the same layout.
///
/// Fails before writing anything if the tree is deeper than
/// [`MAX_TREE_DEPTH`]. Fails mid-walk if an attachment name is not a plain
/// relative path, or if an attachment would land on the note's own body.
pub fn run<W: EntryWriter>(
    writer: &mut W,
    root: &DocumentNode,
    config: &BundleConfig,
) -> Result<ExportReport> {
    let depth = root.depth();
    if depth > MAX_TREE_DEPTH {
        return Err(BundleError::TooDeep {
            depth,
            max: MAX_TREE_DEPTH,
        });
    }
    info!(title = %root.title, depth, "Export started");

    let mut walk = TreeWalk {
        writer,
        allocator: PathAllocator::new(config.max_name_len()),
        written: HashSet::new(),
        body_ext: &config.body_ext,
        report: ExportReport::default(),
    };

    let record = walk.visit("", root)?;
    let manifest_text = manifest::encode(&record)?;
    walk.store(MANIFEST_PATH.to_string(), manifest_text.as_bytes())?;

    let report = walk.report;
    info!(
        branches = report.branches,
        notes = report.notes,
        attachments = report.attachments,
        entries = report.entries,
        "Export finished"
    );
    Ok(report)
}

struct TreeWalk<'a, W: EntryWriter> {
    writer: &'a mut W,
    allocator: PathAllocator,
    /// Every entry path written so far
    written: HashSet<String>,
    body_ext: &'a str,
    report: ExportReport,
}

impl<W: EntryWriter> TreeWalk<'_, W> {
    fn visit(&mut self, parent_dir: &str, node: &DocumentNode) -> Result<ManifestRecord> {
        match &node.kind {
            NodeKind::Branch(children) => {
                let slot = self
                    .allocator
                    .allocate(parent_dir, EntryKind::Branch, &node.title);
                self.report.branches += 1;

                let mut records = Vec::with_capacity(children.len());
                for child in children {
                    records.push(self.visit(&slot.dir, child)?);
                }

                let mut record = ManifestRecord::branch(node.title.clone(), slot.filename);
                record.children = Some(records);
                Ok(record)
            }
            NodeKind::Note(note) => {
                let slot = self
                    .allocator
                    .allocate(parent_dir, EntryKind::Note, &node.title);
                self.report.notes += 1;

                let mut record =
                    ManifestRecord::note(node.title.clone(), slot.filename.clone(), note.status);
                record.attachments =
                    Some(self.write_note(&node.title, &slot.dir, &slot.filename, note)?);
                Ok(record)
            }
        }
    }

    fn write_note(
        &mut self,
        title: &str,
        dir: &str,
        filename: &str,
        note: &Note,
    ) -> Result<Vec<AttachmentRef>> {
        let body = body_path(dir, filename, self.body_ext);
        self.store(body.clone(), note.content.as_bytes())?;
        trace!(path = %body, "Stored note body");

        let mut refs = Vec::with_capacity(note.attachments().len());
        for attachment in note.attachments() {
            validate_attachment_name(&attachment.name).map_err(|reason| {
                BundleError::InvalidAttachmentName {
                    note: title.to_string(),
                    name: attachment.name.clone(),
                    reason,
                }
            })?;

            let path = attachment_path(dir, &attachment.name);
            self.store(path.clone(), &attachment.data)?;
            self.report.attachments += 1;
            trace!(path = %path, bytes = attachment.data.len(), "Stored attachment");

            refs.push(AttachmentRef {
                name: attachment.name.clone(),
            });
        }
        Ok(refs)
    }

    /// Writes one entry, refusing a path this export already wrote.
    fn store(&mut self, path: String, data: &[u8]) -> Result<()> {
        if self.written.contains(&path) {
            return Err(BundleError::DuplicateEntry(path));
        }
        self.writer.write_entry(&path, data)?;
        self.written.insert(path);
        self.report.entries += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::{EntryReader, MemArchive};
    use crate::model::{Attachment, NoteStatus};

    fn export(root: &DocumentNode) -> (MemArchive, ExportReport) {
        let mut archive = MemArchive::new();
        let report = run(&mut archive, root, &BundleConfig::default()).unwrap();
        (archive, report)
    }

    #[test]
    fn test_duplicate_titles_get_distinct_paths() {
        let root = DocumentNode::branch("Root")
            .with_child(DocumentNode::note("Draft", Note::new("a")))
            .with_child(DocumentNode::note("Draft", Note::new("b")));

        let (archive, report) = export(&root);

        assert_eq!(
            archive.entry_names(),
            vec![
                "branch_Root/note_Draft/Draft.md",
                "branch_Root/note_Draft_(1)/Draft_(1).md",
                "index.json",
            ]
        );
        assert_eq!(
            archive
                .read_entry_text("branch_Root/note_Draft_(1)/Draft_(1).md")
                .unwrap(),
            "b"
        );
        assert_eq!(report.notes, 2);
        assert_eq!(report.branches, 1);
        assert_eq!(report.entries, 3);
    }

    #[test]
    fn test_manifest_records_generated_filenames() {
        let root = DocumentNode::branch("Root")
            .with_child(DocumentNode::note("a/b", Note::new("")))
            .with_child(DocumentNode::note("a?b", Note::new("")));

        let (archive, _) = export(&root);
        let record = manifest::decode(&archive.read_entry_text(MANIFEST_PATH).unwrap()).unwrap();
        let children = record.children.unwrap();

        assert_eq!(children[0].title, "a/b");
        assert_eq!(children[0].filename, "a_b");
        assert_eq!(children[1].title, "a?b");
        assert_eq!(children[1].filename, "a_b_(1)");
    }

    #[test]
    fn test_attachments_written_next_to_body() {
        let note = Note::new("see pic")
            .with_status(NoteStatus::IMPORTANT)
            .with_attachment(Attachment::new("img.png", vec![7u8; 10]));
        let root = DocumentNode::branch("Root").with_child(DocumentNode::note("Pic", note));

        let (archive, report) = export(&root);

        assert_eq!(
            archive.read_entry("branch_Root/note_Pic/img.png").unwrap(),
            vec![7u8; 10]
        );
        assert_eq!(report.attachments, 1);

        let record = manifest::decode(&archive.read_entry_text(MANIFEST_PATH).unwrap()).unwrap();
        let children = record.children.unwrap();
        let pic = &children[0];
        assert_eq!(pic.status, Some(NoteStatus::IMPORTANT));
        assert_eq!(pic.attachment_names().collect::<Vec<_>>(), vec!["img.png"]);
    }

    #[test]
    fn test_same_title_in_different_branches_does_not_collide() {
        let root = DocumentNode::branch("Root")
            .with_child(DocumentNode::branch("A").with_child(DocumentNode::note("x", Note::new("1"))))
            .with_child(DocumentNode::branch("B").with_child(DocumentNode::note("x", Note::new("2"))));

        let (archive, _) = export(&root);

        assert!(archive.contains_entry("branch_Root/branch_A/note_x/x.md").unwrap());
        assert!(archive.contains_entry("branch_Root/branch_B/note_x/x.md").unwrap());
    }

    #[test]
    fn test_manifest_is_last_entry() {
        let root = DocumentNode::branch("Root").with_child(DocumentNode::note("n", Note::new("")));
        let (archive, _) = export(&root);
        assert_eq!(archive.entry_names().last().unwrap(), MANIFEST_PATH);
    }

    #[test]
    fn test_empty_root_writes_only_manifest() {
        let (archive, report) = export(&DocumentNode::branch("Root"));
        assert_eq!(archive.entry_names(), vec![MANIFEST_PATH]);
        assert_eq!(report.branches, 1);
        assert_eq!(report.entries, 1);
    }

    #[test]
    fn test_write_failure_propagates() {
        let mut archive = MemArchive::new();
        archive.set_simulate_write_error(true);
        let root = DocumentNode::branch("Root").with_child(DocumentNode::note("n", Note::new("")));

        let err = run(&mut archive, &root, &BundleConfig::default()).unwrap_err();
        assert!(err.is_archive_failure());
    }

    #[test]
    fn test_attachment_named_like_body_is_refused() {
        let note = Note::new("body text").with_attachment(Attachment::new("Draft.md", "ATTACH"));
        let root = DocumentNode::branch("Root").with_child(DocumentNode::note("Draft", note));

        let mut archive = MemArchive::new();
        let err = run(&mut archive, &root, &BundleConfig::default()).unwrap_err();
        match err {
            BundleError::DuplicateEntry(path) => assert_eq!(path, "branch_Root/note_Draft/Draft.md"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(
            archive.read_entry_text("branch_Root/note_Draft/Draft.md").unwrap(),
            "body text"
        );
    }

    #[test]
    fn test_attachment_named_like_other_extension_is_kept() {
        let note = Note::new("body").with_attachment(Attachment::new("Draft.txt", "other"));
        let root = DocumentNode::branch("Root").with_child(DocumentNode::note("Draft", note));

        let (archive, report) = export(&root);
        assert_eq!(report.attachments, 1);
        assert_eq!(
            archive.read_entry_text("branch_Root/note_Draft/Draft.txt").unwrap(),
            "other"
        );
    }

    #[test]
    fn test_attachment_names_that_do_not_survive_a_container_are_refused() {
        for name in ["./a.png", "sub//a.png", "/abs.png", "..", "../a.png", "a/"] {
            let note = Note::new("").with_attachment(Attachment::new(name, vec![1]));
            let root = DocumentNode::branch("Root").with_child(DocumentNode::note("Pic", note));

            let mut archive = MemArchive::new();
            let err = run(&mut archive, &root, &BundleConfig::default()).unwrap_err();
            match err {
                BundleError::InvalidAttachmentName { note, name: bad, .. } => {
                    assert_eq!(note, "Pic");
                    assert_eq!(bad, name);
                }
                other => panic!("unexpected error for {name:?}: {other:?}"),
            }
            assert!(!archive.contains_entry(MANIFEST_PATH).unwrap());
        }
    }

    #[test]
    fn test_nested_attachment_name_is_accepted() {
        let note = Note::new("").with_attachment(Attachment::new("sub/a.png", vec![3]));
        let root = DocumentNode::branch("Root").with_child(DocumentNode::note("Pic", note));

        let (archive, _) = export(&root);
        assert_eq!(archive.read_entry("branch_Root/note_Pic/sub/a.png").unwrap(), vec![3]);
    }

    fn chain(levels: usize) -> DocumentNode {
        let mut node = DocumentNode::note("leaf", Note::new("deep"));
        for i in 1..levels {
            node = DocumentNode::branch(format!("level {}", i)).with_child(node);
        }
        node
    }

    #[test]
    fn test_deepest_allowed_tree_is_written() {
        let (archive, report) = export(&chain(MAX_TREE_DEPTH));
        assert_eq!(report.branches, MAX_TREE_DEPTH - 1);
        assert_eq!(report.notes, 1);
        assert!(archive.contains_entry(MANIFEST_PATH).unwrap());
    }

    #[test]
    fn test_too_deep_tree_writes_nothing() {
        let mut archive = MemArchive::new();
        let err = run(&mut archive, &chain(MAX_TREE_DEPTH + 5), &BundleConfig::default())
            .unwrap_err();

        match err {
            BundleError::TooDeep { depth, max } => {
                assert_eq!(depth, MAX_TREE_DEPTH + 5);
                assert_eq!(max, MAX_TREE_DEPTH);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(archive.entry_names().is_empty());
    }

    #[test]
    fn test_body_ext_from_config() {
        let mut config = BundleConfig::default();
        config.set_body_ext("txt");
        let root = DocumentNode::branch("Root").with_child(DocumentNode::note("n", Note::new("x")));

        let mut archive = MemArchive::new();
        run(&mut archive, &root, &config).unwrap();
        assert!(archive.contains_entry("branch_Root/note_n/n.txt").unwrap());
    }
}
