use serde::{Deserialize, Serialize};

/// Status flag of a note. Stored in the manifest as a plain integer so values
/// written by other tools survive a round-trip untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteStatus(pub i64);

impl NoteStatus {
    pub const NORMAL: NoteStatus = NoteStatus(0);
    pub const IMPORTANT: NoteStatus = NoteStatus(1);

    pub fn is_normal(&self) -> bool {
        *self == Self::NORMAL
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub name: String,
    pub data: Vec<u8>,
}

impl Attachment {
    pub fn new(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Note {
    pub content: String,
    pub status: NoteStatus,
    attachments: Vec<Attachment>,
}

impl Note {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    pub fn with_status(mut self, status: NoteStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.add_attachment(attachment);
        self
    }

    /// Adds an attachment, replacing any existing one with the same name in
    /// place so names stay unique within the note.
    pub fn add_attachment(&mut self, attachment: Attachment) {
        match self
            .attachments
            .iter_mut()
            .find(|a| a.name == attachment.name)
        {
            Some(existing) => *existing = attachment,
            None => self.attachments.push(attachment),
        }
    }

    pub fn remove_attachment(&mut self, name: &str) -> Option<Attachment> {
        let pos = self.attachments.iter().position(|a| a.name == name)?;
        Some(self.attachments.remove(pos))
    }

    pub fn attachment(&self, name: &str) -> Option<&Attachment> {
        self.attachments.iter().find(|a| a.name == name)
    }

    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Branch(Vec<DocumentNode>),
    Note(Note),
}

/// One entry of a document tree. The root of a document is a branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentNode {
    pub title: String,
    pub kind: NodeKind,
}

impl DocumentNode {
    pub fn branch(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            kind: NodeKind::Branch(Vec::new()),
        }
    }

    pub fn note(title: impl Into<String>, note: Note) -> Self {
        Self {
            title: title.into(),
            kind: NodeKind::Note(note),
        }
    }

    /// Appends a child, returning it back if this node is a note.
    pub fn push_child(&mut self, child: DocumentNode) -> Result<(), DocumentNode> {
        match &mut self.kind {
            NodeKind::Branch(children) => {
                children.push(child);
                Ok(())
            }
            NodeKind::Note(_) => Err(child),
        }
    }

    /// Builder form of [`push_child`](Self::push_child).
    ///
    /// # Panics
    ///
    /// Panics if this node is a note; use `push_child` to handle that case.
    pub fn with_child(mut self, child: DocumentNode) -> Self {
        if let Err(child) = self.push_child(child) {
            panic!(
                "note {:?} cannot take child {:?}",
                self.title, child.title
            );
        }
        self
    }

    /// Number of levels in the tree rooted here (a lone node is 1 deep).
    ///
    /// Walks with an explicit stack so arbitrarily deep trees can be measured.
    pub fn depth(&self) -> usize {
        let mut max = 0;
        let mut pending = vec![(self, 1usize)];
        while let Some((node, level)) = pending.pop() {
            max = max.max(level);
            pending.extend(node.children().iter().map(|child| (child, level + 1)));
        }
        max
    }

    pub fn is_branch(&self) -> bool {
        matches!(self.kind, NodeKind::Branch(_))
    }

    pub fn children(&self) -> &[DocumentNode] {
        match &self.kind {
            NodeKind::Branch(children) => children,
            NodeKind::Note(_) => &[],
        }
    }

    pub fn as_note(&self) -> Option<&Note> {
        match &self.kind {
            NodeKind::Note(note) => Some(note),
            NodeKind::Branch(_) => None,
        }
    }
}
