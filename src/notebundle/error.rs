use std::string::FromUtf8Error;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BundleError {
    /// The archive has no usable manifest; it is not a note bundle.
    #[error("Invalid file format: {0}")]
    InvalidFormat(String),

    #[error("Malformed manifest: {0}")]
    MalformedManifest(String),

    /// An entry referenced by the manifest is not in the archive.
    #[error("Missing entry in archive: {0}")]
    MissingEntry(String),

    #[error("Archive error: {0}")]
    Archive(String),

    /// Two things in one export mapped to the same archive entry.
    #[error("Entry written twice in one export: {0}")]
    DuplicateEntry(String),

    #[error("Invalid attachment name {name:?} on note {note:?}: {reason}")]
    InvalidAttachmentName {
        note: String,
        name: String,
        reason: &'static str,
    },

    #[error("Tree is {depth} levels deep, the limit is {max}")]
    TooDeep { depth: usize, max: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Entry {path} is not valid UTF-8: {source}")]
    Encoding {
        path: String,
        #[source]
        source: FromUtf8Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),
}

impl BundleError {
    pub fn archive(msg: impl Into<String>) -> Self {
        Self::Archive(msg.into())
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedManifest(msg.into())
    }

    pub fn missing_entry(path: impl Into<String>) -> Self {
        Self::MissingEntry(path.into())
    }

    /// True for failures of the underlying container: open, read, write,
    /// close, or a required entry that is not there.
    pub fn is_archive_failure(&self) -> bool {
        matches!(
            self,
            Self::Archive(_) | Self::Io(_) | Self::MissingEntry(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, BundleError>;
