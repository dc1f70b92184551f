//! # Notebundle Architecture
//!
//! Notebundle stores a **tree of notes in one archive file** and reads it back.
//! It knows nothing about editors, windows or menus: a host hands it a
//! [`model::DocumentNode`] tree and gets one back on import.
//!
//! ## Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  API Layer (api.rs)                                         │
//! │  - Opens the container, runs a walk, finishes the container │
//! │  - export_file / import_file / ExportStrategy               │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Command Layer (commands/*.rs)                              │
//! │  - export: tree -> entries + manifest                       │
//! │  - import: manifest + entries -> tree                       │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Format Layer (paths.rs, manifest.rs)                       │
//! │  - Collision-free archive paths from free-text titles       │
//! │  - index.json encode / decode                               │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Archive Layer (archive/)                                   │
//! │  - EntryReader / EntryWriter traits                         │
//! │  - TarGzReader, TarGzWriter (files), MemArchive (tests)     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Archive Layout
//!
//! ```text
//! doc.tar.gz
//! ├── branch_Root/
//! │   ├── note_Draft/Draft.md
//! │   ├── note_Draft_(1)/Draft_(1).md
//! │   └── note_Pic/
//! │       ├── Pic.md
//! │       └── img.png
//! └── index.json          # written last
//! ```
//!
//! Titles live only in `index.json`. Directory names are derived from them but
//! are never read back as titles, so any title (empty, duplicated, full of
//! slashes) survives a round-trip.
//!
//! ## Guarantees
//!
//! - `import(export(tree)) == tree` for titles, kinds, bodies, statuses,
//!   attachments and child order.
//! - No two nodes of one export share a directory, and no entry is written
//!   twice. Attachment names that a container would rewrite are refused.
//! - Any tree up to [`manifest::MAX_TREE_DEPTH`] levels exports and imports;
//!   deeper trees are refused before anything is written.
//! - The same tree exported twice gives byte-identical archives.
//! - Every export and import owns its container for exactly one call; nothing
//!   is cached or shared between calls.
//!
//! ## Module Overview
//!
//! - [`api`]: Entry points and the [`api::ExportStrategy`] seam
//! - [`commands`]: The export and import tree walks
//! - [`paths`]: Filename sanitizing and the per-export path allocator
//! - [`manifest`]: `index.json` records and codec
//! - [`archive`]: Entry-level archive access and its backends
//! - [`model`]: Document tree types
//! - [`config`]: Compression level, body extension, name length
//! - [`error`]: Error types

pub mod api;
pub mod archive;
pub mod commands;
pub mod config;
pub mod error;
pub mod manifest;
pub mod model;
pub mod paths;
