#![forbid(unsafe_code)]

//! Core: the typed tag graph the editor operates on.
//!
//! # Role in nbted
//! `nbted-core` owns the domain objects: [`TagRef`] trees, [`Document`]s,
//! [`Folder`]s, region files and their lazily-loaded [`Chunk`]s. The
//! [`Node`] variant ties them together so `nbted-runtime` can walk, edit and
//! reconcile any of them with one pattern match.
//!
//! Parsing and serializing the binary format live outside this crate; a
//! [`ChunkLoader`] is the only hook through which external I/O enters.

pub mod error;
pub mod node;
pub mod shared;
pub mod tag;

pub use error::{LoadError, TagError};
pub use node::{
    Chunk, ChunkLoader, ChunkRef, Document, DocumentRef, Folder, FolderRef, Node, NodeKey,
    REGION_SLOTS, RegionFile, RegionRef,
};
pub use shared::Shared;
pub use tag::{Payload, Tag, TagKind, TagRef};
