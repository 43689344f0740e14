#![forbid(unsafe_code)]

//! nbted Runtime
//!
//! The editing core of nbted: everything between an edit gesture and the
//! tree widget's structural events.
//!
//! # Key Components
//!
//! - [`UndoableTreeModel`] - Tree data source with undo history, batching
//!   and reconciliation
//! - [`Command`] - Reversible edit; [`MergedCommand`] folds several into one
//! - [`HistoryManager`] - Undo/redo stacks with depth and memory limits
//! - [`ByteTransformer`] - Flat byte view of an array or numeric list, for
//!   the hex editor
//! - [`EditorConfig`] - Tunables, optionally loaded from TOML/JSON
//!
//! # Role in nbted
//! `nbted-runtime` sits on top of `nbted-core`. It never parses or writes
//! files; it mutates the in-memory graph through commands and tells the
//! presentation layer what changed.
//!
//! # Logging
//! All components log through `tracing` under the `nbted.undo`,
//! `nbted.tree` and `nbted.bytes` targets.

pub mod bytes;
pub mod config;
pub mod tree_model;
pub mod undo;

pub use bytes::{ByteChange, ByteEditError, ByteTransformer, has_provider, provider_for};
pub use config::{ConfigError, EditorConfig};
pub use tree_model::{
    DropPosition, Reconciliation, ReplayState, TreeEvent, TreePath, UndoableTreeModel,
};
pub use undo::{
    AddRangeCmd, ChangeValueCmd, ClearCmd, Command, CommandError, CommandMetadata, CommandResult,
    CommandSource, HistoryConfig, HistoryManager, InsertTagCmd, MergedCommand, RemoveTagCmd,
    RenameCmd, Replayed,
};
