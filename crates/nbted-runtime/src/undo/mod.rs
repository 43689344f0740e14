#![forbid(unsafe_code)]

//! Undo/Redo command history framework.
//!
//! Every edit to the document graph is expressed as a [`Command`] with
//! `execute`/`undo`/`redo`. The [`HistoryManager`] keeps the undo and redo
//! stacks; [`MergedCommand`] folds several commands into one undo unit.
//!
//! # Flow
//!
//! ```text
//! edit gesture ──► Command::execute ──► UndoableTreeModel::push_undo
//!                                          │
//!                       batch open? ───────┼──► pending ──► MergedCommand
//!                                          ▼                     │
//!                                   HistoryManager ◄─────────────┘
//!                                   undo ⇄ redo  ──► targets() reconciled
//! ```
//!
//! # Module Structure
//!
//! - [`command`]: `Command` trait, metadata, and `MergedCommand`
//! - [`history`]: `HistoryManager` and its limits
//! - [`tag_commands`]: value, rename and structural edits on tags

pub mod command;
pub mod history;
pub mod tag_commands;

pub use command::{
    Command, CommandError, CommandMetadata, CommandResult, CommandSource, MergedCommand,
};
pub use history::{HistoryConfig, HistoryManager, Replayed};
pub use tag_commands::{
    AddRangeCmd, ChangeValueCmd, ClearCmd, InsertTagCmd, RemoveTagCmd, RenameCmd,
};
