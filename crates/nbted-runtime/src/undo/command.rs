#![forbid(unsafe_code)]

//! Command infrastructure for the undo/redo system.
//!
//! This module provides the [`Command`] trait for reversible edits and the
//! [`MergedCommand`] that composes several of them into one undo unit.
//!
//! Commands capture by value everything they need to replay, report an
//! estimated size for history budgeting, and list the nodes they touch so
//! the tree model can reconcile them after a replay.
//!
//! # Invariants
//!
//! - `execute()` followed by `undo()` restores prior state exactly
//! - `undo()` followed by `redo()` restores the executed state exactly
//! - A [`MergedCommand`] undoes its parts in reverse order
//!
//! A container reshaped since the command was built makes replay fail with
//! [`CommandError::StaleTarget`] rather than panicking.

use std::fmt;

use nbted_core::{Node, TagError};

/// Source of a command - who/what triggered it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommandSource {
    /// Direct edit in the tree view.
    #[default]
    User,
    /// Committed from the hex editor.
    HexEditor,
}

/// Metadata attached to every command for tracing and UI display.
#[derive(Debug, Clone)]
pub struct CommandMetadata {
    /// Human-readable description for UI (e.g., "Rename int 'x'").
    pub description: String,
    /// Who/what triggered the command.
    pub source: CommandSource,
}

impl CommandMetadata {
    /// Create new metadata with the given description.
    #[must_use]
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            source: CommandSource::User,
        }
    }

    /// Set the command source.
    #[must_use]
    pub fn with_source(mut self, source: CommandSource) -> Self {
        self.source = source;
        self
    }

    /// Size in bytes for memory accounting.
    #[must_use]
    pub fn size_bytes(&self) -> usize {
        std::mem::size_of::<Self>() + self.description.len()
    }
}

impl Default for CommandMetadata {
    fn default() -> Self {
        Self::new("Unknown")
    }
}

/// Result of command execution or undo.
pub type CommandResult = Result<(), CommandError>;

/// Errors that can occur during command execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// The underlying tag mutation was rejected.
    Tag(TagError),
    /// The target no longer matches what the command recorded.
    StaleTarget(String),
    /// Command cannot be executed in current state.
    InvalidState(String),
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tag(err) => write!(f, "tag edit failed: {err}"),
            Self::StaleTarget(what) => write!(f, "stale target: {what}"),
            Self::InvalidState(msg) => write!(f, "invalid state: {msg}"),
        }
    }
}

impl std::error::Error for CommandError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Tag(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TagError> for CommandError {
    fn from(err: TagError) -> Self {
        Self::Tag(err)
    }
}

/// A reversible edit that can be undone and redone.
///
/// Commands live on the single interaction thread together with the
/// `Rc`-based document graph they mutate, so the trait carries no
/// `Send`/`Sync` bound.
pub trait Command {
    /// Execute the command, applying its effect.
    fn execute(&mut self) -> CommandResult;

    /// Undo the command, reverting its effect.
    fn undo(&mut self) -> CommandResult;

    /// Redo the command after it was undone.
    fn redo(&mut self) -> CommandResult {
        self.execute()
    }

    /// Human-readable description for UI display.
    fn description(&self) -> &str {
        &self.metadata().description
    }

    /// Size of this command in bytes for memory budgeting.
    fn size_bytes(&self) -> usize;

    /// Get the command metadata.
    fn metadata(&self) -> &CommandMetadata;

    /// Domain objects whose children or value this command changes.
    fn targets(&self) -> Vec<Node> {
        Vec::new()
    }

    /// Debug description of the command.
    fn debug_name(&self) -> &'static str {
        "Command"
    }
}

impl fmt::Debug for dyn Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(self.debug_name())
            .field("description", &self.description())
            .field("size_bytes", &self.size_bytes())
            .finish()
    }
}

/// A sequence of commands that execute and undo together.
///
/// Used for batches recorded by the tree model and for compound edits
/// such as "clear the list, then append the decoded elements".
pub struct MergedCommand {
    /// Commands in execution order.
    commands: Vec<Box<dyn Command>>,
    /// Merged metadata.
    metadata: CommandMetadata,
    /// Number of leading commands currently applied.
    executed_to: usize,
}

impl fmt::Debug for MergedCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MergedCommand")
            .field("commands_count", &self.commands.len())
            .field("metadata", &self.metadata)
            .field("executed_to", &self.executed_to)
            .finish()
    }
}

impl MergedCommand {
    /// Create an empty merged command.
    #[must_use]
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            commands: Vec::new(),
            metadata: CommandMetadata::new(description),
            executed_to: 0,
        }
    }

    /// Merge commands that have already been executed, in their original
    /// order. The description lists the distinct part descriptions.
    #[must_use]
    pub fn from_executed(commands: Vec<Box<dyn Command>>) -> Self {
        let mut parts: Vec<&str> = Vec::new();
        for cmd in &commands {
            if !parts.contains(&cmd.description()) {
                parts.push(cmd.description());
            }
        }
        let description = parts.join(", ");
        let executed_to = commands.len();
        Self {
            commands,
            metadata: CommandMetadata::new(description),
            executed_to,
        }
    }

    /// Add a command to run after the existing ones.
    pub fn push(&mut self, cmd: Box<dyn Command>) {
        self.commands.push(cmd);
    }

    /// Set the command source.
    #[must_use]
    pub fn with_source(mut self, source: CommandSource) -> Self {
        self.metadata.source = source;
        self
    }

    /// Number of commands in the merge.
    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl Command for MergedCommand {
    fn execute(&mut self) -> CommandResult {
        let start = self.executed_to;
        for i in start..self.commands.len() {
            if let Err(e) = self.commands[i].execute() {
                // Roll back what this call applied
                let mut applied = start;
                for j in (start..i).rev() {
                    if let Err(rollback) = self.commands[j].undo() {
                        tracing::warn!(
                            target: "nbted.undo",
                            part = j,
                            error = %rollback,
                            "merged execute rollback failed"
                        );
                        applied = j + 1;
                        break;
                    }
                }
                self.executed_to = applied;
                return Err(e);
            }
            self.executed_to = i + 1;
        }
        Ok(())
    }

    fn undo(&mut self) -> CommandResult {
        let end = self.executed_to;
        for i in (0..end).rev() {
            if let Err(e) = self.commands[i].undo() {
                // Re-apply what this call undid
                let mut applied = end;
                for j in i + 1..end {
                    if let Err(rollback) = self.commands[j].redo() {
                        tracing::warn!(
                            target: "nbted.undo",
                            part = j,
                            error = %rollback,
                            "merged undo rollback failed"
                        );
                        applied = j;
                        break;
                    }
                }
                self.executed_to = applied;
                return Err(e);
            }
            self.executed_to = i;
        }
        Ok(())
    }

    fn redo(&mut self) -> CommandResult {
        self.execute()
    }

    fn size_bytes(&self) -> usize {
        std::mem::size_of::<Self>()
            + self.metadata.size_bytes()
            + self.commands.iter().map(|c| c.size_bytes()).sum::<usize>()
    }

    fn metadata(&self) -> &CommandMetadata {
        &self.metadata
    }

    fn targets(&self) -> Vec<Node> {
        let mut out: Vec<Node> = Vec::new();
        for node in self.commands.iter().flat_map(|c| c.targets()) {
            if !out.contains(&node) {
                out.push(node);
            }
        }
        out
    }

    fn debug_name(&self) -> &'static str {
        "MergedCommand"
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Appends `text` to a shared log on execute, pops it on undo. Undo
    /// fails without touching the log unless `text` is the last entry.
    struct LogCmd {
        log: Rc<RefCell<Vec<String>>>,
        text: String,
        metadata: CommandMetadata,
        fail: bool,
    }

    impl LogCmd {
        fn new(log: &Rc<RefCell<Vec<String>>>, text: &str) -> Self {
            Self {
                log: Rc::clone(log),
                text: text.to_owned(),
                metadata: CommandMetadata::new(format!("Log {text}")),
                fail: false,
            }
        }
    }

    impl Command for LogCmd {
        fn execute(&mut self) -> CommandResult {
            if self.fail {
                return Err(CommandError::InvalidState("forced".into()));
            }
            self.log.borrow_mut().push(self.text.clone());
            Ok(())
        }

        fn undo(&mut self) -> CommandResult {
            let mut log = self.log.borrow_mut();
            if log.last() != Some(&self.text) {
                return Err(CommandError::StaleTarget(self.text.clone()));
            }
            log.pop();
            Ok(())
        }

        fn size_bytes(&self) -> usize {
            std::mem::size_of::<Self>() + self.text.len()
        }

        fn metadata(&self) -> &CommandMetadata {
            &self.metadata
        }
    }

    #[test]
    fn test_command_metadata_size() {
        let meta = CommandMetadata::new("Test command");
        assert!(meta.size_bytes() >= std::mem::size_of::<CommandMetadata>() + 12);
    }

    #[test]
    fn test_command_metadata_with_source() {
        let meta = CommandMetadata::new("Test").with_source(CommandSource::HexEditor);
        assert_eq!(meta.source, CommandSource::HexEditor);
    }

    #[test]
    fn test_merged_execute_undo_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut merged = MergedCommand::new("Both");
        merged.push(Box::new(LogCmd::new(&log, "a")));
        merged.push(Box::new(LogCmd::new(&log, "b")));

        merged.execute().unwrap();
        assert_eq!(*log.borrow(), vec!["a", "b"]);

        // LogCmd::undo fails unless it pops its own entry, so this
        // also checks reverse order.
        merged.undo().unwrap();
        assert!(log.borrow().is_empty());

        merged.redo().unwrap();
        assert_eq!(*log.borrow(), vec!["a", "b"]);
    }

    #[test]
    fn test_from_executed_undoes_without_reexecuting() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut a = LogCmd::new(&log, "a");
        let mut b = LogCmd::new(&log, "b");
        a.execute().unwrap();
        b.execute().unwrap();

        let mut merged = MergedCommand::from_executed(vec![Box::new(a), Box::new(b)]);
        assert_eq!(merged.description(), "Log a, Log b");
        merged.undo().unwrap();
        assert!(log.borrow().is_empty());
        merged.redo().unwrap();
        assert_eq!(*log.borrow(), vec!["a", "b"]);
    }

    #[test]
    fn test_merged_rolls_back_on_failure() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut bad = LogCmd::new(&log, "bad");
        bad.fail = true;
        let mut merged = MergedCommand::new("Partial");
        merged.push(Box::new(LogCmd::new(&log, "a")));
        merged.push(Box::new(bad));

        assert!(merged.execute().is_err());
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_failed_merged_undo_reapplies_undone_parts() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut merged = MergedCommand::new("Both");
        merged.push(Box::new(LogCmd::new(&log, "a")));
        merged.push(Box::new(LogCmd::new(&log, "b")));
        merged.execute().unwrap();

        log.borrow_mut()[0] = "z".to_owned();
        assert!(matches!(merged.undo(), Err(CommandError::StaleTarget(_))));
        assert_eq!(*log.borrow(), vec!["z", "b"]);

        log.borrow_mut()[0] = "a".to_owned();
        merged.undo().unwrap();
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_merged_empty() {
        let merged = MergedCommand::new("Empty");
        assert!(merged.is_empty());
        assert_eq!(merged.len(), 0);
        assert!(merged.targets().is_empty());
    }

    #[test]
    fn test_command_error_display() {
        let err = CommandError::from(TagError::UnnamedEntry);
        assert!(err.to_string().contains("named"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_debug_implementations() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let cmd: Box<dyn Command> = Box::new(LogCmd::new(&log, "x"));
        let debug_str = format!("{:?}", cmd);
        assert!(debug_str.contains("Log x"));

        let merged = MergedCommand::new("Test batch");
        assert!(format!("{:?}", merged).contains("MergedCommand"));
    }
}
