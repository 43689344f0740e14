#![forbid(unsafe_code)]

//! Undo and redo stacks for tag edits.
//!
//! [`HistoryManager`] owns executed [`Command`]s. Undo moves the newest entry
//! to the redo stack after reversing it; redo moves it back. A failed replay
//! leaves the entry where it was.
//!
//! Limits from [`HistoryConfig`] are applied on every push: the oldest entries
//! go first once `max_depth` entries or `max_bytes` of estimated command size
//! are exceeded. Redo entries are evicted before undo entries.
//!
//! ```text
//! set n=1, set n=2        undo              set n=3
//! undo: [n=1, n=2]        undo: [n=1]       undo: [n=1, n=3]
//! redo: []                redo: [n=2]       redo: []   (n=2 dropped)
//! ```
//!
//! `push_keep_redo` records without dropping redo entries; the tree model
//! uses it for commands recorded while a replay is in progress.

use std::collections::VecDeque;
use std::fmt;

use nbted_core::Node;

#[cfg(feature = "config-file")]
use serde::{Deserialize, Serialize};

use super::command::{Command, CommandError};

/// Configuration for the history manager.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config-file", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config-file", serde(default))]
pub struct HistoryConfig {
    /// Maximum number of commands to keep in undo history.
    pub max_depth: usize,
    /// Maximum total bytes for all commands (0 = unlimited).
    pub max_bytes: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_depth: 500,
            max_bytes: 64 * 1024 * 1024, // 64 MB
        }
    }
}

impl HistoryConfig {
    /// Create a new configuration with custom limits.
    #[must_use]
    pub fn new(max_depth: usize, max_bytes: usize) -> Self {
        Self {
            max_depth,
            max_bytes,
        }
    }

    /// Create unlimited configuration (for testing).
    #[must_use]
    pub fn unlimited() -> Self {
        Self {
            max_depth: usize::MAX,
            max_bytes: 0,
        }
    }
}

/// What an undo or redo replayed.
#[derive(Debug, Clone, PartialEq)]
pub struct Replayed {
    /// Description of the replayed command.
    pub description: String,
    /// Nodes the command touched.
    pub targets: Vec<Node>,
}

/// Manager for undo/redo history.
///
/// Maintains dual stacks for undo and redo operations with
/// configurable memory and depth limits.
pub struct HistoryManager {
    /// Commands available for undo (newest at back).
    undo_stack: VecDeque<Box<dyn Command>>,
    /// Commands available for redo (newest at back).
    redo_stack: VecDeque<Box<dyn Command>>,
    /// Configuration for limits.
    config: HistoryConfig,
    /// Total bytes used by all commands.
    total_bytes: usize,
}

impl fmt::Debug for HistoryManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HistoryManager")
            .field("undo_depth", &self.undo_stack.len())
            .field("redo_depth", &self.redo_stack.len())
            .field("total_bytes", &self.total_bytes)
            .field("config", &self.config)
            .finish()
    }
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::new(HistoryConfig::default())
    }
}

impl HistoryManager {
    /// Create a new history manager with the given configuration.
    #[must_use]
    pub fn new(config: HistoryConfig) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: VecDeque::new(),
            config,
            total_bytes: 0,
        }
    }

    // ========================================================================
    // Core Operations
    // ========================================================================

    /// Push an already-executed command onto the undo stack.
    ///
    /// This clears the redo stack (new branch) and enforces limits.
    pub fn push(&mut self, cmd: Box<dyn Command>) {
        self.clear_redo();
        self.push_keep_redo(cmd);
    }

    /// Push without discarding the redo stack.
    ///
    /// Used for commands recorded while an undo/redo is being replayed,
    /// which must not branch the history.
    pub fn push_keep_redo(&mut self, cmd: Box<dyn Command>) {
        self.total_bytes += cmd.size_bytes();
        self.undo_stack.push_back(cmd);
        self.enforce_limits();
    }

    /// Undo the last command.
    ///
    /// Moves the command from undo stack to redo stack and calls undo().
    ///
    /// # Returns
    ///
    /// - `Some(Ok(replayed))` if undo succeeded
    /// - `Some(Err(error))` if undo failed (command remains on undo stack)
    /// - `None` if no commands to undo
    pub fn undo(&mut self) -> Option<Result<Replayed, CommandError>> {
        let mut cmd = self.undo_stack.pop_back()?;
        match cmd.undo() {
            Ok(()) => {
                let replayed = replayed(cmd.as_ref());
                self.redo_stack.push_back(cmd);
                Some(Ok(replayed))
            }
            Err(e) => {
                self.undo_stack.push_back(cmd);
                Some(Err(e))
            }
        }
    }

    /// Redo the last undone command.
    ///
    /// # Returns
    ///
    /// - `Some(Ok(replayed))` if redo succeeded
    /// - `Some(Err(error))` if redo failed (command remains on redo stack)
    /// - `None` if no commands to redo
    pub fn redo(&mut self) -> Option<Result<Replayed, CommandError>> {
        let mut cmd = self.redo_stack.pop_back()?;
        match cmd.redo() {
            Ok(()) => {
                let replayed = replayed(cmd.as_ref());
                self.undo_stack.push_back(cmd);
                Some(Ok(replayed))
            }
            Err(e) => {
                self.redo_stack.push_back(cmd);
                Some(Err(e))
            }
        }
    }

    /// Check if undo is available.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Check if redo is available.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    // ========================================================================
    // Info
    // ========================================================================

    #[must_use]
    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    #[must_use]
    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    /// Nodes touched by the entry [`undo`](Self::undo) would replay next.
    #[must_use]
    pub fn next_undo_targets(&self) -> Vec<Node> {
        self.undo_stack.back().map(|c| c.targets()).unwrap_or_default()
    }

    /// Nodes touched by the entry [`redo`](Self::redo) would replay next.
    #[must_use]
    pub fn next_redo_targets(&self) -> Vec<Node> {
        self.redo_stack.back().map(|c| c.targets()).unwrap_or_default()
    }

    /// Get descriptions for undo commands (most recent first).
    pub fn undo_descriptions(&self, limit: usize) -> Vec<&str> {
        self.undo_stack
            .iter()
            .rev()
            .take(limit)
            .map(|c| c.description())
            .collect()
    }

    /// Get descriptions for redo commands (most recent first).
    pub fn redo_descriptions(&self, limit: usize) -> Vec<&str> {
        self.redo_stack
            .iter()
            .rev()
            .take(limit)
            .map(|c| c.description())
            .collect()
    }

    #[must_use]
    pub fn next_undo_description(&self) -> Option<&str> {
        self.undo_stack.back().map(|c| c.description())
    }

    #[must_use]
    pub fn next_redo_description(&self) -> Option<&str> {
        self.redo_stack.back().map(|c| c.description())
    }

    /// Get total memory usage in bytes.
    #[must_use]
    pub fn memory_usage(&self) -> usize {
        self.total_bytes
    }

    #[must_use]
    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    // ========================================================================
    // Maintenance
    // ========================================================================

    /// Clear all history (both undo and redo).
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.total_bytes = 0;
    }

    /// Drop the redo stack.
    pub fn clear_redo(&mut self) {
        for cmd in self.redo_stack.drain(..) {
            self.total_bytes = self.total_bytes.saturating_sub(cmd.size_bytes());
        }
    }

    /// Enforce depth and memory limits by evicting oldest commands.
    fn enforce_limits(&mut self) {
        while self.undo_stack.len() > self.config.max_depth {
            if let Some(cmd) = self.undo_stack.pop_front() {
                self.total_bytes = self.total_bytes.saturating_sub(cmd.size_bytes());
            }
        }

        if self.config.max_bytes > 0 {
            while self.total_bytes > self.config.max_bytes {
                if let Some(cmd) = self.redo_stack.pop_front() {
                    self.total_bytes = self.total_bytes.saturating_sub(cmd.size_bytes());
                    continue;
                }
                if let Some(cmd) = self.undo_stack.pop_front() {
                    self.total_bytes = self.total_bytes.saturating_sub(cmd.size_bytes());
                } else {
                    break;
                }
            }
        }
    }
}

fn replayed(cmd: &dyn Command) -> Replayed {
    Replayed {
        description: cmd.description().to_owned(),
        targets: cmd.targets(),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::undo::tag_commands::ChangeValueCmd;
    use nbted_core::{Payload, TagRef};

    /// Executed value change on a fresh int tag, so undo() works.
    fn make_cmd(tag: &TagRef, value: i32) -> Box<dyn Command> {
        let mut cmd = ChangeValueCmd::new(tag.clone(), Payload::Int(value));
        cmd.execute().expect("test command should execute");
        Box::new(cmd)
    }

    fn int_tag() -> TagRef {
        TagRef::scalar(Some("n"), Payload::Int(0))
    }

    #[test]
    fn test_new_manager() {
        let mgr = HistoryManager::default();
        assert!(!mgr.can_undo());
        assert!(!mgr.can_redo());
        assert_eq!(mgr.undo_depth(), 0);
        assert_eq!(mgr.redo_depth(), 0);
    }

    #[test]
    fn test_undo_moves_to_redo_and_restores() {
        let tag = int_tag();
        let mut mgr = HistoryManager::default();
        mgr.push(make_cmd(&tag, 5));

        let replayed = mgr.undo().unwrap().unwrap();
        assert_eq!(replayed.description, "Change value of int 'n'");
        assert_eq!(replayed.targets, vec![Node::Tag(tag.clone())]);
        assert_eq!(tag.numeric(), Some(0));
        assert!(!mgr.can_undo());
        assert_eq!(mgr.redo_depth(), 1);

        mgr.redo().unwrap().unwrap();
        assert_eq!(tag.numeric(), Some(5));
        assert_eq!(mgr.undo_depth(), 1);
    }

    #[test]
    fn test_push_clears_redo() {
        let tag = int_tag();
        let mut mgr = HistoryManager::default();
        mgr.push(make_cmd(&tag, 1));
        mgr.push(make_cmd(&tag, 2));
        mgr.undo();
        assert!(mgr.can_redo());

        mgr.push(make_cmd(&tag, 3));
        assert_eq!(mgr.undo_depth(), 2);
        assert_eq!(mgr.redo_depth(), 0);
        assert!(mgr.redo().is_none());
    }

    #[test]
    fn test_push_keep_redo() {
        let tag = int_tag();
        let mut mgr = HistoryManager::default();
        mgr.push(make_cmd(&tag, 1));
        mgr.undo();
        mgr.push_keep_redo(make_cmd(&tag, 2));
        assert_eq!(mgr.redo_depth(), 1);
    }

    #[test]
    fn test_max_depth_enforced() {
        let tag = int_tag();
        let mut mgr = HistoryManager::new(HistoryConfig::new(3, 0));
        for i in 0..5 {
            mgr.push(make_cmd(&tag, i));
        }
        assert_eq!(mgr.undo_depth(), 3);
    }

    #[test]
    fn test_memory_byte_limit_evicts_old_commands() {
        let tag = int_tag();
        let mut mgr = HistoryManager::new(HistoryConfig::new(100, 1));
        for i in 0..5 {
            mgr.push(make_cmd(&tag, i));
        }
        assert!(mgr.undo_depth() < 5, "depth={}", mgr.undo_depth());
    }

    #[test]
    fn test_memory_tracking_after_undo_redo() {
        let tag = int_tag();
        let mut mgr = HistoryManager::new(HistoryConfig::unlimited());
        mgr.push(make_cmd(&tag, 1));
        let after_push = mgr.memory_usage();
        assert!(after_push > 0);
        mgr.undo();
        assert_eq!(mgr.memory_usage(), after_push);
        mgr.redo();
        assert_eq!(mgr.memory_usage(), after_push);
    }

    #[test]
    fn test_failed_undo_stays_on_stack() {
        let list = TagRef::list(Some("l"), nbted_core::TagKind::Int, Vec::new()).unwrap();
        let mut cmd = crate::undo::tag_commands::AddRangeCmd::new(
            list.clone(),
            vec![TagRef::scalar(None, Payload::Int(1))],
        );
        cmd.execute().unwrap();
        let mut mgr = HistoryManager::default();
        mgr.push(Box::new(cmd));

        // Out-of-band edit makes the recorded range stale.
        list.insert_child(0, TagRef::scalar(None, Payload::Int(2)))
            .unwrap();
        assert!(mgr.undo().unwrap().is_err());
        assert_eq!(mgr.undo_depth(), 1);
        assert_eq!(mgr.redo_depth(), 0);
    }

    #[test]
    fn test_descriptions() {
        let tag = int_tag();
        let mut mgr = HistoryManager::default();
        mgr.push(make_cmd(&tag, 1));
        mgr.push(make_cmd(&tag, 2));
        mgr.push(make_cmd(&tag, 3));
        assert_eq!(mgr.undo_descriptions(2).len(), 2);
        assert_eq!(mgr.next_undo_description(), Some("Change value of int 'n'"));
        assert_eq!(mgr.next_redo_description(), None);
        mgr.undo();
        assert_eq!(mgr.redo_descriptions(5).len(), 1);
    }

    #[test]
    fn test_undo_redo_without_commands() {
        let mut mgr = HistoryManager::default();
        assert!(mgr.undo().is_none());
        assert!(mgr.redo().is_none());
    }

    #[test]
    fn test_clear() {
        let tag = int_tag();
        let mut mgr = HistoryManager::default();
        mgr.push(make_cmd(&tag, 1));
        mgr.push(make_cmd(&tag, 2));
        mgr.undo();
        mgr.clear();
        assert!(!mgr.can_undo());
        assert!(!mgr.can_redo());
        assert_eq!(mgr.memory_usage(), 0);
    }

    #[test]
    fn test_config_defaults() {
        let config = HistoryConfig::default();
        assert_eq!(config.max_depth, 500);
        assert_eq!(HistoryConfig::unlimited().max_bytes, 0);
        let mgr = HistoryManager::new(HistoryConfig::new(42, 1024));
        assert_eq!(mgr.config().max_depth, 42);
        assert!(format!("{:?}", mgr).contains("undo_depth"));
    }
}
