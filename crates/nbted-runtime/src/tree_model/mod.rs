#![forbid(unsafe_code)]

//! Undo-aware tree model.
//!
//! [`UndoableTreeModel`] presents a mutable, partly lazily-loaded domain
//! graph as a tree data source. It keeps a shadow of what the widget has
//! materialized, records every edit in an undo history, and turns
//! "this object changed" notifications into minimal structural events.
//!
//! # Flow
//!
//! ```text
//!   edit gesture ──► Command ──► execute()
//!                                    │
//!                                    ▼
//!                       notify_changed(each target)
//!                          locate shadow, diff children
//!                                    │
//!          NodesChanged / NodesRemoved / NodesInserted ──► take_events()
//!                                    │
//!                                    ▼
//!                              push_undo() ──► history (or open batch)
//! ```
//!
//! # Invariants
//!
//! 1. `get_children` never emits structural events; only reconciliation,
//!    `add_root` and `refresh` do.
//! 2. While a batch is open, pushed commands go to the pending list; when
//!    the outermost batch finishes they become one undo entry.
//! 3. Undo and redo run in [`ReplayState::Replaying`] and never clear the
//!    redo stack.
//! 4. Reconciling the same object twice without a mutation in between
//!    reports no added and no removed children the second time.
//!
//! # Failure Modes
//!
//! - Paths that no longer resolve yield no children.
//! - `notify_changed` on an object that is not materialized is a no-op.
//! - A chunk whose loader fails shows no children and is retried on the
//!   next access.
//! - A failed undo or redo keeps its entry and still reconciles the
//!   entry's targets.

pub mod events;
mod locate;
pub mod shadow;

use std::collections::HashSet;
use std::fmt;

use nbted_core::{Node, NodeKey, TagRef};

use crate::config::EditorConfig;
use crate::undo::{Command, CommandError, CommandResult, HistoryManager, MergedCommand, Replayed};

pub use events::{DropPosition, Reconciliation, TreeEvent};
pub use shadow::TreePath;

use shadow::ShadowNode;

/// Whether the model is replaying history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplayState {
    #[default]
    Idle,
    Replaying,
}

type HistoryStep = fn(&mut HistoryManager) -> Option<Result<Replayed, CommandError>>;

/// Tree data source over the domain graph with undo/redo history.
pub struct UndoableTreeModel {
    roots: Vec<Node>,
    shadows: Vec<ShadowNode>,
    history: HistoryManager,
    batch_depth: usize,
    pending: Vec<Box<dyn Command>>,
    replay: ReplayState,
    unsaved: bool,
    events: Vec<TreeEvent>,
    selection: Vec<Node>,
    drop_target: Option<(Node, DropPosition)>,
    config: EditorConfig,
}

impl fmt::Debug for UndoableTreeModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UndoableTreeModel")
            .field("roots", &self.roots.len())
            .field("history", &self.history)
            .field("batch_depth", &self.batch_depth)
            .field("pending", &self.pending.len())
            .field("replay", &self.replay)
            .field("unsaved", &self.unsaved)
            .field("queued_events", &self.events.len())
            .finish()
    }
}

impl UndoableTreeModel {
    /// Model over `roots` with the default configuration.
    #[must_use]
    pub fn new(roots: Vec<Node>) -> Self {
        Self::with_config(roots, EditorConfig::default())
    }

    /// Model over `roots`. With `expand_roots` set, every root's children
    /// are materialized immediately.
    #[must_use]
    pub fn with_config(roots: Vec<Node>, config: EditorConfig) -> Self {
        let shadows = roots.iter().cloned().map(ShadowNode::new).collect();
        let mut model = Self {
            roots,
            shadows,
            history: HistoryManager::new(config.history.clone()),
            batch_depth: 0,
            pending: Vec::new(),
            replay: ReplayState::Idle,
            unsaved: false,
            events: Vec::new(),
            selection: Vec::new(),
            drop_target: None,
            config,
        };
        model.expand_roots();
        model
    }

    fn expand_roots(&mut self) {
        if !self.config.expand_roots {
            return;
        }
        for index in 0..self.roots.len() {
            self.expand(&TreePath::root().child(index));
        }
    }

    #[must_use]
    pub fn roots(&self) -> &[Node] {
        &self.roots
    }

    #[must_use]
    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    // ========================================================================
    // Tree data source
    // ========================================================================

    /// Node whose shadow sits at `path`.
    #[must_use]
    pub fn node_at(&self, path: &TreePath) -> Option<Node> {
        shadow::resolve(&self.shadows, path).map(|s| s.node.clone())
    }

    /// Current children of the node at `path`; the roots for the virtual
    /// root. Loads a lazy node on first access, raising [`TreeEvent::Changed`].
    pub fn get_children(&mut self, path: &TreePath) -> Vec<Node> {
        if path.is_root() {
            return self.roots.clone();
        }
        match self.node_at(path) {
            Some(node) => self.children_of(&node),
            None => {
                tracing::trace!(target: "nbted.tree", path = %path, "unresolved path");
                Vec::new()
            }
        }
    }

    /// Whether the node at `path` should render as expandable. Never loads.
    #[must_use]
    pub fn has_children(&self, path: &TreePath) -> bool {
        if path.is_root() {
            return !self.roots.is_empty();
        }
        self.node_at(path)
            .is_some_and(|node| node.always_expandable() || !node.children().is_empty())
    }

    #[must_use]
    pub fn is_leaf(&self, path: &TreePath) -> bool {
        !self.has_children(path)
    }

    /// Materialize the children of the node at `path`, as the widget does on
    /// first expansion. Emits no structural event. Returns `false` when the
    /// path does not resolve.
    pub fn expand(&mut self, path: &TreePath) -> bool {
        if path.is_root() {
            return true;
        }
        let Some(node) = self.node_at(path) else {
            return false;
        };
        let children = self.children_of(&node);
        match shadow::resolve_mut(&mut self.shadows, path) {
            Some(shadow) => {
                shadow.replace_children(children);
                shadow.expanded_once = true;
                true
            }
            None => false,
        }
    }

    fn children_of(&mut self, node: &Node) -> Vec<Node> {
        match node.load_if_needed() {
            Ok(true) => self.events.push(TreeEvent::Changed),
            Ok(false) => {}
            Err(err) => {
                tracing::debug!(
                    target: "nbted.tree",
                    node = %node.label(),
                    error = %err,
                    "lazy node has no children until it loads"
                );
            }
        }
        node.children()
    }

    // ========================================================================
    // Reconciliation
    // ========================================================================

    /// Bring the shadow of `object` in line with its real children and emit
    /// the structural events for the difference.
    ///
    /// Returns `None` when `object` is not materialized.
    pub fn notify_changed(&mut self, object: &Node) -> Option<Reconciliation> {
        let Some(path) = locate::locate(&self.shadows, object) else {
            tracing::trace!(
                target: "nbted.tree",
                object = %object.label(),
                "change notification for an object not in view"
            );
            return None;
        };
        let node = self.node_at(&path)?;
        let real = self.children_of(&node);

        let shadow = shadow::resolve_mut(&mut self.shadows, &path)?;
        let real_keys: HashSet<NodeKey> = real.iter().map(Node::key).collect();
        let cached_keys: HashSet<NodeKey> = shadow.children.iter().map(|c| c.node.key()).collect();
        let (removed_indices, removed): (Vec<usize>, Vec<Node>) = shadow
            .children
            .iter()
            .enumerate()
            .filter(|(_, c)| !real_keys.contains(&c.node.key()))
            .map(|(i, c)| (i, c.node.clone()))
            .unzip();
        let (added_indices, added): (Vec<usize>, Vec<Node>) = real
            .iter()
            .enumerate()
            .filter(|(_, n)| !cached_keys.contains(&n.key()))
            .map(|(i, n)| (i, n.clone()))
            .unzip();
        let expanded_once = shadow.expanded_once;
        shadow.replace_children(real.clone());
        if !added.is_empty() {
            shadow.expanded_once = true;
        }

        tracing::trace!(
            target: "nbted.tree",
            path = %path,
            added = added.len(),
            removed = removed.len(),
            "reconciled"
        );
        self.events.push(TreeEvent::NodesChanged {
            path: path.clone(),
            nodes: real,
        });
        if !removed.is_empty() {
            self.events.push(TreeEvent::NodesRemoved {
                path: path.clone(),
                indices: removed_indices,
                nodes: removed.clone(),
            });
        }
        if !added.is_empty() {
            // The widget's own lazy load picks these up when it expands.
            if expanded_once {
                self.events.push(TreeEvent::NodesInserted {
                    path: path.clone(),
                    indices: added_indices,
                    nodes: added.clone(),
                });
            } else {
                tracing::trace!(target: "nbted.tree", path = %path, "insert suppressed before first expansion");
            }
        }
        self.mark_unsaved();
        Some(Reconciliation {
            path,
            added,
            removed,
        })
    }

    /// Path of the shadow standing for `object`, if materialized.
    #[must_use]
    pub fn find(&self, object: &Node) -> Option<TreePath> {
        locate::locate(&self.shadows, object)
    }

    fn reconcile_all(&mut self, targets: &[Node]) {
        for target in targets {
            self.notify_changed(target);
        }
    }

    /// Append a root and announce it at the virtual root.
    pub fn add_root(&mut self, node: Node) {
        let index = self.roots.len();
        self.roots.push(node.clone());
        self.shadows.push(ShadowNode::new(node.clone()));
        self.events.push(TreeEvent::NodesInserted {
            path: TreePath::root(),
            indices: vec![index],
            nodes: vec![node],
        });
        if self.config.expand_roots {
            self.expand(&TreePath::root().child(index));
        }
    }

    /// Drop every shadow and rebuild from the roots.
    pub fn refresh(&mut self) {
        self.shadows = self.roots.iter().cloned().map(ShadowNode::new).collect();
        self.expand_roots();
        self.events.push(TreeEvent::StructureChanged {
            path: TreePath::root(),
        });
    }

    // ========================================================================
    // History
    // ========================================================================

    /// Execute `cmd`, reconcile everything it touched, and record it.
    ///
    /// # Errors
    ///
    /// The command's execution error; nothing is recorded then.
    pub fn execute(&mut self, mut cmd: Box<dyn Command>) -> CommandResult {
        cmd.execute()?;
        let targets = cmd.targets();
        self.reconcile_all(&targets);
        self.push_undo(cmd);
        Ok(())
    }

    /// Record an already-executed command.
    ///
    /// Inside a batch the command is held until the outermost batch
    /// finishes. Otherwise it goes straight onto the undo stack, clearing
    /// redo unless history is being replayed.
    pub fn push_undo(&mut self, cmd: Box<dyn Command>) {
        if self.batch_depth > 0 {
            self.pending.push(cmd);
            tracing::debug!(
                target: "nbted.undo",
                pending = self.pending.len(),
                "command added to batch"
            );
            return;
        }
        match self.replay {
            ReplayState::Idle => self.history.push(cmd),
            ReplayState::Replaying => self.history.push_keep_redo(cmd),
        }
        tracing::debug!(
            target: "nbted.undo",
            undo_depth = self.history.undo_depth(),
            redo_depth = self.history.redo_depth(),
            "command added to undo stack"
        );
        self.mark_unsaved();
    }

    /// Undo the newest entry. `None` when there is nothing to undo; on
    /// error the entry stays on the undo stack.
    pub fn undo(&mut self) -> Option<Result<Replayed, CommandError>> {
        self.replay_with("undo", HistoryManager::undo, HistoryManager::next_undo_targets)
    }

    /// Redo the newest undone entry. `None` when there is nothing to redo.
    pub fn redo(&mut self) -> Option<Result<Replayed, CommandError>> {
        self.replay_with("redo", HistoryManager::redo, HistoryManager::next_redo_targets)
    }

    fn replay_with(
        &mut self,
        action: &'static str,
        step: HistoryStep,
        failed_targets: fn(&HistoryManager) -> Vec<Node>,
    ) -> Option<Result<Replayed, CommandError>> {
        self.replay = ReplayState::Replaying;
        let outcome = step(&mut self.history);
        match &outcome {
            Some(Ok(replayed)) => self.reconcile_all(&replayed.targets),
            // The entry stayed on its stack; show whatever the document holds now.
            Some(Err(_)) => {
                let targets = failed_targets(&self.history);
                self.reconcile_all(&targets);
            }
            None => {}
        }
        self.replay = ReplayState::Idle;

        match &outcome {
            Some(Ok(replayed)) => tracing::debug!(
                target: "nbted.undo",
                action,
                description = %replayed.description,
                undo_depth = self.history.undo_depth(),
                redo_depth = self.history.redo_depth(),
                "history replayed"
            ),
            Some(Err(err)) => tracing::warn!(
                target: "nbted.undo",
                action,
                error = %err,
                "replay failed; history unchanged"
            ),
            None => return None,
        }
        self.events.push(TreeEvent::Changed);
        outcome
    }

    /// Open a batch. Batches nest.
    pub fn start_batch(&mut self) {
        self.batch_depth += 1;
        tracing::debug!(target: "nbted.undo", depth = self.batch_depth, "batch started");
    }

    /// Close a batch. When the outermost batch closes, everything pushed
    /// since it opened becomes one undo entry. Without an open batch this
    /// does nothing.
    pub fn finish_batch(&mut self) {
        if self.batch_depth == 0 {
            tracing::debug!(target: "nbted.undo", "finish_batch without an open batch");
            return;
        }
        self.batch_depth -= 1;
        if self.batch_depth > 0 || self.pending.is_empty() {
            return;
        }
        let parts = std::mem::take(&mut self.pending);
        let count = parts.len();
        let merged = MergedCommand::from_executed(parts);
        match self.replay {
            ReplayState::Idle => self.history.push(Box::new(merged)),
            ReplayState::Replaying => self.history.push_keep_redo(Box::new(merged)),
        }
        tracing::debug!(
            target: "nbted.undo",
            merged = count,
            undo_depth = self.history.undo_depth(),
            "batch merged"
        );
        self.mark_unsaved();
    }

    #[must_use]
    pub fn batch_depth(&self) -> usize {
        self.batch_depth
    }

    #[must_use]
    pub fn replay_state(&self) -> ReplayState {
        self.replay
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    #[must_use]
    pub fn undo_depth(&self) -> usize {
        self.history.undo_depth()
    }

    #[must_use]
    pub fn redo_depth(&self) -> usize {
        self.history.redo_depth()
    }

    /// Undo menu entries, newest first.
    pub fn undo_descriptions(&self, limit: usize) -> Vec<&str> {
        self.history.undo_descriptions(limit)
    }

    /// Redo menu entries, newest first.
    pub fn redo_descriptions(&self, limit: usize) -> Vec<&str> {
        self.history.redo_descriptions(limit)
    }

    #[must_use]
    pub fn next_undo_description(&self) -> Option<&str> {
        self.history.next_undo_description()
    }

    #[must_use]
    pub fn next_redo_description(&self) -> Option<&str> {
        self.history.next_redo_description()
    }

    #[must_use]
    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    // ========================================================================
    // Dirtiness and events
    // ========================================================================

    #[must_use]
    pub fn has_unsaved_changes(&self) -> bool {
        self.unsaved
    }

    /// Called by the save path once the document is on disk.
    pub fn set_saved(&mut self) {
        self.unsaved = false;
        self.events.push(TreeEvent::Changed);
    }

    fn mark_unsaved(&mut self) {
        self.unsaved = true;
        self.events.push(TreeEvent::Changed);
    }

    /// Drain queued events in emission order.
    pub fn take_events(&mut self) -> Vec<TreeEvent> {
        std::mem::take(&mut self.events)
    }

    // ========================================================================
    // Selection and drop target
    // ========================================================================

    /// Replace the selection. Paths that do not resolve are skipped.
    pub fn select(&mut self, paths: &[TreePath]) {
        self.selection = paths.iter().filter_map(|p| self.node_at(p)).collect();
    }

    #[must_use]
    pub fn selected_node(&self) -> Option<&Node> {
        self.selection.first()
    }

    #[must_use]
    pub fn selected_nodes(&self) -> &[Node] {
        &self.selection
    }

    /// Tag behind the primary selection.
    #[must_use]
    pub fn selected_tag(&self) -> Option<TagRef> {
        self.selection.first().and_then(Node::tag)
    }

    /// Tags behind the selection; folders and region files have none.
    #[must_use]
    pub fn selected_tags(&self) -> Vec<TagRef> {
        self.selection.iter().filter_map(Node::tag).collect()
    }

    /// Point the drop target at `path`. Returns `false` if it does not resolve.
    pub fn set_drop_target(&mut self, path: &TreePath, position: DropPosition) -> bool {
        self.drop_target = self.node_at(path).map(|node| (node, position));
        self.drop_target.is_some()
    }

    pub fn clear_drop_target(&mut self) {
        self.drop_target = None;
    }

    #[must_use]
    pub fn drop_node(&self) -> Option<&Node> {
        self.drop_target.as_ref().map(|(node, _)| node)
    }

    #[must_use]
    pub fn drop_tag(&self) -> Option<TagRef> {
        self.drop_node().and_then(Node::tag)
    }

    #[must_use]
    pub fn drop_position(&self) -> Option<DropPosition> {
        self.drop_target.as_ref().map(|(_, position)| *position)
    }

    /// Tags behind dragged rows.
    #[must_use]
    pub fn tags_from_paths(&self, paths: &[TreePath]) -> Vec<TagRef> {
        paths
            .iter()
            .filter_map(|p| self.node_at(p))
            .filter_map(|node| node.tag())
            .collect()
    }

    /// Materialized documents, folders and region files, breadth-first.
    #[must_use]
    pub fn opened_files(&self) -> Vec<Node> {
        locate::walk(&self.shadows)
            .into_iter()
            .filter(|(_, shadow)| shadow.node.is_saveable())
            .map(|(_, shadow)| shadow.node.clone())
            .collect()
    }
}

// ============================================================================
// Tests
// ============================================================================
