#![forbid(unsafe_code)]

use nbted_core::Node;

use super::shadow::TreePath;

/// Notification for the presentation widget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeEvent {
    /// The children of `path` were updated in place; `nodes` is the full
    /// current child list.
    NodesChanged { path: TreePath, nodes: Vec<Node> },
    /// New children of `path` at `indices` of the current child list.
    NodesInserted {
        path: TreePath,
        indices: Vec<usize>,
        nodes: Vec<Node>,
    },
    /// Children of `path` dropped; `indices` refer to the previous list.
    NodesRemoved {
        path: TreePath,
        indices: Vec<usize>,
        nodes: Vec<Node>,
    },
    /// Everything below `path` must be rebuilt.
    StructureChanged { path: TreePath },
    /// Dirtiness or undo/redo availability may have changed.
    Changed,
}

impl TreeEvent {
    /// Path the event applies to. `None` for [`TreeEvent::Changed`].
    #[must_use]
    pub fn path(&self) -> Option<&TreePath> {
        match self {
            Self::NodesChanged { path, .. }
            | Self::NodesInserted { path, .. }
            | Self::NodesRemoved { path, .. }
            | Self::StructureChanged { path } => Some(path),
            Self::Changed => None,
        }
    }
}

/// Where a drop lands relative to the target node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropPosition {
    Before,
    After,
    Inside,
}

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    /// Path of the reconciled shadow.
    pub path: TreePath,
    /// Children present now that were not cached.
    pub added: Vec<Node>,
    /// Cached children that are gone.
    pub removed: Vec<Node>,
}

impl Reconciliation {
    /// Nothing structural changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}
