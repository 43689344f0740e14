#![forbid(unsafe_code)]

//! Shadow tree: the model's cached view of what the widget has materialized.

use std::collections::HashMap;
use std::fmt;

use nbted_core::{Node, NodeKey};

/// Position of a node as child indices from the virtual root.
///
/// The empty path is the virtual root whose children are the model's roots.
/// Paths are computed on demand and go stale after any structural change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct TreePath(Vec<usize>);

impl TreePath {
    /// The virtual root.
    #[must_use]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Path of the `index`th child of this node.
    #[must_use]
    pub fn child(&self, index: usize) -> Self {
        let mut indices = self.0.clone();
        indices.push(index);
        Self(indices)
    }

    /// Parent path; `None` for the virtual root.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        let (_, head) = self.0.split_last()?;
        Some(Self(head.to_vec()))
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn indices(&self) -> &[usize] {
        &self.0
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// Index within the parent.
    #[must_use]
    pub fn last(&self) -> Option<usize> {
        self.0.last().copied()
    }
}

impl From<Vec<usize>> for TreePath {
    fn from(indices: Vec<usize>) -> Self {
        Self(indices)
    }
}

impl From<&[usize]> for TreePath {
    fn from(indices: &[usize]) -> Self {
        Self(indices.to_vec())
    }
}

impl fmt::Display for TreePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("/");
        }
        for index in &self.0 {
            write!(f, "/{index}")?;
        }
        Ok(())
    }
}

/// Cached shadow of one domain node.
#[derive(Debug, Clone)]
pub(crate) struct ShadowNode {
    pub(crate) node: Node,
    pub(crate) children: Vec<ShadowNode>,
    /// Set once the children were materialized by an expansion or a
    /// reconciliation that found new children.
    pub(crate) expanded_once: bool,
}

impl ShadowNode {
    pub(crate) fn new(node: Node) -> Self {
        Self {
            node,
            children: Vec::new(),
            expanded_once: false,
        }
    }

    /// Replace the cached children with `real`, keeping the existing shadow
    /// subtree of every child that is still present.
    pub(crate) fn replace_children(&mut self, real: Vec<Node>) {
        let mut old: HashMap<NodeKey, ShadowNode> = self
            .children
            .drain(..)
            .map(|shadow| (shadow.node.key(), shadow))
            .collect();
        self.children = real
            .into_iter()
            .map(|node| old.remove(&node.key()).unwrap_or_else(|| Self::new(node)))
            .collect();
    }
}

/// Shadow at `path` below `roots`. `None` for the virtual root and for paths
/// that run past what is materialized.
pub(crate) fn resolve<'a>(roots: &'a [ShadowNode], path: &TreePath) -> Option<&'a ShadowNode> {
    let (first, rest) = path.indices().split_first()?;
    let mut shadow = roots.get(*first)?;
    for index in rest {
        shadow = shadow.children.get(*index)?;
    }
    Some(shadow)
}

pub(crate) fn resolve_mut<'a>(
    roots: &'a mut [ShadowNode],
    path: &TreePath,
) -> Option<&'a mut ShadowNode> {
    let (first, rest) = path.indices().split_first()?;
    let mut shadow = roots.get_mut(*first)?;
    for index in rest {
        shadow = shadow.children.get_mut(*index)?;
    }
    Some(shadow)
}
