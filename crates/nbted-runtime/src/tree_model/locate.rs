#![forbid(unsafe_code)]

//! Finding the shadow that currently represents a domain object.
//!
//! Both passes are breadth-first scans over materialized shadows, so cost is
//! bounded by what the widget shows. Everything the model needs goes through
//! [`locate`], which keeps the scan replaceable by a reverse index.

use std::collections::VecDeque;

use nbted_core::{Node, TagRef};

use super::shadow::{ShadowNode, TreePath};

/// Path of the shadow standing for `target`.
///
/// Direct identity wins. A tag that matches nothing directly is then looked
/// up as the root of a document or the data of a loaded chunk, since
/// collaborators editing that content cannot tell it is shown through its
/// owner.
pub(crate) fn locate(roots: &[ShadowNode], target: &Node) -> Option<TreePath> {
    breadth_first(roots, |shadow| shadow.node == *target).or_else(|| match target {
        Node::Tag(tag) => wrapped(roots, tag),
        _ => None,
    })
}

fn wrapped(roots: &[ShadowNode], tag: &TagRef) -> Option<TreePath> {
    breadth_first(roots, |shadow| shadow.node.wraps(tag))
}

/// Every materialized shadow with its path, in breadth-first order.
pub(crate) fn walk(roots: &[ShadowNode]) -> Vec<(TreePath, &ShadowNode)> {
    let mut out = Vec::new();
    let mut queue: VecDeque<(TreePath, &ShadowNode)> = roots
        .iter()
        .enumerate()
        .map(|(i, shadow)| (TreePath::root().child(i), shadow))
        .collect();
    while let Some((path, shadow)) = queue.pop_front() {
        for (i, child) in shadow.children.iter().enumerate() {
            queue.push_back((path.child(i), child));
        }
        out.push((path, shadow));
    }
    out
}

fn breadth_first<F>(roots: &[ShadowNode], matches: F) -> Option<TreePath>
where
    F: Fn(&ShadowNode) -> bool,
{
    let mut queue: VecDeque<(TreePath, &ShadowNode)> = roots
        .iter()
        .enumerate()
        .map(|(i, shadow)| (TreePath::root().child(i), shadow))
        .collect();
    while let Some((path, shadow)) = queue.pop_front() {
        if matches(shadow) {
            return Some(path);
        }
        for (i, child) in shadow.children.iter().enumerate() {
            queue.push_back((path.child(i), child));
        }
    }
    None
}
