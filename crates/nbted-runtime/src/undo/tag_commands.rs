#![forbid(unsafe_code)]

//! Built-in commands over tags.
//!
//! Each command captures the handles and values it needs when it is built,
//! so replaying it never consults editor state.

use nbted_core::{Node, Payload, TagRef};

use super::command::{Command, CommandError, CommandMetadata, CommandResult, CommandSource};

/// Approximate heap size of a payload for history budgeting.
fn payload_size(payload: &Payload) -> usize {
    let heap = match payload {
        Payload::ByteArray(v) => v.len(),
        Payload::String(s) => s.len(),
        Payload::IntArray(v) => v.len() * 4,
        Payload::LongArray(v) => v.len() * 8,
        Payload::List { items, .. } => items.len() * std::mem::size_of::<TagRef>(),
        Payload::Compound(entries) => entries.len() * std::mem::size_of::<TagRef>(),
        _ => 0,
    };
    std::mem::size_of::<Payload>() + heap
}

// ============================================================================
// Value replacement
// ============================================================================

/// Replace a tag's payload with another of the same kind.
pub struct ChangeValueCmd {
    tag: TagRef,
    old: Payload,
    new: Payload,
    metadata: CommandMetadata,
}

impl ChangeValueCmd {
    /// Record the tag's current payload as the undo value.
    #[must_use]
    pub fn new(tag: TagRef, new: Payload) -> Self {
        let old = tag.payload().clone();
        let metadata = CommandMetadata::new(format!("Change value of {}", tag.describe()));
        Self {
            tag,
            old,
            new,
            metadata,
        }
    }

    #[must_use]
    pub fn with_source(mut self, source: CommandSource) -> Self {
        self.metadata.source = source;
        self
    }
}

impl Command for ChangeValueCmd {
    fn execute(&mut self) -> CommandResult {
        self.tag.set_payload(self.new.clone())?;
        Ok(())
    }

    fn undo(&mut self) -> CommandResult {
        self.tag.set_payload(self.old.clone())?;
        Ok(())
    }

    fn size_bytes(&self) -> usize {
        std::mem::size_of::<Self>()
            + payload_size(&self.old)
            + payload_size(&self.new)
            + self.metadata.size_bytes()
    }

    fn metadata(&self) -> &CommandMetadata {
        &self.metadata
    }

    fn targets(&self) -> Vec<Node> {
        vec![Node::Tag(self.tag.clone())]
    }

    fn debug_name(&self) -> &'static str {
        "ChangeValueCmd"
    }
}

/// Rename a tag.
///
/// Entries of a container are renamed through it, so compound entries stay
/// named and unique.
pub struct RenameCmd {
    parent: Option<TagRef>,
    tag: TagRef,
    old: Option<String>,
    new: Option<String>,
    metadata: CommandMetadata,
}

impl RenameCmd {
    /// Rename `tag`, a child of `parent`.
    #[must_use]
    pub fn new(parent: TagRef, tag: TagRef, new: Option<String>) -> Self {
        Self::build(Some(parent), tag, new)
    }

    /// Rename a tag that sits in no container (a document root, chunk data
    /// or a top-level node).
    #[must_use]
    pub fn detached(tag: TagRef, new: Option<String>) -> Self {
        Self::build(None, tag, new)
    }

    fn build(parent: Option<TagRef>, tag: TagRef, new: Option<String>) -> Self {
        let old = tag.name();
        let metadata = CommandMetadata::new(format!("Rename {}", tag.describe()));
        Self {
            parent,
            tag,
            old,
            new,
            metadata,
        }
    }

    fn apply_name(&self, name: Option<String>) -> CommandResult {
        match &self.parent {
            Some(parent) => {
                parent.rename_child(&self.tag, name)?;
            }
            None => {
                self.tag.rename(name);
            }
        }
        Ok(())
    }
}

impl Command for RenameCmd {
    fn execute(&mut self) -> CommandResult {
        self.apply_name(self.new.clone())
    }

    fn undo(&mut self) -> CommandResult {
        self.apply_name(self.old.clone())
    }

    fn size_bytes(&self) -> usize {
        std::mem::size_of::<Self>()
            + self.old.as_ref().map_or(0, String::len)
            + self.new.as_ref().map_or(0, String::len)
            + self.metadata.size_bytes()
    }

    fn metadata(&self) -> &CommandMetadata {
        &self.metadata
    }

    fn targets(&self) -> Vec<Node> {
        self.parent
            .iter()
            .chain(std::iter::once(&self.tag))
            .map(|t| Node::Tag(t.clone()))
            .collect()
    }

    fn debug_name(&self) -> &'static str {
        "RenameCmd"
    }
}

// ============================================================================
// Structural edits
// ============================================================================

/// Remove every child of a list or compound.
pub struct ClearCmd {
    container: TagRef,
    removed: Vec<TagRef>,
    metadata: CommandMetadata,
}

impl ClearCmd {
    #[must_use]
    pub fn new(container: TagRef) -> Self {
        let metadata = CommandMetadata::new(format!("Clear {}", container.describe()));
        Self {
            container,
            removed: Vec::new(),
            metadata,
        }
    }
}

impl Command for ClearCmd {
    fn execute(&mut self) -> CommandResult {
        self.removed = self.container.clear_children()?;
        Ok(())
    }

    fn undo(&mut self) -> CommandResult {
        if self.container.child_count() != 0 {
            return Err(CommandError::StaleTarget(format!(
                "{} gained children after being cleared",
                self.container.describe()
            )));
        }
        self.container.push_children(self.removed.clone())?;
        Ok(())
    }

    fn size_bytes(&self) -> usize {
        std::mem::size_of::<Self>()
            + self.removed.len() * std::mem::size_of::<TagRef>()
            + self.metadata.size_bytes()
    }

    fn metadata(&self) -> &CommandMetadata {
        &self.metadata
    }

    fn targets(&self) -> Vec<Node> {
        vec![Node::Tag(self.container.clone())]
    }

    fn debug_name(&self) -> &'static str {
        "ClearCmd"
    }
}

/// Append children to the end of a list or compound.
pub struct AddRangeCmd {
    container: TagRef,
    items: Vec<TagRef>,
    /// Child count before the append, set on execute.
    start: usize,
    metadata: CommandMetadata,
}

impl AddRangeCmd {
    #[must_use]
    pub fn new(container: TagRef, items: Vec<TagRef>) -> Self {
        let metadata = CommandMetadata::new(format!(
            "Add {} tags to {}",
            items.len(),
            container.describe()
        ));
        Self {
            container,
            items,
            start: 0,
            metadata,
        }
    }
}

impl Command for AddRangeCmd {
    fn execute(&mut self) -> CommandResult {
        self.start = self.container.child_count();
        for (offset, item) in self.items.iter().enumerate() {
            if let Err(err) = self.container.insert_child(self.start + offset, item.clone()) {
                for _ in 0..offset {
                    if let Err(rollback) = self.container.remove_child(self.start) {
                        tracing::warn!(
                            target: "nbted.undo",
                            container = %self.container.describe(),
                            error = %rollback,
                            "add range rollback failed"
                        );
                        break;
                    }
                }
                return Err(err.into());
            }
        }
        Ok(())
    }

    fn undo(&mut self) -> CommandResult {
        let expected = self.start + self.items.len();
        if self.container.child_count() != expected {
            return Err(CommandError::StaleTarget(format!(
                "{} has {} children, expected {expected}",
                self.container.describe(),
                self.container.child_count()
            )));
        }
        for _ in 0..self.items.len() {
            self.container.remove_child(self.start)?;
        }
        Ok(())
    }

    fn size_bytes(&self) -> usize {
        std::mem::size_of::<Self>()
            + self.items.len() * std::mem::size_of::<TagRef>()
            + self.metadata.size_bytes()
    }

    fn metadata(&self) -> &CommandMetadata {
        &self.metadata
    }

    fn targets(&self) -> Vec<Node> {
        vec![Node::Tag(self.container.clone())]
    }

    fn debug_name(&self) -> &'static str {
        "AddRangeCmd"
    }
}

/// Insert one child at an index.
pub struct InsertTagCmd {
    parent: TagRef,
    index: usize,
    child: TagRef,
    metadata: CommandMetadata,
}

impl InsertTagCmd {
    #[must_use]
    pub fn new(parent: TagRef, index: usize, child: TagRef) -> Self {
        let metadata = CommandMetadata::new(format!(
            "Add {} to {}",
            child.describe(),
            parent.describe()
        ));
        Self {
            parent,
            index,
            child,
            metadata,
        }
    }
}

impl Command for InsertTagCmd {
    fn execute(&mut self) -> CommandResult {
        self.parent.insert_child(self.index, self.child.clone())?;
        Ok(())
    }

    fn undo(&mut self) -> CommandResult {
        match self.parent.index_of(&self.child) {
            Some(index) => {
                self.parent.remove_child(index)?;
                Ok(())
            }
            None => Err(CommandError::StaleTarget(self.child.describe())),
        }
    }

    fn size_bytes(&self) -> usize {
        std::mem::size_of::<Self>() + self.metadata.size_bytes()
    }

    fn metadata(&self) -> &CommandMetadata {
        &self.metadata
    }

    fn targets(&self) -> Vec<Node> {
        vec![Node::Tag(self.parent.clone())]
    }

    fn debug_name(&self) -> &'static str {
        "InsertTagCmd"
    }
}

/// Remove one child, remembering where it was.
pub struct RemoveTagCmd {
    parent: TagRef,
    child: TagRef,
    /// Position the child occupied, set on execute.
    index: usize,
    metadata: CommandMetadata,
}

impl RemoveTagCmd {
    #[must_use]
    pub fn new(parent: TagRef, child: TagRef) -> Self {
        let metadata = CommandMetadata::new(format!("Remove {}", child.describe()));
        Self {
            parent,
            child,
            index: 0,
            metadata,
        }
    }
}

impl Command for RemoveTagCmd {
    fn execute(&mut self) -> CommandResult {
        let index = self
            .parent
            .index_of(&self.child)
            .ok_or_else(|| CommandError::StaleTarget(self.child.describe()))?;
        self.parent.remove_child(index)?;
        self.index = index;
        Ok(())
    }

    fn undo(&mut self) -> CommandResult {
        self.parent.insert_child(self.index, self.child.clone())?;
        Ok(())
    }

    fn size_bytes(&self) -> usize {
        std::mem::size_of::<Self>() + self.metadata.size_bytes()
    }

    fn metadata(&self) -> &CommandMetadata {
        &self.metadata
    }

    fn targets(&self) -> Vec<Node> {
        vec![Node::Tag(self.parent.clone())]
    }

    fn debug_name(&self) -> &'static str {
        "RemoveTagCmd"
    }
}
