#![forbid(unsafe_code)]

//! Documents, folders, region files and chunks, plus the [`Node`] variant
//! the tree model dispatches on.
//!
//! Capability set per node kind:
//!
//! | Kind     | Children                      | Lazy | Edit target   |
//! |----------|-------------------------------|------|---------------|
//! | Folder   | subfolders, then documents    | no   | none          |
//! | Document | entries of its root compound  | no   | root compound |
//! | Region   | chunks that are present       | no   | none          |
//! | Chunk    | entries of its data compound  | yes  | data compound |
//! | Tag      | list items / compound entries | no   | itself        |

use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::LoadError;
use crate::shared::Shared;
use crate::tag::TagRef;

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// A single tag file: a root compound plus where it came from.
#[derive(Debug)]
pub struct Document {
    path: Option<PathBuf>,
    root: TagRef,
}

pub type DocumentRef = Shared<Document>;

impl Shared<Document> {
    #[must_use]
    pub fn new(path: Option<PathBuf>, root: TagRef) -> Self {
        Self::wrap(Document { path, root })
    }

    #[must_use]
    pub fn path(&self) -> Option<PathBuf> {
        self.borrow().path.clone()
    }

    pub fn set_path(&self, path: impl AsRef<Path>) {
        self.borrow_mut().path = Some(path.as_ref().to_path_buf());
    }

    /// The root compound.
    #[must_use]
    pub fn root(&self) -> TagRef {
        self.borrow().root.clone()
    }

    /// Swap the root compound, returning the previous one.
    pub fn set_root(&self, root: TagRef) -> TagRef {
        std::mem::replace(&mut self.borrow_mut().root, root)
    }
}

// ---------------------------------------------------------------------------
// Folder
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct Folder {
    name: String,
    subfolders: Vec<FolderRef>,
    documents: Vec<DocumentRef>,
}

pub type FolderRef = Shared<Folder>;

impl Shared<Folder> {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::wrap(Folder {
            name: name.into(),
            subfolders: Vec::new(),
            documents: Vec::new(),
        })
    }

    #[must_use]
    pub fn name(&self) -> String {
        self.borrow().name.clone()
    }

    #[must_use]
    pub fn subfolders(&self) -> Vec<FolderRef> {
        self.borrow().subfolders.clone()
    }

    #[must_use]
    pub fn documents(&self) -> Vec<DocumentRef> {
        self.borrow().documents.clone()
    }

    pub fn add_subfolder(&self, folder: FolderRef) {
        self.borrow_mut().subfolders.push(folder);
    }

    pub fn add_document(&self, document: DocumentRef) {
        self.borrow_mut().documents.push(document);
    }

    /// Detach a document by identity. Returns whether it was present.
    pub fn remove_document(&self, document: &DocumentRef) -> bool {
        let mut folder = self.borrow_mut();
        let before = folder.documents.len();
        folder.documents.retain(|d| d != document);
        folder.documents.len() != before
    }
}

// ---------------------------------------------------------------------------
// Region file and chunks
// ---------------------------------------------------------------------------

/// Number of chunk slots in a region (32 x 32).
pub const REGION_SLOTS: usize = 1024;

#[derive(Debug)]
pub struct RegionFile {
    name: String,
    slots: Vec<Option<ChunkRef>>,
}

pub type RegionRef = Shared<RegionFile>;

impl Shared<RegionFile> {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::wrap(RegionFile {
            name: name.into(),
            slots: vec![None; REGION_SLOTS],
        })
    }

    #[must_use]
    pub fn name(&self) -> String {
        self.borrow().name.clone()
    }

    /// Place (or clear) the chunk at `slot`. Out-of-range slots are ignored.
    pub fn set_chunk(&self, slot: usize, chunk: Option<ChunkRef>) {
        if let Some(entry) = self.borrow_mut().slots.get_mut(slot) {
            *entry = chunk;
        }
    }

    /// Present chunks in slot order.
    #[must_use]
    pub fn chunks(&self) -> Vec<ChunkRef> {
        self.borrow().slots.iter().flatten().cloned().collect()
    }
}

/// Reads a chunk's data compound on demand.
pub type ChunkLoader = Box<dyn Fn() -> Result<TagRef, LoadError>>;

enum ChunkState {
    Unloaded(ChunkLoader),
    Loaded(TagRef),
}

pub struct Chunk {
    x: i32,
    z: i32,
    state: ChunkState,
}

impl fmt::Debug for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chunk")
            .field("x", &self.x)
            .field("z", &self.z)
            .field("loaded", &matches!(self.state, ChunkState::Loaded(_)))
            .finish()
    }
}

pub type ChunkRef = Shared<Chunk>;

impl Shared<Chunk> {
    /// A chunk whose data is read on first access.
    #[must_use]
    pub fn lazy<F>(x: i32, z: i32, loader: F) -> Self
    where
        F: Fn() -> Result<TagRef, LoadError> + 'static,
    {
        Self::wrap(Chunk {
            x,
            z,
            state: ChunkState::Unloaded(Box::new(loader)),
        })
    }

    /// A chunk with its data already in memory.
    #[must_use]
    pub fn loaded(x: i32, z: i32, data: TagRef) -> Self {
        Self::wrap(Chunk {
            x,
            z,
            state: ChunkState::Loaded(data),
        })
    }

    #[must_use]
    pub fn coords(&self) -> (i32, i32) {
        let chunk = self.borrow();
        (chunk.x, chunk.z)
    }

    #[must_use]
    pub fn is_loaded(&self) -> bool {
        matches!(self.borrow().state, ChunkState::Loaded(_))
    }

    /// Data compound, if loaded.
    #[must_use]
    pub fn data(&self) -> Option<TagRef> {
        match &self.borrow().state {
            ChunkState::Loaded(data) => Some(data.clone()),
            ChunkState::Unloaded(_) => None,
        }
    }

    /// Run the loader if the chunk is not loaded yet.
    ///
    /// Returns `Ok(true)` when this call performed the load.
    ///
    /// # Errors
    ///
    /// Propagates the loader's error; the chunk stays unloaded and a later
    /// call retries.
    pub fn load(&self) -> Result<bool, LoadError> {
        let result = match &self.borrow().state {
            ChunkState::Loaded(_) => return Ok(false),
            ChunkState::Unloaded(loader) => loader(),
        };
        #[cfg(feature = "tracing")]
        {
            let (x, z) = self.coords();
            match &result {
                Ok(_) => tracing::debug!(target: "nbted.core", x, z, "chunk loaded"),
                Err(err) => {
                    tracing::warn!(target: "nbted.core", x, z, error = %err, "chunk load failed");
                }
            }
        }
        let data = result?;
        self.borrow_mut().state = ChunkState::Loaded(data);
        Ok(true)
    }
}

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

/// Any object that can appear in the editor tree.
///
/// Equality is identity of the underlying object.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Node {
    Folder(FolderRef),
    Document(DocumentRef),
    Region(RegionRef),
    Chunk(ChunkRef),
    Tag(TagRef),
}

/// Hashable identity of a [`Node`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeKey(usize);

impl Node {
    #[must_use]
    pub fn key(&self) -> NodeKey {
        NodeKey(match self {
            Self::Folder(f) => f.key(),
            Self::Document(d) => d.key(),
            Self::Region(r) => r.key(),
            Self::Chunk(c) => c.key(),
            Self::Tag(t) => t.key(),
        })
    }

    /// True when both refer to the same underlying object.
    #[must_use]
    pub fn same(&self, other: &Node) -> bool {
        self == other
    }

    /// Current children. Never loads; an unloaded chunk has none.
    #[must_use]
    pub fn children(&self) -> Vec<Node> {
        match self {
            Self::Folder(folder) => folder
                .subfolders()
                .into_iter()
                .map(Node::Folder)
                .chain(folder.documents().into_iter().map(Node::Document))
                .collect(),
            Self::Document(doc) => tags(doc.root().children()),
            Self::Region(region) => region.chunks().into_iter().map(Node::Chunk).collect(),
            Self::Chunk(chunk) => chunk
                .data()
                .map(|data| tags(data.children()))
                .unwrap_or_default(),
            Self::Tag(tag) => tags(tag.children()),
        }
    }

    /// Whether children only become available after [`load_if_needed`](Self::load_if_needed).
    #[must_use]
    pub fn is_lazy(&self) -> bool {
        matches!(self, Self::Chunk(_))
    }

    /// Load deferred content. `Ok(true)` when this call loaded something.
    ///
    /// # Errors
    ///
    /// Propagates chunk loader failures.
    pub fn load_if_needed(&self) -> Result<bool, LoadError> {
        match self {
            Self::Chunk(chunk) => chunk.load(),
            _ => Ok(false),
        }
    }

    /// Nodes that must render as expandable before their content is known.
    #[must_use]
    pub fn always_expandable(&self) -> bool {
        match self {
            Self::Chunk(chunk) => !chunk.is_loaded(),
            _ => false,
        }
    }

    /// The tag edits on this node apply to.
    #[must_use]
    pub fn tag(&self) -> Option<TagRef> {
        match self {
            Self::Document(doc) => Some(doc.root()),
            Self::Chunk(chunk) => chunk.data(),
            Self::Tag(tag) => Some(tag.clone()),
            Self::Folder(_) | Self::Region(_) => None,
        }
    }

    /// Documents, folders and region files can be saved.
    #[must_use]
    pub fn is_saveable(&self) -> bool {
        matches!(self, Self::Folder(_) | Self::Document(_) | Self::Region(_))
    }

    /// Whether this node stands for `tag` without being the tag itself:
    /// a document whose root is `tag`, or a loaded chunk whose data is `tag`.
    #[must_use]
    pub fn wraps(&self, tag: &TagRef) -> bool {
        match self {
            Self::Document(doc) => doc.root() == *tag,
            Self::Chunk(chunk) => chunk.data().is_some_and(|data| data == *tag),
            _ => false,
        }
    }

    /// Display label.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::Folder(folder) => folder.name(),
            Self::Document(doc) => doc
                .path()
                .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
                .unwrap_or_else(|| "untitled".to_owned()),
            Self::Region(region) => region.name(),
            Self::Chunk(chunk) => {
                let (x, z) = chunk.coords();
                format!("chunk [{x}, {z}]")
            }
            Self::Tag(tag) => tag.describe(),
        }
    }
}

fn tags(children: Vec<TagRef>) -> Vec<Node> {
    children.into_iter().map(Node::Tag).collect()
}

impl From<TagRef> for Node {
    fn from(tag: TagRef) -> Self {
        Self::Tag(tag)
    }
}

impl From<DocumentRef> for Node {
    fn from(doc: DocumentRef) -> Self {
        Self::Document(doc)
    }
}

impl From<FolderRef> for Node {
    fn from(folder: FolderRef) -> Self {
        Self::Folder(folder)
    }
}

impl From<RegionRef> for Node {
    fn from(region: RegionRef) -> Self {
        Self::Region(region)
    }
}

impl From<ChunkRef> for Node {
    fn from(chunk: ChunkRef) -> Self {
        Self::Chunk(chunk)
    }
}
