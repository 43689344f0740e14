#![forbid(unsafe_code)]

//! Error types for the tag graph.

use std::fmt;

use crate::tag::TagKind;

/// Errors raised by tag mutations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagError {
    /// The tag does not hold children (not a list or compound).
    NotAContainer(TagKind),
    /// A replacement payload has a different kind than the tag.
    KindMismatch { expected: TagKind, found: TagKind },
    /// A list received an element of the wrong kind.
    ListTypeMismatch { expected: TagKind, found: TagKind },
    /// A compound already has an entry with this name.
    DuplicateName(String),
    /// Compound entries must be named.
    UnnamedEntry,
    /// Child index is past the end of the container.
    IndexOutOfRange { index: usize, length: usize },
    /// The tag is already a child of this container.
    AlreadyChild,
    /// The tag is not a child of this container.
    NotAChild,
}

impl fmt::Display for TagError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAContainer(kind) => write!(f, "{kind} tag cannot hold children"),
            Self::KindMismatch { expected, found } => {
                write!(f, "expected a {expected} payload, got {found}")
            }
            Self::ListTypeMismatch { expected, found } => {
                write!(f, "list of {expected} cannot hold a {found} tag")
            }
            Self::DuplicateName(name) => write!(f, "compound already contains '{name}'"),
            Self::UnnamedEntry => write!(f, "compound entries must be named"),
            Self::IndexOutOfRange { index, length } => {
                write!(f, "index {index} out of range (length {length})")
            }
            Self::AlreadyChild => write!(f, "tag is already in this container"),
            Self::NotAChild => write!(f, "tag is not in this container"),
        }
    }
}

impl std::error::Error for TagError {}

/// Failure to materialize a lazily-loaded chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// The backing storage could not be read.
    Io(String),
    /// The stored bytes did not decode to a compound.
    Malformed(String),
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(msg) => write!(f, "chunk read failed: {msg}"),
            Self::Malformed(msg) => write!(f, "malformed chunk data: {msg}"),
        }
    }
}

impl std::error::Error for LoadError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_mentions_kinds() {
        let err = TagError::ListTypeMismatch {
            expected: TagKind::Short,
            found: TagKind::String,
        };
        let msg = err.to_string();
        assert!(msg.contains("short"));
        assert!(msg.contains("string"));
    }

    #[test]
    fn index_error_mentions_bounds() {
        let err = TagError::IndexOutOfRange {
            index: 7,
            length: 3,
        };
        assert!(err.to_string().contains('7'));
        assert!(err.to_string().contains('3'));
    }
}
