#![forbid(unsafe_code)]

//! Hex-editor access to fixed-width containers.
//!
//! A [`ByteTransformer`] exposes a byte array, int array, long array, or a
//! list of byte/short/int/long tags as one flat, randomly addressable byte
//! buffer. Edits only touch the buffer; [`ByteTransformer::apply`] compiles
//! the net result into a single [`Command`] that the caller may execute,
//! record, or discard.
//!
//! # Commit policy
//!
//! The buffer may be any length while editing. At commit time its length
//! must be a multiple of the element width; otherwise `apply` returns
//! [`ByteEditError::Misaligned`] and leaves buffer and change flag intact,
//! so the user can fix the data or cancel.
//!
//! # Selection
//!
//! | Container            | Provider layout     | Width |
//! |----------------------|---------------------|-------|
//! | byte array           | `ByteArrayLayout`   | 1     |
//! | int array            | `IntArrayLayout`    | 4     |
//! | long array           | `LongArrayLayout`   | 8     |
//! | list of byte         | `ByteListLayout`    | 1     |
//! | list of short        | `ShortListLayout`   | 2     |
//! | list of int          | `IntListLayout`     | 4     |
//! | list of long         | `LongListLayout`    | 8     |

pub mod codec;
pub mod provider;

use std::fmt;

use bitflags::bitflags;
use nbted_core::{TagKind, TagRef};

use crate::undo::{Command, CommandError};

pub use codec::ElementCodec;
pub use provider::{
    ByteArrayLayout, ByteListLayout, ElementLayout, IntArrayLayout, IntListLayout,
    LongArrayLayout, LongListLayout, ShortListLayout, TagByteProvider,
};

bitflags! {
    /// Notifications raised by buffer edits since the last drain.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ByteChange: u8 {
        /// Buffer length changed.
        const LENGTH = 0b01;
        /// Buffer content changed.
        const CONTENT = 0b10;
    }
}

/// Errors from byte providers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ByteEditError {
    /// No provider exists for this container.
    Unsupported {
        kind: TagKind,
        element: Option<TagKind>,
    },
    /// Commit attempted while the buffer is not whole elements.
    Misaligned { length: usize, width: usize },
    /// Offset past the end of the buffer.
    OutOfRange { offset: usize, length: usize },
    /// Executing the compiled command failed.
    Command(CommandError),
}

impl fmt::Display for ByteEditError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unsupported {
                kind,
                element: Some(element),
            } => write!(f, "can't edit bytes of a {kind} of {element}"),
            Self::Unsupported {
                kind,
                element: None,
            } => write!(f, "can't edit bytes of a {kind}"),
            Self::Misaligned { length, width } => write!(
                f,
                "{length} bytes is not a whole number of {width}-byte elements"
            ),
            Self::OutOfRange { offset, length } => {
                write!(f, "offset {offset} out of range (length {length})")
            }
            Self::Command(err) => write!(f, "applying byte edits failed: {err}"),
        }
    }
}

impl std::error::Error for ByteEditError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Command(err) => Some(err),
            _ => None,
        }
    }
}

/// Editable byte view of a typed container.
pub trait ByteTransformer {
    /// The container being edited.
    fn target(&self) -> &TagRef;

    /// Width of one element in bytes.
    fn bytes_per_value(&self) -> usize;

    /// Current buffer length.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current buffer contents.
    fn current_bytes(&self) -> &[u8];

    /// # Errors
    ///
    /// `OutOfRange` when `offset >= len`.
    fn read_byte(&self, offset: usize) -> Result<u8, ByteEditError>;

    /// Overwrite one byte. Raises a content change only.
    ///
    /// # Errors
    ///
    /// `OutOfRange` when `offset >= len`.
    fn write_byte(&mut self, offset: usize, value: u8) -> Result<(), ByteEditError>;

    /// Splice `bytes` in at `offset`.
    ///
    /// # Errors
    ///
    /// `OutOfRange` when `offset > len`.
    fn insert_bytes(&mut self, offset: usize, bytes: &[u8]) -> Result<(), ByteEditError>;

    /// Remove up to `length` bytes starting at `max(offset, 0)`, clamped to
    /// the buffer. Returns how many bytes were removed. Raises both change
    /// flags even when nothing was removed.
    fn delete_bytes(&mut self, offset: i64, length: usize) -> usize;

    /// Overwrite from `offset`, appending whatever runs past the end.
    ///
    /// # Errors
    ///
    /// `OutOfRange` when `offset > len`.
    fn write_bytes(&mut self, offset: usize, bytes: &[u8]) -> Result<(), ByteEditError>;

    /// Replace the whole buffer.
    fn set_bytes(&mut self, bytes: &[u8]);

    /// Whether the buffer was edited since construction or the last
    /// successful [`apply`](Self::apply).
    fn has_changes(&self) -> bool;

    /// Drain the change notifications raised since the last call.
    fn take_changes(&mut self) -> ByteChange;

    /// Compile the buffer into a command replacing the container's elements.
    /// The command is returned unexecuted.
    ///
    /// # Errors
    ///
    /// `Misaligned` when the length is not a multiple of the element width.
    fn apply(&mut self) -> Result<Box<dyn Command>, ByteEditError>;

    /// Apply and execute immediately, bypassing any undo history.
    ///
    /// # Errors
    ///
    /// As [`apply`](Self::apply), plus command execution failures.
    fn apply_now(&mut self) -> Result<(), ByteEditError> {
        let mut cmd = self.apply()?;
        tracing::warn!(
            target: "nbted.bytes",
            description = cmd.description(),
            "byte edits applied outside undo history"
        );
        cmd.execute().map_err(ByteEditError::Command)
    }
}

/// Classify a container. Pure; never touches the tag's contents.
fn layout_of(tag: &TagRef) -> Result<Layout, ByteEditError> {
    let kind = tag.kind();
    let element = tag.list_element();
    match (kind, element) {
        (TagKind::ByteArray, _) => Ok(Layout::ByteArray),
        (TagKind::IntArray, _) => Ok(Layout::IntArray),
        (TagKind::LongArray, _) => Ok(Layout::LongArray),
        (TagKind::List, Some(TagKind::Byte)) => Ok(Layout::ByteList),
        (TagKind::List, Some(TagKind::Short)) => Ok(Layout::ShortList),
        (TagKind::List, Some(TagKind::Int)) => Ok(Layout::IntList),
        (TagKind::List, Some(TagKind::Long)) => Ok(Layout::LongList),
        _ => Err(ByteEditError::Unsupported { kind, element }),
    }
}

enum Layout {
    ByteArray,
    IntArray,
    LongArray,
    ByteList,
    ShortList,
    IntList,
    LongList,
}

/// Whether [`provider_for`] would succeed.
#[must_use]
pub fn has_provider(tag: &TagRef) -> bool {
    layout_of(tag).is_ok()
}

/// Open a byte provider for `tag`.
///
/// # Errors
///
/// `Unsupported` for anything but byte/int/long arrays and lists of
/// byte/short/int/long.
pub fn provider_for(tag: &TagRef) -> Result<Box<dyn ByteTransformer>, ByteEditError> {
    let tag = tag.clone();
    Ok(match layout_of(&tag)? {
        Layout::ByteArray => Box::new(TagByteProvider::<ByteArrayLayout>::new(tag)),
        Layout::IntArray => Box::new(TagByteProvider::<IntArrayLayout>::new(tag)),
        Layout::LongArray => Box::new(TagByteProvider::<LongArrayLayout>::new(tag)),
        Layout::ByteList => Box::new(TagByteProvider::<ByteListLayout>::new(tag)),
        Layout::ShortList => Box::new(TagByteProvider::<ShortListLayout>::new(tag)),
        Layout::IntList => Box::new(TagByteProvider::<IntListLayout>::new(tag)),
        Layout::LongList => Box::new(TagByteProvider::<LongListLayout>::new(tag)),
    })
}
