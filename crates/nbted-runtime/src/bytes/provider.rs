#![forbid(unsafe_code)]

//! Byte providers over typed containers.
//!
//! [`TagByteProvider`] holds the editable buffer and implements every
//! buffer operation once. An [`ElementLayout`] supplies the part that
//! differs per container: element type, how to read the elements out of the
//! tag, and which command writes decoded elements back.

use std::fmt;
use std::marker::PhantomData;

use nbted_core::{Payload, TagRef};

use super::codec::{self, ElementCodec};
use super::{ByteChange, ByteEditError, ByteTransformer};
use crate::undo::{
    AddRangeCmd, ChangeValueCmd, ClearCmd, Command, CommandSource, MergedCommand,
};

/// Per-container encoding rules.
pub trait ElementLayout {
    /// Native element type.
    type Element: ElementCodec;

    /// Short name used in logs.
    const NAME: &'static str;

    /// Current elements of `tag`.
    fn read(tag: &TagRef) -> Vec<Self::Element>;

    /// Command replacing the elements of `tag` with `values`.
    fn compile(tag: &TagRef, values: Vec<Self::Element>) -> Box<dyn Command>;
}

// ============================================================================
// Array layouts: one field assignment
// ============================================================================

pub struct ByteArrayLayout;
pub struct IntArrayLayout;
pub struct LongArrayLayout;

impl ElementLayout for ByteArrayLayout {
    type Element = u8;
    const NAME: &'static str = "byte array";

    fn read(tag: &TagRef) -> Vec<u8> {
        tag.byte_array().unwrap_or_default()
    }

    fn compile(tag: &TagRef, values: Vec<u8>) -> Box<dyn Command> {
        Box::new(
            ChangeValueCmd::new(tag.clone(), Payload::ByteArray(values))
                .with_source(CommandSource::HexEditor),
        )
    }
}

impl ElementLayout for IntArrayLayout {
    type Element = i32;
    const NAME: &'static str = "int array";

    fn read(tag: &TagRef) -> Vec<i32> {
        tag.int_array().unwrap_or_default()
    }

    fn compile(tag: &TagRef, values: Vec<i32>) -> Box<dyn Command> {
        Box::new(
            ChangeValueCmd::new(tag.clone(), Payload::IntArray(values))
                .with_source(CommandSource::HexEditor),
        )
    }
}

impl ElementLayout for LongArrayLayout {
    type Element = i64;
    const NAME: &'static str = "long array";

    fn read(tag: &TagRef) -> Vec<i64> {
        tag.long_array().unwrap_or_default()
    }

    fn compile(tag: &TagRef, values: Vec<i64>) -> Box<dyn Command> {
        Box::new(
            ChangeValueCmd::new(tag.clone(), Payload::LongArray(values))
                .with_source(CommandSource::HexEditor),
        )
    }
}

// ============================================================================
// List layouts: clear, then append
// ============================================================================

pub struct ByteListLayout;
pub struct ShortListLayout;
pub struct IntListLayout;
pub struct LongListLayout;

/// Lists have no bulk value setter, so the write-back is a merged
/// clear + append.
fn replace_list_items(tag: &TagRef, element_name: &str, items: Vec<TagRef>) -> Box<dyn Command> {
    let mut merged = MergedCommand::new(format!(
        "Replace {element_name} tags of {}",
        tag.describe()
    ))
    .with_source(CommandSource::HexEditor);
    merged.push(Box::new(ClearCmd::new(tag.clone())));
    merged.push(Box::new(AddRangeCmd::new(tag.clone(), items)));
    Box::new(merged)
}

macro_rules! list_layout {
    ($layout:ty, $elem:ty, $variant:ident, $name:literal) => {
        impl ElementLayout for $layout {
            type Element = $elem;
            const NAME: &'static str = concat!($name, " list");

            fn read(tag: &TagRef) -> Vec<$elem> {
                tag.children()
                    .iter()
                    .filter_map(|item| match &*item.payload() {
                        Payload::$variant(v) => Some(*v),
                        _ => None,
                    })
                    .collect()
            }

            fn compile(tag: &TagRef, values: Vec<$elem>) -> Box<dyn Command> {
                let items = values
                    .into_iter()
                    .map(|v| TagRef::scalar(None, Payload::$variant(v)))
                    .collect();
                replace_list_items(tag, $name, items)
            }
        }
    };
}

list_layout!(ByteListLayout, i8, Byte, "byte");
list_layout!(ShortListLayout, i16, Short, "short");
list_layout!(IntListLayout, i32, Int, "int");
list_layout!(LongListLayout, i64, Long, "long");

// ============================================================================
// Provider
// ============================================================================

/// Editable byte view of one container.
pub struct TagByteProvider<L: ElementLayout> {
    tag: TagRef,
    bytes: Vec<u8>,
    changed: bool,
    pending: ByteChange,
    _layout: PhantomData<L>,
}

impl<L: ElementLayout> fmt::Debug for TagByteProvider<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TagByteProvider")
            .field("layout", &L::NAME)
            .field("tag", &self.tag.describe())
            .field("len", &self.bytes.len())
            .field("changed", &self.changed)
            .finish()
    }
}

impl<L: ElementLayout> TagByteProvider<L> {
    /// Snapshot the container's current elements into a byte buffer.
    #[must_use]
    pub fn new(tag: TagRef) -> Self {
        let bytes = codec::encode_all(&L::read(&tag));
        tracing::trace!(
            target: "nbted.bytes",
            layout = L::NAME,
            len = bytes.len(),
            "byte provider opened"
        );
        Self {
            tag,
            bytes,
            changed: false,
            pending: ByteChange::empty(),
            _layout: PhantomData,
        }
    }

    fn touch(&mut self, change: ByteChange) {
        self.changed = true;
        self.pending |= change;
    }

    fn check_offset(&self, offset: usize, inclusive_end: bool) -> Result<(), ByteEditError> {
        let len = self.bytes.len();
        let ok = if inclusive_end { offset <= len } else { offset < len };
        if ok {
            Ok(())
        } else {
            Err(ByteEditError::OutOfRange {
                offset,
                length: len,
            })
        }
    }
}

impl<L: ElementLayout> ByteTransformer for TagByteProvider<L> {
    fn target(&self) -> &TagRef {
        &self.tag
    }

    fn bytes_per_value(&self) -> usize {
        <L::Element as ElementCodec>::WIDTH
    }

    fn len(&self) -> usize {
        self.bytes.len()
    }

    fn current_bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn read_byte(&self, offset: usize) -> Result<u8, ByteEditError> {
        self.check_offset(offset, false)?;
        Ok(self.bytes[offset])
    }

    fn write_byte(&mut self, offset: usize, value: u8) -> Result<(), ByteEditError> {
        self.check_offset(offset, false)?;
        self.bytes[offset] = value;
        self.touch(ByteChange::CONTENT);
        Ok(())
    }

    fn insert_bytes(&mut self, offset: usize, bytes: &[u8]) -> Result<(), ByteEditError> {
        self.check_offset(offset, true)?;
        self.bytes.splice(offset..offset, bytes.iter().copied());
        self.touch(ByteChange::LENGTH | ByteChange::CONTENT);
        Ok(())
    }

    fn delete_bytes(&mut self, offset: i64, length: usize) -> usize {
        let len = self.bytes.len();
        let start = usize::try_from(offset.max(0)).unwrap_or(usize::MAX).min(len);
        let end = start.saturating_add(length).min(len);
        self.bytes.drain(start..end);
        self.touch(ByteChange::LENGTH | ByteChange::CONTENT);
        end - start
    }

    fn write_bytes(&mut self, offset: usize, bytes: &[u8]) -> Result<(), ByteEditError> {
        self.check_offset(offset, true)?;
        let overwrite = (self.bytes.len() - offset).min(bytes.len());
        self.bytes[offset..offset + overwrite].copy_from_slice(&bytes[..overwrite]);
        let mut change = ByteChange::CONTENT;
        if overwrite < bytes.len() {
            self.bytes.extend_from_slice(&bytes[overwrite..]);
            change |= ByteChange::LENGTH;
        }
        self.touch(change);
        Ok(())
    }

    fn set_bytes(&mut self, bytes: &[u8]) {
        self.bytes.clear();
        self.bytes.extend_from_slice(bytes);
        self.touch(ByteChange::LENGTH | ByteChange::CONTENT);
    }

    fn has_changes(&self) -> bool {
        self.changed
    }

    fn take_changes(&mut self) -> ByteChange {
        std::mem::replace(&mut self.pending, ByteChange::empty())
    }

    fn apply(&mut self) -> Result<Box<dyn Command>, ByteEditError> {
        let width = self.bytes_per_value();
        let Some(values) = codec::decode_all::<L::Element>(&self.bytes) else {
            tracing::warn!(
                target: "nbted.bytes",
                layout = L::NAME,
                length = self.bytes.len(),
                width,
                "rejected commit of misaligned buffer"
            );
            return Err(ByteEditError::Misaligned {
                length: self.bytes.len(),
                width,
            });
        };
        tracing::debug!(
            target: "nbted.bytes",
            layout = L::NAME,
            elements = values.len(),
            "compiled byte edits"
        );
        self.changed = false;
        Ok(L::compile(&self.tag, values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn byte_array(values: &[u8]) -> TagByteProvider<ByteArrayLayout> {
        TagByteProvider::new(TagRef::scalar(
            Some("b"),
            Payload::ByteArray(values.to_vec()),
        ))
    }

    #[test]
    fn write_byte_is_content_only() {
        let mut p = byte_array(&[1, 2, 3]);
        p.write_byte(1, 9).unwrap();
        assert_eq!(p.current_bytes(), &[1, 9, 3]);
        assert_eq!(p.take_changes(), ByteChange::CONTENT);
        assert!(p.take_changes().is_empty());
    }

    #[test]
    fn write_past_end_is_out_of_range() {
        let mut p = byte_array(&[1]);
        assert_eq!(
            p.write_byte(1, 0),
            Err(ByteEditError::OutOfRange {
                offset: 1,
                length: 1
            })
        );
        assert!(p.read_byte(5).is_err());
        assert!(!p.has_changes());
    }

    #[test]
    fn insert_at_end_appends() {
        let mut p = byte_array(&[1]);
        p.insert_bytes(1, &[2, 3]).unwrap();
        assert_eq!(p.current_bytes(), &[1, 2, 3]);
        assert_eq!(p.take_changes(), ByteChange::LENGTH | ByteChange::CONTENT);
    }

    #[test]
    fn delete_clamps_offset_and_length() {
        let mut p = byte_array(&[1, 2, 3, 4]);
        assert_eq!(p.delete_bytes(-5, 1), 1);
        assert_eq!(p.current_bytes(), &[2, 3, 4]);
        assert_eq!(p.delete_bytes(1, 100), 2);
        assert_eq!(p.current_bytes(), &[2]);
        p.take_changes();
        assert_eq!(p.delete_bytes(10, 1), 0);
        assert_eq!(p.current_bytes(), &[2]);
    }

    #[test]
    fn empty_delete_still_notifies() {
        let mut p = byte_array(&[1, 2]);
        assert_eq!(p.delete_bytes(2, 5), 0);
        assert!(p.has_changes());
        assert_eq!(p.take_changes(), ByteChange::LENGTH | ByteChange::CONTENT);
        p.apply().unwrap().execute().unwrap();
        assert!(!p.has_changes());
    }

    #[test]
    fn write_bytes_overwrites_then_appends() {
        let mut p = byte_array(&[1, 2, 3]);
        p.write_bytes(1, &[7, 8]).unwrap();
        assert_eq!(p.current_bytes(), &[1, 7, 8]);
        assert_eq!(p.take_changes(), ByteChange::CONTENT);

        p.write_bytes(2, &[5, 6, 7]).unwrap();
        assert_eq!(p.current_bytes(), &[1, 7, 5, 6, 7]);
        assert_eq!(p.take_changes(), ByteChange::LENGTH | ByteChange::CONTENT);
    }

    #[test]
    fn set_bytes_replaces_everything() {
        let mut p = byte_array(&[1, 2, 3]);
        p.set_bytes(&[4]);
        assert_eq!(p.current_bytes(), &[4]);
        assert!(p.has_changes());
    }

    #[test]
    fn apply_clears_change_flag_without_executing() {
        let tag = TagRef::scalar(Some("b"), Payload::ByteArray(vec![1, 2]));
        let mut p = TagByteProvider::<ByteArrayLayout>::new(tag.clone());
        p.set_bytes(&[3]);
        let mut cmd = p.apply().unwrap();
        assert!(!p.has_changes());
        assert_eq!(tag.byte_array(), Some(vec![1, 2]));
        cmd.execute().unwrap();
        assert_eq!(tag.byte_array(), Some(vec![3]));
        cmd.undo().unwrap();
        assert_eq!(tag.byte_array(), Some(vec![1, 2]));
    }

    #[test]
    fn misaligned_apply_is_rejected_and_keeps_changes() {
        let tag = TagRef::scalar(Some("l"), Payload::LongArray(vec![1]));
        let mut p = TagByteProvider::<LongArrayLayout>::new(tag);
        p.delete_bytes(0, 3);
        assert_eq!(
            p.apply().unwrap_err(),
            ByteEditError::Misaligned {
                length: 5,
                width: 8
            }
        );
        assert!(p.has_changes());
        assert_eq!(p.len(), 5);
    }

    #[test]
    fn debug_names_layout() {
        let p = byte_array(&[]);
        assert!(format!("{p:?}").contains("byte array"));
        assert!(p.is_empty());
    }
}
