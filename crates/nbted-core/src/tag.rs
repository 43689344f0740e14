#![forbid(unsafe_code)]

//! Typed tags: scalars, arrays, lists and compounds.
//!
//! A tag is a named (or unnamed) payload. Lists and compounds own child tags
//! through [`TagRef`] handles so the same child can be referenced from the
//! tree model, from commands, and from its parent at once.
//!
//! # Invariants
//!
//! - A tag's kind never changes after construction; [`TagRef::set_payload`]
//!   rejects payloads of another kind.
//! - Every item of a list has the list's element kind. An empty list whose
//!   element kind is [`TagKind::End`] adopts the kind of the first item added.
//! - Compound entries are named and names are unique within one compound.

use std::cell::Ref;
use std::fmt;

use crate::error::TagError;
use crate::shared::Shared;

/// Tag type identifiers as used by the binary format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TagKind {
    End = 0,
    Byte = 1,
    Short = 2,
    Int = 3,
    Long = 4,
    Float = 5,
    Double = 6,
    ByteArray = 7,
    String = 8,
    List = 9,
    Compound = 10,
    IntArray = 11,
    LongArray = 12,
}

impl TagKind {
    /// Numeric id of this kind.
    #[must_use]
    pub const fn id(self) -> u8 {
        self as u8
    }

    /// Look up a kind by numeric id.
    #[must_use]
    pub const fn from_id(id: u8) -> Option<Self> {
        Some(match id {
            0 => Self::End,
            1 => Self::Byte,
            2 => Self::Short,
            3 => Self::Int,
            4 => Self::Long,
            5 => Self::Float,
            6 => Self::Double,
            7 => Self::ByteArray,
            8 => Self::String,
            9 => Self::List,
            10 => Self::Compound,
            11 => Self::IntArray,
            12 => Self::LongArray,
            _ => return None,
        })
    }

    /// Lowercase display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::End => "end",
            Self::Byte => "byte",
            Self::Short => "short",
            Self::Int => "int",
            Self::Long => "long",
            Self::Float => "float",
            Self::Double => "double",
            Self::ByteArray => "byte array",
            Self::String => "string",
            Self::List => "list",
            Self::Compound => "compound",
            Self::IntArray => "int array",
            Self::LongArray => "long array",
        }
    }

    /// Byte, int and long arrays.
    #[must_use]
    pub const fn is_array(self) -> bool {
        matches!(self, Self::ByteArray | Self::IntArray | Self::LongArray)
    }

    /// Lists and compounds.
    #[must_use]
    pub const fn is_container(self) -> bool {
        matches!(self, Self::List | Self::Compound)
    }
}

impl fmt::Display for TagKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Value carried by a tag.
#[derive(Debug, Clone)]
pub enum Payload {
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    ByteArray(Vec<u8>),
    String(String),
    List { element: TagKind, items: Vec<TagRef> },
    Compound(Vec<TagRef>),
    IntArray(Vec<i32>),
    LongArray(Vec<i64>),
}

impl Payload {
    /// Kind of this payload.
    #[must_use]
    pub fn kind(&self) -> TagKind {
        match self {
            Self::Byte(_) => TagKind::Byte,
            Self::Short(_) => TagKind::Short,
            Self::Int(_) => TagKind::Int,
            Self::Long(_) => TagKind::Long,
            Self::Float(_) => TagKind::Float,
            Self::Double(_) => TagKind::Double,
            Self::ByteArray(_) => TagKind::ByteArray,
            Self::String(_) => TagKind::String,
            Self::List { .. } => TagKind::List,
            Self::Compound(_) => TagKind::Compound,
            Self::IntArray(_) => TagKind::IntArray,
            Self::LongArray(_) => TagKind::LongArray,
        }
    }

    /// Empty list with an undetermined element kind.
    #[must_use]
    pub fn empty_list() -> Self {
        Self::List {
            element: TagKind::End,
            items: Vec::new(),
        }
    }

    fn check_list(element: TagKind, items: &[TagRef]) -> Result<(), TagError> {
        check_distinct(items)?;
        for item in items {
            let found = item.kind();
            if found != element {
                return Err(TagError::ListTypeMismatch {
                    expected: element,
                    found,
                });
            }
        }
        Ok(())
    }
}

/// A named payload.
#[derive(Debug, Clone)]
pub struct Tag {
    name: Option<String>,
    payload: Payload,
}

/// Shared handle to a [`Tag`].
pub type TagRef = Shared<Tag>;

impl Shared<Tag> {
    /// Create a tag.
    ///
    /// # Errors
    ///
    /// Fails when a list payload holds items of mixed kinds.
    pub fn new(name: Option<String>, payload: Payload) -> Result<Self, TagError> {
        if let Payload::List { element, items } = &payload {
            let element = match (element, items.first()) {
                (TagKind::End, Some(first)) => first.kind(),
                (element, _) => *element,
            };
            Payload::check_list(element, items)?;
        }
        if let Payload::Compound(entries) = &payload {
            check_entries(entries)?;
        }
        let payload = match payload {
            Payload::List {
                element: TagKind::End,
                items,
            } if !items.is_empty() => Payload::List {
                element: items[0].kind(),
                items,
            },
            other => other,
        };
        Ok(Self::wrap(Tag { name, payload }))
    }

    /// Scalar, string or array tag.
    ///
    /// Never fails. A list or compound payload goes through the same checks
    /// as [`new`](Self::new); if it is invalid the tag is created as an empty
    /// container of that kind. Use [`compound`](Self::compound) or
    /// [`list`](Self::list) to get the error instead.
    #[must_use]
    pub fn scalar(name: Option<&str>, payload: Payload) -> Self {
        let name = name.map(str::to_owned);
        if !payload.kind().is_container() {
            return Self::wrap(Tag { name, payload });
        }
        let kind = payload.kind();
        match Self::new(name.clone(), payload) {
            Ok(tag) => tag,
            Err(_err) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(target: "nbted.core", %kind, error = %_err, "invalid container payload dropped");
                let payload = match kind {
                    TagKind::List => Payload::empty_list(),
                    _ => Payload::Compound(Vec::new()),
                };
                Self::wrap(Tag { name, payload })
            }
        }
    }

    /// Build a compound from named entries.
    ///
    /// # Errors
    ///
    /// Fails on unnamed or duplicate entries.
    pub fn compound(name: Option<&str>, entries: Vec<TagRef>) -> Result<Self, TagError> {
        Self::new(name.map(str::to_owned), Payload::Compound(entries))
    }

    /// Build a list from unnamed items.
    ///
    /// # Errors
    ///
    /// Fails when an item's kind differs from `element`.
    pub fn list(name: Option<&str>, element: TagKind, items: Vec<TagRef>) -> Result<Self, TagError> {
        Self::new(name.map(str::to_owned), Payload::List { element, items })
    }

    #[must_use]
    pub fn name(&self) -> Option<String> {
        self.borrow().name.clone()
    }

    /// Replace the name, returning the previous one.
    ///
    /// Tags do not know their container, so no naming rule is checked here.
    /// Rename container entries with [`rename_child`](Self::rename_child).
    pub fn rename(&self, name: Option<String>) -> Option<String> {
        std::mem::replace(&mut self.borrow_mut().name, name)
    }

    #[must_use]
    pub fn kind(&self) -> TagKind {
        self.borrow().payload.kind()
    }

    /// Borrow the payload.
    #[must_use]
    pub fn payload(&self) -> Ref<'_, Payload> {
        Ref::map(self.borrow(), |tag| &tag.payload)
    }

    /// Element kind, for lists.
    #[must_use]
    pub fn list_element(&self) -> Option<TagKind> {
        match &*self.payload() {
            Payload::List { element, .. } => Some(*element),
            _ => None,
        }
    }

    /// Replace the payload with one of the same kind, returning the old one.
    ///
    /// # Errors
    ///
    /// Fails on a kind change or an inconsistent list/compound payload.
    pub fn set_payload(&self, payload: Payload) -> Result<Payload, TagError> {
        let expected = self.kind();
        let found = payload.kind();
        if expected != found {
            return Err(TagError::KindMismatch { expected, found });
        }
        match &payload {
            Payload::List { element, items } => Payload::check_list(*element, items)?,
            Payload::Compound(entries) => check_entries(entries)?,
            _ => {}
        }
        Ok(std::mem::replace(&mut self.borrow_mut().payload, payload))
    }

    /// Child tags of a list or compound, in order. Empty for other kinds.
    #[must_use]
    pub fn children(&self) -> Vec<TagRef> {
        match &*self.payload() {
            Payload::List { items, .. } => items.clone(),
            Payload::Compound(entries) => entries.clone(),
            _ => Vec::new(),
        }
    }

    #[must_use]
    pub fn child_count(&self) -> usize {
        match &*self.payload() {
            Payload::List { items, .. } => items.len(),
            Payload::Compound(entries) => entries.len(),
            _ => 0,
        }
    }

    /// Position of `child` among this tag's children, by identity.
    #[must_use]
    pub fn index_of(&self, child: &TagRef) -> Option<usize> {
        match &*self.payload() {
            Payload::List { items, .. } => items.iter().position(|t| t == child),
            Payload::Compound(entries) => entries.iter().position(|t| t == child),
            _ => None,
        }
    }

    /// Compound entry by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<TagRef> {
        match &*self.payload() {
            Payload::Compound(entries) => entries
                .iter()
                .find(|t| t.name().as_deref() == Some(name))
                .cloned(),
            _ => None,
        }
    }

    /// Insert a child at `index`.
    ///
    /// # Errors
    ///
    /// Fails for non-containers, out-of-range indices, list kind mismatches
    /// and compound naming conflicts.
    pub fn insert_child(&self, index: usize, child: TagRef) -> Result<(), TagError> {
        let child_kind = child.kind();
        let child_name = child.name();
        let mut tag = self.borrow_mut();
        let kind = tag.payload.kind();
        match &mut tag.payload {
            Payload::List { element, items } => {
                if index > items.len() {
                    return Err(TagError::IndexOutOfRange {
                        index,
                        length: items.len(),
                    });
                }
                if items.contains(&child) {
                    return Err(TagError::AlreadyChild);
                }
                adopt_element(element, items.is_empty(), child_kind)?;
                items.insert(index, child);
                Ok(())
            }
            Payload::Compound(entries) => {
                if index > entries.len() {
                    return Err(TagError::IndexOutOfRange {
                        index,
                        length: entries.len(),
                    });
                }
                if entries.contains(&child) {
                    return Err(TagError::AlreadyChild);
                }
                let name = child_name.ok_or(TagError::UnnamedEntry)?;
                if entries.iter().any(|t| t.name().as_deref() == Some(&name)) {
                    return Err(TagError::DuplicateName(name));
                }
                entries.insert(index, child);
                Ok(())
            }
            _ => Err(TagError::NotAContainer(kind)),
        }
    }

    /// Append children in order.
    ///
    /// # Errors
    ///
    /// Same conditions as [`insert_child`](Self::insert_child). Children
    /// before the failing one stay inserted.
    pub fn push_children(&self, children: Vec<TagRef>) -> Result<(), TagError> {
        for child in children {
            let end = self.child_count();
            self.insert_child(end, child)?;
        }
        Ok(())
    }

    /// Remove and return the child at `index`.
    ///
    /// # Errors
    ///
    /// Fails for non-containers and out-of-range indices.
    pub fn remove_child(&self, index: usize) -> Result<TagRef, TagError> {
        let mut tag = self.borrow_mut();
        let kind = tag.payload.kind();
        let children = match &mut tag.payload {
            Payload::List { items, .. } => items,
            Payload::Compound(entries) => entries,
            _ => return Err(TagError::NotAContainer(kind)),
        };
        if index >= children.len() {
            return Err(TagError::IndexOutOfRange {
                index,
                length: children.len(),
            });
        }
        Ok(children.remove(index))
    }

    /// Remove all children, returning them. A list keeps its element kind.
    ///
    /// # Errors
    ///
    /// Fails for non-containers.
    pub fn clear_children(&self) -> Result<Vec<TagRef>, TagError> {
        let mut tag = self.borrow_mut();
        let kind = tag.payload.kind();
        match &mut tag.payload {
            Payload::List { items, .. } => Ok(std::mem::take(items)),
            Payload::Compound(entries) => Ok(std::mem::take(entries)),
            _ => Err(TagError::NotAContainer(kind)),
        }
    }

    /// Rename `child`, an entry of this container, returning its old name.
    ///
    /// Compound entries must stay named and unique. List items carry no
    /// naming rule.
    ///
    /// # Errors
    ///
    /// Fails for non-containers, for a tag that is not a child of this one,
    /// and for a missing or duplicate compound entry name.
    pub fn rename_child(
        &self,
        child: &TagRef,
        name: Option<String>,
    ) -> Result<Option<String>, TagError> {
        {
            let tag = self.borrow();
            match &tag.payload {
                Payload::List { items, .. } => {
                    if !items.contains(child) {
                        return Err(TagError::NotAChild);
                    }
                }
                Payload::Compound(entries) => {
                    if !entries.contains(child) {
                        return Err(TagError::NotAChild);
                    }
                    let wanted = name.as_deref().ok_or(TagError::UnnamedEntry)?;
                    let taken = entries
                        .iter()
                        .filter(|t| *t != child)
                        .any(|t| t.name().as_deref() == Some(wanted));
                    if taken {
                        return Err(TagError::DuplicateName(wanted.to_owned()));
                    }
                }
                other => return Err(TagError::NotAContainer(other.kind())),
            }
        }
        Ok(child.rename(name))
    }

    /// Integer value of a byte/short/int/long tag.
    #[must_use]
    pub fn numeric(&self) -> Option<i64> {
        match &*self.payload() {
            Payload::Byte(v) => Some(i64::from(*v)),
            Payload::Short(v) => Some(i64::from(*v)),
            Payload::Int(v) => Some(i64::from(*v)),
            Payload::Long(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn byte_array(&self) -> Option<Vec<u8>> {
        match &*self.payload() {
            Payload::ByteArray(v) => Some(v.clone()),
            _ => None,
        }
    }

    #[must_use]
    pub fn int_array(&self) -> Option<Vec<i32>> {
        match &*self.payload() {
            Payload::IntArray(v) => Some(v.clone()),
            _ => None,
        }
    }

    #[must_use]
    pub fn long_array(&self) -> Option<Vec<i64>> {
        match &*self.payload() {
            Payload::LongArray(v) => Some(v.clone()),
            _ => None,
        }
    }

    /// Short human-readable label used in command descriptions.
    #[must_use]
    pub fn describe(&self) -> String {
        match self.name() {
            Some(name) => format!("{} '{}'", self.kind(), name),
            None => format!("unnamed {}", self.kind()),
        }
    }
}

fn adopt_element(element: &mut TagKind, empty: bool, found: TagKind) -> Result<(), TagError> {
    if *element == TagKind::End && empty {
        *element = found;
    }
    if *element != found {
        return Err(TagError::ListTypeMismatch {
            expected: *element,
            found,
        });
    }
    Ok(())
}

fn check_distinct(items: &[TagRef]) -> Result<(), TagError> {
    let mut seen = std::collections::HashSet::new();
    if items.iter().all(|t| seen.insert(t.key())) {
        Ok(())
    } else {
        Err(TagError::AlreadyChild)
    }
}

fn check_entries(entries: &[TagRef]) -> Result<(), TagError> {
    check_distinct(entries)?;
    let mut seen = std::collections::HashSet::new();
    for entry in entries {
        let name = entry.name().ok_or(TagError::UnnamedEntry)?;
        if !seen.insert(name.clone()) {
            return Err(TagError::DuplicateName(name));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn short(v: i16) -> TagRef {
        TagRef::scalar(None, Payload::Short(v))
    }

    #[test]
    fn kind_ids_round_trip() {
        for id in 0..=12u8 {
            let kind = TagKind::from_id(id).unwrap();
            assert_eq!(kind.id(), id);
        }
        assert!(TagKind::from_id(13).is_none());
    }

    #[test]
    fn list_adopts_first_element_kind() {
        let list = TagRef::new(None, Payload::empty_list()).unwrap();
        list.insert_child(0, short(1)).unwrap();
        assert_eq!(list.list_element(), Some(TagKind::Short));

        let err = list
            .insert_child(1, TagRef::scalar(None, Payload::Int(2)))
            .unwrap_err();
        assert_eq!(
            err,
            TagError::ListTypeMismatch {
                expected: TagKind::Short,
                found: TagKind::Int
            }
        );
    }

    #[test]
    fn clear_keeps_element_kind() {
        let list = TagRef::list(Some("xs"), TagKind::Short, vec![short(1), short(2)]).unwrap();
        let removed = list.clear_children().unwrap();
        assert_eq!(removed.len(), 2);
        assert_eq!(list.child_count(), 0);
        assert_eq!(list.list_element(), Some(TagKind::Short));
    }

    #[test]
    fn compound_rejects_duplicates() {
        let a = TagRef::scalar(Some("a"), Payload::Int(1));
        let root = TagRef::compound(None, vec![a]).unwrap();
        let err = root
            .insert_child(1, TagRef::scalar(Some("a"), Payload::Int(2)))
            .unwrap_err();
        assert_eq!(err, TagError::DuplicateName("a".into()));
        assert!(matches!(
            root.insert_child(0, short(3)),
            Err(TagError::UnnamedEntry)
        ));
    }

    #[test]
    fn rename_child_keeps_compound_names_unique() {
        let a = TagRef::scalar(Some("a"), Payload::Int(1));
        let b = TagRef::scalar(Some("b"), Payload::Int(2));
        let root = TagRef::compound(None, vec![a, b.clone()]).unwrap();

        assert_eq!(
            root.rename_child(&b, Some("a".into())),
            Err(TagError::DuplicateName("a".into()))
        );
        assert_eq!(root.rename_child(&b, None), Err(TagError::UnnamedEntry));
        assert_eq!(b.name().as_deref(), Some("b"));

        assert_eq!(root.rename_child(&b, Some("b".into())), Ok(Some("b".into())));
        assert_eq!(root.rename_child(&b, Some("c".into())), Ok(Some("b".into())));
        assert_eq!(root.get("c"), Some(b));
    }

    #[test]
    fn rename_child_requires_membership() {
        let root = TagRef::compound(None, Vec::new()).unwrap();
        let stray = TagRef::scalar(Some("x"), Payload::Int(0));
        assert_eq!(
            root.rename_child(&stray, Some("y".into())),
            Err(TagError::NotAChild)
        );
        let list = TagRef::list(None, TagKind::Short, vec![short(1)]).unwrap();
        let item = list.children().remove(0);
        assert_eq!(list.rename_child(&item, Some("free".into())), Ok(None));
        assert_eq!(
            stray.rename_child(&item, None),
            Err(TagError::NotAContainer(TagKind::Int))
        );
    }

    #[test]
    fn same_handle_cannot_be_inserted_twice() {
        let item = short(4);
        let list = TagRef::list(None, TagKind::Short, vec![item.clone()]).unwrap();
        assert_eq!(list.insert_child(1, item.clone()), Err(TagError::AlreadyChild));
        assert_eq!(list.child_count(), 1);

        let a = TagRef::scalar(Some("a"), Payload::Int(1));
        let root = TagRef::compound(None, vec![a.clone()]).unwrap();
        assert_eq!(root.insert_child(0, a.clone()), Err(TagError::AlreadyChild));
        assert!(matches!(
            TagRef::compound(None, vec![a.clone(), a]),
            Err(TagError::AlreadyChild)
        ));
        assert!(matches!(
            TagRef::list(None, TagKind::Short, vec![item.clone(), item]),
            Err(TagError::AlreadyChild)
        ));
    }

    #[test]
    fn scalar_never_builds_an_invalid_container() {
        let mixed = Payload::List {
            element: TagKind::Short,
            items: vec![short(1), TagRef::scalar(None, Payload::Int(2))],
        };
        let list = TagRef::scalar(Some("xs"), mixed);
        assert_eq!(list.child_count(), 0);
        assert_eq!(list.kind(), TagKind::List);

        let unnamed = Payload::Compound(vec![short(1)]);
        let root = TagRef::scalar(None, unnamed);
        assert_eq!(root.kind(), TagKind::Compound);
        assert_eq!(root.child_count(), 0);

        let valid = Payload::List {
            element: TagKind::Short,
            items: vec![short(7)],
        };
        assert_eq!(TagRef::scalar(None, valid).child_count(), 1);
    }

    #[test]
    fn set_payload_keeps_kind() {
        let tag = TagRef::scalar(Some("n"), Payload::Int(1));
        let old = tag.set_payload(Payload::Int(9)).unwrap();
        assert!(matches!(old, Payload::Int(1)));
        assert_eq!(tag.numeric(), Some(9));
        assert!(tag.set_payload(Payload::Long(1)).is_err());
    }

    #[test]
    fn index_of_uses_identity() {
        let a = short(1);
        let b = short(1);
        let list = TagRef::list(None, TagKind::Short, vec![a.clone(), b.clone()]).unwrap();
        assert_eq!(list.index_of(&b), Some(1));
        assert_eq!(list.index_of(&short(1)), None);
    }

    #[test]
    fn describe_uses_name_and_kind() {
        let tag = TagRef::scalar(Some("Pos"), Payload::LongArray(vec![]));
        assert_eq!(tag.describe(), "long array 'Pos'");
        assert_eq!(short(0).describe(), "unnamed short");
    }

    #[test]
    fn non_container_rejects_children() {
        let tag = TagRef::scalar(None, Payload::Int(1));
        assert_eq!(
            tag.remove_child(0).unwrap_err(),
            TagError::NotAContainer(TagKind::Int)
        );
    }
}
