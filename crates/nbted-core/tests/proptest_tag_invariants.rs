//! Property-based invariant tests for container tags.
//!
//! 1. A list only ever holds children of its element kind.
//! 2. List contents track a plain `Vec` model under insert/remove/clear.
//! 3. Compound entry names stay unique under insert and rename.

use std::collections::HashSet;

use nbted_core::{Payload, TagError, TagKind, TagRef};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum ListOp {
    Insert { pos: usize, wide: bool, value: i16 },
    Remove { pos: usize },
    Clear,
}

fn list_op() -> impl Strategy<Value = ListOp> {
    prop_oneof![
        4 => (any::<usize>(), any::<bool>(), any::<i16>())
            .prop_map(|(pos, wide, value)| ListOp::Insert { pos, wide, value }),
        2 => any::<usize>().prop_map(|pos| ListOp::Remove { pos }),
        1 => Just(ListOp::Clear),
    ]
}

fn element(wide: bool, value: i16) -> TagRef {
    if wide {
        TagRef::scalar(None, Payload::Int(i32::from(value)))
    } else {
        TagRef::scalar(None, Payload::Short(value))
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 1 + 2. Lists stay homogeneous and match the model
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn list_matches_model(ops in proptest::collection::vec(list_op(), 1..48)) {
        let list = TagRef::new(Some("xs".into()), Payload::empty_list()).unwrap();
        let mut model: Vec<i64> = Vec::new();
        let mut kind: Option<TagKind> = None;

        for op in ops {
            match op {
                ListOp::Insert { pos, wide, value } => {
                    let index = pos % (model.len() + 1);
                    let child = element(wide, value);
                    let child_kind = child.kind();
                    let result = list.insert_child(index, child);
                    match kind {
                        Some(k) if k != child_kind => {
                            let is_mismatch = matches!(result, Err(TagError::ListTypeMismatch { .. }));
                            prop_assert!(is_mismatch);
                        }
                        _ => {
                            prop_assert!(result.is_ok());
                            kind = Some(child_kind);
                            model.insert(index, i64::from(value));
                        }
                    }
                }
                ListOp::Remove { pos } => {
                    if model.is_empty() {
                        prop_assert!(list.remove_child(pos).is_err());
                    } else {
                        let index = pos % model.len();
                        let removed = list.remove_child(index).unwrap();
                        prop_assert_eq!(removed.numeric(), Some(model.remove(index)));
                    }
                }
                ListOp::Clear => {
                    let removed = list.clear_children().unwrap();
                    prop_assert_eq!(removed.len(), model.len());
                    model.clear();
                }
            }

            let children = list.children();
            prop_assert_eq!(children.len(), model.len());
            let values: Vec<i64> = children.iter().filter_map(TagRef::numeric).collect();
            prop_assert_eq!(&values, &model);
            if let Some(k) = kind {
                prop_assert_eq!(list.list_element(), Some(k));
                prop_assert!(children.iter().all(|c| c.kind() == k));
            }
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3. Compound names are unique
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn compound_names_stay_unique(names in proptest::collection::vec("[a-d]", 1..24)) {
        let root = TagRef::compound(None, Vec::new()).unwrap();
        let mut seen = HashSet::new();

        for name in names {
            let result = root.insert_child(0, TagRef::scalar(Some(&name), Payload::Byte(0)));
            if seen.insert(name.clone()) {
                prop_assert!(result.is_ok());
            } else {
                prop_assert_eq!(result, Err(TagError::DuplicateName(name)));
            }
        }

        prop_assert_eq!(root.child_count(), seen.len());
        let stored: HashSet<String> = root.children().iter().filter_map(TagRef::name).collect();
        prop_assert_eq!(stored, seen);
    }

    #[test]
    fn renamed_compound_names_stay_unique(
        renames in proptest::collection::vec((any::<usize>(), "[a-f]"), 1..24),
    ) {
        let entries = ["a", "b", "c"]
            .iter()
            .map(|n| TagRef::scalar(Some(n), Payload::Byte(0)))
            .collect();
        let root = TagRef::compound(None, entries).unwrap();

        for (pick, name) in renames {
            let children = root.children();
            let child = &children[pick % children.len()];
            let held_elsewhere = children
                .iter()
                .any(|c| c != child && c.name().as_deref() == Some(name.as_str()));
            let result = root.rename_child(child, Some(name.clone()));
            if held_elsewhere {
                prop_assert_eq!(result, Err(TagError::DuplicateName(name)));
            } else {
                prop_assert!(result.is_ok());
                prop_assert_eq!(child.name(), Some(name));
            }

            let names: Vec<String> = root.children().iter().filter_map(TagRef::name).collect();
            let distinct: HashSet<&String> = names.iter().collect();
            prop_assert_eq!(names.len(), 3);
            prop_assert_eq!(distinct.len(), 3);
        }
    }
}
