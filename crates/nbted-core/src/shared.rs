#![forbid(unsafe_code)]

//! Identity-compared shared handles.
//!
//! Every object in the editor graph lives behind a [`Shared`] handle. Two
//! handles are equal only when they point at the same allocation, which is
//! what the tree model needs to match shadow nodes against live objects.

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

/// Reference-counted, interior-mutable handle with identity equality.
pub struct Shared<T>(Rc<RefCell<T>>);

impl<T> Shared<T> {
    /// Wrap a value in a fresh handle.
    #[must_use]
    pub fn wrap(value: T) -> Self {
        Self(Rc::new(RefCell::new(value)))
    }

    /// Whether both handles point at the same object.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Stable identity of the pointee while any handle is alive.
    #[must_use]
    pub fn key(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }

    pub(crate) fn borrow(&self) -> Ref<'_, T> {
        self.0.borrow()
    }

    pub(crate) fn borrow_mut(&self) -> RefMut<'_, T> {
        self.0.borrow_mut()
    }
}

impl<T> Clone for Shared<T> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<T> PartialEq for Shared<T> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl<T> Eq for Shared<T> {}

impl<T> Hash for Shared<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl<T: fmt::Debug> fmt::Debug for Shared<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(inner) => inner.fmt(f),
            Err(_) => f.write_str("<borrowed>"),
        }
    }
}
