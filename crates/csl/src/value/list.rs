//! Owned lists and their flags

use bitflags::bitflags;

use super::Value;
use crate::eval::ensure_sufficient_stack;

bitflags! {
    /// Marks a list as something other than plain data.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ListFlags: u8 {
        /// `[parameter-list, body]` pair produced by `lambda`/`defun`
        const FUNCTION = 1 << 0;
        /// `[library, symbol, return-type, parameter-types]` produced by `ffi`
        const FOREIGN = 1 << 1;
    }
}

/// An ordered sequence of values that exclusively owns its children.
///
/// Cloning recurses on a growable stack and dropping is iterative, so
/// arbitrarily deep literals from the reader are safe to copy and free.
#[derive(Default)]
pub struct List {
    items: Vec<Value>,
    flags: ListFlags,
}

impl List {
    /// Create an empty, unflagged list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a list from items with the given flags.
    pub fn with_flags(items: Vec<Value>, flags: ListFlags) -> Self {
        Self { items, flags }
    }

    /// The list's flags.
    pub fn flags(&self) -> ListFlags {
        self.flags
    }

    /// Whether this list is a function definition.
    pub fn is_function(&self) -> bool {
        self.flags.contains(ListFlags::FUNCTION)
    }

    /// Whether this list is a foreign declaration.
    pub fn is_foreign(&self) -> bool {
        self.flags.contains(ListFlags::FOREIGN)
    }

    /// Whether any flag is set. Flagged lists are values, not call forms.
    pub fn is_flagged(&self) -> bool {
        !self.flags.is_empty()
    }

    /// Number of children.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the list has no children.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Borrow the child at `index`.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.items.get(index)
    }

    /// Prepend a child.
    pub fn insert_head(&mut self, value: Value) {
        self.items.insert(0, value);
    }

    /// Append a child.
    pub fn insert_tail(&mut self, value: Value) {
        self.items.push(value);
    }

    /// Remove and return the child at `index`.
    pub fn remove(&mut self, index: usize) -> Option<Value> {
        (index < self.items.len()).then(|| self.items.remove(index))
    }

    /// Remove and return the first child.
    pub fn remove_head(&mut self) -> Option<Value> {
        self.remove(0)
    }

    /// Remove and return the last child.
    pub fn remove_tail(&mut self) -> Option<Value> {
        self.items.pop()
    }

    /// Iterate over the children.
    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.items.iter()
    }

    /// The children as a slice.
    pub fn as_slice(&self) -> &[Value] {
        &self.items
    }

    /// Consume the list, returning its children.
    pub fn into_items(mut self) -> Vec<Value> {
        std::mem::take(&mut self.items)
    }
}

impl Clone for List {
    fn clone(&self) -> Self {
        ensure_sufficient_stack(|| Self {
            items: self.items.clone(),
            flags: self.flags,
        })
    }
}

impl Drop for List {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.items);
        while let Some(value) = pending.pop() {
            if let Value::List(mut child) = value {
                pending.append(&mut child.items);
            }
        }
    }
}

impl From<Vec<Value>> for List {
    fn from(items: Vec<Value>) -> Self {
        Self {
            items,
            flags: ListFlags::empty(),
        }
    }
}

impl FromIterator<Value> for List {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self::from(iter.into_iter().collect::<Vec<_>>())
    }
}

impl<'a> IntoIterator for &'a List {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
