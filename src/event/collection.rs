use std::any::Any;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use itertools::Itertools;

/// Typed position of an element in an [`OutputCollection<T>`].
///
/// Handles are valid for one event; the collection is reset by
/// [`OutputEventRecord::init`](crate::event::OutputEventRecord::init) and positions are reused.
pub struct OutputHandle<T> {
    index: usize,
    _kind: PhantomData<fn() -> T>,
}

impl<T> OutputHandle<T> {
    pub fn new(index: usize) -> Self {
        OutputHandle {
            index,
            _kind: PhantomData,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }
}

impl<T> Clone for OutputHandle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for OutputHandle<T> {}

impl<T> PartialEq for OutputHandle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl<T> Eq for OutputHandle<T> {}

impl<T> PartialOrd for OutputHandle<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for OutputHandle<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.index.cmp(&other.index)
    }
}

impl<T> Hash for OutputHandle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
    }
}

impl<T> fmt::Debug for OutputHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OutputHandle({})", self.index)
    }
}

/// Append-only, indexable output collection of one object category.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputCollection<T> {
    items: Vec<T>,
}

impl<T> Default for OutputCollection<T> {
    fn default() -> Self {
        OutputCollection { items: Vec::new() }
    }
}

impl<T> OutputCollection<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an element and return its handle.
    pub fn push(&mut self, item: T) -> OutputHandle<T> {
        self.items.push(item);
        OutputHandle::new(self.items.len() - 1)
    }

    pub fn get(&self, handle: OutputHandle<T>) -> Option<&T> {
        self.items.get(handle.index)
    }

    pub fn get_mut(&mut self, handle: OutputHandle<T>) -> Option<&mut T> {
        self.items.get_mut(handle.index)
    }

    pub fn handle_at(&self, index: usize) -> Option<OutputHandle<T>> {
        (index < self.items.len()).then(|| OutputHandle::new(index))
    }

    pub fn handles(&self) -> impl Iterator<Item = OutputHandle<T>> {
        (0..self.items.len()).map(OutputHandle::new)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.items.iter_mut()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Reorder the collection with a stable sort and return the permutation applied.
    ///
    /// Arguments
    /// -----------------
    /// * `compare`: ordering of two elements.
    ///
    /// Return
    /// ----------
    /// * `original[new_position] = old_position`, so a filler that recorded per-element
    ///   bookkeeping before sorting can still find each element afterwards.
    pub fn sort_by<F>(&mut self, mut compare: F) -> Vec<usize>
    where
        F: FnMut(&T, &T) -> Ordering,
    {
        let original: Vec<usize> = (0..self.items.len())
            .sorted_by(|&a, &b| compare(&self.items[a], &self.items[b]))
            .collect();

        let mut slots: Vec<Option<T>> = self.items.drain(..).map(Some).collect();
        self.items = original
            .iter()
            .filter_map(|&old| slots[old].take())
            .collect();

        original
    }
}

impl<'a, T> IntoIterator for &'a OutputCollection<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Type-erased view over an output collection, used by the event record to hold collections
/// of different element types under their names.
pub(crate) trait ErasedCollection: Any + Send + fmt::Debug {
    fn clear(&mut self);
    fn len(&self) -> usize;
    fn element_type(&self) -> &'static str;
    fn clone_box(&self) -> Box<dyn ErasedCollection>;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T> ErasedCollection for OutputCollection<T>
where
    T: Clone + Send + fmt::Debug + 'static,
{
    fn clear(&mut self) {
        OutputCollection::clear(self);
    }

    fn len(&self) -> usize {
        OutputCollection::len(self)
    }

    fn element_type(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn clone_box(&self) -> Box<dyn ErasedCollection> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
