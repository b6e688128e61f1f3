use std::any::Any;
use std::fmt;
use std::marker::PhantomData;

use crate::event::collection::OutputHandle;
use crate::object_map::bimap::BiMap;
use crate::object_map::{IdentityKey, KindTag};

/// Input identity ⇄ output handle map of one filler, for one `(In, Out)` kind pair.
///
/// `In` is the input record type the keys were taken from and `Out` the output object type
/// the handles point to. Both only exist at the type level; the map stores keys and handles.
///
/// Invariant
/// -----------------
/// The forward (`IdentityKey → OutputHandle<Out>`) and backward
/// (`OutputHandle<Out> → IdentityKey`) maps are mutual inverses at all times. Re-adding a key
/// with another handle is **last write wins**: the stale backward entry is retired, and
/// symmetrically for a handle re-added with another key.
///
/// See also
/// ------------
/// * [`ObjectMapStore`](crate::object_map::store::ObjectMapStore) – Named registry of these maps.
pub struct TypedObjectMap<In, Out> {
    links: BiMap<IdentityKey, OutputHandle<Out>>,
    _input: PhantomData<fn() -> In>,
}

impl<In, Out> Default for TypedObjectMap<In, Out> {
    fn default() -> Self {
        TypedObjectMap {
            links: BiMap::new(),
            _input: PhantomData,
        }
    }
}

impl<In, Out> fmt::Debug for TypedObjectMap<In, Out> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedObjectMap")
            .field("links", &self.links)
            .finish()
    }
}

impl<In: 'static, Out: 'static> TypedObjectMap<In, Out> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn kind() -> KindTag {
        KindTag::of::<In, Out>()
    }

    /// Link an input object to the output object it became.
    ///
    /// Arguments
    /// -----------------
    /// * `key`: identity of the input object.
    /// * `handle`: position of the output object.
    ///
    /// Return
    /// ----------
    /// * The handle previously bound to `key`, if it was different. Its backward entry has
    ///   been removed.
    pub fn add(&mut self, key: IdentityKey, handle: OutputHandle<Out>) -> Option<OutputHandle<Out>> {
        let (stale_handle, _stale_key) = self.links.insert(key, handle);
        stale_handle
    }

    /// Output handle of an input object. `None` is a valid answer: the object was not selected.
    pub fn find(&self, key: &IdentityKey) -> Option<OutputHandle<Out>> {
        self.links.get_by_key(key).copied()
    }

    /// Input identity of an output object.
    pub fn find_key(&self, handle: OutputHandle<Out>) -> Option<IdentityKey> {
        self.links.get_by_value(&handle).copied()
    }

    pub fn contains(&self, key: &IdentityKey) -> bool {
        self.links.contains_key(key)
    }

    /// Forward pairs (`input → output`), in no particular order.
    pub fn iter_forward(&self) -> impl Iterator<Item = (IdentityKey, OutputHandle<Out>)> + '_ {
        self.links.iter_forward().map(|(k, h)| (*k, *h))
    }

    /// Backward pairs (`output → input`), in no particular order.
    pub fn iter_backward(&self) -> impl Iterator<Item = (OutputHandle<Out>, IdentityKey)> + '_ {
        self.links.iter_backward().map(|(h, k)| (*h, *k))
    }

    pub fn clear(&mut self) {
        self.links.clear();
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Check the bijection invariant. Used by tests and debug assertions.
    pub fn is_consistent(&self) -> bool {
        self.links.is_consistent()
    }
}

/// Type-erased view of a [`TypedObjectMap`], stored by the
/// [`ObjectMapStore`](crate::object_map::store::ObjectMapStore).
pub(crate) trait ErasedObjectMap: Any + Send + fmt::Debug {
    fn clear(&mut self);
    fn len(&self) -> usize;
    fn kind(&self) -> KindTag;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<In: 'static, Out: 'static> ErasedObjectMap for TypedObjectMap<In, Out> {
    fn clear(&mut self) {
        TypedObjectMap::clear(self);
    }

    fn len(&self) -> usize {
        TypedObjectMap::len(self)
    }

    fn kind(&self) -> KindTag {
        KindTag::of::<In, Out>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
