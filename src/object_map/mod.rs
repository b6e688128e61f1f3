//! # Object identity and cross-reference maps
//!
//! Fillers translate input objects into output objects and must later find, for an input object
//! produced by *another* filler, the output object it became. This module provides the pieces
//! of that lookup:
//!
//! - [`IdentityKey`] – stable identity of one input object (collection handle + position).
//! - [`BiMap`](crate::object_map::bimap::BiMap) – a bidirectional hash map with explicit
//!   last-write-wins semantics.
//! - [`TypedObjectMap`](crate::object_map::typed_map::TypedObjectMap) – a `BiMap` from
//!   [`IdentityKey`] to [`OutputHandle`](crate::event::collection::OutputHandle), tagged with
//!   its `(input kind, output kind)` pair.
//! - [`ObjectMapStore`](crate::object_map::store::ObjectMapStore) – the named registry of typed
//!   maps, one entry per filler, cleared between events.
//!
//! ## Lifecycle
//!
//! ```text
//! construction   fill (event n)          setRefs (event n)         next event
//! register ───▶  MapScope::own().add ──▶ store.get(name)?.find ──▶ store.clear()
//! ```
//!
//! Registrations and kind tags survive [`clear`](crate::object_map::store::ObjectMapStore::clear);
//! only the content is dropped.
//!
//! ## See also
//! ------------
//! * [`InputCollection::key`](crate::input::InputCollection::key) – Builds keys for input objects.
//! * [`Filler`](crate::filler::Filler) – The two-phase protocol that populates and reads maps.

pub mod bimap;
pub mod store;
pub mod typed_map;

use std::any::{type_name, TypeId};
use std::fmt;

/// Opaque handle of one input collection, issued by the
/// [`ProductRegistry`](crate::input::ProductRegistry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CollectionHandle(pub(crate) u32);

impl CollectionHandle {
    pub fn id(&self) -> u32 {
        self.0
    }
}

/// Identity of one input object: the collection it lives in and its position there.
///
/// Keys are compared by value and never dereferenced by the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IdentityKey {
    pub collection: CollectionHandle,
    pub index: usize,
}

impl IdentityKey {
    pub fn new(collection: CollectionHandle, index: usize) -> Self {
        IdentityKey { collection, index }
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.collection.0, self.index)
    }
}

/// Runtime tag of an `(input kind, output kind)` pair.
///
/// Equality only looks at the type ids; the names are kept for diagnostics.
#[derive(Debug, Clone, Copy)]
pub struct KindTag {
    input: TypeId,
    output: TypeId,
    input_name: &'static str,
    output_name: &'static str,
}

impl KindTag {
    pub fn of<In: 'static, Out: 'static>() -> Self {
        KindTag {
            input: TypeId::of::<In>(),
            output: TypeId::of::<Out>(),
            input_name: type_name::<In>(),
            output_name: type_name::<Out>(),
        }
    }
}

impl PartialEq for KindTag {
    fn eq(&self, other: &Self) -> bool {
        self.input == other.input && self.output == other.output
    }
}

impl Eq for KindTag {}

impl fmt::Display for KindTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} -> {})", self.input_name, self.output_name)
    }
}
