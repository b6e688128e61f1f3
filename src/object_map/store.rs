use ahash::AHashMap;
use itertools::Itertools;

use crate::ntuplizer_errors::NtuplizerError;
use crate::object_map::typed_map::{ErasedObjectMap, TypedObjectMap};
use crate::object_map::KindTag;

/// Registry of named [`TypedObjectMap`]s for one processing job.
///
/// Each filler registers its maps once, at construction, under its own name (or
/// `"<filler>:<label>"` for additional maps). The set of names is fixed after that;
/// [`clear`](ObjectMapStore::clear) only empties the contents between events.
///
/// Retrieval is type-checked: a name bound to another `(In, Out)` pair yields
/// [`NtuplizerError::TypeMismatch`], which is a configuration fault.
///
/// See also
/// ------------
/// * [`MapScope`] – Restricted mutable view handed to a filler during value extraction.
#[derive(Debug, Default)]
pub struct ObjectMapStore {
    maps: AHashMap<String, Box<dyn ErasedObjectMap>>,
}

impl ObjectMapStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the map registered under `name`, creating it if absent.
    ///
    /// Arguments
    /// -----------------
    /// * `name`: registration name, usually the filler name.
    ///
    /// Return
    /// ----------
    /// * The typed map, or [`NtuplizerError::TypeMismatch`] if `name` is already bound to
    ///   another kind pair.
    pub fn get_or_create<In, Out>(
        &mut self,
        name: &str,
    ) -> Result<&mut TypedObjectMap<In, Out>, NtuplizerError>
    where
        In: Send + 'static,
        Out: Send + 'static,
    {
        let entry = self
            .maps
            .entry(name.to_string())
            .or_insert_with(|| Box::new(TypedObjectMap::<In, Out>::new()));
        let stored = entry.kind();

        entry
            .as_any_mut()
            .downcast_mut::<TypedObjectMap<In, Out>>()
            .ok_or_else(|| mismatch::<In, Out>(name, stored))
    }

    /// Register a map without using it yet.
    pub fn register<In, Out>(&mut self, name: &str) -> Result<(), NtuplizerError>
    where
        In: Send + 'static,
        Out: Send + 'static,
    {
        self.get_or_create::<In, Out>(name).map(|_| ())
    }

    /// Read-only, type-checked lookup.
    ///
    /// An unknown name is `Ok(None)`: the providing filler may be disabled or absent from the
    /// job, which callers must treat like a missing counterpart.
    pub fn get<In, Out>(&self, name: &str) -> Result<Option<&TypedObjectMap<In, Out>>, NtuplizerError>
    where
        In: Send + 'static,
        Out: Send + 'static,
    {
        let Some(entry) = self.maps.get(name) else {
            return Ok(None);
        };

        entry
            .as_any()
            .downcast_ref::<TypedObjectMap<In, Out>>()
            .map(Some)
            .ok_or_else(|| mismatch::<In, Out>(name, entry.kind()))
    }

    /// Empty every registered map, keeping names and kind tags. Idempotent.
    pub fn clear(&mut self) {
        self.maps.values_mut().for_each(|m| m.clear());
    }

    pub fn contains(&self, name: &str) -> bool {
        self.maps.contains_key(name)
    }

    pub fn kind_of(&self, name: &str) -> Option<KindTag> {
        self.maps.get(name).map(|m| m.kind())
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.maps.keys().map(String::as_str).sorted().collect()
    }

    /// Number of links currently held by the map `name` (0 if unknown).
    pub fn entries(&self, name: &str) -> usize {
        self.maps.get(name).map_or(0, |m| m.len())
    }

    /// Number of registered maps.
    pub fn len(&self) -> usize {
        self.maps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }

    /// Mutable view restricted to the maps owned by `owner`.
    pub fn scope<'a>(&'a mut self, owner: &'a str) -> MapScope<'a> {
        MapScope { store: self, owner }
    }
}

fn mismatch<In: 'static, Out: 'static>(name: &str, stored: KindTag) -> NtuplizerError {
    NtuplizerError::TypeMismatch {
        name: name.to_string(),
        stored: stored.to_string(),
        requested: KindTag::of::<In, Out>().to_string(),
    }
}

/// Mutable access to the maps of a single filler.
///
/// During value extraction a filler may only publish into its own maps: the map named after the
/// filler and the maps named `"<filler>:<label>"`. Reading other fillers' maps is deferred to
/// reference linking, where the whole store is available read-only.
pub struct MapScope<'a> {
    store: &'a mut ObjectMapStore,
    owner: &'a str,
}

impl MapScope<'_> {
    pub fn owner(&self) -> &str {
        self.owner
    }

    /// The map registered under the owner's name.
    pub fn own<In, Out>(&mut self) -> Result<&mut TypedObjectMap<In, Out>, NtuplizerError>
    where
        In: Send + 'static,
        Out: Send + 'static,
    {
        self.store.get_or_create::<In, Out>(self.owner)
    }

    /// A map owned by this filler, addressed by its full name.
    ///
    /// Errors
    /// ----------
    /// * [`NtuplizerError::ForeignMapAccess`] if `name` belongs to another filler.
    pub fn get_mut<In, Out>(&mut self, name: &str) -> Result<&mut TypedObjectMap<In, Out>, NtuplizerError>
    where
        In: Send + 'static,
        Out: Send + 'static,
    {
        let owned = name == self.owner
            || name
                .strip_prefix(self.owner)
                .is_some_and(|rest| rest.starts_with(':'));

        if !owned {
            return Err(NtuplizerError::ForeignMapAccess {
                owner: self.owner.to_string(),
                requested: name.to_string(),
            });
        }

        self.store.get_or_create::<In, Out>(name)
    }
}
