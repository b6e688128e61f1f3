//! # Input products
//!
//! Fillers never read input collections by raw name during an event. They declare what they
//! consume once, at construction, through the job's [`ProductRegistry`], and receive a typed
//! [`ProductToken`]. During the event the token is exchanged for an [`InputCollection`] view via
//! [`InputEvent::product`].
//!
//! The registry also issues the [`CollectionHandle`] of every consumed label, so that
//! [`IdentityKey`]s built by different fillers for the same input object compare equal.
//!
//! Availability rules
//! -----------------
//! * mandatory token, product present → `Ok(Some(view))`
//! * mandatory token, product absent → [`NtuplizerError::MissingProduct`] (event-local)
//! * optional token, product absent → `Ok(None)`
//! * product stored with another element type → [`NtuplizerError::TypeMismatch`]
pub mod records;

use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::marker::PhantomData;

use ahash::AHashMap;
use itertools::Itertools;

use crate::event::EventId;
use crate::ntuplizer_errors::NtuplizerError;
use crate::object_map::{CollectionHandle, IdentityKey};

#[derive(Debug, Clone, Copy)]
struct Registration {
    handle: CollectionHandle,
    /// `None` for derived collections, which hold no input objects.
    element: Option<(TypeId, &'static str)>,
}

/// Job-scoped table of consumed input labels.
#[derive(Debug, Default)]
pub struct ProductRegistry {
    labels: AHashMap<String, Registration>,
}

impl ProductRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare that `label` is read as a collection of `T`.
    ///
    /// Several fillers may consume the same label; they share its [`CollectionHandle`].
    ///
    /// Errors
    /// ----------
    /// * [`NtuplizerError::TypeMismatch`] if `label` was declared with another element type.
    pub fn consumes<T: 'static>(
        &mut self,
        label: &str,
        mandatory: bool,
    ) -> Result<ProductToken<T>, NtuplizerError> {
        let requested = (TypeId::of::<T>(), type_name::<T>());
        let next = CollectionHandle(self.labels.len() as u32);
        let registration = self
            .labels
            .entry(label.to_string())
            .or_insert(Registration {
                handle: next,
                element: Some(requested),
            });

        match registration.element {
            Some((id, _)) if id == requested.0 => Ok(ProductToken {
                label: label.to_string(),
                handle: registration.handle,
                mandatory,
                _marker: PhantomData,
            }),
            stored => Err(NtuplizerError::TypeMismatch {
                name: label.to_string(),
                stored: stored.map_or("derived collection", |(_, name)| name).to_string(),
                requested: requested.1.to_string(),
            }),
        }
    }

    /// Handle for identities that do not come from an input collection (e.g. objects synthesized
    /// by a filler). Repeated calls with the same label return the same handle.
    pub fn derived(&mut self, label: &str) -> CollectionHandle {
        let next = CollectionHandle(self.labels.len() as u32);
        self.labels
            .entry(label.to_string())
            .or_insert(Registration {
                handle: next,
                element: None,
            })
            .handle
    }

    /// Handle of a label already consumed or derived by some filler.
    ///
    /// Errors
    /// ----------
    /// * [`NtuplizerError::UnregisteredProduct`] if no filler registered `label`.
    pub fn handle(&self, label: &str) -> Result<CollectionHandle, NtuplizerError> {
        self.labels
            .get(label)
            .map(|r| r.handle)
            .ok_or_else(|| NtuplizerError::UnregisteredProduct(label.to_string()))
    }

    /// Registered labels, sorted.
    pub fn labels(&self) -> Vec<&str> {
        self.labels.keys().map(String::as_str).sorted().collect()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Typed permission to read one input collection.
pub struct ProductToken<T> {
    label: String,
    handle: CollectionHandle,
    mandatory: bool,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for ProductToken<T> {
    fn clone(&self) -> Self {
        ProductToken {
            label: self.label.clone(),
            handle: self.handle,
            mandatory: self.mandatory,
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for ProductToken<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProductToken")
            .field("label", &self.label)
            .field("handle", &self.handle)
            .field("mandatory", &self.mandatory)
            .finish()
    }
}

impl<T> ProductToken<T> {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn handle(&self) -> CollectionHandle {
        self.handle
    }

    pub fn is_mandatory(&self) -> bool {
        self.mandatory
    }

    /// Identity of the object at `index` of the collection read through this token.
    pub fn key(&self, index: usize) -> IdentityKey {
        IdentityKey::new(self.handle, index)
    }
}

/// Read-only view of one input collection for the current event.
pub struct InputCollection<'a, T> {
    handle: CollectionHandle,
    items: &'a [T],
}

impl<T> Clone for InputCollection<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for InputCollection<'_, T> {}

impl<T: fmt::Debug> fmt::Debug for InputCollection<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputCollection")
            .field("handle", &self.handle)
            .field("items", &self.items)
            .finish()
    }
}

impl<'a, T> InputCollection<'a, T> {
    pub fn handle(&self) -> CollectionHandle {
        self.handle
    }

    pub fn key(&self, index: usize) -> IdentityKey {
        IdentityKey::new(self.handle, index)
    }

    pub fn items(&self) -> &'a [T] {
        self.items
    }

    pub fn get(&self, index: usize) -> Option<&'a T> {
        self.items.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'a, T> {
        self.items.iter()
    }

    /// Objects paired with their identity.
    pub fn keyed(&self) -> impl Iterator<Item = (IdentityKey, &'a T)> + 'a {
        let handle = self.handle;
        self.items
            .iter()
            .enumerate()
            .map(move |(i, item)| (IdentityKey::new(handle, i), item))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Input products of one event, addressed by label.
#[derive(Default)]
pub struct InputEvent {
    pub id: EventId,
    pub is_real_data: bool,
    products: AHashMap<String, Box<dyn Any + Send + Sync>>,
}

impl fmt::Debug for InputEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputEvent")
            .field("id", &self.id)
            .field("is_real_data", &self.is_real_data)
            .field("products", &self.labels())
            .finish()
    }
}

impl InputEvent {
    pub fn new(id: EventId) -> Self {
        InputEvent {
            id,
            ..Default::default()
        }
    }

    /// Store a product, replacing any previous product with the same label.
    pub fn put<T: Send + Sync + 'static>(&mut self, label: &str, items: Vec<T>) {
        self.products.insert(label.to_string(), Box::new(items));
    }

    pub fn with<T: Send + Sync + 'static>(mut self, label: &str, items: Vec<T>) -> Self {
        self.put(label, items);
        self
    }

    pub fn remove(&mut self, label: &str) -> bool {
        self.products.remove(label).is_some()
    }

    pub fn contains(&self, label: &str) -> bool {
        self.products.contains_key(label)
    }

    pub fn labels(&self) -> Vec<&str> {
        self.products.keys().map(String::as_str).sorted().collect()
    }

    /// Read the product behind `token`.
    ///
    /// Return
    /// ----------
    /// * `Ok(Some(view))` when present, `Ok(None)` when absent and the token is optional.
    ///
    /// Errors
    /// ----------
    /// * [`NtuplizerError::MissingProduct`] when absent and the token is mandatory.
    /// * [`NtuplizerError::TypeMismatch`] when the product holds another element type.
    pub fn product<T: 'static>(
        &self,
        token: &ProductToken<T>,
    ) -> Result<Option<InputCollection<'_, T>>, NtuplizerError> {
        let Some(product) = self.products.get(token.label()) else {
            return if token.is_mandatory() {
                Err(NtuplizerError::MissingProduct(token.label().to_string()))
            } else {
                Ok(None)
            };
        };

        let items = product.downcast_ref::<Vec<T>>().ok_or_else(|| {
            NtuplizerError::TypeMismatch {
                name: token.label().to_string(),
                stored: "another element type".to_string(),
                requested: type_name::<T>().to_string(),
            }
        })?;

        Ok(Some(InputCollection {
            handle: token.handle(),
            items,
        }))
    }

    /// Like [`product`](InputEvent::product) for a mandatory token: absence is always an error.
    pub fn require<T: 'static>(
        &self,
        token: &ProductToken<T>,
    ) -> Result<InputCollection<'_, T>, NtuplizerError> {
        self.product(token)?
            .ok_or_else(|| NtuplizerError::MissingProduct(token.label().to_string()))
    }
}

/// Run-level input, handed to [`Filler::fill_run`](crate::filler::Filler::fill_run).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputRun {
    pub run: u32,
    pub is_real_data: bool,
}
