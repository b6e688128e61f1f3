//! # Flat output records
//!
//! The [`OutputEventRecord`](crate::event::OutputEventRecord) is the single result of processing
//! one event: a set of **named, typed output collections** plus the scalar event metadata. It is
//! created once per [`Producer`](crate::pipeline::producer::Producer), populated by every filler,
//! handed to the [`EventSink`](crate::pipeline::sink::EventSink) and reset with
//! [`init`](crate::event::OutputEventRecord::init) before the next event.
//!
//! Collections are created on first access under a name, bound to their element type the same
//! way object maps are bound to their kind pair: asking for an existing name with another element
//! type is a [`TypeMismatch`](crate::ntuplizer_errors::NtuplizerError::TypeMismatch).
//!
//! The [`RunRecord`](crate::event::RunRecord) is its per-run counterpart, filled once at the
//! beginning of each run through [`Filler::fill_run`](crate::filler::Filler::fill_run).

pub mod collection;
pub mod objects;

use std::collections::BTreeMap;
use std::fmt;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::event::collection::{ErasedCollection, OutputCollection};
use crate::ntuplizer_errors::NtuplizerError;

/// Run / luminosity-section / event numbers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId {
    pub run: u32,
    pub lumi: u32,
    pub event: u64,
}

impl EventId {
    pub fn new(run: u32, lumi: u32, event: u64) -> Self {
        EventId { run, lumi, event }
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.run, self.lumi, self.event)
    }
}

/// Flat, cross-referenced result of one event.
#[derive(Debug, Default)]
pub struct OutputEventRecord {
    pub id: EventId,
    pub weight: f64,
    scalars: BTreeMap<String, f64>,
    collections: AHashMap<String, Box<dyn ErasedCollection>>,
}

impl Clone for OutputEventRecord {
    fn clone(&self) -> Self {
        OutputEventRecord {
            id: self.id,
            weight: self.weight,
            scalars: self.scalars.clone(),
            collections: self
                .collections
                .iter()
                .map(|(name, coll)| (name.clone(), coll.clone_box()))
                .collect(),
        }
    }
}

impl OutputEventRecord {
    pub fn new() -> Self {
        OutputEventRecord {
            weight: 1.0,
            ..Default::default()
        }
    }

    /// Reset the record for a new event.
    ///
    /// Collections are emptied but stay registered with their element type.
    pub fn init(&mut self) {
        self.id = EventId::default();
        self.weight = 1.0;
        self.scalars.clear();
        self.collections.values_mut().for_each(|c| c.clear());
    }

    /// Get the collection registered under `name`, creating it on first use.
    ///
    /// Arguments
    /// -----------------
    /// * `name`: the collection name (e.g. `"genParticles"`).
    ///
    /// Return
    /// ----------
    /// * The typed collection, or [`NtuplizerError::TypeMismatch`] if `name` is bound to
    ///   another element type.
    pub fn collection_mut<T>(&mut self, name: &str) -> Result<&mut OutputCollection<T>, NtuplizerError>
    where
        T: Clone + Send + fmt::Debug + 'static,
    {
        let entry = self
            .collections
            .entry(name.to_string())
            .or_insert_with(|| Box::new(OutputCollection::<T>::new()));
        let stored = entry.element_type();

        entry
            .as_any_mut()
            .downcast_mut::<OutputCollection<T>>()
            .ok_or_else(|| NtuplizerError::TypeMismatch {
                name: name.to_string(),
                stored: stored.to_string(),
                requested: std::any::type_name::<T>().to_string(),
            })
    }

    /// Read-only access to a collection. An unknown name is `Ok(None)`.
    pub fn collection<T>(&self, name: &str) -> Result<Option<&OutputCollection<T>>, NtuplizerError>
    where
        T: Clone + Send + fmt::Debug + 'static,
    {
        let Some(entry) = self.collections.get(name) else {
            return Ok(None);
        };

        entry
            .as_any()
            .downcast_ref::<OutputCollection<T>>()
            .map(Some)
            .ok_or_else(|| NtuplizerError::TypeMismatch {
                name: name.to_string(),
                stored: entry.element_type().to_string(),
                requested: std::any::type_name::<T>().to_string(),
            })
    }

    pub fn set_scalar(&mut self, name: &str, value: f64) {
        self.scalars.insert(name.to_string(), value);
    }

    pub fn scalar(&self, name: &str) -> Option<f64> {
        self.scalars.get(name).copied()
    }

    pub fn scalars(&self) -> &BTreeMap<String, f64> {
        &self.scalars
    }

    /// Names of the registered collections with their current sizes, sorted by name.
    pub fn collection_sizes(&self) -> Vec<(&str, usize)> {
        let mut sizes: Vec<_> = self
            .collections
            .iter()
            .map(|(name, coll)| (name.as_str(), coll.len()))
            .collect();
        sizes.sort_unstable();
        sizes
    }
}

/// Per-run summary record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub run: u32,
    pub values: BTreeMap<String, f64>,
}

impl RunRecord {
    pub fn init(&mut self) {
        self.run = 0;
        self.values.clear();
    }

    pub fn set(&mut self, name: &str, value: f64) {
        self.values.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }
}
