//! # Fillers
//!
//! A [`Filler`] is one unit of per-event extraction: it reads some input products, writes some
//! output collections, and publishes the correspondence between the two in an object map named
//! after itself. Every event it is driven through two phases by the
//! [`Producer`](crate::pipeline::producer::Producer):
//!
//! 1. [`Filler::fill`] (value extraction) – convert input objects, record `input → output`
//!    links in its own maps. Other fillers' maps are out of reach: the [`MapScope`] only hands
//!    out maps named after the filler.
//! 2. [`Filler::set_refs`] (reference linking) – read any map, by name, through the shared
//!    [`ObjectMapStore`], and fill the cross references of its own output objects.
//!
//! Fillers are built once per job from a [`FillerConfig`] by the
//! [`FillerRegistry`](crate::filler::registry::FillerRegistry). Construction is where input
//! labels are resolved into [`ProductToken`]s and object maps are registered, so misconfiguration
//! surfaces before the first event.
//!
//! ## See also
//! ------------
//! * [`crate::fillers`] – The built-in fillers.
pub mod registry;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::event::{OutputEventRecord, RunRecord};
use crate::input::{InputEvent, InputRun, ProductRegistry, ProductToken};
use crate::ntuplizer_errors::NtuplizerError;
use crate::object_map::store::{MapScope, ObjectMapStore};

/// One per-event extraction unit.
pub trait Filler: Send {
    /// Unique name; also the name of the object map the filler publishes.
    fn name(&self) -> &str;

    fn enabled(&self) -> bool {
        true
    }

    /// Output fields written by this filler.
    fn branch_names(&self) -> Vec<String> {
        Vec::new()
    }

    /// Input labels consumed by this filler.
    fn reads(&self) -> Vec<String> {
        Vec::new()
    }

    /// Value extraction.
    fn fill(
        &mut self,
        out: &mut OutputEventRecord,
        input: &InputEvent,
        maps: &mut MapScope<'_>,
    ) -> Result<(), NtuplizerError>;

    /// Reference linking. Runs after every enabled filler has completed [`fill`](Filler::fill).
    fn set_refs(
        &mut self,
        _out: &mut OutputEventRecord,
        _maps: &ObjectMapStore,
    ) -> Result<(), NtuplizerError> {
        Ok(())
    }

    /// Once per run, before the first event of the run.
    fn fill_run(&mut self, _run: &mut RunRecord, _input: &InputRun) -> Result<(), NtuplizerError> {
        Ok(())
    }
}

/// Value of a filler parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<ParamValue>),
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Int(value)
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Float(value)
    }
}

impl<T: Into<ParamValue>> From<Vec<T>> for ParamValue {
    fn from(values: Vec<T>) -> Self {
        ParamValue::List(values.into_iter().map(Into::into).collect())
    }
}

fn default_enabled() -> bool {
    true
}

/// Configuration of one filler.
///
/// ```rust
/// use ntuplizer::filler::FillerConfig;
///
/// let config = FillerConfig::new("muons", "MuonsFiller")
///     .with_param("muons", "slimmedMuons")
///     .with_param("minPt", 5.0);
/// assert_eq!(config.text("muons").unwrap(), Some("slimmedMuons"));
/// assert_eq!(config.float_or("minPt", -1.0).unwrap(), 5.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillerConfig {
    pub name: String,
    pub class: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub params: BTreeMap<String, ParamValue>,
}

impl FillerConfig {
    pub fn new(name: &str, class: &str) -> Self {
        FillerConfig {
            name: name.to_string(),
            class: class.to_string(),
            enabled: true,
            params: BTreeMap::new(),
        }
    }

    pub fn with_param(mut self, key: &str, value: impl Into<ParamValue>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    fn wrong_type(&self, key: &str, expected: &str) -> NtuplizerError {
        NtuplizerError::config(
            &self.name,
            format!("parameter '{key}' must be {expected}, got {:?}", self.params.get(key)),
        )
    }

    /// Text parameter; an empty string counts as absent.
    pub fn text(&self, key: &str) -> Result<Option<&str>, NtuplizerError> {
        match self.params.get(key) {
            None => Ok(None),
            Some(ParamValue::Text(s)) if s.is_empty() => Ok(None),
            Some(ParamValue::Text(s)) => Ok(Some(s)),
            Some(_) => Err(self.wrong_type(key, "a string")),
        }
    }

    /// Numeric parameter, integers are widened.
    pub fn float_or(&self, key: &str, default: f64) -> Result<f64, NtuplizerError> {
        match self.params.get(key) {
            None => Ok(default),
            Some(ParamValue::Float(v)) => Ok(*v),
            Some(ParamValue::Int(v)) => Ok(*v as f64),
            Some(_) => Err(self.wrong_type(key, "a number")),
        }
    }

    pub fn bool_or(&self, key: &str, default: bool) -> Result<bool, NtuplizerError> {
        match self.params.get(key) {
            None => Ok(default),
            Some(ParamValue::Bool(v)) => Ok(*v),
            Some(_) => Err(self.wrong_type(key, "a boolean")),
        }
    }

    /// List of strings; integers in the list are accepted and rendered as text.
    pub fn text_list(&self, key: &str) -> Result<Vec<String>, NtuplizerError> {
        let values = match self.params.get(key) {
            None => return Ok(Vec::new()),
            Some(ParamValue::List(values)) => values,
            Some(_) => return Err(self.wrong_type(key, "a list")),
        };

        values
            .iter()
            .map(|v| match v {
                ParamValue::Text(s) => Ok(s.clone()),
                ParamValue::Int(i) => Ok(i.to_string()),
                _ => Err(self.wrong_type(key, "a list of strings or integers")),
            })
            .collect()
    }
}

/// What a filler sees while being constructed.
#[derive(Debug)]
pub struct JobContext<'a> {
    pub products: &'a mut ProductRegistry,
    pub maps: &'a mut ObjectMapStore,
    pub is_real_data: bool,
}

impl JobContext<'_> {
    /// Resolve the input label stored under `param` into a token.
    ///
    /// Arguments
    /// -----------------
    /// * `config`: the filler configuration holding the label.
    /// * `param`: parameter name of the label.
    /// * `mandatory`: whether the product must be present in every event.
    ///
    /// Return
    /// ----------
    /// * `Ok(Some(token))` when the label is configured, `Ok(None)` for an unset optional label.
    ///
    /// Errors
    /// ----------
    /// * [`NtuplizerError::Configuration`] for an unset mandatory label.
    /// * [`NtuplizerError::TypeMismatch`] if the label is consumed elsewhere with another type.
    pub fn consumes<T: 'static>(
        &mut self,
        config: &FillerConfig,
        param: &str,
        mandatory: bool,
    ) -> Result<Option<ProductToken<T>>, NtuplizerError> {
        match config.text(param)? {
            Some(label) => self.products.consumes::<T>(label, mandatory).map(Some),
            None if mandatory => Err(NtuplizerError::config(
                &config.name,
                format!("missing or empty parameter '{param}'"),
            )),
            None => Ok(None),
        }
    }

    /// [`consumes`](JobContext::consumes) for a mandatory label.
    pub fn require<T: 'static>(
        &mut self,
        config: &FillerConfig,
        param: &str,
    ) -> Result<ProductToken<T>, NtuplizerError> {
        self.consumes(config, param, true)?
            .ok_or_else(|| NtuplizerError::config(&config.name, format!("missing parameter '{param}'")))
    }

    /// Register the map `config.name` with kind `(In, Out)`. Disabled fillers publish nothing.
    pub fn publish<In, Out>(&mut self, config: &FillerConfig) -> Result<(), NtuplizerError>
    where
        In: Send + 'static,
        Out: Send + 'static,
    {
        if config.enabled {
            self.maps.register::<In, Out>(&config.name)?;
        }
        Ok(())
    }
}
