//! Job-scoped filler factories.
//!
//! A [`FillerRegistry`] maps a class name to a constructor. It is an ordinary value owned by
//! whoever builds the job; there is no process-wide table.
use std::fmt;

use ahash::AHashMap;
use itertools::Itertools;

use crate::filler::{Filler, FillerConfig, JobContext};
use crate::fillers::gen_particles::GenParticlesFiller;
use crate::fillers::muons::MuonsFiller;
use crate::fillers::pf_cands::PfCandsFiller;
use crate::fillers::vertices::VerticesFiller;
use crate::ntuplizer_errors::NtuplizerError;

/// Constructor of one filler class.
pub type FillerFactory =
    Box<dyn Fn(&FillerConfig, &mut JobContext<'_>) -> Result<Box<dyn Filler>, NtuplizerError> + Send + Sync>;

#[derive(Default)]
pub struct FillerRegistry {
    factories: AHashMap<String, FillerFactory>,
}

impl fmt::Debug for FillerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FillerRegistry")
            .field("classes", &self.classes())
            .finish()
    }
}

impl FillerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry knowing the fillers shipped with the crate.
    pub fn with_builtin_fillers() -> Self {
        let mut registry = Self::new();
        registry.register("VerticesFiller", |config, ctx| {
            Ok(Box::new(VerticesFiller::new(config, ctx)?))
        });
        registry.register("PFCandsFiller", |config, ctx| {
            Ok(Box::new(PfCandsFiller::new(config, ctx)?))
        });
        registry.register("GenParticlesFiller", |config, ctx| {
            Ok(Box::new(GenParticlesFiller::new(config, ctx)?))
        });
        registry.register("MuonsFiller", |config, ctx| {
            Ok(Box::new(MuonsFiller::new(config, ctx)?))
        });
        registry
    }

    /// Register (or replace) the factory of `class`.
    pub fn register<F>(&mut self, class: &str, factory: F)
    where
        F: Fn(&FillerConfig, &mut JobContext<'_>) -> Result<Box<dyn Filler>, NtuplizerError>
            + Send
            + Sync
            + 'static,
    {
        self.factories.insert(class.to_string(), Box::new(factory));
    }

    pub fn contains(&self, class: &str) -> bool {
        self.factories.contains_key(class)
    }

    pub fn classes(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).sorted().collect()
    }

    /// Instantiate the filler described by `config`.
    ///
    /// Errors
    /// ----------
    /// * [`NtuplizerError::UnknownFillerClass`] if `config.class` is not registered.
    /// * Whatever the factory reports (configuration faults, map kind conflicts).
    pub fn make(
        &self,
        config: &FillerConfig,
        ctx: &mut JobContext<'_>,
    ) -> Result<Box<dyn Filler>, NtuplizerError> {
        let factory = self
            .factories
            .get(&config.class)
            .ok_or_else(|| NtuplizerError::UnknownFillerClass(config.class.clone()))?;
        factory(config, ctx)
    }
}
