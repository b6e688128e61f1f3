//! # Producer
//!
//! The orchestrator of the two-phase pipeline. One [`Producer`] serves one worker: it owns its
//! fillers, its [`ObjectMapStore`], its output record and run record, and shares nothing with
//! other producers. Running several producers on several threads needs no synchronization.
//!
//! ## Example
//!
//! ```rust
//! use nalgebra::Vector3;
//! use ntuplizer::event::EventId;
//! use ntuplizer::filler::registry::FillerRegistry;
//! use ntuplizer::filler::FillerConfig;
//! use ntuplizer::input::records::RecoVertex;
//! use ntuplizer::input::InputEvent;
//! use ntuplizer::pipeline::producer::{Producer, ProducerConfig};
//! use ntuplizer::pipeline::sink::MemorySink;
//!
//! let config = ProducerConfig::new().with_filler(
//!     FillerConfig::new("vertices", "VerticesFiller")
//!         .with_param("vertices", "offlineSlimmedPrimaryVertices"),
//! );
//! let mut producer =
//!     Producer::from_config(&config, &FillerRegistry::with_builtin_fillers()).unwrap();
//!
//! let event = InputEvent::new(EventId::new(1, 1, 42)).with(
//!     "offlineSlimmedPrimaryVertices",
//!     vec![RecoVertex::new(Vector3::new(0.0, 0.0, 1.0), 12.0)],
//! );
//!
//! let mut sink = MemorySink::new();
//! let summary = producer.run([&event], &mut sink).unwrap();
//! assert_eq!(summary.processed, 1);
//! assert_eq!(sink.events[0].scalar("npv"), Some(1.0));
//! ```
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::event::{OutputEventRecord, RunRecord};
use crate::filler::registry::FillerRegistry;
use crate::filler::{Filler, FillerConfig, JobContext};
use crate::input::{InputEvent, InputRun, ProductRegistry};
use crate::ntuplizer_errors::{FaultKind, NtuplizerError};
use crate::object_map::store::ObjectMapStore;
use crate::pipeline::sink::EventSink;
use crate::pipeline::{EventOutcome, Phase, RunSummary};

/// Job configuration: the fillers in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProducerConfig {
    #[serde(default)]
    pub is_real_data: bool,
    #[serde(default)]
    pub fillers: Vec<FillerConfig>,
}

impl ProducerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filler(mut self, filler: FillerConfig) -> Self {
        self.fillers.push(filler);
        self
    }

    pub fn real_data(mut self, is_real_data: bool) -> Self {
        self.is_real_data = is_real_data;
        self
    }
}

pub struct Producer {
    fillers: Vec<Box<dyn Filler>>,
    maps: ObjectMapStore,
    products: ProductRegistry,
    output: OutputEventRecord,
    run: RunRecord,
    phase: Phase,
    is_real_data: bool,
}

impl std::fmt::Debug for Producer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Producer")
            .field("fillers", &self.filler_names())
            .field("maps", &self.maps.names())
            .field("phase", &self.phase)
            .field("is_real_data", &self.is_real_data)
            .finish()
    }
}

impl Producer {
    /// Build every configured filler, in declaration order.
    ///
    /// Errors
    /// ----------
    /// * [`NtuplizerError::Configuration`] for duplicate filler names or filler misconfiguration.
    /// * [`NtuplizerError::UnknownFillerClass`] for an unregistered class.
    /// * [`NtuplizerError::TypeMismatch`] if two fillers declare conflicting maps or products.
    pub fn from_config(
        config: &ProducerConfig,
        registry: &FillerRegistry,
    ) -> Result<Self, NtuplizerError> {
        if let Some(name) = config.fillers.iter().map(|f| &f.name).duplicates().next() {
            return Err(NtuplizerError::config(name, "duplicate filler name"));
        }

        let mut products = ProductRegistry::new();
        let mut maps = ObjectMapStore::new();
        let mut fillers = Vec::with_capacity(config.fillers.len());

        for filler_config in &config.fillers {
            let mut ctx = JobContext {
                products: &mut products,
                maps: &mut maps,
                is_real_data: config.is_real_data,
            };
            let filler = registry.make(filler_config, &mut ctx)?;
            debug!(
                filler = filler.name(),
                class = %filler_config.class,
                enabled = filler.enabled(),
                "filler constructed"
            );
            fillers.push(filler);
        }

        Ok(Producer {
            fillers,
            maps,
            products,
            output: OutputEventRecord::new(),
            run: RunRecord::default(),
            phase: Phase::Idle,
            is_real_data: config.is_real_data,
        })
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The record of the last processed event.
    ///
    /// After a skipped event the record is emptied and keeps only the id of that event.
    pub fn output(&self) -> &OutputEventRecord {
        &self.output
    }

    pub fn run_record(&self) -> &RunRecord {
        &self.run
    }

    pub fn products(&self) -> &ProductRegistry {
        &self.products
    }

    pub fn maps(&self) -> &ObjectMapStore {
        &self.maps
    }

    pub fn is_real_data(&self) -> bool {
        self.is_real_data
    }

    pub fn filler_names(&self) -> Vec<&str> {
        self.fillers.iter().map(|f| f.name()).collect()
    }

    /// Output fields of all fillers; a disabled filler contributes `!name`.
    pub fn branch_list(&self) -> Vec<String> {
        self.fillers
            .iter()
            .flat_map(|f| {
                if f.enabled() {
                    f.branch_names()
                } else {
                    vec![format!("!{}", f.name())]
                }
            })
            .collect()
    }

    /// Reset the run record and let every enabled filler fill it.
    pub fn begin_run(&mut self, input: &InputRun) -> Result<(), NtuplizerError> {
        self.run.init();
        self.run.run = input.run;
        self.phase = Phase::RunBegin;

        let result = self
            .fillers
            .iter_mut()
            .filter(|f| f.enabled())
            .try_for_each(|filler| {
                filler
                    .fill_run(&mut self.run, input)
                    .map_err(|e| e.in_filler(filler.name(), Phase::RunBegin))
            });

        self.phase = Phase::Idle;
        debug!(run = input.run, "run record filled");
        result
    }

    /// Hand the run record to `sink`.
    pub fn end_run<S: EventSink + ?Sized>(&mut self, sink: &mut S) -> Result<(), NtuplizerError> {
        sink.write_run(&self.run)
    }

    /// Produce one event.
    ///
    /// Return
    /// ----------
    /// * [`EventOutcome::Produced`] when both phases completed; [`output`](Producer::output)
    ///   then holds the event.
    /// * [`EventOutcome::Skipped`] when an event-local fault aborted the event; nothing the
    ///   fillers wrote before the fault is kept.
    ///
    /// Errors
    /// ----------
    /// * Any job-fatal fault, wrapped in a [`FillerFault`](crate::ntuplizer_errors::FillerFault)
    ///   naming the filler and the phase.
    pub fn process_event(&mut self, input: &InputEvent) -> Result<EventOutcome, NtuplizerError> {
        self.maps.clear();
        self.output.init();
        self.output.id = input.id;

        let result = self.run_phases(input);
        self.phase = Phase::Idle;

        match result {
            Ok(()) => Ok(EventOutcome::Produced),
            Err(e) if e.kind() == FaultKind::EventLocal => {
                warn!(event = %input.id, error = %e, "skipping event");
                self.maps.clear();
                self.output.init();
                self.output.id = input.id;
                Ok(EventOutcome::Skipped(e))
            }
            Err(e) => Err(e),
        }
    }

    fn run_phases(&mut self, input: &InputEvent) -> Result<(), NtuplizerError> {
        self.phase = Phase::ValueExtraction;
        debug!(event = %input.id, phase = %self.phase, "starting phase");

        for filler in self.fillers.iter_mut().filter(|f| f.enabled()) {
            let owner = filler.name().to_string();
            let mut scope = self.maps.scope(&owner);
            filler
                .fill(&mut self.output, input, &mut scope)
                .map_err(|e| e.in_filler(&owner, Phase::ValueExtraction))?;
        }

        self.phase = Phase::ReferenceLinking;
        debug!(event = %input.id, phase = %self.phase, "starting phase");

        for filler in self.fillers.iter_mut().filter(|f| f.enabled()) {
            filler
                .set_refs(&mut self.output, &self.maps)
                .map_err(|e| e.in_filler(filler.name(), Phase::ReferenceLinking))?;
        }
        Ok(())
    }

    /// Produce every event of `events` and write the produced ones to `sink`.
    ///
    /// Stops at the first job-fatal fault.
    pub fn run<'e, I, S>(&mut self, events: I, sink: &mut S) -> Result<RunSummary, NtuplizerError>
    where
        I: IntoIterator<Item = &'e InputEvent>,
        S: EventSink + ?Sized,
    {
        let mut summary = RunSummary::default();

        for event in events {
            match self.process_event(event)? {
                EventOutcome::Produced => {
                    sink.write_event(&self.output)?;
                    summary.processed += 1;
                }
                EventOutcome::Skipped(_) => summary.skipped += 1,
            }
        }

        info!(
            processed = summary.processed,
            skipped = summary.skipped,
            "event loop finished"
        );
        Ok(summary)
    }
}
