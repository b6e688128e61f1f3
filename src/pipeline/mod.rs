//! # Two-phase event pipeline
//!
//! The [`Producer`](crate::pipeline::producer::Producer) owns every per-job resource (fillers,
//! object maps, output record) and drives each event through
//!
//! ```text
//!  clear maps ─▶ init record ─▶ fill (all fillers) ─▶ set_refs (all fillers) ─▶ sink
//! ```
//!
//! The second phase starts only once the first has completed for every enabled filler. A fault
//! in either phase aborts the event: event-local faults skip it, job-fatal faults stop the job
//! (see [`FaultKind`](crate::ntuplizer_errors::FaultKind)).
pub mod producer;
pub mod sink;

use std::fmt;

use crate::ntuplizer_errors::NtuplizerError;

/// Where the producer is within the current event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Between events.
    #[default]
    Idle,
    /// Per-run filling, before the first event of a run.
    RunBegin,
    /// Fillers convert input objects and record their own maps.
    ValueExtraction,
    /// Fillers read each other's maps and set cross references.
    ReferenceLinking,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::RunBegin => "fillRun",
            Phase::ValueExtraction => "fill",
            Phase::ReferenceLinking => "setRefs",
        };
        f.write_str(name)
    }
}

/// Result of one call to [`Producer::process_event`](crate::pipeline::producer::Producer::process_event).
#[derive(Debug, PartialEq)]
pub enum EventOutcome {
    /// Both phases completed; the output record holds the event.
    Produced,
    /// An event-local fault aborted the event.
    Skipped(NtuplizerError),
}

impl EventOutcome {
    pub fn is_produced(&self) -> bool {
        matches!(self, EventOutcome::Produced)
    }
}

/// Counters of a [`Producer::run`](crate::pipeline::producer::Producer::run).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub processed: usize,
    pub skipped: usize,
}

impl RunSummary {
    pub fn total(&self) -> usize {
        self.processed + self.skipped
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} events read, {} written, {} skipped",
            self.total(),
            self.processed,
            self.skipped
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_display() {
        assert_eq!(Phase::ValueExtraction.to_string(), "fill");
        assert_eq!(Phase::ReferenceLinking.to_string(), "setRefs");
        assert_eq!(Phase::default(), Phase::Idle);
    }

    #[test]
    fn test_summary_display() {
        let summary = RunSummary {
            processed: 8,
            skipped: 2,
        };
        assert_eq!(summary.to_string(), "10 events read, 8 written, 2 skipped");
    }
}
