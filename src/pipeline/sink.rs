//! Destinations of produced records.
use crate::event::{OutputEventRecord, RunRecord};
use crate::ntuplizer_errors::NtuplizerError;

/// Consumer of the records produced by a [`Producer`](crate::pipeline::producer::Producer).
///
/// The record is lent for the duration of the call; a sink that keeps it must copy it.
pub trait EventSink {
    fn write_event(&mut self, record: &OutputEventRecord) -> Result<(), NtuplizerError>;

    fn write_run(&mut self, _run: &RunRecord) -> Result<(), NtuplizerError> {
        Ok(())
    }
}

/// Sink keeping copies of everything it receives.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    pub events: Vec<OutputEventRecord>,
    pub runs: Vec<RunRecord>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventSink for MemorySink {
    fn write_event(&mut self, record: &OutputEventRecord) -> Result<(), NtuplizerError> {
        self.events.push(record.clone());
        Ok(())
    }

    fn write_run(&mut self, run: &RunRecord) -> Result<(), NtuplizerError> {
        self.runs.push(run.clone());
        Ok(())
    }
}

/// Sink dropping everything, for jobs only interested in the summary.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn write_event(&mut self, _record: &OutputEventRecord) -> Result<(), NtuplizerError> {
        Ok(())
    }
}
