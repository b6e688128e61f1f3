//! # Error taxonomy
//!
//! Every fallible operation of the crate returns [`NtuplizerError`]. Variants fall into two
//! classes, reported by [`NtuplizerError::kind`]:
//!
//! * [`FaultKind::EventLocal`] – the current event cannot be produced (a mandatory product is
//!   absent, an input collection is malformed). The [`Producer`](crate::pipeline::producer::Producer)
//!   skips the event and continues.
//! * [`FaultKind::JobFatal`] – misconfiguration or a broken internal invariant. The producer
//!   stops and hands the error to its caller.
//!
//! Data anomalies found while merging generator collections are **not** errors; they are logged
//! and returned in a [`MergeReport`](crate::gen::merge::MergeReport).
use thiserror::Error;

use crate::pipeline::Phase;

/// Severity class of a fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultKind {
    /// Skip the current event and go on with the next one.
    EventLocal,
    /// Abort the whole job.
    JobFatal,
}

#[derive(Error, Debug)]
pub enum NtuplizerError {
    #[error("Object map '{name}' is registered as {stored}, requested as {requested}")]
    TypeMismatch {
        name: String,
        stored: String,
        requested: String,
    },

    #[error("Input collection '{0}' was never registered")]
    UnregisteredProduct(String),

    #[error("Configuration error in '{filler}': {message}")]
    Configuration { filler: String, message: String },

    #[error("Unknown filler class: {0}")]
    UnknownFillerClass(String),

    #[error("Product not found: {0}")]
    MissingProduct(String),

    #[error("Malformed input collection: {0}")]
    MalformedInput(String),

    #[error("Internal invariant violated: {0}")]
    InvariantViolation(String),

    #[error("Filler '{owner}' tried to access map '{requested}' during value extraction")]
    ForeignMapAccess { owner: String, requested: String },

    #[error("Invalid merge parameters: {0}")]
    InvalidParams(String),

    #[error("Event sink error: {0}")]
    Sink(String),

    #[error(transparent)]
    Filler(Box<FillerFault>),
}

/// A fault raised by one filler, tagged with the filler name and the phase it was raised in.
#[derive(Error, Debug, PartialEq)]
#[error("filler '{filler}' failed during {phase}: {source}")]
pub struct FillerFault {
    pub filler: String,
    pub phase: Phase,
    pub source: NtuplizerError,
}

impl NtuplizerError {
    /// Classify the error as event-local or job-fatal.
    ///
    /// A [`FillerFault`] inherits the class of the error it wraps.
    pub fn kind(&self) -> FaultKind {
        use NtuplizerError::*;
        match self {
            MissingProduct(_) | MalformedInput(_) => FaultKind::EventLocal,
            Filler(fault) => fault.source.kind(),
            TypeMismatch { .. }
            | UnregisteredProduct(_)
            | Configuration { .. }
            | UnknownFillerClass(_)
            | InvariantViolation(_)
            | ForeignMapAccess { .. }
            | InvalidParams(_)
            | Sink(_) => FaultKind::JobFatal,
        }
    }

    /// Attach the filler identity and the phase to an error.
    ///
    /// Already wrapped errors are returned unchanged so the innermost filler stays reported.
    pub fn in_filler(self, filler: &str, phase: Phase) -> Self {
        match self {
            NtuplizerError::Filler(_) => self,
            source => NtuplizerError::Filler(Box::new(FillerFault {
                filler: filler.to_string(),
                phase,
                source,
            })),
        }
    }

    pub(crate) fn config(filler: &str, message: impl Into<String>) -> Self {
        NtuplizerError::Configuration {
            filler: filler.to_string(),
            message: message.into(),
        }
    }
}

impl PartialEq for NtuplizerError {
    fn eq(&self, other: &Self) -> bool {
        use NtuplizerError::*;
        match (self, other) {
            (
                TypeMismatch {
                    name: a,
                    stored: b,
                    requested: c,
                },
                TypeMismatch {
                    name: x,
                    stored: y,
                    requested: z,
                },
            ) => a == x && b == y && c == z,
            (UnregisteredProduct(a), UnregisteredProduct(b)) => a == b,
            (
                Configuration {
                    filler: a,
                    message: b,
                },
                Configuration {
                    filler: x,
                    message: y,
                },
            ) => a == x && b == y,
            (UnknownFillerClass(a), UnknownFillerClass(b)) => a == b,
            (MissingProduct(a), MissingProduct(b)) => a == b,
            (MalformedInput(a), MalformedInput(b)) => a == b,
            (InvariantViolation(a), InvariantViolation(b)) => a == b,
            (
                ForeignMapAccess {
                    owner: a,
                    requested: b,
                },
                ForeignMapAccess {
                    owner: x,
                    requested: y,
                },
            ) => a == x && b == y,
            (InvalidParams(a), InvalidParams(b)) => a == b,
            (Sink(a), Sink(b)) => a == b,
            (Filler(a), Filler(b)) => a == b,
            _ => false,
        }
    }
}
