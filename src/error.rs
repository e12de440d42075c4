// src/error.rs
use std::io;
use thiserror::Error;

use crate::entry::EntryKind;

// Re-export anyhow's Result type
pub use anyhow::Result;

/// Custom Error type for the vitals library
#[derive(Error, Debug)]
pub enum VitalsError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Trace error: {0}")]
    Trace(String),

    #[error("Sink error: {0}")]
    Sink(String),

    #[error("Collector '{0}' has already been started")]
    AlreadyStarted(String),

    #[error("Other error: {0}")]
    Other(String),
}

/// Raised when a performance source cannot provide a signal channel.
///
/// This never propagates past the collector: the affected metric is simply
/// not collected.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Unsupported signal '{kind}': {reason}")]
pub struct UnsupportedSignal {
    pub kind: EntryKind,
    pub reason: String,
}

impl UnsupportedSignal {
    pub fn new(kind: EntryKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for VitalsError {
    fn from(err: serde_json::Error) -> Self {
        VitalsError::Trace(err.to_string())
    }
}
