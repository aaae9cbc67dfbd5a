//! Boundary traits toward the rest of the application.
//!
//! The core treats both collaborators as black boxes: the report generator
//! returns an opaque narrative string, the sink swallows a finished record.

use thiserror::Error;

use crate::models::{SessionRecord, SessionSnapshot};

#[derive(Error, Debug)]
#[error("report generation failed: {message}")]
pub struct ReportError {
    pub message: String,
}

impl ReportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

/// External (typically AI-backed) narrative report builder. The core hands
/// over the plain-data snapshot and never parses the returned text.
pub trait ReportGenerator {
    fn generate(&self, snapshot: &SessionSnapshot) -> Result<String, ReportError>;
}

#[derive(Error, Debug)]
#[error("persistence failed: {message}")]
pub struct PersistError {
    pub message: String,
}

impl PersistError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

/// External persistence service for finished sessions. This is the one
/// collaborator whose failure surfaces as a hard error to the caller.
pub trait SessionSink {
    fn persist(&mut self, record: &SessionRecord) -> Result<(), PersistError>;
}
