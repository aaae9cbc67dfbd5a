//! Final session output handed to external reporting/persistence.
//!
//! Field names follow the consuming collaborators' contract (camelCase,
//! `durationSeconds`/`scoreFor`/... per the app's report builder), so the
//! serde shape here is the wire shape, do not rename casually.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::events::{SidelineEvent, SubstitutionEvent};

pub const RECORD_VERSION: u32 = 1;

/// Immutable summary of a finished live session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub duration_seconds: u32,
    pub score_for: u32,
    pub score_against: u32,
    pub substitution_log: Vec<SubstitutionEvent>,
    /// Every sideline event in recorded order (goals included; the score
    /// counters above are the derived tallies).
    pub sideline_notes: Vec<SidelineEvent>,
    pub evaluations: Vec<EvaluationSummary>,
    pub player_statuses: BTreeMap<String, PlayerMinutes>,
}

/// Per-player scores as the report builder consumes them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationSummary {
    pub player_id: String,
    pub scores: BTreeMap<String, u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerMinutes {
    pub cumulative_minutes: u32,
}

/// The persisted unit: snapshot plus metadata and the optional
/// externally-generated narrative report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    /// Record format version for forward migration.
    pub version: u32,
    pub session_id: String,
    pub saved_at: DateTime<Utc>,
    pub snapshot: SessionSnapshot,
    /// Opaque narrative text from the AI report collaborator, if any.
    /// The core never parses or depends on its content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<String>,
}

impl SessionRecord {
    pub fn new(session_id: impl Into<String>, snapshot: SessionSnapshot, report: Option<String>) -> Self {
        Self {
            version: RECORD_VERSION,
            session_id: session_id.into(),
            saved_at: Utc::now(),
            snapshot,
            report,
        }
    }
}
