//! Session event records (substitutions, goals, sideline notes).
//!
//! Substitution events carry player names in addition to ids: they are rare,
//! and embedding the names avoids fragile post-hoc resolution once the
//! on-pitch assignment has changed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One executed substitution, appended to the ledger's time-ascending log.
///
/// "Out" is always whichever player of the pair was on-pitch immediately
/// before the swap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubstitutionEvent {
    pub id: String,
    /// Wall-clock time the swap was recorded.
    pub timestamp: DateTime<Utc>,
    pub player_out_id: String,
    pub player_out_name: String,
    pub player_in_id: String,
    pub player_in_name: String,
    /// Match clock position in seconds at the moment of the swap.
    pub match_second: u32,
}

impl SubstitutionEvent {
    pub fn new(
        player_out_id: impl Into<String>,
        player_out_name: impl Into<String>,
        player_in_id: impl Into<String>,
        player_in_name: impl Into<String>,
        match_second: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            player_out_id: player_out_id.into(),
            player_out_name: player_out_name.into(),
            player_in_id: player_in_id.into(),
            player_in_name: player_in_name.into(),
            match_second,
        }
    }

    /// Match minute for display ("62'" style).
    pub fn match_minute(&self) -> u32 {
        self.match_second / 60
    }
}

/// A goal or free-text note recorded against the running clock,
/// independent of player evaluations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SidelineEvent {
    Goal {
        id: String,
        timestamp: DateTime<Utc>,
        match_second: u32,
        /// true = our team scored, false = opponent.
        scored_by_us: bool,
    },
    Note {
        id: String,
        timestamp: DateTime<Utc>,
        match_second: u32,
        text: String,
        /// Scope: a specific player, or the whole session when `None`.
        #[serde(skip_serializing_if = "Option::is_none")]
        player_id: Option<String>,
    },
}

impl SidelineEvent {
    pub fn goal(match_second: u32, scored_by_us: bool) -> Self {
        SidelineEvent::Goal {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            match_second,
            scored_by_us,
        }
    }

    pub fn note(match_second: u32, text: impl Into<String>, player_id: Option<String>) -> Self {
        SidelineEvent::Note {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            match_second,
            text: text.into(),
            player_id,
        }
    }

    pub fn match_second(&self) -> u32 {
        match self {
            SidelineEvent::Goal { match_second, .. } => *match_second,
            SidelineEvent::Note { match_second, .. } => *match_second,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substitution_minute() {
        let event = SubstitutionEvent::new("p1", "Ahn", "p2", "Bae", 1875);
        assert_eq!(event.match_minute(), 31);
    }

    #[test]
    fn test_sideline_event_serde_tagging() {
        let goal = SidelineEvent::goal(300, true);
        let json = serde_json::to_string(&goal).unwrap();
        assert!(json.contains("\"type\":\"goal\""));

        let note = SidelineEvent::note(300, "pressing well", None);
        let json = serde_json::to_string(&note).unwrap();
        assert!(json.contains("\"type\":\"note\""));
        assert!(!json.contains("player_id"));
    }
}
