//! Evaluation Board
//!
//! Per-player criterion scores (0..=5) and free-text notes, with completion
//! progress for the coach's checklist. Score writes auto-persist to the
//! recovery store, coalesced so rapid tapping produces at most one write per
//! quiet window.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

use crate::error::SessionError;
use crate::models::{Criterion, Roster, RosterEntry};
use crate::recovery::{self, Concern, StoreHandle};

pub const MAX_SCORE: u8 = 5;

/// Coalesce rapid successive writes into one save per quiet window.
pub const AUTOSAVE_QUIET_WINDOW: Duration = Duration::from_secs(2);

/// Sparse per-player evaluation. A player with no record is "unevaluated".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub player_id: String,
    pub session_id: String,
    /// criterion id → score, last write wins.
    pub scores: BTreeMap<String, u8>,
    /// Last score update.
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct BoardCheckpoint {
    evaluations: HashMap<String, Evaluation>,
    notes: HashMap<String, String>,
    /// Opaque session metadata (score board, sideline events) that rides in
    /// the same checkpoint namespace as the evaluations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    metadata: Option<serde_json::Value>,
}

#[derive(Debug)]
pub struct EvaluationBoard {
    roster: Roster,
    criteria: Vec<Criterion>,
    session_id: String,
    evaluations: HashMap<String, Evaluation>,
    notes: HashMap<String, String>,
    metadata: Option<serde_json::Value>,
    dirty: bool,
    last_persist: Option<Instant>,
    store: StoreHandle,
}

impl EvaluationBoard {
    pub fn new(
        store: StoreHandle,
        session_id: &str,
        roster: Roster,
        criteria: Vec<Criterion>,
    ) -> Self {
        Self {
            roster,
            criteria,
            session_id: session_id.to_string(),
            evaluations: HashMap::new(),
            notes: HashMap::new(),
            metadata: None,
            dirty: false,
            last_persist: None,
            store,
        }
    }

    /// Restore scores and notes from a checkpoint if one exists.
    pub fn restore_or_new(
        store: StoreHandle,
        session_id: &str,
        roster: Roster,
        criteria: Vec<Criterion>,
    ) -> Self {
        let restored: Option<BoardCheckpoint> =
            recovery::restore(&store, session_id, Concern::Evaluations);

        let mut board = Self::new(store, session_id, roster, criteria);
        if let Some(cp) = restored {
            board.evaluations = cp.evaluations;
            board.notes = cp.notes;
            board.metadata = cp.metadata;
        }
        board
    }

    /// Upsert one criterion score. Out-of-range scores are rejected with the
    /// prior state fully intact; no evaluation record is created for a
    /// first-time player on a rejected call.
    pub fn set_score(
        &mut self,
        player_id: &str,
        criterion_id: &str,
        score: u8,
    ) -> Result<(), SessionError> {
        if score > MAX_SCORE {
            return Err(SessionError::ScoreOutOfRange { score });
        }
        if !self.roster.contains(player_id) {
            return Err(SessionError::UnknownPlayer { id: player_id.to_string() });
        }
        if !self.criteria.iter().any(|c| c.id == criterion_id) {
            return Err(SessionError::UnknownCriterion { id: criterion_id.to_string() });
        }

        let evaluation =
            self.evaluations.entry(player_id.to_string()).or_insert_with(|| Evaluation {
                player_id: player_id.to_string(),
                session_id: self.session_id.clone(),
                scores: BTreeMap::new(),
                timestamp: Utc::now(),
            });
        evaluation.scores.insert(criterion_id.to_string(), score);
        evaluation.timestamp = Utc::now();

        self.mark_dirty();
        Ok(())
    }

    pub fn get_evaluation(&self, player_id: &str) -> Option<&Evaluation> {
        self.evaluations.get(player_id)
    }

    /// Percentage of roster players with at least one scored criterion.
    pub fn progress(&self) -> u8 {
        if self.roster.is_empty() {
            return 0;
        }
        let evaluated = self.roster.iter().filter(|e| self.is_evaluated(&e.id)).count();
        ((evaluated as f32 / self.roster.len() as f32) * 100.0).round() as u8
    }

    /// Roster entries with zero scored criteria, in roster order.
    pub fn unevaluated_players(&self) -> Vec<&RosterEntry> {
        self.roster.iter().filter(|e| !self.is_evaluated(&e.id)).collect()
    }

    /// Free-text annotation, independent of scores. Does not make a player
    /// count as evaluated.
    pub fn set_note(&mut self, player_id: &str, text: impl Into<String>) -> Result<(), SessionError> {
        if !self.roster.contains(player_id) {
            return Err(SessionError::UnknownPlayer { id: player_id.to_string() });
        }
        self.notes.insert(player_id.to_string(), text.into());
        self.mark_dirty();
        Ok(())
    }

    pub fn note(&self, player_id: &str) -> Option<&str> {
        self.notes.get(player_id).map(String::as_str)
    }

    pub fn criteria(&self) -> &[Criterion] {
        &self.criteria
    }

    /// Session-owned metadata persisted alongside the evaluations (the
    /// orchestrator keeps its score board and sideline events here so they
    /// survive a reload in the same namespace).
    pub fn set_metadata(&mut self, metadata: serde_json::Value) {
        self.metadata = Some(metadata);
        self.mark_dirty();
    }

    pub fn metadata(&self) -> Option<&serde_json::Value> {
        self.metadata.as_ref()
    }

    pub fn has_pending_writes(&self) -> bool {
        self.dirty
    }

    /// Force any pending write out now. Called on finish/abandon so no
    /// deferred save can land after the session changes phase.
    pub fn flush(&mut self) {
        if self.dirty {
            self.persist();
        }
    }

    /// Land a pending write once the quiet window has passed. The host's
    /// once-per-second tick drives this, so the trailing writes of a burst
    /// reach the checkpoint without waiting for the next mutation.
    pub fn flush_if_quiet(&mut self) {
        if !self.dirty {
            return;
        }
        let quiet = match self.last_persist {
            None => true,
            Some(at) => at.elapsed() >= AUTOSAVE_QUIET_WINDOW,
        };
        if quiet {
            self.persist();
        }
    }

    /// Drop pending writes without persisting (abandon path).
    pub fn discard_pending(&mut self) {
        self.dirty = false;
    }

    fn is_evaluated(&self, player_id: &str) -> bool {
        self.evaluations.get(player_id).map(|e| !e.scores.is_empty()).unwrap_or(false)
    }

    fn mark_dirty(&mut self) {
        self.dirty = true;

        // Debounced auto-persist: at most one write per quiet window; the
        // remainder rides along with a later mutation or the final flush.
        let due = match self.last_persist {
            None => true,
            Some(at) => at.elapsed() >= AUTOSAVE_QUIET_WINDOW,
        };
        if due {
            self.persist();
        }
    }

    fn persist(&mut self) {
        let cp = BoardCheckpoint {
            evaluations: self.evaluations.clone(),
            notes: self.notes.clone(),
            metadata: self.metadata.clone(),
        };
        recovery::checkpoint(&self.store, &self.session_id, Concern::Evaluations, &cp);
        self.dirty = false;
        self.last_persist = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recovery::{MemoryRecoveryStore, RecoveryError, RecoveryStore};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn roster() -> Roster {
        Roster::new(vec![RosterEntry::new("p1", "Ahn"), RosterEntry::new("p2", "Bae")])
    }

    fn criteria() -> Vec<Criterion> {
        vec![
            Criterion { id: "c1".into(), name: "First touch".into(), category: "Technical".into() },
            Criterion { id: "c2".into(), name: "Positioning".into(), category: "Tactical".into() },
            Criterion { id: "c3".into(), name: "Work rate".into(), category: "Physical".into() },
        ]
    }

    fn board() -> EvaluationBoard {
        let store: StoreHandle = Arc::new(MemoryRecoveryStore::new());
        EvaluationBoard::new(store, "test-session", roster(), criteria())
    }

    #[test]
    fn test_progress_and_unevaluated() {
        // 2 players, 3 criteria; p1 scored on 2 of 3.
        let mut board = board();
        board.set_score("p1", "c1", 4).unwrap();
        board.set_score("p1", "c2", 3).unwrap();

        assert_eq!(board.progress(), 50);
        let unevaluated: Vec<&str> =
            board.unevaluated_players().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(unevaluated, vec!["p2"]);
    }

    #[test]
    fn test_out_of_range_rejected_without_record() {
        let mut board = board();

        let err = board.set_score("p1", "c1", 7).unwrap_err();
        assert!(matches!(err, SessionError::ScoreOutOfRange { score: 7 }));
        // First call for p1 was rejected: still unevaluated, no record.
        assert!(board.get_evaluation("p1").is_none());
        assert_eq!(board.progress(), 0);
    }

    #[test]
    fn test_out_of_range_leaves_prior_value() {
        let mut board = board();
        board.set_score("p1", "c1", 4).unwrap();

        assert!(board.set_score("p1", "c1", 6).is_err());
        assert_eq!(board.get_evaluation("p1").unwrap().scores["c1"], 4);
    }

    #[test]
    fn test_set_score_idempotent() {
        let mut board = board();
        board.set_score("p1", "c1", 5).unwrap();
        let progress_before = board.progress();
        let scores_before = board.get_evaluation("p1").unwrap().scores.clone();

        board.set_score("p1", "c1", 5).unwrap();
        assert_eq!(board.progress(), progress_before);
        assert_eq!(board.get_evaluation("p1").unwrap().scores, scores_before);
    }

    #[test]
    fn test_last_write_wins() {
        let mut board = board();
        board.set_score("p1", "c1", 2).unwrap();
        board.set_score("p1", "c1", 5).unwrap();
        assert_eq!(board.get_evaluation("p1").unwrap().scores["c1"], 5);
    }

    #[test]
    fn test_unknown_ids_rejected() {
        let mut board = board();
        assert!(matches!(
            board.set_score("ghost", "c1", 3),
            Err(SessionError::UnknownPlayer { .. })
        ));
        assert!(matches!(
            board.set_score("p1", "c9", 3),
            Err(SessionError::UnknownCriterion { .. })
        ));
    }

    #[test]
    fn test_notes_independent_of_scores() {
        let mut board = board();
        board.set_note("p2", "struggled in duels").unwrap();

        assert_eq!(board.note("p2"), Some("struggled in duels"));
        // A note alone does not count as evaluated.
        assert_eq!(board.progress(), 0);
        assert_eq!(board.unevaluated_players().len(), 2);
    }

    #[test]
    fn test_restore_recovers_scores_and_notes() {
        let store: StoreHandle = Arc::new(MemoryRecoveryStore::new());
        {
            let mut board =
                EvaluationBoard::new(Arc::clone(&store), "s1", roster(), criteria());
            board.set_score("p1", "c1", 4).unwrap();
            board.set_note("p1", "good session").unwrap();
            board.flush();
        }

        let restored = EvaluationBoard::restore_or_new(store, "s1", roster(), criteria());
        assert_eq!(restored.get_evaluation("p1").unwrap().scores["c1"], 4);
        assert_eq!(restored.note("p1"), Some("good session"));
    }

    /// Store wrapper that counts writes, to observe debouncing.
    #[derive(Debug)]
    struct CountingStore {
        inner: MemoryRecoveryStore,
        writes: AtomicUsize,
    }

    impl RecoveryStore for CountingStore {
        fn put(&self, key: &str, value: &str) -> Result<(), RecoveryError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner.put(key, value)
        }
        fn get(&self, key: &str) -> Result<Option<String>, RecoveryError> {
            self.inner.get(key)
        }
        fn remove(&self, key: &str) -> Result<(), RecoveryError> {
            self.inner.remove(key)
        }
    }

    #[test]
    fn test_quiet_window_lands_trailing_write() {
        let store: StoreHandle = Arc::new(MemoryRecoveryStore::new());
        let mut board = EvaluationBoard::new(Arc::clone(&store), "s1", roster(), criteria());
        let key = crate::recovery::checkpoint_key("s1", Concern::Evaluations);
        let checkpointed_score = |store: &StoreHandle| -> serde_json::Value {
            let cp: serde_json::Value =
                serde_json::from_str(&store.get(&key).unwrap().unwrap()).unwrap();
            cp["evaluations"]["p1"]["scores"]["c1"].clone()
        };

        // Mis-tap then correction inside one window: the checkpoint still
        // holds the first write...
        board.set_score("p1", "c1", 1).unwrap();
        board.set_score("p1", "c1", 4).unwrap();
        board.flush_if_quiet();
        assert_eq!(checkpointed_score(&store), 1);
        assert!(board.has_pending_writes());

        // ...until the quiet window passes and the correction lands.
        std::thread::sleep(AUTOSAVE_QUIET_WINDOW + Duration::from_millis(100));
        board.flush_if_quiet();
        assert_eq!(checkpointed_score(&store), 4);
        assert!(!board.has_pending_writes());
    }

    #[test]
    fn test_rapid_writes_coalesced() {
        let counting = Arc::new(CountingStore {
            inner: MemoryRecoveryStore::new(),
            writes: AtomicUsize::new(0),
        });
        let store: StoreHandle = Arc::clone(&counting) as StoreHandle;
        let mut board = EvaluationBoard::new(store, "s1", roster(), criteria());

        // Burst of taps well inside one quiet window.
        for score in 0..=5u8 {
            board.set_score("p1", "c1", score).unwrap();
        }

        // First write goes out immediately, the rest stay pending.
        assert_eq!(counting.writes.load(Ordering::SeqCst), 1);
        assert!(board.has_pending_writes());

        board.flush();
        assert_eq!(counting.writes.load(Ordering::SeqCst), 2);
        assert!(!board.has_pending_writes());
    }
}
