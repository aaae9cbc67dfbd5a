//! Substitution Ledger
//!
//! Per-player on-pitch/bench status, minutes-played accounting, and the
//! ordered substitution log. Also hosts the two-step "select then swap"
//! touch protocol used by the bench view.
//!
//! 교체 규칙: 두 선수 중 정확히 한 명이 on-pitch일 때만 교체 가능.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::SessionError;
use crate::models::{Roster, SubstitutionEvent};
use crate::recovery::{self, Concern, StoreHandle};

/// Live tracking row for one roster entry. Never deleted during a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerStatus {
    pub player_id: String,
    pub player_name: String,
    pub is_on_pitch: bool,
    /// Whole minutes played across all completed and current stints.
    pub cumulative_minutes: u32,
    /// Match second the player last entered the pitch.
    /// `None` only for a player who has never taken the pitch.
    pub last_substitution_time: Option<u32>,
    /// Whole minutes of the current stint; 0 while on the bench.
    pub current_stint_minutes: u32,
}

/// Explicit two-state selection machine (none selected / one selected).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PendingSelection {
    #[default]
    None,
    Selected(String),
}

/// What a `select_player` call did.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectionOutcome {
    /// First tap: player recorded as pending.
    Selected,
    /// Second tap on a valid partner: swap executed.
    Substituted(SubstitutionEvent),
    /// Tapping the pending player again deselects it.
    Cleared,
}

#[derive(Debug, Serialize, Deserialize)]
struct LedgerCheckpoint {
    statuses: Vec<PlayerStatus>,
    log: Vec<SubstitutionEvent>,
    elapsed_seconds: u32,
}

#[derive(Debug)]
pub struct SubstitutionLedger {
    /// Roster order, one row per entry.
    statuses: Vec<PlayerStatus>,
    index: HashMap<String, usize>,
    log: Vec<SubstitutionEvent>,
    pending: PendingSelection,
    elapsed_seconds: u32,
    session_id: String,
    store: StoreHandle,
}

impl SubstitutionLedger {
    /// Build one status row per roster entry; `initial_on_pitch` players
    /// start on the pitch with their stint anchored at 0.
    pub fn new(
        store: StoreHandle,
        session_id: &str,
        roster: &Roster,
        initial_on_pitch: &[String],
    ) -> Result<Self, SessionError> {
        for id in initial_on_pitch {
            if !roster.contains(id) {
                return Err(SessionError::UnknownPlayer { id: id.clone() });
            }
        }

        let statuses: Vec<PlayerStatus> = roster
            .iter()
            .map(|entry| {
                let on_pitch = initial_on_pitch.iter().any(|id| id == &entry.id);
                PlayerStatus {
                    player_id: entry.id.clone(),
                    player_name: entry.name.clone(),
                    is_on_pitch: on_pitch,
                    cumulative_minutes: 0,
                    last_substitution_time: if on_pitch { Some(0) } else { None },
                    current_stint_minutes: 0,
                }
            })
            .collect();

        let index = statuses
            .iter()
            .enumerate()
            .map(|(i, s)| (s.player_id.clone(), i))
            .collect();

        Ok(Self {
            statuses,
            index,
            log: Vec::new(),
            pending: PendingSelection::None,
            elapsed_seconds: 0,
            session_id: session_id.to_string(),
            store,
        })
    }

    /// Restore minutes and the substitution log from a checkpoint if one
    /// exists; otherwise initialize fresh. The pending selection is
    /// deliberately not recovered (it is transient UI state).
    pub fn restore_or_new(
        store: StoreHandle,
        session_id: &str,
        roster: &Roster,
        initial_on_pitch: &[String],
    ) -> Result<Self, SessionError> {
        let restored: Option<LedgerCheckpoint> =
            recovery::restore(&store, session_id, Concern::Substitutions);

        let mut ledger = Self::new(store, session_id, roster, initial_on_pitch)?;
        if let Some(cp) = restored {
            // Only accept a checkpoint that matches the current roster.
            let same_roster = cp.statuses.len() == ledger.statuses.len()
                && cp.statuses.iter().all(|s| ledger.index.contains_key(&s.player_id));
            if same_roster {
                for status in cp.statuses {
                    let i = ledger.index[&status.player_id];
                    ledger.statuses[i] = status;
                }
                ledger.log = cp.log;
                ledger.elapsed_seconds = cp.elapsed_seconds;
            } else {
                log::warn!("Substitution checkpoint does not match roster, starting fresh");
            }
        }
        Ok(ledger)
    }

    /// Consume the clock. Recomputes every on-pitch player's stint minutes
    /// and rolls cumulative minutes forward by the stint delta.
    pub fn on_clock_tick(&mut self, elapsed_seconds: u32) {
        self.elapsed_seconds = elapsed_seconds;

        let mut minute_rolled = false;
        for status in &mut self.statuses {
            if !status.is_on_pitch {
                continue;
            }
            let Some(entered_at) = status.last_substitution_time else {
                continue;
            };

            let stint = elapsed_seconds.saturating_sub(entered_at) / 60;
            let delta = stint.saturating_sub(status.current_stint_minutes);
            if delta > 0 {
                status.cumulative_minutes += delta;
                status.current_stint_minutes = stint;
                minute_rolled = true;
            }
        }

        // One checkpoint per rolled minute at most, not one per second.
        if minute_rolled {
            self.write_checkpoint();
        }
    }

    /// Two-step protocol: first call records a pending selection, second
    /// call with a valid partner executes the swap. Any completed second
    /// call clears the pending selection, including rejections.
    pub fn select_player(&mut self, player_id: &str) -> Result<SelectionOutcome, SessionError> {
        if !self.index.contains_key(player_id) {
            self.pending = PendingSelection::None;
            return Err(SessionError::UnknownPlayer { id: player_id.to_string() });
        }

        match std::mem::take(&mut self.pending) {
            PendingSelection::None => {
                self.pending = PendingSelection::Selected(player_id.to_string());
                Ok(SelectionOutcome::Selected)
            }
            PendingSelection::Selected(prev) if prev == player_id => Ok(SelectionOutcome::Cleared),
            PendingSelection::Selected(prev) => {
                // Pending already cleared by the take; reject or swap.
                let event = self.substitute(&prev, player_id)?;
                Ok(SelectionOutcome::Substituted(event))
            }
        }
    }

    pub fn cancel_selection(&mut self) {
        self.pending = PendingSelection::None;
    }

    pub fn pending_selection(&self) -> &PendingSelection {
        &self.pending
    }

    /// Swap a pitch/bench pair. The pair may be passed in either order;
    /// whichever player was on the pitch is recorded as "out".
    pub fn substitute(
        &mut self,
        first_id: &str,
        second_id: &str,
    ) -> Result<SubstitutionEvent, SessionError> {
        let first = *self
            .index
            .get(first_id)
            .ok_or_else(|| SessionError::UnknownPlayer { id: first_id.to_string() })?;
        let second = *self
            .index
            .get(second_id)
            .ok_or_else(|| SessionError::UnknownPlayer { id: second_id.to_string() })?;

        if self.statuses[first].is_on_pitch == self.statuses[second].is_on_pitch {
            return Err(SessionError::SameZonePair {
                first: first_id.to_string(),
                second: second_id.to_string(),
                zone: if self.statuses[first].is_on_pitch { "on the pitch" } else { "on the bench" },
            });
        }

        let (out_idx, in_idx) =
            if self.statuses[first].is_on_pitch { (first, second) } else { (second, first) };

        let now = self.elapsed_seconds;
        {
            let leaving = &mut self.statuses[out_idx];
            leaving.is_on_pitch = false;
            leaving.current_stint_minutes = 0;
        }
        {
            let entering = &mut self.statuses[in_idx];
            entering.is_on_pitch = true;
            entering.last_substitution_time = Some(now);
            entering.current_stint_minutes = 0;
        }

        let event = SubstitutionEvent::new(
            self.statuses[out_idx].player_id.clone(),
            self.statuses[out_idx].player_name.clone(),
            self.statuses[in_idx].player_id.clone(),
            self.statuses[in_idx].player_name.clone(),
            now,
        );
        log::info!(
            "Substitution at {}: {} off, {} on",
            now,
            event.player_out_name,
            event.player_in_name
        );

        self.log.push(event.clone());
        self.write_checkpoint();
        Ok(event)
    }

    pub fn status(&self, player_id: &str) -> Option<&PlayerStatus> {
        self.index.get(player_id).map(|&i| &self.statuses[i])
    }

    /// All rows, roster order.
    pub fn statuses(&self) -> &[PlayerStatus] {
        &self.statuses
    }

    pub fn players_on_pitch(&self) -> Vec<&PlayerStatus> {
        self.statuses.iter().filter(|s| s.is_on_pitch).collect()
    }

    pub fn players_on_bench(&self) -> Vec<&PlayerStatus> {
        self.statuses.iter().filter(|s| !s.is_on_pitch).collect()
    }

    pub fn substitution_log(&self) -> &[SubstitutionEvent] {
        &self.log
    }

    fn write_checkpoint(&self) {
        let cp = LedgerCheckpoint {
            statuses: self.statuses.clone(),
            log: self.log.clone(),
            elapsed_seconds: self.elapsed_seconds,
        };
        recovery::checkpoint(&self.store, &self.session_id, Concern::Substitutions, &cp);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RosterEntry;
    use crate::recovery::MemoryRecoveryStore;
    use proptest::prelude::*;
    use std::sync::Arc;

    fn roster() -> Roster {
        Roster::new(vec![
            RosterEntry::new("p1", "Ahn"),
            RosterEntry::new("p2", "Bae"),
            RosterEntry::new("p3", "Cho"),
        ])
    }

    fn ledger_with(initial: &[&str]) -> SubstitutionLedger {
        let store: StoreHandle = Arc::new(MemoryRecoveryStore::new());
        let initial: Vec<String> = initial.iter().map(|s| s.to_string()).collect();
        SubstitutionLedger::new(store, "test-session", &roster(), &initial).unwrap()
    }

    #[test]
    fn test_initialize_on_pitch_and_bench() {
        let ledger = ledger_with(&["p1", "p3"]);

        let on_pitch: Vec<&str> =
            ledger.players_on_pitch().iter().map(|s| s.player_id.as_str()).collect();
        assert_eq!(on_pitch, vec!["p1", "p3"]);

        let bench: Vec<&str> =
            ledger.players_on_bench().iter().map(|s| s.player_id.as_str()).collect();
        assert_eq!(bench, vec!["p2"]);

        assert_eq!(ledger.status("p1").unwrap().last_substitution_time, Some(0));
        assert_eq!(ledger.status("p2").unwrap().last_substitution_time, None);
    }

    #[test]
    fn test_two_step_select_then_swap() {
        // Scenario: only p1 on pitch, swap at 300s via two taps.
        let mut ledger = ledger_with(&["p1"]);
        ledger.on_clock_tick(300);

        assert_eq!(ledger.select_player("p1").unwrap(), SelectionOutcome::Selected);
        let outcome = ledger.select_player("p2").unwrap();
        let event = match outcome {
            SelectionOutcome::Substituted(event) => event,
            other => panic!("expected substitution, got {:?}", other),
        };

        assert_eq!(event.player_out_id, "p1");
        assert_eq!(event.player_in_id, "p2");
        assert_eq!(event.match_second, 300);
        assert!(!ledger.status("p1").unwrap().is_on_pitch);
        assert!(ledger.status("p2").unwrap().is_on_pitch);
        assert_eq!(ledger.status("p2").unwrap().last_substitution_time, Some(300));
        assert_eq!(*ledger.pending_selection(), PendingSelection::None);
    }

    #[test]
    fn test_select_same_player_clears() {
        let mut ledger = ledger_with(&["p1"]);

        ledger.select_player("p2").unwrap();
        assert_eq!(ledger.select_player("p2").unwrap(), SelectionOutcome::Cleared);
        assert_eq!(*ledger.pending_selection(), PendingSelection::None);
    }

    #[test]
    fn test_cancel_selection() {
        let mut ledger = ledger_with(&["p1"]);

        ledger.select_player("p2").unwrap();
        ledger.cancel_selection();
        assert_eq!(*ledger.pending_selection(), PendingSelection::None);

        // Next select is a fresh first tap, not a swap.
        assert_eq!(ledger.select_player("p3").unwrap(), SelectionOutcome::Selected);
    }

    #[test]
    fn test_same_zone_pair_rejected_without_mutation() {
        let mut ledger = ledger_with(&["p1"]);

        // p2 and p3 are both on the bench.
        ledger.select_player("p2").unwrap();
        let err = ledger.select_player("p3").unwrap_err();
        assert!(matches!(err, SessionError::SameZonePair { .. }));

        assert!(!ledger.status("p2").unwrap().is_on_pitch);
        assert!(!ledger.status("p3").unwrap().is_on_pitch);
        assert!(ledger.substitution_log().is_empty());
        // Selection cleared, caller surfaces the warning.
        assert_eq!(*ledger.pending_selection(), PendingSelection::None);
    }

    #[test]
    fn test_unknown_player_is_error_not_corruption() {
        let mut ledger = ledger_with(&["p1"]);

        let err = ledger.substitute("p1", "ghost").unwrap_err();
        assert!(matches!(err, SessionError::UnknownPlayer { .. }));
        assert!(ledger.status("p1").unwrap().is_on_pitch);
        assert!(ledger.substitution_log().is_empty());
    }

    #[test]
    fn test_zone_invariant_on_pitch_count_unchanged() {
        let mut ledger = ledger_with(&["p1", "p2"]);
        ledger.on_clock_tick(600);

        let before = ledger.players_on_pitch().len();
        ledger.substitute("p1", "p3").unwrap();
        assert_eq!(ledger.players_on_pitch().len(), before);
    }

    #[test]
    fn test_substitute_pair_order_does_not_matter() {
        // Bench player passed first: the on-pitch player is still "out".
        let mut ledger = ledger_with(&["p1"]);
        let event = ledger.substitute("p3", "p1").unwrap();
        assert_eq!(event.player_out_id, "p1");
        assert_eq!(event.player_in_id, "p3");
    }

    #[test]
    fn test_minutes_accrual_across_stints() {
        let mut ledger = ledger_with(&["p1"]);

        // First stint: 0..300s = 5 minutes.
        for second in 1..=300 {
            ledger.on_clock_tick(second);
        }
        assert_eq!(ledger.status("p1").unwrap().current_stint_minutes, 5);
        assert_eq!(ledger.status("p1").unwrap().cumulative_minutes, 5);

        ledger.substitute("p1", "p2").unwrap();
        assert_eq!(ledger.status("p1").unwrap().current_stint_minutes, 0);
        assert_eq!(ledger.status("p1").unwrap().cumulative_minutes, 5);

        // Bench time does not accrue.
        for second in 301..=600 {
            ledger.on_clock_tick(second);
        }
        assert_eq!(ledger.status("p1").unwrap().cumulative_minutes, 5);
        assert_eq!(ledger.status("p2").unwrap().current_stint_minutes, 5);

        // Second stint for p1: 600..780s = 2 more minutes.
        ledger.substitute("p2", "p1").unwrap();
        for second in 601..=780 {
            ledger.on_clock_tick(second);
        }
        let p1 = ledger.status("p1").unwrap();
        assert_eq!(p1.last_substitution_time, Some(600));
        assert_eq!(p1.current_stint_minutes, 3);
        assert_eq!(p1.cumulative_minutes, 8);
    }

    #[test]
    fn test_restore_recovers_minutes_and_log() {
        let store: StoreHandle = Arc::new(MemoryRecoveryStore::new());
        let initial = vec!["p1".to_string()];
        {
            let mut ledger =
                SubstitutionLedger::new(Arc::clone(&store), "s1", &roster(), &initial).unwrap();
            for second in 1..=420 {
                ledger.on_clock_tick(second);
            }
            ledger.substitute("p1", "p2").unwrap();
        }

        let restored =
            SubstitutionLedger::restore_or_new(store, "s1", &roster(), &initial).unwrap();
        assert_eq!(restored.substitution_log().len(), 1);
        assert_eq!(restored.status("p1").unwrap().cumulative_minutes, 7);
        assert!(restored.status("p2").unwrap().is_on_pitch);
    }

    proptest! {
        // Minutes conservation: cumulative minutes equals the sum of
        // floor(stint / 60) over all completed stints, and never decreases.
        #[test]
        fn prop_minutes_conservation(stints in proptest::collection::vec(1u32..900, 1..8)) {
            let mut ledger = ledger_with(&["p1"]);
            let mut clock = 0u32;
            let mut expected = 0u32;
            let mut p1_playing = true;

            for stint_len in &stints {
                let end = clock + stint_len;
                for second in (clock + 1)..=end {
                    ledger.on_clock_tick(second);
                }
                if p1_playing {
                    expected += stint_len / 60;
                }
                clock = end;

                let (a, b) = if p1_playing { ("p1", "p2") } else { ("p2", "p1") };
                ledger.substitute(a, b).unwrap();
                p1_playing = !p1_playing;
            }

            prop_assert_eq!(ledger.status("p1").unwrap().cumulative_minutes, expected);
        }
    }
}
